//! Substructures: a definition graph plus its host-graph instances.

use std::rc::Rc;

use crate::graph::Graph;
use crate::instance::Instance;

/// A connected graph pattern together with every host-graph instance of it
/// found so far, the number of distinct positive examples those instances
/// cover, and the substructure's evaluation value (higher is better).
#[derive(Debug, Clone, Default)]
pub struct Substructure {
    /// The pattern itself, a small connected graph. Label ids index the
    /// host's registry.
    pub definition: Graph,
    /// Instances in the host graph, shared by reference count.
    pub instances: Vec<Rc<Instance>>,
    /// Distinct positive examples covered by the instances.
    pub num_examples: u32,
    /// Evaluation value under the active method.
    pub value: f64,
}

impl Substructure {
    /// Creates a substructure with the given definition and no instances.
    pub fn new(definition: Graph) -> Self {
        Substructure {
            definition,
            instances: Vec::new(),
            num_examples: 0,
            value: 0.0,
        }
    }

    /// Number of instances.
    pub fn num_instances(&self) -> usize {
        self.instances.len()
    }

    /// Recounts how many distinct positive examples the instances cover.
    pub fn recount_examples(&mut self, host: &Graph) {
        let mut examples: Vec<u32> = self.instances.iter().map(|i| i.example(host)).collect();
        examples.sort_unstable();
        examples.dedup();
        self.num_examples = examples.len() as u32;
    }

    /// True when `candidate` shares a vertex with any admitted instance.
    pub fn overlaps_any(&self, candidate: &Instance) -> bool {
        self.instances.iter().any(|i| i.overlaps(candidate))
    }

    /// True when the definition is a single vertex introduced by an earlier
    /// compression pass (such patterns are excluded from the best list).
    pub fn is_compressed_singleton(&self) -> bool {
        self.definition.vertex_count() == 1
            && self.definition.edge_count() == 0
            && self
                .definition
                .vertex(crate::id::VertexId(0))
                .map(|v| v.introduced_by_compression.is_some())
                .unwrap_or(false)
    }
}
