//! One-edge extension of a substructure's instance set.
//!
//! Every instance grows by every host edge incident to it, the grown
//! instances are grouped by the canonical graph they induce, and each group
//! becomes a child substructure. With a nonzero threshold, an instance whose
//! shape is within `threshold * (|V| + |E|)` edit cost of an existing
//! child's definition joins that child instead of founding its own.

use std::rc::Rc;

use tracing::trace;

use ganom_core::{Graph, Instance, Substructure, UNMAPPED};

use crate::matcher::{graphs_match_exactly, inexact_match, MapTarget, MatchCosts};

/// Knobs for one extension pass.
#[derive(Debug, Clone)]
pub struct ExtendOptions {
    /// Fraction of a definition's size allowed as admission edit cost.
    pub threshold: f64,
    /// When false, instances sharing a vertex with an already-admitted
    /// instance of the same child are rejected (first-inserted wins).
    pub allow_overlap: bool,
    /// Mark the added edge (and added vertex, if any) anomalous in each
    /// child instance; the probabilistic search uses this to tag rare
    /// extensions.
    pub mark_anomalous: bool,
    /// Matcher cost model.
    pub costs: MatchCosts,
}

impl Default for ExtendOptions {
    fn default() -> Self {
        ExtendOptions {
            threshold: 0.0,
            allow_overlap: false,
            mark_anomalous: false,
            costs: MatchCosts::default(),
        }
    }
}

/// Extends `sub` by one edge in every possible way, returning the child
/// substructures populated with their instances.
pub fn extend_substructure(
    sub: &Substructure,
    host: &Graph,
    opts: &ExtendOptions,
) -> Vec<Substructure> {
    let mut children: Vec<Substructure> = Vec::new();

    for inst in &sub.instances {
        for &v in &inst.vertices {
            for &e in host.incident_edges(v) {
                if inst.contains_edge(e) {
                    continue;
                }
                let candidate = Instance::extend_with(inst, host, e);
                admit(&mut children, candidate, host, opts);
            }
        }
    }

    for child in &mut children {
        child.recount_examples(host);
    }
    trace!(
        parent_size = sub.definition.size(),
        children = children.len(),
        "extended substructure"
    );
    children
}

/// Routes one grown instance into the child whose definition matches it, or
/// founds a new child.
fn admit(children: &mut Vec<Substructure>, mut candidate: Instance, host: &Graph, opts: &ExtendOptions) {
    let graph = candidate.to_graph(host);

    let mut home: Option<(usize, f64)> = None;
    for (idx, child) in children.iter().enumerate() {
        if graphs_match_exactly(&graph, &child.definition) {
            home = Some((idx, 0.0));
            break;
        }
    }
    if home.is_none() && opts.threshold > 0.0 {
        for (idx, child) in children.iter().enumerate() {
            let tau = opts.threshold * child.definition.size() as f64;
            if let Some(result) =
                inexact_match(&graph, &child.definition, opts.costs, Some(tau))
            {
                home = Some((idx, result.cost));
                break;
            }
        }
    }

    if opts.mark_anomalous {
        if let Some(e) = candidate.new_edge {
            candidate.anomalous_edges.push(e);
        }
        if let Some(v) = candidate.new_vertex {
            candidate.anomalous_vertices.push(v);
        }
    }

    match home {
        Some((idx, cost)) => {
            let child = &mut children[idx];
            if child.instances.iter().any(|i| i.same_shape(&candidate)) {
                return;
            }
            if !opts.allow_overlap && child.overlaps_any(&candidate) {
                return;
            }
            candidate.min_match_cost = cost;
            candidate.mapping = definition_mapping(&child.definition, &graph, &candidate, opts);
            child.instances.push(Rc::new(candidate));
        }
        None => {
            // This instance's own graph becomes the child definition; its
            // mapping is the identity onto the sorted vertex list.
            candidate.min_match_cost = 0.0;
            candidate.mapping = candidate.vertices.clone();
            let mut child = Substructure::new(graph);
            child.instances.push(Rc::new(candidate));
            children.push(child);
        }
    }
}

/// Mapping from definition vertices to host vertices for an admitted
/// instance, via a zero-or-low-cost match of the definition onto the
/// instance's graph. Definition vertices the match deletes map to
/// [`UNMAPPED`].
fn definition_mapping(
    definition: &Graph,
    instance_graph: &Graph,
    candidate: &Instance,
    opts: &ExtendOptions,
) -> smallvec::SmallVec<[ganom_core::VertexId; 8]> {
    let result = inexact_match(definition, instance_graph, opts.costs, None)
        .expect("unbounded match always completes");
    result
        .mapping
        .iter()
        .map(|target| match target {
            MapTarget::To(local) => candidate.vertices[local.index()],
            MapTarget::Deleted => UNMAPPED,
        })
        .collect()
}
