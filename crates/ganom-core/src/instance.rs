//! Instances: concrete occurrences of a substructure in the host graph.
//!
//! An [`Instance`] names a subgraph of the host by sorted vertex-index and
//! edge-index lists, plus a mapping from substructure-definition vertices to
//! host vertices. Instances are immutable once built; extension produces a
//! new instance carrying an `Rc` back reference to its parent, and instance
//! lists share instances by reference counting.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::graph::Graph;
use crate::id::{EdgeId, VertexId};

/// Sentinel for a definition vertex with no host counterpart in a partial
/// mapping.
pub const UNMAPPED: VertexId = VertexId(u32::MAX);

/// A subgraph of the host graph matching (or nearly matching) a
/// substructure definition.
///
/// The vertex and edge lists are strictly increasing; [`Instance::insert_vertex`]
/// and [`Instance::insert_edge`] keep them that way.
#[derive(Debug, Clone, Default)]
pub struct Instance {
    /// Host vertex indices, strictly increasing.
    pub vertices: SmallVec<[VertexId; 8]>,
    /// Host edge indices, strictly increasing.
    pub edges: SmallVec<[EdgeId; 8]>,
    /// Definition vertex `i` maps to host vertex `mapping[i]`. Filled in when
    /// the instance is admitted to a substructure; empty until then.
    pub mapping: SmallVec<[VertexId; 8]>,
    /// Lowest edit cost observed against any candidate definition.
    pub min_match_cost: f64,
    /// The vertex added by the most recent extension, if any.
    pub new_vertex: Option<VertexId>,
    /// The edge added by the most recent extension, if any.
    pub new_edge: Option<EdgeId>,
    /// Host vertices flagged anomalous within this instance.
    pub anomalous_vertices: SmallVec<[VertexId; 2]>,
    /// Host edges flagged anomalous within this instance.
    pub anomalous_edges: SmallVec<[EdgeId; 2]>,
    /// Information-theoretic anomaly score (cost x frequency).
    pub info_anom_value: f64,
    /// Probabilistic anomaly score (instance ratio).
    pub prob_anom_value: f64,
    /// Maximum-partial-substructure anomaly score.
    pub mps_anom_value: f64,
    /// Number of exact-matching candidates sharing this instance's shape.
    pub frequency: u32,
    /// The instance this one was extended from, for provenance chains.
    pub parent: Option<Rc<Instance>>,
}

impl Instance {
    /// Creates a single-vertex instance (the seed shape).
    pub fn single(v: VertexId) -> Self {
        Instance {
            vertices: SmallVec::from_slice(&[v]),
            mapping: SmallVec::from_slice(&[v]),
            min_match_cost: 0.0,
            ..Instance::default()
        }
    }

    /// Inserts a vertex keeping the list sorted; returns false if already
    /// present.
    pub fn insert_vertex(&mut self, v: VertexId) -> bool {
        match self.vertices.binary_search(&v) {
            Ok(_) => false,
            Err(pos) => {
                self.vertices.insert(pos, v);
                true
            }
        }
    }

    /// Inserts an edge keeping the list sorted; returns false if already
    /// present.
    pub fn insert_edge(&mut self, e: EdgeId) -> bool {
        match self.edges.binary_search(&e) {
            Ok(_) => false,
            Err(pos) => {
                self.edges.insert(pos, e);
                true
            }
        }
    }

    /// True when the instance contains host vertex `v`.
    pub fn contains_vertex(&self, v: VertexId) -> bool {
        self.vertices.binary_search(&v).is_ok()
    }

    /// True when the instance contains host edge `e`.
    pub fn contains_edge(&self, e: EdgeId) -> bool {
        self.edges.binary_search(&e).is_ok()
    }

    /// Vertices + edges, the instance's size measure.
    pub fn size(&self) -> usize {
        self.vertices.len() + self.edges.len()
    }

    /// True when the two instances share at least one vertex.
    ///
    /// Both lists are sorted, so this is a linear merge scan.
    pub fn overlaps(&self, other: &Instance) -> bool {
        let (mut i, mut j) = (0, 0);
        while i < self.vertices.len() && j < other.vertices.len() {
            match self.vertices[i].cmp(&other.vertices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => return true,
            }
        }
        false
    }

    /// The vertices shared with `other`, in ascending order.
    pub fn shared_vertices(&self, other: &Instance) -> SmallVec<[VertexId; 4]> {
        let mut shared = SmallVec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.vertices.len() && j < other.vertices.len() {
            match self.vertices[i].cmp(&other.vertices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    shared.push(self.vertices[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        shared
    }

    /// True when both instances name exactly the same vertices and edges.
    pub fn same_shape(&self, other: &Instance) -> bool {
        self.vertices == other.vertices && self.edges == other.edges
    }

    /// Builds the child instance formed by adding host edge `e` (and its
    /// endpoints, where new) to `parent`.
    ///
    /// Records the added edge and any added vertex in the `new_edge` /
    /// `new_vertex` markers and links the child back to its parent.
    pub fn extend_with(parent: &Rc<Instance>, host: &Graph, e: EdgeId) -> Instance {
        let mut child = Instance {
            vertices: parent.vertices.clone(),
            edges: parent.edges.clone(),
            mapping: SmallVec::new(),
            min_match_cost: parent.min_match_cost,
            new_vertex: None,
            new_edge: None,
            anomalous_vertices: parent.anomalous_vertices.clone(),
            anomalous_edges: parent.anomalous_edges.clone(),
            info_anom_value: 0.0,
            prob_anom_value: 0.0,
            mps_anom_value: 0.0,
            frequency: 0,
            parent: Some(Rc::clone(parent)),
        };
        let edge = &host[e];
        if child.insert_vertex(edge.v1) {
            child.new_vertex = Some(edge.v1);
        }
        if child.insert_vertex(edge.v2) {
            child.new_vertex = Some(edge.v2);
        }
        child.insert_edge(e);
        child.new_edge = Some(e);
        child
    }

    /// Extracts the subgraph this instance names as a standalone graph.
    ///
    /// Vertices appear in ascending host order, edges in ascending host
    /// order, with provenance copied from the host elements. Label ids are
    /// carried over unchanged (same registry).
    pub fn to_graph(&self, host: &Graph) -> Graph {
        let mut g = Graph::new();
        for &v in &self.vertices {
            g.add_vertex_from(&host[v]);
        }
        for &e in &self.edges {
            let edge = &host[e];
            let local_v1 = self.local_index(edge.v1);
            let local_v2 = self.local_index(edge.v2);
            // Endpoints are members of this instance, so the lookups and the
            // re-add cannot fail.
            g.add_edge_from(edge, local_v1, local_v2)
                .expect("instance edge endpoints are instance vertices");
        }
        g
    }

    /// Position of host vertex `v` within this instance's sorted vertex list.
    ///
    /// Panics if `v` is not a member; callers index with instance vertices
    /// only.
    pub fn local_index(&self, v: VertexId) -> VertexId {
        let pos = self
            .vertices
            .binary_search(&v)
            .expect("vertex is a member of the instance");
        VertexId(pos as u32)
    }

    /// The example this instance lives in (all its vertices share one).
    pub fn example(&self, host: &Graph) -> u32 {
        self.vertices
            .first()
            .map(|&v| host[v].source_example)
            .unwrap_or(0)
    }
}
