//! The host graph store.
//!
//! A [`Graph`] owns its vertices and edges in contiguous index-addressed
//! arrays; everything else in the pipeline (instances, substructures, the
//! matcher) refers to graph elements by [`VertexId`]/[`EdgeId`], never by
//! pointer. Copies are deep (`Clone`), and no two graphs share storage.
//!
//! # Adjacency invariant
//!
//! For every edge `e` with endpoints `v1, v2`, both endpoint vertices list
//! `e` in their adjacency arrays exactly once -- except self-edges, which are
//! listed once in total. The invariant is maintained by [`Graph::add_edge`];
//! structural mutation happens only through `Graph` methods. Scratch state
//! used by individual algorithms (visited marks, mapping arrays) is *not*
//! stored here; algorithms own index-keyed arrays of their own.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{CoreError, EndpointRole};
use crate::id::{EdgeId, LabelId, VertexId};

/// A vertex of the host graph.
///
/// Provenance fields record where the vertex came from in the original
/// input: its 1-based number within its example (`source_vertex`), the
/// example it belongs to, and its index in the graph as first loaded
/// (`original_index`, before any compression pass rewrote the arrays).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Label index into the run's registry.
    pub label: LabelId,
    /// Incident edge indices; maintained by [`Graph::add_edge`].
    pub(crate) edges: SmallVec<[EdgeId; 4]>,
    /// 1-based vertex number within its source example.
    pub source_vertex: u32,
    /// Which positive example this vertex belongs to (0-based).
    pub source_example: u32,
    /// Index in the originally loaded graph.
    pub original_index: u32,
    /// Display color for visualization output.
    pub color: u32,
    /// Set when an anomaly search flags this vertex.
    pub anomalous: bool,
    /// Anomaly score attached when `anomalous` is set.
    pub anomalous_value: f64,
    /// `Some(k)` when this vertex is a SUB vertex introduced by compression
    /// iteration `k`. Replaces label-text sniffing everywhere a pass needs
    /// to recognize compressed substructures.
    pub introduced_by_compression: Option<u32>,
}

/// An edge of the host graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// First endpoint (the source when `directed`).
    pub v1: VertexId,
    /// Second endpoint (the target when `directed`).
    pub v2: VertexId,
    /// Label index into the run's registry.
    pub label: LabelId,
    /// Directed edge from `v1` to `v2` when true, undirected otherwise.
    pub directed: bool,
    /// 1-based source-example number of `v1`.
    pub source_v1: u32,
    /// 1-based source-example number of `v2`.
    pub source_v2: u32,
    /// Which positive example this edge belongs to (0-based).
    pub source_example: u32,
    /// Index in the originally loaded graph.
    pub original_index: u32,
    /// Display color for visualization output.
    pub color: u32,
    /// Set when an anomaly search flags this edge.
    pub anomalous: bool,
    /// Anomaly score attached when `anomalous` is set.
    pub anomalous_value: f64,
}

/// A labeled graph with index-addressed vertex and edge arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) edges: Vec<Edge>,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Graph::default()
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Adds a vertex with the given label and default provenance
    /// (`source_vertex` = new index + 1, example 0). Returns the new id.
    pub fn add_vertex(&mut self, label: LabelId) -> VertexId {
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(Vertex {
            label,
            edges: SmallVec::new(),
            source_vertex: id.0 + 1,
            source_example: 0,
            original_index: id.0,
            color: 0,
            anomalous: false,
            anomalous_value: 0.0,
            introduced_by_compression: None,
        });
        id
    }

    /// Adds a vertex carrying the provenance, coloring, and anomaly fields of
    /// `template` (its adjacency is not copied; edges are rebuilt by the
    /// caller). Used when compression and instance extraction copy vertices
    /// between graphs.
    pub fn add_vertex_from(&mut self, template: &Vertex) -> VertexId {
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(Vertex {
            edges: SmallVec::new(),
            ..template.clone()
        });
        id
    }

    /// Adds an edge between two existing vertices and indexes it in both
    /// endpoints' adjacency lists (once, for a self-edge).
    pub fn add_edge(
        &mut self,
        v1: VertexId,
        v2: VertexId,
        label: LabelId,
        directed: bool,
    ) -> Result<EdgeId, CoreError> {
        self.check_endpoint(v1, EndpointRole::Source)?;
        self.check_endpoint(v2, EndpointRole::Target)?;

        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge {
            v1,
            v2,
            label,
            directed,
            source_v1: self.vertices[v1.index()].source_vertex,
            source_v2: self.vertices[v2.index()].source_vertex,
            source_example: self.vertices[v1.index()].source_example,
            original_index: id.0,
            color: 0,
            anomalous: false,
            anomalous_value: 0.0,
        });
        self.vertices[v1.index()].edges.push(id);
        if v1 != v2 {
            self.vertices[v2.index()].edges.push(id);
        }
        Ok(id)
    }

    /// Adds an edge carrying the provenance, coloring, and anomaly fields of
    /// `template`, rewired to `v1`/`v2` in this graph.
    pub fn add_edge_from(
        &mut self,
        template: &Edge,
        v1: VertexId,
        v2: VertexId,
    ) -> Result<EdgeId, CoreError> {
        self.check_endpoint(v1, EndpointRole::Source)?;
        self.check_endpoint(v2, EndpointRole::Target)?;

        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge {
            v1,
            v2,
            ..template.clone()
        });
        self.vertices[v1.index()].edges.push(id);
        if v1 != v2 {
            self.vertices[v2.index()].edges.push(id);
        }
        Ok(id)
    }

    fn check_endpoint(&self, v: VertexId, role: EndpointRole) -> Result<(), CoreError> {
        if v.index() >= self.vertices.len() {
            return Err(CoreError::EndpointOutOfRange {
                role,
                vertex: v,
                vertex_count: self.vertices.len(),
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// Looks up a vertex by id.
    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.index())
    }

    /// Looks up a vertex by id (mutable, e.g. for setting anomaly flags).
    pub fn vertex_mut(&mut self, id: VertexId) -> Option<&mut Vertex> {
        self.vertices.get_mut(id.index())
    }

    /// Looks up an edge by id.
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.index())
    }

    /// Looks up an edge by id (mutable).
    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(id.index())
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Graph size as vertices + edges (the SIZE evaluation measure).
    pub fn size(&self) -> usize {
        self.vertices.len() + self.edges.len()
    }

    /// True when the graph has no vertices.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Iterates over all vertex ids in index order.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> {
        (0..self.vertices.len() as u32).map(VertexId)
    }

    /// Iterates over all edge ids in index order.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> {
        (0..self.edges.len() as u32).map(EdgeId)
    }

    /// The edges incident to `v`, in insertion order.
    pub fn incident_edges(&self, v: VertexId) -> &[EdgeId] {
        &self.vertices[v.index()].edges
    }

    /// Degree of `v` (self-edges count once).
    pub fn degree(&self, v: VertexId) -> usize {
        self.vertices[v.index()].edges.len()
    }

    /// The endpoint of `e` that is not `v` (`v` itself for a self-edge).
    pub fn other_endpoint(&self, e: EdgeId, v: VertexId) -> VertexId {
        let edge = &self.edges[e.index()];
        if edge.v1 == v {
            edge.v2
        } else {
            edge.v1
        }
    }

    /// Number of distinct positive examples the vertices span.
    pub fn example_count(&self) -> usize {
        self.vertices
            .iter()
            .map(|v| v.source_example as usize + 1)
            .max()
            .unwrap_or(0)
    }

    // -----------------------------------------------------------------------
    // Connectivity
    // -----------------------------------------------------------------------

    /// True when the graph is connected, ignoring edge direction.
    ///
    /// The empty graph counts as connected. Used to enforce the invariant
    /// that substructure definitions are connected.
    pub fn is_connected(&self) -> bool {
        if self.vertices.is_empty() {
            return true;
        }
        let mut seen = vec![false; self.vertices.len()];
        let mut stack = vec![VertexId(0)];
        seen[0] = true;
        let mut count = 1;
        while let Some(v) = stack.pop() {
            for &e in self.incident_edges(v) {
                let w = self.other_endpoint(e, v);
                if !seen[w.index()] {
                    seen[w.index()] = true;
                    count += 1;
                    stack.push(w);
                }
            }
        }
        count == self.vertices.len()
    }

    // -----------------------------------------------------------------------
    // Invariant checking
    // -----------------------------------------------------------------------

    /// Verifies the adjacency invariant: every edge is listed exactly once in
    /// each endpoint's adjacency array (once total for self-edges), and every
    /// adjacency entry points back at an incident edge.
    pub fn adjacency_is_consistent(&self) -> bool {
        for (i, edge) in self.edges.iter().enumerate() {
            let e = EdgeId(i as u32);
            if edge.v1.index() >= self.vertices.len() || edge.v2.index() >= self.vertices.len() {
                return false;
            }
            let in_v1 = self.vertices[edge.v1.index()]
                .edges
                .iter()
                .filter(|&&x| x == e)
                .count();
            let in_v2 = self.vertices[edge.v2.index()]
                .edges
                .iter()
                .filter(|&&x| x == e)
                .count();
            let ok = if edge.v1 == edge.v2 {
                in_v1 == 1
            } else {
                in_v1 == 1 && in_v2 == 1
            };
            if !ok {
                return false;
            }
        }
        for (i, vertex) in self.vertices.iter().enumerate() {
            let v = VertexId(i as u32);
            for &e in &vertex.edges {
                match self.edges.get(e.index()) {
                    Some(edge) if edge.v1 == v || edge.v2 == v => {}
                    _ => return false,
                }
            }
        }
        true
    }

    /// Debug-build assertion of the adjacency invariant.
    #[cfg(debug_assertions)]
    pub fn debug_assert_adjacency(&self) {
        assert!(
            self.adjacency_is_consistent(),
            "adjacency invariant violated ({} vertices, {} edges)",
            self.vertices.len(),
            self.edges.len()
        );
    }

    /// No-op in release builds.
    #[cfg(not(debug_assertions))]
    pub fn debug_assert_adjacency(&self) {}
}

impl std::ops::Index<VertexId> for Graph {
    type Output = Vertex;

    fn index(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.index()]
    }
}

impl std::ops::Index<EdgeId> for Graph {
    type Output = Edge;

    fn index(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::{Label, LabelRegistry};

    fn two_labels() -> (LabelRegistry, LabelId, LabelId) {
        let mut reg = LabelRegistry::new();
        let a = reg.intern(Label::from("a"));
        let e = reg.intern(Label::from("e"));
        (reg, a, e)
    }

    #[test]
    fn add_edge_indexes_both_endpoints() {
        let (_reg, a, e) = two_labels();
        let mut g = Graph::new();
        let v1 = g.add_vertex(a);
        let v2 = g.add_vertex(a);
        let edge = g.add_edge(v1, v2, e, false).unwrap();

        assert_eq!(g.incident_edges(v1), &[edge]);
        assert_eq!(g.incident_edges(v2), &[edge]);
        assert!(g.adjacency_is_consistent());
    }

    #[test]
    fn self_edge_is_listed_once() {
        let (_reg, a, e) = two_labels();
        let mut g = Graph::new();
        let v = g.add_vertex(a);
        let edge = g.add_edge(v, v, e, true).unwrap();

        assert_eq!(g.incident_edges(v), &[edge]);
        assert_eq!(g.degree(v), 1);
        assert!(g.adjacency_is_consistent());
    }

    #[test]
    fn add_edge_rejects_missing_source() {
        let (_reg, a, e) = two_labels();
        let mut g = Graph::new();
        let v = g.add_vertex(a);

        let err = g.add_edge(VertexId(5), v, e, false).unwrap_err();
        match err {
            CoreError::EndpointOutOfRange { role, vertex, .. } => {
                assert_eq!(role, EndpointRole::Source);
                assert_eq!(vertex, VertexId(5));
            }
            other => panic!("expected EndpointOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn other_endpoint_resolves_both_directions() {
        let (_reg, a, e) = two_labels();
        let mut g = Graph::new();
        let v1 = g.add_vertex(a);
        let v2 = g.add_vertex(a);
        let edge = g.add_edge(v1, v2, e, true).unwrap();

        assert_eq!(g.other_endpoint(edge, v1), v2);
        assert_eq!(g.other_endpoint(edge, v2), v1);
    }

    #[test]
    fn connectivity() {
        let (_reg, a, e) = two_labels();
        let mut g = Graph::new();
        let v1 = g.add_vertex(a);
        let v2 = g.add_vertex(a);
        let v3 = g.add_vertex(a);
        g.add_edge(v1, v2, e, false).unwrap();

        assert!(!g.is_connected());
        g.add_edge(v2, v3, e, false).unwrap();
        assert!(g.is_connected());
        assert!(Graph::new().is_connected());
    }

    #[test]
    fn deep_copy_is_independent() {
        let (_reg, a, e) = two_labels();
        let mut g = Graph::new();
        let v1 = g.add_vertex(a);
        let v2 = g.add_vertex(a);
        g.add_edge(v1, v2, e, false).unwrap();

        let mut copy = g.clone();
        copy.add_vertex(a);

        assert_eq!(g.vertex_count(), 2);
        assert_eq!(copy.vertex_count(), 3);
    }

    #[test]
    fn example_count_spans_vertices() {
        let (_reg, a, _e) = two_labels();
        let mut g = Graph::new();
        assert_eq!(g.example_count(), 0);

        let v1 = g.add_vertex(a);
        let v2 = g.add_vertex(a);
        g.vertex_mut(v1).unwrap().source_example = 0;
        g.vertex_mut(v2).unwrap().source_example = 2;
        assert_eq!(g.example_count(), 3);
    }

    #[test]
    fn serde_roundtrip_preserves_structure() {
        let (_reg, a, e) = two_labels();
        let mut g = Graph::new();
        let v1 = g.add_vertex(a);
        let v2 = g.add_vertex(a);
        g.add_edge(v1, v2, e, true).unwrap();

        let json = serde_json::to_string(&g).unwrap();
        let back: Graph = serde_json::from_str(&json).unwrap();
        assert_eq!(g, back);
    }
}
