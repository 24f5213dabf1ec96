//! Inexact graph matcher.
//!
//! Computes the minimum edit distance transforming one graph into another
//! under a unit cost model, via best-first search over partial vertex
//! mappings `V(G1) ⇀ V(G2) ∪ {DELETED}`. The same routine answers both
//! questions the pipeline asks: "are these two subgraphs the same shape?"
//! (cost 0 within threshold 0) and "how far is this candidate from the
//! normative pattern?" (the anomaly distance).
//!
//! # Search model
//!
//! States are partial mappings ordered by a cost lower bound: the cost of
//! everything mapped so far, plus forced deletions of G1 edges already
//! decided by the partial mapping, plus a lower bound on inserts for G2
//! vertices that can no longer be matched. The frontier is a binary heap
//! keyed `(bound ascending, depth descending)` so the search reaches leaves
//! sooner among equal bounds. G1 vertices are consumed in a fixed order
//! (descending degree, index tiebreak), making the result deterministic.
//!
//! The number of expanded states is capped at `|V(G1)|^3`; on ceiling hit
//! the best frontier state is completed greedily, which degrades the result
//! to an upper bound but never reports a false match.
//!
//! Both graphs must index the same label registry; labels compare by id.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use smallvec::SmallVec;

use ganom_core::{EdgeId, Graph, VertexId};

/// Exponent of the matcher's node ceiling: at most `|V(G1)|^3` states are
/// expanded before the search falls back to greedy completion.
pub const SEARCH_CEILING_EXPONENT: u32 = 3;

/// Edit operation costs. All unit by default; identical labels cost 0.
#[derive(Debug, Clone, Copy)]
pub struct MatchCosts {
    /// Inserting a vertex present only in G2.
    pub insert_vertex: f64,
    /// Deleting a G1 vertex.
    pub delete_vertex: f64,
    /// Substituting a vertex label.
    pub substitute_vertex: f64,
    /// Inserting an edge present only in G2.
    pub insert_edge: f64,
    /// Deleting a G1 edge.
    pub delete_edge: f64,
    /// Inserting an edge together with a new endpoint vertex (one op).
    pub insert_edge_with_vertex: f64,
    /// Substituting an edge label.
    pub substitute_edge: f64,
    /// Changing an edge between directed and undirected.
    pub directedness: f64,
    /// Reversing a directed edge.
    pub reverse_edge: f64,
}

impl Default for MatchCosts {
    fn default() -> Self {
        MatchCosts {
            insert_vertex: 1.0,
            delete_vertex: 1.0,
            substitute_vertex: 1.0,
            insert_edge: 1.0,
            delete_edge: 1.0,
            insert_edge_with_vertex: 1.0,
            substitute_edge: 1.0,
            directedness: 1.0,
            reverse_edge: 1.0,
        }
    }
}

/// Where a mapping sends a G1 vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapTarget {
    /// Mapped onto a G2 vertex.
    To(VertexId),
    /// Deleted; no counterpart in G2.
    Deleted,
}

/// A complete minimum-cost mapping.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// Total edit cost.
    pub cost: f64,
    /// Target of each G1 vertex, indexed by G1 vertex id.
    pub mapping: Vec<MapTarget>,
}

/// Slack for threshold comparisons on accumulated float costs.
const COST_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Search state
// ---------------------------------------------------------------------------

/// A partial mapping on the frontier. `assignment[i]` is the target of the
/// i-th G1 vertex in matching order; `used_edges` are the G2 edges already
/// consumed by matched G1 edges.
///
/// Deleted vertices are charged optimistically during the search (a vertex
/// with incident edges is assumed to ride along with one edge deletion, the
/// mirror image of insert-edge-with-vertex); the exact ride assignment is a
/// bipartite matching settled when the mapping completes. The optimistic
/// charge never exceeds the true cost, so the bound stays admissible.
#[derive(Debug, Clone)]
struct SearchNode {
    bound: f64,
    cost: f64,
    depth: usize,
    seq: u64,
    assignment: SmallVec<[MapTarget; 8]>,
    used_edges: SmallVec<[EdgeId; 16]>,
}

impl PartialEq for SearchNode {
    fn eq(&self, other: &Self) -> bool {
        self.bound == other.bound && self.depth == other.depth && self.seq == other.seq
    }
}

impl Eq for SearchNode {}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; invert the bound so the cheapest state
        // pops first. Among equal bounds prefer deeper states, then the
        // earlier-pushed state.
        other
            .bound
            .partial_cmp(&self.bound)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.depth.cmp(&other.depth))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

/// Matcher for one (G1, G2) pair.
pub struct Matcher<'g> {
    g1: &'g Graph,
    g2: &'g Graph,
    costs: MatchCosts,
    /// G1 vertices in matching order: descending degree, index tiebreak.
    order: Vec<VertexId>,
}

impl<'g> Matcher<'g> {
    /// Prepares a matcher; the G1 vertex order is fixed here.
    pub fn new(g1: &'g Graph, g2: &'g Graph, costs: MatchCosts) -> Self {
        let mut order: Vec<VertexId> = g1.vertex_ids().collect();
        order.sort_by(|&a, &b| {
            g1.degree(b)
                .cmp(&g1.degree(a))
                .then_with(|| a.0.cmp(&b.0))
        });
        Matcher { g1, g2, costs, order }
    }

    /// Runs the search. With a threshold, `None` means "no match within
    /// threshold" -- a normal outcome, not an error. Without one, a complete
    /// mapping always exists (delete everything, insert everything).
    pub fn best_mapping(&self, threshold: Option<f64>) -> Option<MatchResult> {
        let tau = threshold.unwrap_or(f64::INFINITY);
        let n1 = self.g1.vertex_count();
        let ceiling = (n1 as u64).pow(SEARCH_CEILING_EXPONENT).max(1);

        let mut heap = BinaryHeap::new();
        let mut seq: u64 = 0;
        let root = self.make_node(SmallVec::new(), SmallVec::new(), 0.0, &mut seq);
        if root.bound > tau + COST_EPSILON {
            return None;
        }
        heap.push(root);

        let mut expanded: u64 = 0;
        while let Some(node) = heap.pop() {
            if node.depth == n1 {
                return Some(self.finish(node));
            }
            if expanded >= ceiling {
                // Ceiling hit: complete the best frontier state greedily.
                let node = self.greedy_complete(node, &mut seq);
                if node.cost > tau + COST_EPSILON {
                    return None;
                }
                return Some(self.finish(node));
            }
            expanded += 1;

            for child in self.children(&node, &mut seq) {
                if child.bound <= tau + COST_EPSILON {
                    heap.push(child);
                }
            }
        }
        None
    }

    // -- state construction -------------------------------------------------

    /// Builds a node from an assignment, computing its lower bound (and, at
    /// full depth, folding the deletion-ride settlement and the G2 insertion
    /// remainder into the cost).
    fn make_node(
        &self,
        assignment: SmallVec<[MapTarget; 8]>,
        used_edges: SmallVec<[EdgeId; 16]>,
        cost: f64,
        seq: &mut u64,
    ) -> SearchNode {
        let depth = assignment.len();
        let n1 = self.g1.vertex_count();
        let mut cost = cost;
        let bound;
        if depth == n1 {
            cost += self.deletion_settlement(&assignment);
            cost += self.insertion_remainder(&assignment, &used_edges);
            bound = cost;
        } else {
            let mapped = assignment
                .iter()
                .filter(|t| matches!(t, MapTarget::To(_)))
                .count();
            let g2_unmapped = self.g2.vertex_count() - mapped;
            let g1_remaining = n1 - depth;
            let surplus = g2_unmapped.saturating_sub(g1_remaining);
            bound = cost + surplus as f64 * self.costs.insert_vertex.min(self.costs.insert_edge_with_vertex);
        }
        *seq += 1;
        SearchNode {
            bound,
            cost,
            depth,
            seq: *seq,
            assignment,
            used_edges,
        }
    }

    /// Enumerates the extensions of `node` by assigning the next G1 vertex.
    ///
    /// The same-index target is tried first so that matching a graph against
    /// itself resolves to the identity mapping; remaining targets follow in
    /// ascending index order, then deletion.
    fn children(&self, node: &SearchNode, seq: &mut u64) -> Vec<SearchNode> {
        let u = self.order[node.depth];
        let mut children = Vec::new();

        let mut targets: Vec<VertexId> = Vec::with_capacity(self.g2.vertex_count());
        if (u.index()) < self.g2.vertex_count() {
            targets.push(u);
        }
        for w in self.g2.vertex_ids() {
            if w != u {
                targets.push(w);
            }
        }

        for w in targets {
            if node
                .assignment
                .iter()
                .any(|t| matches!(t, MapTarget::To(x) if *x == w))
            {
                continue;
            }
            let mut used = node.used_edges.clone();
            let delta = self.step_cost(u, Some(w), &node.assignment, &mut used);
            let mut assignment = node.assignment.clone();
            assignment.push(MapTarget::To(w));
            children.push(self.make_node(assignment, used, node.cost + delta, seq));
        }

        let mut used = node.used_edges.clone();
        let delta = self.step_cost(u, None, &node.assignment, &mut used);
        let mut assignment = node.assignment.clone();
        assignment.push(MapTarget::Deleted);
        children.push(self.make_node(assignment, used, node.cost + delta, seq));

        children
    }

    /// Cost of assigning G1 vertex `u` to `target` given the partial
    /// assignment; consumed G2 edges are appended to `used`.
    ///
    /// Edges are charged when their second endpoint is assigned, so every G1
    /// edge is charged exactly once over a complete mapping. A deleted vertex
    /// with incident edges is charged the optimistic ride price here; the
    /// exact ride assignment is settled at completion.
    fn step_cost(
        &self,
        u: VertexId,
        target: Option<VertexId>,
        assignment: &[MapTarget],
        used: &mut SmallVec<[EdgeId; 16]>,
    ) -> f64 {
        let mut delta = 0.0;
        match target {
            None => {
                delta += self.costs.delete_vertex;
                if self.g1.degree(u) > 0 {
                    // Assume the vertex rides one of its (necessarily
                    // deleted) incident edges.
                    delta -= self.delete_ride_discount();
                }
                for &e in self.g1.incident_edges(u) {
                    let o = self.g1.other_endpoint(e, u);
                    if o == u || self.position_of(o, assignment).is_some() {
                        delta += self.costs.delete_edge;
                    }
                }
            }
            Some(w) => {
                if self.g1[u].label != self.g2[w].label {
                    delta += self.costs.substitute_vertex;
                }
                for &e1 in self.g1.incident_edges(u) {
                    let o = self.g1.other_endpoint(e1, u);
                    if o == u {
                        delta += self.match_edge(e1, u, w, w, used);
                    } else if let Some(pos) = self.position_of(o, assignment) {
                        match assignment[pos] {
                            MapTarget::Deleted => delta += self.costs.delete_edge,
                            MapTarget::To(x) => delta += self.match_edge(e1, u, w, x, used),
                        }
                    }
                }
            }
        }
        delta
    }

    /// Saving of deleting a vertex together with one incident edge compared
    /// to deleting both separately.
    fn delete_ride_discount(&self) -> f64 {
        (self.costs.delete_vertex + self.costs.delete_edge - self.costs.insert_edge_with_vertex)
            .max(0.0)
    }

    /// Settles the deleted-vertex ride assignment exactly: each deleted
    /// vertex may pair with one distinct incident edge. The search charged
    /// one optimistic discount per edge-bearing deleted vertex; the
    /// difference against the maximum pairing is paid back here.
    fn deletion_settlement(&self, assignment: &[MapTarget]) -> f64 {
        let deleted: Vec<VertexId> = (0..assignment.len())
            .filter(|&pos| assignment[pos] == MapTarget::Deleted)
            .map(|pos| self.order[pos])
            .filter(|&v| self.g1.degree(v) > 0)
            .collect();
        if deleted.is_empty() {
            return 0.0;
        }
        let candidates: Vec<Vec<usize>> = deleted
            .iter()
            .map(|&v| {
                self.g1
                    .incident_edges(v)
                    .iter()
                    .map(|e| e.index())
                    .collect()
            })
            .collect();
        let exact = max_matching(&candidates, self.g1.edge_count());
        (deleted.len() - exact) as f64 * self.delete_ride_discount()
    }

    /// Matches G1 edge `e1` (oriented from `u`) against the cheapest unused
    /// G2 edge between `w` and `x`, consuming it; a missing counterpart is a
    /// deletion.
    fn match_edge(
        &self,
        e1: EdgeId,
        u: VertexId,
        w: VertexId,
        x: VertexId,
        used: &mut SmallVec<[EdgeId; 16]>,
    ) -> f64 {
        let edge1 = &self.g1[e1];
        let mut best: Option<(f64, EdgeId)> = None;
        for &e2 in self.g2.incident_edges(w) {
            if self.g2.other_endpoint(e2, w) != x || used.contains(&e2) {
                continue;
            }
            let edge2 = &self.g2[e2];
            let mut cost = 0.0;
            if edge1.label != edge2.label {
                cost += self.costs.substitute_edge;
            }
            if edge1.directed != edge2.directed {
                cost += self.costs.directedness;
            } else if edge1.directed && edge1.v1 != edge1.v2 {
                let forward1 = edge1.v1 == u;
                let forward2 = edge2.v1 == w;
                if forward1 != forward2 {
                    cost += self.costs.reverse_edge;
                }
            }
            match best {
                Some((c, _)) if c <= cost => {}
                _ => best = Some((cost, e2)),
            }
        }
        match best {
            Some((cost, e2)) => {
                used.push(e2);
                cost
            }
            None => self.costs.delete_edge,
        }
    }

    /// Cost of the G2 leftovers once every G1 vertex is assigned: every
    /// unused G2 edge is an insertion, and each unmapped G2 vertex either
    /// rides along with one distinct inserted edge (insert-edge-with-vertex)
    /// or costs a vertex insertion of its own. The vertex-to-edge pairing is
    /// an exact maximum matching, mirroring the deletion settlement.
    fn insertion_remainder(&self, assignment: &[MapTarget], used: &[EdgeId]) -> f64 {
        let mut mapped = vec![false; self.g2.vertex_count()];
        for t in assignment {
            if let MapTarget::To(x) = t {
                mapped[x.index()] = true;
            }
        }
        let mut claimed = vec![false; self.g2.edge_count()];
        for e in used {
            claimed[e.index()] = true;
        }

        let inserted_edges = claimed.iter().filter(|c| !**c).count();
        let mut remainder = inserted_edges as f64 * self.costs.insert_edge;

        let unmapped: Vec<VertexId> = self
            .g2
            .vertex_ids()
            .filter(|v| !mapped[v.index()])
            .collect();
        if unmapped.is_empty() {
            return remainder;
        }
        let candidates: Vec<Vec<usize>> = unmapped
            .iter()
            .map(|&v| {
                self.g2
                    .incident_edges(v)
                    .iter()
                    .filter(|e| !claimed[e.index()])
                    .map(|e| e.index())
                    .collect()
            })
            .collect();
        let riding = max_matching(&candidates, self.g2.edge_count());
        let ride_delta = self.costs.insert_edge_with_vertex - self.costs.insert_edge;
        remainder += riding as f64 * ride_delta;
        remainder += (unmapped.len() - riding) as f64 * self.costs.insert_vertex;
        remainder
    }

    /// Completes a frontier state by always taking the locally cheapest
    /// assignment. Upper bound only; used after the node ceiling.
    fn greedy_complete(&self, mut node: SearchNode, seq: &mut u64) -> SearchNode {
        while node.depth < self.g1.vertex_count() {
            let children = self.children(&node, seq);
            // children is never empty: deletion is always available.
            node = children
                .into_iter()
                .min_by(|a, b| {
                    a.bound
                        .partial_cmp(&b.bound)
                        .unwrap_or(Ordering::Equal)
                        .then_with(|| a.seq.cmp(&b.seq))
                })
                .expect("deletion child always exists");
        }
        node
    }

    /// Position in matching order at which `v` was assigned, if yet.
    fn position_of(&self, v: VertexId, assignment: &[MapTarget]) -> Option<usize> {
        self.order[..assignment.len()]
            .iter()
            .position(|&ordered| ordered == v)
    }

    /// Re-keys the order-indexed assignment by G1 vertex id.
    fn finish(&self, node: SearchNode) -> MatchResult {
        let mut mapping = vec![MapTarget::Deleted; self.g1.vertex_count()];
        for (pos, &target) in node.assignment.iter().enumerate() {
            mapping[self.order[pos].index()] = target;
        }
        MatchResult {
            cost: node.cost,
            mapping,
        }
    }
}

/// Maximum bipartite matching (Kuhn's augmenting paths): item `i` may pair
/// with any partner in `candidates[i]`, each partner serves one item.
fn max_matching(candidates: &[Vec<usize>], partner_count: usize) -> usize {
    fn augment(
        item: usize,
        candidates: &[Vec<usize>],
        partner_of: &mut [Option<usize>],
        visited: &mut [bool],
    ) -> bool {
        for &p in &candidates[item] {
            if visited[p] {
                continue;
            }
            visited[p] = true;
            let displaced = partner_of[p];
            if displaced.is_none()
                || augment(displaced.expect("checked"), candidates, partner_of, visited)
            {
                partner_of[p] = Some(item);
                return true;
            }
        }
        false
    }

    let mut partner_of: Vec<Option<usize>> = vec![None; partner_count];
    let mut matched = 0;
    for item in 0..candidates.len() {
        let mut visited = vec![false; partner_count];
        if augment(item, candidates, &mut partner_of, &mut visited) {
            matched += 1;
        }
    }
    matched
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Minimum edit cost from `g1` to `g2`, with an optional cost threshold.
///
/// `None` means no mapping fits under the threshold.
pub fn inexact_match(
    g1: &Graph,
    g2: &Graph,
    costs: MatchCosts,
    threshold: Option<f64>,
) -> Option<MatchResult> {
    Matcher::new(g1, g2, costs).best_mapping(threshold)
}

/// Minimum edit cost under default unit costs, unbounded.
pub fn match_cost(g1: &Graph, g2: &Graph) -> f64 {
    inexact_match(g1, g2, MatchCosts::default(), None)
        .expect("unbounded match always completes")
        .cost
}

/// Exact-match test: an O(V+E log E) signature screen, then a zero-threshold
/// search to confirm. Never reports a false match.
pub fn graphs_match_exactly(g1: &Graph, g2: &Graph) -> bool {
    if g1.vertex_count() != g2.vertex_count() || g1.edge_count() != g2.edge_count() {
        return false;
    }
    if signature_multiset(g1) != signature_multiset(g2) {
        return false;
    }
    inexact_match(g1, g2, MatchCosts::default(), Some(0.0)).is_some()
}

/// Per-vertex label signatures: the vertex label plus the sorted multiset of
/// (edge label, direction class, neighbor label) descriptors, collected over
/// all vertices and sorted. Equal multisets are necessary for isomorphism.
fn signature_multiset(g: &Graph) -> Vec<(u32, Vec<(u32, u8, u32)>)> {
    let mut sigs: Vec<(u32, Vec<(u32, u8, u32)>)> = g
        .vertex_ids()
        .map(|v| {
            let mut incident: Vec<(u32, u8, u32)> = g
                .incident_edges(v)
                .iter()
                .map(|&e| {
                    let edge = &g[e];
                    let o = g.other_endpoint(e, v);
                    let dir = if edge.v1 == edge.v2 {
                        3
                    } else if !edge.directed {
                        0
                    } else if edge.v1 == v {
                        1
                    } else {
                        2
                    };
                    (edge.label.0, dir, g[o].label.0)
                })
                .collect();
            incident.sort_unstable();
            (g[v].label.0, incident)
        })
        .collect();
    sigs.sort_unstable();
    sigs
}
