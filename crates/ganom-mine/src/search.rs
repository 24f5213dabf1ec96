//! Instance search: locating occurrences of a known pattern in the host.
//!
//! Grows candidate instances outward from label-matched seed vertices, one
//! edge per round, until they reach the pattern's size, then filters by edit
//! cost against the pattern. Used to compress predefined substructures away
//! before discovery and to enumerate candidates for the anomaly searches.

use std::collections::HashSet;
use std::rc::Rc;

use tracing::debug;

use ganom_core::{Graph, Instance, LabelId, VertexId};

use crate::matcher::{inexact_match, MapTarget, MatchCosts, MatchResult};

/// A candidate found at the pattern's size, with its edit cost.
#[derive(Debug, Clone)]
pub struct FoundInstance {
    /// The candidate instance.
    pub instance: Instance,
    /// Edit cost of the candidate's graph against the pattern.
    pub cost: f64,
}

/// Finds every connected host subgraph with the pattern's vertex and edge
/// counts whose edit cost against `pattern` is at most `max_cost`, skipping
/// anything that overlaps an excluded instance.
///
/// Seeding covers the pattern with `ceil(max_cost) + 1` of its vertex labels
/// (capped at the pattern size): a candidate within `max_cost` of the
/// pattern still contains a vertex carrying one of them.
pub fn find_instances(
    host: &Graph,
    pattern: &Graph,
    costs: MatchCosts,
    max_cost: f64,
    exclude: &[Rc<Instance>],
) -> Vec<FoundInstance> {
    if pattern.is_empty() {
        return Vec::new();
    }
    let seed_labels = seed_labels(pattern, max_cost);
    let overlaps_excluded =
        |inst: &Instance| exclude.iter().any(|excluded| excluded.overlaps(inst));

    let mut candidates: Vec<Instance> = Vec::new();
    let mut seen: HashSet<(Vec<u32>, Vec<u32>)> = HashSet::new();
    for v in host.vertex_ids() {
        if !seed_labels.contains(&host[v].label) {
            continue;
        }
        let inst = Instance::single(v);
        if overlaps_excluded(&inst) {
            continue;
        }
        if seen.insert(shape_key(&inst)) {
            candidates.push(inst);
        }
    }

    // Grow every candidate by one edge per round until the pattern's edge
    // count is reached; candidates that would outgrow the pattern stop.
    for _ in 0..pattern.edge_count() {
        let mut next: Vec<Instance> = Vec::new();
        for inst in &candidates {
            let inst_rc = Rc::new(inst.clone());
            for &v in &inst.vertices {
                for &e in host.incident_edges(v) {
                    if inst.contains_edge(e) {
                        continue;
                    }
                    let child = Instance::extend_with(&inst_rc, host, e);
                    if child.vertices.len() > pattern.vertex_count()
                        || child.edges.len() > pattern.edge_count()
                    {
                        continue;
                    }
                    if overlaps_excluded(&child) {
                        continue;
                    }
                    if seen.insert(shape_key(&child)) {
                        next.push(child);
                    }
                }
            }
        }
        if next.is_empty() {
            break;
        }
        candidates = next;
    }

    let mut found = Vec::new();
    for mut inst in candidates {
        if inst.vertices.len() != pattern.vertex_count()
            || inst.edges.len() != pattern.edge_count()
        {
            continue;
        }
        let graph = inst.to_graph(host);
        let Some(result) = inexact_match(&graph, pattern, costs, Some(max_cost)) else {
            continue;
        };
        inst.min_match_cost = result.cost;
        inst.mapping = pattern_mapping(pattern, &graph, &inst, costs, &result);
        found.push(FoundInstance {
            cost: result.cost,
            instance: inst,
        });
    }
    debug!(
        pattern_size = pattern.size(),
        found = found.len(),
        max_cost,
        "instance search"
    );
    found
}

/// Finds disjoint exact occurrences of `pattern`, first-found wins, for
/// predefined-substructure compression.
pub fn find_exact_instances(
    host: &Graph,
    pattern: &Graph,
    costs: MatchCosts,
    allow_overlap: bool,
) -> Vec<Rc<Instance>> {
    let mut kept: Vec<Rc<Instance>> = Vec::new();
    for found in find_instances(host, pattern, costs, 0.0, &[]) {
        let inst = found.instance;
        if !allow_overlap && kept.iter().any(|k| k.overlaps(&inst)) {
            continue;
        }
        kept.push(Rc::new(inst));
    }
    kept
}

/// The first `ceil(max_cost) + 1` distinct vertex labels of the pattern, in
/// pattern order. A candidate within `max_cost` of the pattern must carry at
/// least one of them.
pub fn seed_labels(pattern: &Graph, max_cost: f64) -> Vec<LabelId> {
    let wanted = (max_cost.ceil() as usize + 1).min(pattern.vertex_count());
    let mut labels: Vec<LabelId> = Vec::new();
    for v in pattern.vertex_ids() {
        let label = pattern[v].label;
        if !labels.contains(&label) {
            labels.push(label);
            if labels.len() == wanted {
                break;
            }
        }
    }
    labels
}

fn shape_key(inst: &Instance) -> (Vec<u32>, Vec<u32>) {
    (
        inst.vertices.iter().map(|v| v.0).collect(),
        inst.edges.iter().map(|e| e.0).collect(),
    )
}

/// Pattern-vertex to host-vertex mapping from a candidate match result.
fn pattern_mapping(
    pattern: &Graph,
    graph: &Graph,
    inst: &Instance,
    costs: MatchCosts,
    candidate_to_pattern: &MatchResult,
) -> smallvec::SmallVec<[VertexId; 8]> {
    // The search matched candidate -> pattern; the instance mapping wants
    // pattern -> candidate. Invert when total, re-match otherwise.
    let mut mapping = smallvec::smallvec![ganom_core::UNMAPPED; pattern.vertex_count()];
    let mut total = true;
    for (candidate_v, target) in candidate_to_pattern.mapping.iter().enumerate() {
        match target {
            MapTarget::To(p) => mapping[p.index()] = inst.vertices[candidate_v],
            MapTarget::Deleted => total = false,
        }
    }
    if !total {
        if let Some(result) = inexact_match(pattern, graph, costs, None) {
            for (p, target) in result.mapping.iter().enumerate() {
                mapping[p] = match target {
                    MapTarget::To(local) => inst.vertices[local.index()],
                    MapTarget::Deleted => ganom_core::UNMAPPED,
                };
            }
        }
    }
    mapping
}

#[cfg(test)]
mod tests {
    use super::*;
    use ganom_core::{Label, LabelRegistry};

    /// Ten triangles a-b-c; the last one has its c relabeled to d.
    fn triangle_host() -> (Graph, LabelRegistry, Graph) {
        let mut reg = LabelRegistry::new();
        let a = reg.intern(Label::from("a"));
        let b = reg.intern(Label::from("b"));
        let c = reg.intern(Label::from("c"));
        let d = reg.intern(Label::from("d"));
        let on = reg.intern(Label::from("on"));

        let mut host = Graph::new();
        for i in 0..10u32 {
            let third = if i == 9 { d } else { c };
            let va = host.add_vertex(a);
            let vb = host.add_vertex(b);
            let vc = host.add_vertex(third);
            for v in [va, vb, vc] {
                host.vertex_mut(v).unwrap().source_example = i;
            }
            host.add_edge(va, vb, on, false).unwrap();
            host.add_edge(vb, vc, on, false).unwrap();
            host.add_edge(vc, va, on, false).unwrap();
        }

        let mut pattern = Graph::new();
        let pa = pattern.add_vertex(a);
        let pb = pattern.add_vertex(b);
        let pc = pattern.add_vertex(c);
        pattern.add_edge(pa, pb, on, false).unwrap();
        pattern.add_edge(pb, pc, on, false).unwrap();
        pattern.add_edge(pc, pa, on, false).unwrap();

        (host, reg, pattern)
    }

    #[test]
    fn exact_search_finds_all_clean_triangles() {
        let (host, _reg, pattern) = triangle_host();
        let found = find_exact_instances(&host, &pattern, MatchCosts::default(), false);
        assert_eq!(found.len(), 9);
        for inst in &found {
            assert_eq!(inst.vertices.len(), 3);
            assert_eq!(inst.edges.len(), 3);
            assert_eq!(inst.min_match_cost, 0.0);
        }
    }

    #[test]
    fn costly_search_also_finds_the_deviant_triangle() {
        let (host, _reg, pattern) = triangle_host();
        let found = find_instances(&host, &pattern, MatchCosts::default(), 1.2, &[]);

        let deviant: Vec<&FoundInstance> =
            found.iter().filter(|f| f.cost > 0.0).collect();
        assert_eq!(deviant.len(), 1);
        assert_eq!(deviant[0].cost, 1.0);
        // The deviant lives in the last example.
        assert_eq!(deviant[0].instance.example(&host), 9);
        // Its mapping is total: the label substitution keeps all vertices.
        assert!(deviant[0]
            .instance
            .mapping
            .iter()
            .all(|&m| m != ganom_core::UNMAPPED));
    }

    #[test]
    fn excluded_instances_block_candidates() {
        let (host, _reg, pattern) = triangle_host();
        let all = find_exact_instances(&host, &pattern, MatchCosts::default(), false);
        let found = find_instances(&host, &pattern, MatchCosts::default(), 0.0, &all);
        assert!(found.is_empty());
    }

    #[test]
    fn empty_pattern_finds_nothing() {
        let (host, _reg, _pattern) = triangle_host();
        let found = find_instances(&host, &Graph::new(), MatchCosts::default(), 1.0, &[]);
        assert!(found.is_empty());
    }

    #[test]
    fn seed_labels_cover_the_pattern() {
        let (_host, _reg, pattern) = triangle_host();
        assert_eq!(seed_labels(&pattern, 0.0).len(), 1);
        assert_eq!(seed_labels(&pattern, 1.0).len(), 2);
        assert_eq!(seed_labels(&pattern, 7.0).len(), 3);
    }
}
