//! Graph compression by a substructure.
//!
//! Replaces every instance of a substructure with a single SUB vertex,
//! labeled uniquely per compression iteration. Overlapping instances are
//! stitched together: one undirected OVERLAP edge per overlapping pair, and
//! edges touching a shared vertex are duplicated to every sharing instance's
//! SUB vertex (becoming a self-edge when source and destination collapse to
//! the same SUB vertex).
//!
//! The rewrite is planned first, without touching the graph; [`compress`]
//! materializes the plan and [`size_of_compressed_graph`] merely counts it,
//! so the two always agree.

use std::collections::HashSet;
use std::rc::Rc;

use smallvec::SmallVec;
use tracing::debug;

use ganom_core::{EdgeId, Graph, Instance, Label, LabelRegistry, VertexId};

/// An endpoint of a planned post-compression edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Endpoint {
    /// A host vertex that survives compression (host index).
    Kept(VertexId),
    /// The SUB vertex standing in for instance `i`.
    Sub(u32),
}

/// One edge of the compressed graph, copied from a host template.
#[derive(Debug, Clone)]
struct PlannedEdge {
    template: EdgeId,
    a: Endpoint,
    b: Endpoint,
}

/// Everything compression will do, computed without mutating anything.
#[derive(Debug)]
struct RewritePlan {
    /// Host vertices outside every instance, in index order.
    kept: Vec<VertexId>,
    /// Rewritten edges, in host edge order.
    edges: Vec<PlannedEdge>,
    /// Instance pairs `(i, j)` with `i < j` sharing at least one vertex.
    overlap_pairs: Vec<(u32, u32)>,
}

fn build_plan(host: &Graph, instances: &[Rc<Instance>]) -> RewritePlan {
    // Which instances contain each vertex / claim each edge.
    let mut vertex_instances: Vec<SmallVec<[u32; 2]>> =
        vec![SmallVec::new(); host.vertex_count()];
    let mut edge_instances: Vec<SmallVec<[u32; 2]>> = vec![SmallVec::new(); host.edge_count()];
    for (i, inst) in instances.iter().enumerate() {
        for &v in &inst.vertices {
            vertex_instances[v.index()].push(i as u32);
        }
        for &e in &inst.edges {
            edge_instances[e.index()].push(i as u32);
        }
    }

    let kept: Vec<VertexId> = host
        .vertex_ids()
        .filter(|v| vertex_instances[v.index()].is_empty())
        .collect();

    let mut edges = Vec::new();
    for e in host.edge_ids() {
        let edge = &host[e];
        let ends_a = replacements(&vertex_instances, edge.v1);
        let ends_b = replacements(&vertex_instances, edge.v2);
        let mut seen: HashSet<(Endpoint, Endpoint)> = HashSet::new();
        for &a in &ends_a {
            for &b in &ends_b {
                // The instance that claims this edge represents it inside
                // its SUB vertex; skip that one pairing.
                if let (Endpoint::Sub(i), Endpoint::Sub(j)) = (a, b) {
                    if i == j && edge_instances[e.index()].contains(&i) {
                        continue;
                    }
                }
                let key = if edge.directed {
                    (a, b)
                } else {
                    (a.min(b), a.max(b))
                };
                if seen.insert(key) {
                    edges.push(PlannedEdge { template: e, a, b });
                }
            }
        }
    }

    let mut overlap_pairs = Vec::new();
    for i in 0..instances.len() {
        for j in (i + 1)..instances.len() {
            if instances[i].overlaps(&instances[j]) {
                overlap_pairs.push((i as u32, j as u32));
            }
        }
    }

    RewritePlan {
        kept,
        edges,
        overlap_pairs,
    }
}

/// Post-compression endpoints standing in for host vertex `v`: the vertex
/// itself if kept, otherwise every sharing instance's SUB vertex.
fn replacements(
    vertex_instances: &[SmallVec<[u32; 2]>],
    v: VertexId,
) -> SmallVec<[Endpoint; 2]> {
    let owners = &vertex_instances[v.index()];
    if owners.is_empty() {
        SmallVec::from_slice(&[Endpoint::Kept(v)])
    } else {
        owners.iter().map(|&i| Endpoint::Sub(i)).collect()
    }
}

/// Compresses `host` by the given instances, interning the iteration's
/// `SUB_k` (and, when overlaps exist, `OVERLAP_k`) labels into `labels`.
///
/// SUB vertices carry `introduced_by_compression = Some(iteration)` and the
/// provenance of their instance's first vertex.
pub fn compress(
    host: &Graph,
    labels: &mut LabelRegistry,
    instances: &[Rc<Instance>],
    iteration: u32,
) -> Graph {
    let plan = build_plan(host, instances);
    let sub_label = labels.intern(Label::Str(format!("SUB_{}", iteration)));

    let mut compressed = Graph::new();

    // Surviving vertices first, in host order.
    let mut vertex_map = vec![VertexId(u32::MAX); host.vertex_count()];
    for &v in &plan.kept {
        vertex_map[v.index()] = compressed.add_vertex_from(&host[v]);
    }

    // One SUB vertex per instance, in instance order.
    let mut sub_ids = Vec::with_capacity(instances.len());
    for inst in instances {
        let id = compressed.add_vertex(sub_label);
        let sub = compressed.vertex_mut(id).expect("just added");
        sub.introduced_by_compression = Some(iteration);
        if let Some(&first) = inst.vertices.first() {
            sub.source_example = host[first].source_example;
            sub.original_index = host[first].original_index;
            sub.source_vertex = host[first].source_vertex;
        }
        sub_ids.push(id);
    }

    let resolve = |end: Endpoint| -> VertexId {
        match end {
            Endpoint::Kept(v) => vertex_map[v.index()],
            Endpoint::Sub(i) => sub_ids[i as usize],
        }
    };

    for planned in &plan.edges {
        compressed
            .add_edge_from(
                &host[planned.template],
                resolve(planned.a),
                resolve(planned.b),
            )
            .expect("planned endpoints exist in the compressed graph");
    }

    if !plan.overlap_pairs.is_empty() {
        let overlap_label = labels.intern(Label::Str(format!("OVERLAP_{}", iteration)));
        for &(i, j) in &plan.overlap_pairs {
            compressed
                .add_edge(
                    sub_ids[i as usize],
                    sub_ids[j as usize],
                    overlap_label,
                    false,
                )
                .expect("SUB vertices exist");
        }
    }

    debug!(
        instances = instances.len(),
        kept = plan.kept.len(),
        overlap_edges = plan.overlap_pairs.len(),
        vertices = compressed.vertex_count(),
        edges = compressed.edge_count(),
        "compressed graph"
    );
    compressed.debug_assert_adjacency();
    compressed
}

/// Size (vertices + edges) the compressed graph would have, computed from
/// the rewrite plan without materializing anything.
pub fn size_of_compressed_graph(host: &Graph, instances: &[Rc<Instance>]) -> usize {
    let plan = build_plan(host, instances);
    plan.kept.len() + instances.len() + plan.edges.len() + plan.overlap_pairs.len()
}
