//! Graph generation.
//!
//! Embeds instances of the configured substructure to the requested
//! coverage, deviates some of them (label substitutions, deletions with
//! connectivity-preserving secondary deletions), wires external connections,
//! and fills the remaining vertex and edge budget from the label
//! distributions. Given the same parameters and seed, the output is
//! identical.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use ganom_core::{EdgeId, Graph, Label, LabelRegistry, VertexId};

use crate::params::{GenParams, WeightedLabel};

/// How an embedded instance deviates from the substructure.
#[derive(Debug, Clone)]
pub enum Deviation {
    /// A vertex label was substituted.
    VertexLabel { from: String, to: String },
    /// An edge label was substituted.
    EdgeLabel { from: String, to: String },
    /// A vertex (and its incident edges) was deleted.
    VertexDeleted { label: String },
    /// An edge was deleted.
    EdgeDeleted { label: String },
    /// A vertex removed to keep the instance connected.
    SecondaryVertexDeleted { label: String },
    /// An edge removed alongside a deleted vertex.
    SecondaryEdgeDeleted { label: String },
}

/// One embedded instance in the output graph.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedInstance {
    /// Host vertices of the instance.
    pub vertices: Vec<VertexId>,
    /// Host edges of the instance.
    pub edges: Vec<EdgeId>,
    /// Deviations applied while embedding.
    pub deviations: Vec<Deviation>,
}

/// A generated graph with its embedded-instance ground truth.
#[derive(Debug)]
pub struct Generated {
    /// The host graph (one positive example).
    pub graph: Graph,
    /// Labels used by the graph.
    pub labels: LabelRegistry,
    /// The embedded instances with their deviations.
    pub instances: Vec<EmbeddedInstance>,
}

/// In-flight copy of the substructure, with tombstones for deletions.
#[derive(Debug, Clone)]
struct Template {
    vertices: Vec<Option<String>>,
    edges: Vec<Option<(usize, usize, String, bool)>>,
}

impl Template {
    fn from_params(params: &GenParams) -> Self {
        let sub = &params.substructure;
        let vertices = sub
            .vertex_ids()
            .map(|v| Some(label_text(&params.labels, sub[v].label)))
            .collect();
        let edges = sub
            .edge_ids()
            .map(|e| {
                let edge = &sub[e];
                Some((
                    edge.v1.index(),
                    edge.v2.index(),
                    label_text(&params.labels, edge.label),
                    edge.directed,
                ))
            })
            .collect();
        Template { vertices, edges }
    }

    fn live_vertices(&self) -> Vec<usize> {
        (0..self.vertices.len())
            .filter(|&i| self.vertices[i].is_some())
            .collect()
    }

    fn live_edges(&self) -> Vec<usize> {
        (0..self.edges.len())
            .filter(|&i| self.edges[i].is_some())
            .collect()
    }

    /// Drops everything outside the largest connected component, recording
    /// the casualties.
    fn keep_largest_component(&mut self, deviations: &mut Vec<Deviation>) {
        let live = self.live_vertices();
        if live.is_empty() {
            return;
        }
        // Union by repeated sweeps; templates are tiny.
        let mut component: Vec<usize> = (0..self.vertices.len()).collect();
        loop {
            let mut changed = false;
            for edge in self.edges.iter().flatten() {
                let (a, b) = (component[edge.0], component[edge.1]);
                if self.vertices[edge.0].is_some() && self.vertices[edge.1].is_some() && a != b {
                    let low = a.min(b);
                    component[edge.0] = low;
                    component[edge.1] = low;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        let mut counts: std::collections::HashMap<usize, usize> = std::collections::HashMap::new();
        for &v in &live {
            *counts.entry(component[v]).or_insert(0) += 1;
        }
        let Some((&winner, _)) = counts.iter().max_by_key(|&(root, count)| (*count, usize::MAX - *root))
        else {
            return;
        };
        for v in live {
            if component[v] != winner {
                if let Some(label) = self.vertices[v].take() {
                    deviations.push(Deviation::SecondaryVertexDeleted { label });
                }
                for slot in self.edges.iter_mut() {
                    if let Some((a, b, label, _)) = slot.clone() {
                        if a == v || b == v {
                            deviations.push(Deviation::SecondaryEdgeDeleted { label });
                            *slot = None;
                        }
                    }
                }
            }
        }
    }
}

/// Runs the generator.
pub fn generate(params: &GenParams, seed: u64) -> Generated {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut labels = params.labels.clone();
    let mut graph = Graph::new();
    let mut instances: Vec<EmbeddedInstance> = Vec::new();

    let sub_size = params.substructure.vertex_count().max(1);
    let wanted = ((params.coverage * params.vertices as f64) / sub_size as f64).ceil() as usize;
    let capacity = params.vertices / sub_size;
    let num_instances = wanted.min(capacity);

    for _ in 0..num_instances {
        let mut template = Template::from_params(params);
        let mut deviations = Vec::new();
        let n_dev = deviation_count(params.deviation, &mut rng);
        for _ in 0..n_dev {
            apply_deviation(&mut template, params, &mut rng, &mut deviations);
        }
        template.keep_largest_component(&mut deviations);

        // Overlap: reuse one same-labeled vertex of an earlier instance.
        let share = params.overlap > 0.0
            && !instances.is_empty()
            && rng.gen_bool(params.overlap.min(1.0));

        let mut instance = EmbeddedInstance {
            deviations,
            ..EmbeddedInstance::default()
        };
        let mut local_to_global = vec![None; template.vertices.len()];
        for i in template.live_vertices() {
            let text = template.vertices[i].clone().expect("live vertex");
            let shared = if share {
                find_shared_vertex(&graph, &labels, &instances, &text, &mut rng)
            } else {
                None
            };
            let v = match shared {
                Some(v) => v,
                None => {
                    let id = labels.intern(Label::Str(text));
                    graph.add_vertex(id)
                }
            };
            local_to_global[i] = Some(v);
            instance.vertices.push(v);
        }
        for i in template.live_edges() {
            let (a, b, text, directed) = template.edges[i].clone().expect("live edge");
            let (Some(va), Some(vb)) = (local_to_global[a], local_to_global[b]) else {
                continue;
            };
            let id = labels.intern(Label::Str(text));
            let e = graph
                .add_edge(va, vb, id, directed)
                .expect("instance endpoints exist");
            instance.edges.push(e);
        }
        instance.vertices.sort_unstable();
        instance.vertices.dedup();
        instances.push(instance);
    }

    // Background vertices up to the budget.
    while graph.vertex_count() < params.vertices {
        let text = pick(&params.vertex_labels, &mut rng);
        let id = labels.intern(Label::Str(text.to_string()));
        graph.add_vertex(id);
    }

    // External connections per instance.
    for instance in &instances {
        for _ in 0..params.connectivity {
            if graph.edge_count() >= params.edges {
                break;
            }
            let Some(&inside) = pick_slice(&instance.vertices, &mut rng) else {
                continue;
            };
            let outside: Vec<VertexId> = graph
                .vertex_ids()
                .filter(|v| !instance.vertices.contains(v))
                .collect();
            let Some(&target) = pick_slice(&outside, &mut rng) else {
                continue;
            };
            let text = pick(&params.edge_labels, &mut rng);
            let id = labels.intern(Label::Str(text.to_string()));
            graph
                .add_edge(inside, target, id, true)
                .expect("both endpoints exist");
        }
    }

    // Background edges up to the budget.
    while graph.edge_count() < params.edges {
        let v1 = VertexId(rng.gen_range(0..graph.vertex_count() as u32));
        let v2 = VertexId(rng.gen_range(0..graph.vertex_count() as u32));
        let text = pick(&params.edge_labels, &mut rng);
        let id = labels.intern(Label::Str(text.to_string()));
        graph.add_edge(v1, v2, id, true).expect("endpoints exist");
    }

    graph.debug_assert_adjacency();
    info!(
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        instances = instances.len(),
        seed,
        "generated graph"
    );
    Generated {
        graph,
        labels,
        instances,
    }
}

/// Writes the `.insts` ground-truth file: each instance's elements in the
/// grammar (global 1-based numbering), with deviations as comments.
pub fn write_instances<W: std::io::Write>(
    w: &mut W,
    generated: &Generated,
) -> std::io::Result<()> {
    let fmt = |id| {
        generated
            .labels
            .get(id)
            .map(ganom_io::format_label)
            .unwrap_or_default()
    };
    for (k, instance) in generated.instances.iter().enumerate() {
        writeln!(w, "% instance {}", k + 1)?;
        for &v in &instance.vertices {
            writeln!(w, "v {} {}", v.0 + 1, fmt(generated.graph[v].label))?;
        }
        for &e in &instance.edges {
            let edge = &generated.graph[e];
            writeln!(
                w,
                "{} {} {} {}",
                if edge.directed { "d" } else { "u" },
                edge.v1.0 + 1,
                edge.v2.0 + 1,
                fmt(edge.label)
            )?;
        }
        for deviation in &instance.deviations {
            writeln!(w, "% deviation: {:?}", deviation)?;
        }
    }
    Ok(())
}

fn deviation_count(expected: f64, rng: &mut ChaCha8Rng) -> usize {
    let base = expected.floor() as usize;
    let fraction = expected - expected.floor();
    base + usize::from(fraction > 0.0 && rng.gen_bool(fraction))
}

fn apply_deviation(
    template: &mut Template,
    params: &GenParams,
    rng: &mut ChaCha8Rng,
    deviations: &mut Vec<Deviation>,
) {
    let roll: f64 = rng.gen_range(0.0..1.0);
    let p1 = params.sub_vertex_label.probability;
    let p2 = p1 + params.sub_edge_label.probability;
    let p3 = p2 + params.del_vertex.probability;

    if roll < p1 {
        let live = template.live_vertices();
        if let Some(&i) = pick_slice(&live, rng) {
            let from = template.vertices[i].clone().expect("live vertex");
            let to = pick(&params.vertex_labels, rng).to_string();
            template.vertices[i] = Some(to.clone());
            deviations.push(Deviation::VertexLabel { from, to });
        }
    } else if roll < p2 {
        let live = template.live_edges();
        if let Some(&i) = pick_slice(&live, rng) {
            let (a, b, from, directed) = template.edges[i].clone().expect("live edge");
            let to = pick(&params.edge_labels, rng).to_string();
            template.edges[i] = Some((a, b, to.clone(), directed));
            deviations.push(Deviation::EdgeLabel { from, to });
        }
    } else if roll < p3 {
        let live = template.live_vertices();
        // Never delete the last vertex.
        if live.len() > 1 {
            if let Some(&i) = pick_slice(&live, rng) {
                let label = template.vertices[i].take().expect("live vertex");
                deviations.push(Deviation::VertexDeleted { label });
                for slot in template.edges.iter_mut() {
                    if let Some((a, b, label, _)) = slot.clone() {
                        if a == i || b == i {
                            deviations.push(Deviation::SecondaryEdgeDeleted { label });
                            *slot = None;
                        }
                    }
                }
            }
        }
    } else {
        let live = template.live_edges();
        if let Some(&i) = pick_slice(&live, rng) {
            let (_, _, label, _) = template.edges[i].clone().expect("live edge");
            template.edges[i] = None;
            deviations.push(Deviation::EdgeDeleted { label });
        }
    }
}

fn find_shared_vertex(
    graph: &Graph,
    labels: &LabelRegistry,
    instances: &[EmbeddedInstance],
    text: &str,
    rng: &mut ChaCha8Rng,
) -> Option<VertexId> {
    let donor = pick_slice(instances, rng)?;
    donor
        .vertices
        .iter()
        .copied()
        .find(|&v| match labels.get(graph[v].label) {
            Some(Label::Str(s)) => s == text,
            _ => false,
        })
}

fn label_text(labels: &LabelRegistry, id: ganom_core::LabelId) -> String {
    match labels.get(id) {
        Some(Label::Str(s)) => s.clone(),
        Some(Label::Num(n)) => format!("{}", n),
        None => String::new(),
    }
}

/// Draws from a weighted label distribution (weights need not sum to one).
fn pick<'l>(list: &'l [WeightedLabel], rng: &mut ChaCha8Rng) -> &'l str {
    let total: f64 = list.iter().map(|l| l.probability).sum();
    let mut roll = rng.gen_range(0.0..total.max(f64::MIN_POSITIVE));
    for entry in list {
        if roll < entry.probability {
            return &entry.label;
        }
        roll -= entry.probability;
    }
    &list[list.len() - 1].label
}

fn pick_slice<'s, T>(slice: &'s [T], rng: &mut ChaCha8Rng) -> Option<&'s T> {
    if slice.is_empty() {
        None
    } else {
        slice.get(rng.gen_range(0..slice.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::parse_params;

    const SAMPLE: &str = "\
Vertices 40
Edges 60
Connectivity 1
Coverage 0.5
Overlap 0.0
Deviation 0.0
VertexLabels { a 0.5 b 0.5 }
EdgeLabels { on 1.0 }
Substructure {
  v 1 a
  v 2 b
  e 1 2 on
}
";

    #[test]
    fn budgets_are_respected() {
        let params = parse_params(SAMPLE).unwrap();
        let generated = generate(&params, 7);
        assert_eq!(generated.graph.vertex_count(), 40);
        assert_eq!(generated.graph.edge_count(), 60);
        assert!(generated.graph.adjacency_is_consistent());
    }

    #[test]
    fn coverage_drives_instance_count() {
        let params = parse_params(SAMPLE).unwrap();
        let generated = generate(&params, 7);
        // coverage 0.5 of 40 vertices / 2 per instance = 10 instances.
        assert_eq!(generated.instances.len(), 10);
        for instance in &generated.instances {
            assert_eq!(instance.vertices.len(), 2);
            assert_eq!(instance.edges.len(), 1);
            assert!(instance.deviations.is_empty());
        }
    }

    #[test]
    fn same_seed_same_graph() {
        let params = parse_params(SAMPLE).unwrap();
        let a = generate(&params, 42);
        let b = generate(&params, 42);
        assert_eq!(a.graph, b.graph);

        let c = generate(&params, 43);
        // A different seed almost surely wires different background edges.
        assert_ne!(a.graph, c.graph);
    }

    #[test]
    fn deviations_are_recorded() {
        let text = SAMPLE.replace("Deviation 0.0", "Deviation 1.0");
        let params = parse_params(&text).unwrap();
        let generated = generate(&params, 3);
        let deviated = generated
            .instances
            .iter()
            .filter(|i| !i.deviations.is_empty())
            .count();
        assert!(deviated > 0, "expected at least one deviated instance");
    }

    #[test]
    fn generated_graph_roundtrips_through_the_writer() {
        let params = parse_params(SAMPLE).unwrap();
        let generated = generate(&params, 11);

        let mut out = Vec::new();
        ganom_io::write_graph(&mut out, &generated.graph, &generated.labels).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut labels = ganom_core::LabelRegistry::new();
        let parsed = ganom_io::parse_positive(&text, &mut labels, false).unwrap();
        assert_eq!(parsed.graph.vertex_count(), generated.graph.vertex_count());
        assert_eq!(parsed.graph.edge_count(), generated.graph.edge_count());
    }

    #[test]
    fn overlap_shares_vertices_between_instances() {
        let text = SAMPLE.replace("Overlap 0.0", "Overlap 1.0");
        let params = parse_params(&text).unwrap();
        let generated = generate(&params, 5);

        let mut shared = false;
        for i in 0..generated.instances.len() {
            for j in (i + 1)..generated.instances.len() {
                let a = &generated.instances[i].vertices;
                let b = &generated.instances[j].vertices;
                if a.iter().any(|v| b.contains(v)) {
                    shared = true;
                }
            }
        }
        assert!(shared, "full overlap should share at least one vertex");
    }
}
