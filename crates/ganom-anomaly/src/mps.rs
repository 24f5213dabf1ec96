//! Maximum-partial-substructure anomaly search.
//!
//! Looks for connected subgraphs strictly smaller than the normative
//! pattern that still match it within the edit-cost budget -- structures
//! that started to be the pattern and stopped. Candidates contained in a
//! larger surviving candidate are dropped, so only maximal partials are
//! scored. Score is `edit_cost x frequency`; lower is more anomalous.

use std::collections::HashSet;
use std::rc::Rc;

use tracing::{debug, info};

use ganom_core::{Graph, Instance, Substructure};
use ganom_mine::{graphs_match_exactly, inexact_match, seed_labels, MatchCosts};

use crate::phase::SearchPhase;
use crate::report::{
    AnomalousInstance, AnomalyMethod, AnomalyParams, AnomalyReport, SCORE_EPSILON,
};

/// Runs the maximum-partial-substructure search against `norm`.
pub fn mps_anomalies(host: &Graph, norm: &Substructure, params: &AnomalyParams) -> AnomalyReport {
    let mut phase = SearchPhase::Init;
    let definition = &norm.definition;
    let target_size = definition.size();
    let tau = params.threshold * target_size as f64;
    if tau <= 0.0 || definition.is_empty() {
        return AnomalyReport::none(AnomalyMethod::Mps);
    }

    let overlaps_norm =
        |inst: &Instance| norm.instances.iter().any(|n| n.overlaps(inst));
    let labels = seed_labels(definition, tau);

    let mut all: Vec<Instance> = Vec::new();
    let mut seen: HashSet<(Vec<u32>, Vec<u32>)> = HashSet::new();
    for v in host.vertex_ids() {
        if !labels.contains(&host[v].label) {
            continue;
        }
        let inst = Instance::single(v);
        if overlaps_norm(&inst) {
            continue;
        }
        if seen.insert(shape_key(&inst)) {
            all.push(inst);
        }
    }
    if all.is_empty() {
        phase.advance(SearchPhase::Scored);
        return AnomalyReport {
            method: AnomalyMethod::Mps,
            anomalies: Vec::new(),
            phase,
        };
    }
    phase.advance(SearchPhase::Seeded);
    phase.advance(SearchPhase::Extending);

    // Breadth-first growth, keeping every intermediate shape. Partials must
    // stay strictly smaller than the pattern.
    let mut frontier: Vec<Instance> = all.clone();
    for _ in 0..definition.edge_count() {
        let mut next: Vec<Instance> = Vec::new();
        for inst in &frontier {
            let inst_rc = Rc::new(inst.clone());
            for &v in &inst.vertices {
                let mut extended_from_vertex = false;
                for &e in host.incident_edges(v) {
                    if params.optimize && extended_from_vertex {
                        // One successful extension per vertex and step; the
                        // completeness loss is the documented trade for
                        // search time.
                        break;
                    }
                    if inst.contains_edge(e) {
                        continue;
                    }
                    let child = Instance::extend_with(&inst_rc, host, e);
                    if child.vertices.len() > definition.vertex_count()
                        || child.edges.len() > definition.edge_count()
                        || child.size() >= target_size
                    {
                        continue;
                    }
                    if overlaps_norm(&child) {
                        continue;
                    }
                    if seen.insert(shape_key(&child)) {
                        next.push(child.clone());
                        all.push(child);
                        extended_from_vertex = true;
                    }
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    phase.advance(SearchPhase::AtTargetSize);

    // Cost every candidate against the pattern; keep those within budget.
    let mut kept: Vec<(Instance, f64)> = Vec::new();
    for inst in all {
        let graph = inst.to_graph(host);
        if let Some(result) = inexact_match(&graph, definition, MatchCosts::default(), Some(tau)) {
            let mut inst = inst;
            inst.min_match_cost = result.cost;
            kept.push((inst, result.cost));
        }
    }

    // Maximality: drop candidates strictly contained in another kept one.
    let mut maximal: Vec<(Instance, f64)> = Vec::new();
    for (i, (inst, cost)) in kept.iter().enumerate() {
        let dominated = kept.iter().enumerate().any(|(j, (other, _))| {
            j != i && inst.size() < other.size() && is_contained(inst, other)
        });
        if !dominated {
            maximal.push((inst.clone(), *cost));
        }
    }
    phase.advance(SearchPhase::Scored);
    debug!(
        kept = kept.len(),
        maximal = maximal.len(),
        tau,
        "partial-substructure scoring"
    );

    if maximal.is_empty() {
        return AnomalyReport {
            method: AnomalyMethod::Mps,
            anomalies: Vec::new(),
            phase,
        };
    }

    let graphs: Vec<Graph> = maximal.iter().map(|(i, _)| i.to_graph(host)).collect();
    let scores: Vec<f64> = maximal
        .iter()
        .enumerate()
        .map(|(i, (_, cost))| {
            let freq = graphs
                .iter()
                .filter(|g| graphs_match_exactly(&graphs[i], g))
                .count();
            cost * freq as f64
        })
        .collect();
    let min_score = scores
        .iter()
        .copied()
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .unwrap_or(0.0);

    let mut anomalies: Vec<AnomalousInstance> = Vec::new();
    for (i, (inst, _cost)) in maximal.into_iter().enumerate() {
        let score = scores[i];
        if (score - min_score).abs() > SCORE_EPSILON {
            continue;
        }
        if score < params.min_score - SCORE_EPSILON || score > params.max_score + SCORE_EPSILON {
            continue;
        }
        // Overlap-merging: equivalent partials sharing vertices collapse to
        // their first witness.
        if anomalies.iter().any(|a| {
            a.instance.overlaps(&inst) && graphs_match_exactly(&graphs[i], &a.instance.to_graph(host))
        }) {
            continue;
        }
        let mut inst = inst;
        inst.mps_anom_value = score;
        let example = inst.example(host);
        anomalies.push(AnomalousInstance {
            instance: inst,
            score,
            example,
        });
    }
    phase.advance(SearchPhase::Emitted);
    info!(reported = anomalies.len(), min_score, "partial-substructure anomalies");

    AnomalyReport {
        method: AnomalyMethod::Mps,
        anomalies,
        phase,
    }
}

fn shape_key(inst: &Instance) -> (Vec<u32>, Vec<u32>) {
    (
        inst.vertices.iter().map(|v| v.0).collect(),
        inst.edges.iter().map(|e| e.0).collect(),
    )
}

/// True when every vertex and edge of `a` also belongs to `b`.
fn is_contained(a: &Instance, b: &Instance) -> bool {
    a.vertices.iter().all(|v| b.contains_vertex(*v))
        && a.edges.iter().all(|e| b.contains_edge(*e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ganom_core::{Label, LabelRegistry, VertexId};

    /// Ten 4-cycles of n-vertices, plus one 3-edge path; the squares are the
    /// normative instances.
    fn square_scene() -> (Graph, LabelRegistry, Substructure) {
        let mut reg = LabelRegistry::new();
        let n = reg.intern(Label::from("n"));
        let on = reg.intern(Label::from("on"));

        let mut host = Graph::new();
        let mut norm_instances = Vec::new();
        for i in 0..10u32 {
            let vs: Vec<VertexId> = (0..4).map(|_| host.add_vertex(n)).collect();
            for &v in &vs {
                host.vertex_mut(v).unwrap().source_example = i;
            }
            let mut inst = Instance::default();
            for &v in &vs {
                inst.insert_vertex(v);
            }
            for k in 0..4 {
                let e = host
                    .add_edge(vs[k], vs[(k + 1) % 4], on, false)
                    .unwrap();
                inst.insert_edge(e);
            }
            inst.mapping = inst.vertices.clone();
            norm_instances.push(Rc::new(inst));
        }
        // The 3-edge path in its own example.
        let ps: Vec<VertexId> = (0..4).map(|_| host.add_vertex(n)).collect();
        for &v in &ps {
            host.vertex_mut(v).unwrap().source_example = 10;
        }
        for k in 0..3 {
            host.add_edge(ps[k], ps[k + 1], on, false).unwrap();
        }

        let mut def = Graph::new();
        let ds: Vec<VertexId> = (0..4).map(|_| def.add_vertex(n)).collect();
        for k in 0..4 {
            def.add_edge(ds[k], ds[(k + 1) % 4], on, false).unwrap();
        }
        let mut norm = Substructure::new(def);
        norm.instances = norm_instances;
        (host, reg, norm)
    }

    #[test]
    fn missing_edge_path_is_the_partial_anomaly() {
        let (host, _reg, norm) = square_scene();
        let params = AnomalyParams {
            threshold: 0.3,
            ..AnomalyParams::default()
        };
        let report = mps_anomalies(&host, &norm, &params);

        assert_eq!(report.phase, SearchPhase::Emitted);
        assert_eq!(report.anomalies.len(), 1);
        let anomaly = &report.anomalies[0];
        assert_eq!(anomaly.example, 10);
        // The full 3-edge path: one edge short of the square.
        assert_eq!(anomaly.instance.vertices.len(), 4);
        assert_eq!(anomaly.instance.edges.len(), 3);
        assert!((anomaly.score - 1.0).abs() < 1e-9);
        assert_eq!(anomaly.instance.mps_anom_value, anomaly.score);
    }

    #[test]
    fn zero_threshold_reports_none() {
        let (host, _reg, norm) = square_scene();
        let report = mps_anomalies(&host, &norm, &AnomalyParams::default());
        assert!(report.is_none());
    }

    #[test]
    fn disabling_the_optimization_finds_the_same_minimum() {
        let (host, _reg, norm) = square_scene();
        let optimized = mps_anomalies(
            &host,
            &norm,
            &AnomalyParams {
                threshold: 0.3,
                ..AnomalyParams::default()
            },
        );
        let exhaustive = mps_anomalies(
            &host,
            &norm,
            &AnomalyParams {
                threshold: 0.3,
                optimize: false,
                ..AnomalyParams::default()
            },
        );
        assert_eq!(optimized.anomalies.len(), exhaustive.anomalies.len());
        assert_eq!(optimized.anomalies[0].score, exhaustive.anomalies[0].score);
    }

    #[test]
    fn candidates_overlapping_normative_instances_are_pruned() {
        // Without the path, nothing outside the normative squares exists.
        let (mut host, mut reg, norm) = square_scene();
        // Sever the path by relabeling its vertices to something the
        // pattern does not contain.
        let z = reg.intern(Label::from("z"));
        for v in 40..44 {
            host.vertex_mut(VertexId(v)).unwrap().label = z;
        }
        let params = AnomalyParams {
            threshold: 0.3,
            ..AnomalyParams::default()
        };
        let report = mps_anomalies(&host, &norm, &params);
        assert!(report.is_none());
    }
}
