//! Information-theoretic anomaly search.
//!
//! Looks for host subgraphs that are the same size as the normative pattern
//! and structurally match it within an edit-cost budget, yet are not
//! occurrences of it. The anomaly score of a candidate is
//! `edit_cost x frequency` -- a structure that is both close to normal and
//! rare scores lowest, and lower is more anomalous.

use tracing::{debug, info};

use ganom_core::{Graph, Substructure};
use ganom_mine::{find_instances, graphs_match_exactly, MatchCosts};

use crate::phase::SearchPhase;
use crate::report::{
    flag_deviations, AnomalousInstance, AnomalyMethod, AnomalyParams, AnomalyReport, SCORE_EPSILON,
};

/// Runs the information-theoretic search against normative pattern `norm`.
///
/// Candidates have exactly the pattern's vertex and edge counts, an edit
/// cost in `(0, threshold * (|V| + |E|)]` capped by the score bounds, and do
/// not overlap a normative instance. All minimum-score candidates within
/// `[min_score, max_score]` are reported.
pub fn info_anomalies(
    host: &Graph,
    norm: &Substructure,
    params: &AnomalyParams,
) -> AnomalyReport {
    let mut phase = SearchPhase::Init;
    let definition = &norm.definition;
    let tau = params.threshold * definition.size() as f64;
    if tau <= 0.0 || definition.is_empty() {
        return AnomalyReport::none(AnomalyMethod::InfoTheoretic);
    }

    phase.advance(SearchPhase::Seeded);
    phase.advance(SearchPhase::Extending);
    let found = find_instances(
        host,
        definition,
        MatchCosts::default(),
        tau.min(params.max_score),
        &norm.instances,
    );
    if found.is_empty() {
        phase.advance(SearchPhase::Scored);
        return AnomalyReport {
            method: AnomalyMethod::InfoTheoretic,
            anomalies: Vec::new(),
            phase,
        };
    }
    phase.advance(SearchPhase::AtTargetSize);

    // Frequency of each candidate's exact shape across all candidates.
    let graphs: Vec<Graph> = found.iter().map(|f| f.instance.to_graph(host)).collect();
    let mut frequency = vec![0u32; found.len()];
    for i in 0..found.len() {
        for j in 0..found.len() {
            if graphs_match_exactly(&graphs[i], &graphs[j]) {
                frequency[i] += 1;
            }
        }
    }

    // Eligible candidates deviate (cost > 0) but stay within bounds.
    let mut scored: Vec<(usize, f64)> = Vec::new();
    for (i, f) in found.iter().enumerate() {
        if f.cost <= SCORE_EPSILON || f.cost > params.max_score + SCORE_EPSILON {
            continue;
        }
        scored.push((i, f.cost * frequency[i] as f64));
    }
    phase.advance(SearchPhase::Scored);
    debug!(
        candidates = found.len(),
        eligible = scored.len(),
        tau,
        "information-theoretic scoring"
    );

    let Some(min_score) = scored
        .iter()
        .map(|&(_, s)| s)
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    else {
        return AnomalyReport {
            method: AnomalyMethod::InfoTheoretic,
            anomalies: Vec::new(),
            phase,
        };
    };

    let mut anomalies = Vec::new();
    for (i, score) in scored {
        if (score - min_score).abs() > SCORE_EPSILON {
            continue;
        }
        if score < params.min_score - SCORE_EPSILON || score > params.max_score + SCORE_EPSILON {
            continue;
        }
        let mut instance = found[i].instance.clone();
        instance.frequency = frequency[i];
        instance.info_anom_value = score;
        flag_deviations(&mut instance, host, definition);
        let example = instance.example(host);
        anomalies.push(AnomalousInstance {
            instance,
            score,
            example,
        });
    }
    phase.advance(SearchPhase::Emitted);
    info!(reported = anomalies.len(), min_score, "information-theoretic anomalies");

    AnomalyReport {
        method: AnomalyMethod::InfoTheoretic,
        anomalies,
        phase,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ganom_core::{Instance, Label, LabelRegistry, VertexId};
    use std::rc::Rc;

    /// Ten disjoint triangles a-b-c, one of which is a-b-d, plus the
    /// normative substructure with its nine clean instances.
    fn triangle_scene() -> (Graph, LabelRegistry, Substructure) {
        let mut reg = LabelRegistry::new();
        let a = reg.intern(Label::from("a"));
        let b = reg.intern(Label::from("b"));
        let c = reg.intern(Label::from("c"));
        let d = reg.intern(Label::from("d"));
        let on = reg.intern(Label::from("on"));

        let mut host = Graph::new();
        let mut norm_instances = Vec::new();
        for i in 0..10u32 {
            let third = if i == 9 { d } else { c };
            let va = host.add_vertex(a);
            let vb = host.add_vertex(b);
            let vc = host.add_vertex(third);
            for v in [va, vb, vc] {
                host.vertex_mut(v).unwrap().source_example = i;
            }
            let e1 = host.add_edge(va, vb, on, false).unwrap();
            let e2 = host.add_edge(vb, vc, on, false).unwrap();
            let e3 = host.add_edge(vc, va, on, false).unwrap();
            if i != 9 {
                let mut inst = Instance::single(va);
                inst.insert_vertex(vb);
                inst.insert_vertex(vc);
                for e in [e1, e2, e3] {
                    inst.insert_edge(e);
                }
                inst.mapping = inst.vertices.clone();
                norm_instances.push(Rc::new(inst));
            }
        }

        let mut def = Graph::new();
        let pa = def.add_vertex(a);
        let pb = def.add_vertex(b);
        let pc = def.add_vertex(c);
        def.add_edge(pa, pb, on, false).unwrap();
        def.add_edge(pb, pc, on, false).unwrap();
        def.add_edge(pc, pa, on, false).unwrap();

        let mut norm = Substructure::new(def);
        norm.instances = norm_instances;
        (host, reg, norm)
    }

    #[test]
    fn swapped_label_triangle_is_reported() {
        let (host, _reg, norm) = triangle_scene();
        let params = AnomalyParams {
            threshold: 0.2,
            ..AnomalyParams::default()
        };
        let report = info_anomalies(&host, &norm, &params);

        assert_eq!(report.phase, SearchPhase::Emitted);
        assert_eq!(report.anomalies.len(), 1);
        let anomaly = &report.anomalies[0];
        assert_eq!(anomaly.example, 9);
        // cost 1 (one label substitution) x frequency 1.
        assert!((anomaly.score - 1.0).abs() < 1e-9);
        assert_eq!(anomaly.instance.frequency, 1);
        // The swapped vertex is the flagged one.
        assert_eq!(anomaly.instance.anomalous_vertices.len(), 1);
        let flagged = anomaly.instance.anomalous_vertices[0];
        assert_eq!(host[flagged].source_example, 9);
    }

    #[test]
    fn zero_threshold_reports_none() {
        let (host, _reg, norm) = triangle_scene();
        let report = info_anomalies(&host, &norm, &AnomalyParams::default());
        assert!(report.is_none());
    }

    #[test]
    fn score_bounds_filter_reports() {
        let (host, _reg, norm) = triangle_scene();
        let params = AnomalyParams {
            threshold: 0.2,
            max_score: 0.5,
            ..AnomalyParams::default()
        };
        // The only candidate scores 1.0, above the cap.
        let report = info_anomalies(&host, &norm, &params);
        assert!(report.is_none());
    }

    #[test]
    fn clean_host_reports_none() {
        let (mut host, mut reg, norm) = triangle_scene();
        // Repair the deviant vertex: the host now only contains clean
        // triangles, all covered by normative instances except the repaired
        // one -- which matches exactly (cost 0) and is therefore no anomaly.
        let c = reg.intern(Label::from("c"));
        host.vertex_mut(VertexId(29)).unwrap().label = c;
        let params = AnomalyParams {
            threshold: 0.2,
            ..AnomalyParams::default()
        };
        let report = info_anomalies(&host, &norm, &params);
        assert!(report.is_none());
    }
}
