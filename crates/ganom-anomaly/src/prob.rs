//! Probabilistic anomaly search.
//!
//! After the host graph has been compressed by the normative pattern, the
//! pattern's occurrences are single SUB vertices. One further discovery
//! round extends those vertices by a single edge; an extension shared by
//! almost every occurrence is normal, one carried by almost none is not.
//! The rarity of extension `C` is `numInstances(C) / numPreviousInstances`,
//! and the minimum-rarity instances within the score bounds are reported.

use tracing::{debug, info};

use ganom_core::{Graph, LabelRegistry, Substructure};
use ganom_mine::{discover, MineParams, Mode};

use crate::phase::SearchPhase;
use crate::report::{
    AnomalousInstance, AnomalyMethod, AnomalyParams, AnomalyReport, SCORE_EPSILON,
};

/// One probabilistic iteration after the first: rediscovers single-edge
/// extensions of the compressed normative vertex and scores their rarity
/// against `prev_instances`, the normative instance count of the previous
/// iteration.
///
/// Returns the report and the discovery output (best-first) so the caller
/// can compress by the top substructure before the next iteration.
pub fn prob_step(
    host: &Graph,
    labels: &LabelRegistry,
    prev_instances: usize,
    mine: &MineParams,
    params: &AnomalyParams,
) -> (AnomalyReport, Vec<Substructure>) {
    let mut phase = SearchPhase::Init;

    // Pruning is forced off here: a rare extension is exactly the child a
    // value-pruned search would discard.
    let best = discover(host, labels, mine, Mode::ProbSubsequent);

    let extensions: Vec<&Substructure> = best
        .iter()
        .filter(|sub| {
            sub.definition.edge_count() >= 1
                && sub
                    .definition
                    .vertex_ids()
                    .any(|v| sub.definition[v].introduced_by_compression.is_some())
        })
        .collect();

    if prev_instances == 0 || extensions.is_empty() {
        phase.advance(SearchPhase::Scored);
        return (
            AnomalyReport {
                method: AnomalyMethod::Probabilistic,
                anomalies: Vec::new(),
                phase,
            },
            best,
        );
    }
    phase.advance(SearchPhase::Seeded);
    phase.advance(SearchPhase::Extending);
    phase.advance(SearchPhase::AtTargetSize);

    let rarity: Vec<f64> = extensions
        .iter()
        .map(|sub| sub.num_instances() as f64 / prev_instances as f64)
        .collect();
    let min_rarity = rarity
        .iter()
        .copied()
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .unwrap_or(0.0);
    phase.advance(SearchPhase::Scored);
    debug!(
        extensions = extensions.len(),
        min_rarity, prev_instances, "probabilistic scoring"
    );

    let mut anomalies = Vec::new();
    for (sub, r) in extensions.iter().zip(&rarity) {
        if (r - min_rarity).abs() > SCORE_EPSILON {
            continue;
        }
        if *r < params.min_score - SCORE_EPSILON || *r > params.max_score + SCORE_EPSILON {
            continue;
        }
        for inst in &sub.instances {
            let mut inst = (**inst).clone();
            inst.prob_anom_value = *r;
            inst.frequency = sub.num_instances() as u32;
            let example = inst.example(host);
            anomalies.push(AnomalousInstance {
                instance: inst,
                score: *r,
                example,
            });
        }
    }
    phase.advance(SearchPhase::Emitted);
    info!(reported = anomalies.len(), min_rarity, "probabilistic anomalies");

    (
        AnomalyReport {
            method: AnomalyMethod::Probabilistic,
            anomalies,
            phase,
        },
        best,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ganom_core::Label;
    use ganom_mine::{compress, find_exact_instances, MatchCosts};

    /// Twenty x->y pairs, one of which also has y->z; compressed by the
    /// x->y pattern, as the first probabilistic iteration leaves it.
    fn compressed_scene() -> (Graph, LabelRegistry, usize) {
        let mut reg = LabelRegistry::new();
        let x = reg.intern(Label::from("x"));
        let y = reg.intern(Label::from("y"));
        let z = reg.intern(Label::from("z"));
        let to = reg.intern(Label::from("to"));

        let mut host = Graph::new();
        for i in 0..20u32 {
            let vx = host.add_vertex(x);
            let vy = host.add_vertex(y);
            host.vertex_mut(vx).unwrap().source_example = i;
            host.vertex_mut(vy).unwrap().source_example = i;
            host.add_edge(vx, vy, to, true).unwrap();
            if i == 19 {
                let vz = host.add_vertex(z);
                host.vertex_mut(vz).unwrap().source_example = i;
                host.add_edge(vy, vz, to, true).unwrap();
            }
        }

        let mut pattern = Graph::new();
        let px = pattern.add_vertex(x);
        let py = pattern.add_vertex(y);
        pattern.add_edge(px, py, to, true).unwrap();

        let instances = find_exact_instances(&host, &pattern, MatchCosts::default(), false);
        assert_eq!(instances.len(), 20);
        let compressed = compress(&host, &mut reg, &instances, 1);
        (compressed, reg, 20)
    }

    #[test]
    fn rare_extension_is_reported_with_its_ratio() {
        let (host, reg, prev) = compressed_scene();
        let (report, best) = prob_step(
            &host,
            &reg,
            prev,
            &MineParams::default(),
            &AnomalyParams {
                max_score: 1.0,
                ..AnomalyParams::default()
            },
        );

        assert_eq!(report.phase, SearchPhase::Emitted);
        assert_eq!(report.anomalies.len(), 1);
        let anomaly = &report.anomalies[0];
        assert!((anomaly.score - 1.0 / 20.0).abs() < 1e-9);
        assert_eq!(anomaly.instance.prob_anom_value, anomaly.score);
        // The instance carries the flagged rare edge and vertex.
        assert_eq!(anomaly.instance.anomalous_edges.len(), 1);
        assert_eq!(anomaly.instance.anomalous_vertices.len(), 1);
        // Discovery output is available for the next compression pass.
        assert!(!best.is_empty());
    }

    #[test]
    fn no_extensions_means_none() {
        // Compress a host where the pattern covers everything: the SUB
        // vertices have no edges left to extend along.
        let mut reg = LabelRegistry::new();
        let x = reg.intern(Label::from("x"));
        let y = reg.intern(Label::from("y"));
        let to = reg.intern(Label::from("to"));
        let mut host = Graph::new();
        for _ in 0..5 {
            let vx = host.add_vertex(x);
            let vy = host.add_vertex(y);
            host.add_edge(vx, vy, to, true).unwrap();
        }
        let mut pattern = Graph::new();
        let px = pattern.add_vertex(x);
        let py = pattern.add_vertex(y);
        pattern.add_edge(px, py, to, true).unwrap();
        let instances = find_exact_instances(&host, &pattern, MatchCosts::default(), false);
        let compressed = compress(&host, &mut reg, &instances, 1);

        let (report, _best) = prob_step(
            &compressed,
            &reg,
            instances.len(),
            &MineParams::default(),
            &AnomalyParams::default(),
        );
        assert!(report.is_none());
        assert_eq!(report.phase, SearchPhase::Scored);
    }

    #[test]
    fn common_extensions_are_not_anomalous_alone() {
        // Every pair has the same extension; its rarity is 1.0 and it is
        // the minimum, so it is reported only if the bounds allow 1.0.
        let mut reg = LabelRegistry::new();
        let x = reg.intern(Label::from("x"));
        let y = reg.intern(Label::from("y"));
        let w = reg.intern(Label::from("w"));
        let to = reg.intern(Label::from("to"));
        let mut host = Graph::new();
        for _ in 0..4 {
            let vx = host.add_vertex(x);
            let vy = host.add_vertex(y);
            let vw = host.add_vertex(w);
            host.add_edge(vx, vy, to, true).unwrap();
            host.add_edge(vy, vw, to, true).unwrap();
        }
        let mut pattern = Graph::new();
        let px = pattern.add_vertex(x);
        let py = pattern.add_vertex(y);
        pattern.add_edge(px, py, to, true).unwrap();
        let instances = find_exact_instances(&host, &pattern, MatchCosts::default(), false);
        let compressed = compress(&host, &mut reg, &instances, 1);

        let (report, _best) = prob_step(
            &compressed,
            &reg,
            instances.len(),
            &MineParams::default(),
            &AnomalyParams {
                max_score: 0.5,
                ..AnomalyParams::default()
            },
        );
        // Rarity 1.0 exceeds the 0.5 cap.
        assert!(report.is_none());

        let (report, _best) = prob_step(
            &compressed,
            &reg,
            instances.len(),
            &MineParams::default(),
            &AnomalyParams {
                max_score: 1.0,
                ..AnomalyParams::default()
            },
        );
        assert_eq!(report.anomalies.len(), 4);
        for a in &report.anomalies {
            assert!((a.score - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn instance_vertices_reference_the_compressed_host() {
        let (host, reg, prev) = compressed_scene();
        let (report, _) = prob_step(
            &host,
            &reg,
            prev,
            &MineParams::default(),
            &AnomalyParams {
                max_score: 1.0,
                ..AnomalyParams::default()
            },
        );
        let inst = &report.anomalies[0].instance;
        // One endpoint is the SUB vertex, the other the rare z vertex.
        assert!(inst
            .vertices
            .iter()
            .any(|&v| host[v].introduced_by_compression == Some(1)));
        assert!(inst
            .vertices
            .iter()
            .any(|&v| host[v].introduced_by_compression.is_none()));
    }
}
