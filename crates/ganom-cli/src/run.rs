//! The batch pipeline: load, compress predefined patterns, then iterate
//! discover -> anomaly search -> compress.

use std::fmt::Write as _;

use tracing::{info, warn};

use ganom_anomaly::{info_anomalies, mps_anomalies, prob_step, AnomalyMethod, AnomalyReport};
use ganom_core::{Graph, LabelRegistry, Substructure};
use ganom_io::display;
use ganom_mine::{compress, discover, find_exact_instances, MatchCosts, Mode};

use crate::options::RunConfig;

/// Everything a pipeline run produced.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// The host graph after all compression passes, with anomaly flags set.
    pub host: Graph,
    /// The working label registry matching `host`.
    pub labels: LabelRegistry,
    /// Every discovery output, best-first per iteration, in run order.
    pub discoveries: Vec<Substructure>,
    /// One report per anomaly search that ran.
    pub reports: Vec<AnomalyReport>,
    /// Accumulated human-readable output for stdout.
    pub printed: String,
    /// DOT rendering of the graph as of the last anomaly report.
    pub dot: Option<String>,
}

/// Runs the full pipeline over an already-loaded graph.
pub fn run_pipeline(
    mut host: Graph,
    mut labels: LabelRegistry,
    predefined: &[Graph],
    config: &RunConfig,
) -> PipelineOutcome {
    let mut printed = String::new();
    let mut discoveries = Vec::new();
    let mut reports = Vec::new();
    let mut dot = None;
    let mut compression_iteration: u32 = 0;

    // Predefined substructures compress away before discovery sees the
    // graph.
    for pattern in predefined {
        let instances =
            find_exact_instances(&host, pattern, MatchCosts::default(), config.mine.allow_overlap);
        if instances.is_empty() {
            warn!("predefined substructure matched nowhere");
            eprintln!("Warning: predefined substructure matched nowhere; skipping.");
            continue;
        }
        compression_iteration += 1;
        host = compress(&host, &mut labels, &instances, compression_iteration);
        labels = labels.compact(&mut host);
        if config.output >= 2 {
            let _ = writeln!(
                printed,
                "Predefined substructure: compressed {} instance(s).",
                instances.len()
            );
        }
    }

    let infinite = config.iterations == 0;
    let total = if infinite { usize::MAX } else { config.iterations };
    let mut prev_instances = 0usize;

    for iteration in 1..=total {
        // Probabilistic iterations after the first only look at single-edge
        // extensions of the compressed normative vertex.
        if config.method == Some(AnomalyMethod::Probabilistic) && iteration >= 2 {
            let (report, best) =
                prob_step(&host, &labels, prev_instances, &config.mine, &config.anomaly);
            let _ = write!(printed, "{}", display::format_report(&report, &host, &labels));
            mark_anomalies(&mut host, &report);
            dot = Some(ganom_io::to_dot_file_string(&host, &labels));
            reports.push(report);

            let Some(top) = best.first().filter(|s| s.num_instances() > 0).cloned() else {
                break;
            };
            discoveries.extend(best);
            if iteration == total {
                break;
            }
            compression_iteration += 1;
            prev_instances = top.num_instances();
            host = compress(&host, &mut labels, &top.instances, compression_iteration);
            labels = labels.compact(&mut host);
            continue;
        }

        let mode = match config.method {
            Some(AnomalyMethod::InfoTheoretic) => Mode::InfoTheoretic,
            Some(AnomalyMethod::Mps) => Mode::Mps,
            _ => Mode::Normal,
        };
        let best = discover(&host, &labels, &config.mine, mode);
        if best.is_empty() {
            let _ = writeln!(printed, "No substructures found.");
            break;
        }

        let norm_index = if config.norm <= best.len() {
            config.norm - 1
        } else {
            eprintln!(
                "Warning: normative pattern {} not in the top {}; using the best substructure.",
                config.norm,
                best.len()
            );
            0
        };
        let norm = best[norm_index].clone();
        let _ = write!(
            printed,
            "{}",
            display::format_normative(norm_index + 1, &norm, &labels)
        );
        if config.output >= 3 {
            for (i, sub) in best.iter().enumerate() {
                let _ = write!(
                    printed,
                    "Best ({}): {}",
                    i + 1,
                    display::format_substructure(sub, &labels)
                );
            }
        }
        if config.output >= 4 {
            for (i, inst) in norm.instances.iter().enumerate() {
                let _ = writeln!(printed, "  Instance {}:", i + 1);
                let _ = write!(
                    printed,
                    "{}",
                    display::format_graph(&inst.to_graph(&host), &labels, "    ")
                );
            }
        }
        info!(
            iteration,
            value = norm.value,
            instances = norm.num_instances(),
            "normative pattern selected"
        );

        let report = match config.method {
            Some(AnomalyMethod::InfoTheoretic) => Some(info_anomalies(&host, &norm, &config.anomaly)),
            Some(AnomalyMethod::Mps) => Some(mps_anomalies(&host, &norm, &config.anomaly)),
            _ => None,
        };
        if let Some(report) = report {
            let _ = write!(printed, "{}", display::format_report(&report, &host, &labels));
            mark_anomalies(&mut host, &report);
            dot = Some(ganom_io::to_dot_file_string(&host, &labels));
            reports.push(report);
        }
        discoveries.extend(best);

        let last = !infinite && iteration == total;
        let need_compression = !last || config.compress_output;
        if need_compression && norm.num_instances() > 0 {
            compression_iteration += 1;
            prev_instances = norm.num_instances();
            host = compress(&host, &mut labels, &norm.instances, compression_iteration);
            labels = labels.compact(&mut host);
        }
        if last {
            break;
        }
        if infinite && norm.num_instances() < 2 {
            break;
        }
    }

    if dot.is_none() {
        dot = Some(ganom_io::to_dot_file_string(&host, &labels));
    }
    PipelineOutcome {
        host,
        labels,
        discoveries,
        reports,
        printed,
        dot,
    }
}

/// Copies an anomaly report's per-instance flags onto the host graph, for
/// the DOT rendering and the compressed-graph output.
fn mark_anomalies(host: &mut Graph, report: &AnomalyReport) {
    for anomaly in &report.anomalies {
        for &v in &anomaly.instance.anomalous_vertices {
            if let Some(vertex) = host.vertex_mut(v) {
                vertex.anomalous = true;
                vertex.anomalous_value = anomaly.score;
            }
        }
        for &e in &anomaly.instance.anomalous_edges {
            if let Some(edge) = host.edge_mut(e) {
                edge.anomalous = true;
                edge.anomalous_value = anomaly.score;
            }
        }
    }
}
