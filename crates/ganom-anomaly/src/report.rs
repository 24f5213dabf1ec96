//! Anomaly search configuration and results.

use serde::{Deserialize, Serialize};

use ganom_core::{Graph, Instance};

use crate::phase::SearchPhase;

/// Two scores within this distance count as equal when selecting the
/// minimum-score anomalies. Exact equality beyond the epsilon is
/// implementation-defined.
pub const SCORE_EPSILON: f64 = 1e-6;

/// Which anomaly algorithm produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnomalyMethod {
    /// Information-theoretic: structural matches within an edit-cost budget.
    InfoTheoretic,
    /// Maximum partial substructure: smaller-than-normative matches.
    Mps,
    /// Probabilistic: rare single-edge extensions of the compressed pattern.
    Probabilistic,
}

impl std::fmt::Display for AnomalyMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnomalyMethod::InfoTheoretic => write!(f, "Information Theoretic"),
            AnomalyMethod::Mps => write!(f, "Maximum Partial Substructure"),
            AnomalyMethod::Probabilistic => write!(f, "Probabilistic"),
        }
    }
}

/// User-facing anomaly search knobs shared by the three algorithms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyParams {
    /// Fraction of the normative pattern's size allowed as edit cost.
    pub threshold: f64,
    /// Upper bound on reported anomaly scores.
    pub max_score: f64,
    /// Lower bound on reported anomaly scores.
    pub min_score: f64,
    /// Skip further extensions from a vertex once one succeeds in a step
    /// (the MPS search-time optimization; off under `--no-opt`).
    pub optimize: bool,
}

impl Default for AnomalyParams {
    fn default() -> Self {
        AnomalyParams {
            threshold: 0.0,
            max_score: f64::INFINITY,
            min_score: 0.0,
            optimize: true,
        }
    }
}

/// One reported anomalous instance.
#[derive(Debug, Clone)]
pub struct AnomalousInstance {
    /// The instance, with its anomalous elements and score fields filled.
    pub instance: Instance,
    /// The anomaly score (lower is more anomalous).
    pub score: f64,
    /// Positive example the instance lives in.
    pub example: u32,
}

/// The outcome of one anomaly search.
#[derive(Debug, Clone)]
pub struct AnomalyReport {
    /// Which algorithm ran.
    pub method: AnomalyMethod,
    /// Reported instances, in host order. Empty means NONE.
    pub anomalies: Vec<AnomalousInstance>,
    /// Final phase the search reached.
    pub phase: SearchPhase,
}

impl AnomalyReport {
    /// An empty report in the `Scored` phase (nothing found).
    pub fn none(method: AnomalyMethod) -> Self {
        AnomalyReport {
            method,
            anomalies: Vec::new(),
            phase: SearchPhase::Scored,
        }
    }

    /// True when nothing was reported.
    pub fn is_none(&self) -> bool {
        self.anomalies.is_empty()
    }
}

/// Flags the elements of `inst` that deviate from `definition` under the
/// instance's definition mapping: unmapped or label-substituted vertices,
/// and edges with no same-labeled, same-oriented counterpart between their
/// mapped definition endpoints.
pub fn flag_deviations(inst: &mut Instance, host: &Graph, definition: &Graph) {
    use ganom_core::UNMAPPED;

    let mut host_to_def = vec![None; host.vertex_count()];
    for (def_idx, &target) in inst.mapping.iter().enumerate() {
        if target != UNMAPPED {
            host_to_def[target.index()] = Some(ganom_core::VertexId(def_idx as u32));
        }
    }

    for &v in &inst.vertices.clone() {
        let anomalous = match host_to_def[v.index()] {
            None => true,
            Some(d) => definition[d].label != host[v].label,
        };
        if anomalous && !inst.anomalous_vertices.contains(&v) {
            inst.anomalous_vertices.push(v);
        }
    }

    for &e in &inst.edges.clone() {
        let edge = &host[e];
        let anomalous = match (host_to_def[edge.v1.index()], host_to_def[edge.v2.index()]) {
            (Some(d1), Some(d2)) => !definition.edge_ids().any(|de| {
                let def_edge = &definition[de];
                let endpoints_match = if def_edge.directed && edge.directed {
                    def_edge.v1 == d1 && def_edge.v2 == d2
                } else {
                    (def_edge.v1 == d1 && def_edge.v2 == d2)
                        || (def_edge.v1 == d2 && def_edge.v2 == d1)
                };
                endpoints_match
                    && def_edge.label == edge.label
                    && def_edge.directed == edge.directed
            }),
            _ => true,
        };
        if anomalous && !inst.anomalous_edges.contains(&e) {
            inst.anomalous_edges.push(e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ganom_core::{Label, LabelRegistry, VertexId};

    #[test]
    fn flagging_marks_substituted_vertex_only() {
        let mut reg = LabelRegistry::new();
        let a = reg.intern(Label::from("a"));
        let b = reg.intern(Label::from("b"));
        let d = reg.intern(Label::from("d"));
        let on = reg.intern(Label::from("on"));

        let mut host = Graph::new();
        let va = host.add_vertex(a);
        let vd = host.add_vertex(d);
        let e = host.add_edge(va, vd, on, false).unwrap();

        let mut def = Graph::new();
        let pa = def.add_vertex(a);
        let pb = def.add_vertex(b);
        def.add_edge(pa, pb, on, false).unwrap();

        let mut inst = Instance::single(va);
        inst.insert_vertex(vd);
        inst.insert_edge(e);
        inst.mapping = smallvec::SmallVec::from_slice(&[va, vd]);

        flag_deviations(&mut inst, &host, &def);
        assert_eq!(inst.anomalous_vertices.as_slice(), &[vd]);
        // The edge itself still matches (same label, both undirected).
        assert!(inst.anomalous_edges.is_empty());
    }

    #[test]
    fn flagging_marks_unmatched_edges() {
        let mut reg = LabelRegistry::new();
        let a = reg.intern(Label::from("a"));
        let on = reg.intern(Label::from("on"));
        let off = reg.intern(Label::from("off"));

        let mut host = Graph::new();
        let v0 = host.add_vertex(a);
        let v1 = host.add_vertex(a);
        let e = host.add_edge(v0, v1, off, false).unwrap();

        let mut def = Graph::new();
        let p0 = def.add_vertex(a);
        let p1 = def.add_vertex(a);
        def.add_edge(p0, p1, on, false).unwrap();

        let mut inst = Instance::single(v0);
        inst.insert_vertex(v1);
        inst.insert_edge(e);
        inst.mapping = smallvec::SmallVec::from_slice(&[v0, v1]);

        flag_deviations(&mut inst, &host, &def);
        assert!(inst.anomalous_vertices.is_empty());
        assert_eq!(inst.anomalous_edges.as_slice(), &[e]);
    }

    #[test]
    fn report_none_is_empty_and_scored() {
        let report = AnomalyReport::none(AnomalyMethod::Mps);
        assert!(report.is_none());
        assert_eq!(report.phase, SearchPhase::Scored);
        assert_eq!(format!("{}", report.method), "Maximum Partial Substructure");
    }

    #[test]
    fn unmapped_vertices_are_flagged() {
        let mut reg = LabelRegistry::new();
        let a = reg.intern(Label::from("a"));
        let mut host = Graph::new();
        let v = host.add_vertex(a);

        let mut def = Graph::new();
        def.add_vertex(a);

        let mut inst = Instance::single(v);
        inst.mapping = smallvec::SmallVec::from_slice(&[ganom_core::UNMAPPED]);
        flag_deviations(&mut inst, &host, &def);
        assert_eq!(inst.anomalous_vertices.as_slice(), &[VertexId(0)]);
    }
}
