//! Human-readable report rendering.
//!
//! Formats the normative pattern and the anomaly reports for stdout. Element
//! lines reuse the grammar (`v` / `d` / `u`), with flagged elements carrying
//! the ` <-- anomaly (original vertex: X , in original example Y)` suffix.

use std::fmt::Write as _;

use ganom_anomaly::AnomalyReport;
use ganom_core::{Graph, LabelRegistry, Substructure};

use crate::write::format_label;

fn label_of(labels: &LabelRegistry, id: ganom_core::LabelId) -> String {
    labels
        .get(id)
        .map(format_label)
        .unwrap_or_else(|| format!("?{}", id))
}

/// Renders a definition graph as indented grammar lines with local 1-based
/// numbering.
pub fn format_graph(graph: &Graph, labels: &LabelRegistry, indent: &str) -> String {
    let mut out = String::new();
    for v in graph.vertex_ids() {
        let _ = writeln!(
            out,
            "{}v {} {}",
            indent,
            v.0 + 1,
            label_of(labels, graph[v].label)
        );
    }
    for e in graph.edge_ids() {
        let edge = &graph[e];
        let _ = writeln!(
            out,
            "{}{} {} {} {}",
            indent,
            if edge.directed { "d" } else { "u" },
            edge.v1.0 + 1,
            edge.v2.0 + 1,
            label_of(labels, edge.label)
        );
    }
    out
}

/// Renders one substructure: its value, instance and example counts, and
/// definition.
pub fn format_substructure(sub: &Substructure, labels: &LabelRegistry) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Substructure: value = {:.5}, instances = {}, examples = {}",
        sub.value,
        sub.num_instances(),
        sub.num_examples
    );
    out.push_str(&format_graph(&sub.definition, labels, "    "));
    out
}

/// Renders the normative-pattern banner for rank `k` (1-based).
pub fn format_normative(k: usize, sub: &Substructure, labels: &LabelRegistry) -> String {
    format!(
        "Normative Pattern ({}):\n{}",
        k,
        format_substructure(sub, labels)
    )
}

/// Renders an anomaly report. An empty report is the literal
/// "Anomalous Instances: NONE".
pub fn format_report(report: &AnomalyReport, host: &Graph, labels: &LabelRegistry) -> String {
    if report.is_none() {
        return "Anomalous Instances: NONE\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "Anomalous Instance(s):");
    for anomaly in &report.anomalies {
        let _ = writeln!(out);
        let _ = writeln!(out, " from example {}:", anomaly.example + 1);
        let inst = &anomaly.instance;
        for &v in &inst.vertices {
            let vertex = &host[v];
            let _ = write!(
                out,
                "    v {} {}",
                vertex.source_vertex,
                label_of(labels, vertex.label)
            );
            if inst.anomalous_vertices.contains(&v) {
                let _ = write!(
                    out,
                    " <-- anomaly (original vertex: {} , in original example {})",
                    vertex.source_vertex,
                    vertex.source_example + 1
                );
            }
            let _ = writeln!(out);
        }
        for &e in &inst.edges {
            let edge = &host[e];
            let _ = write!(
                out,
                "    {} {} {} {}",
                if edge.directed { "d" } else { "u" },
                host[edge.v1].source_vertex,
                host[edge.v2].source_vertex,
                label_of(labels, edge.label)
            );
            if inst.anomalous_edges.contains(&e) {
                let _ = write!(
                    out,
                    " <-- anomaly (original vertex: {} , in original example {})",
                    edge.source_v1,
                    edge.source_example + 1
                );
            }
            let _ = writeln!(out);
        }
        let _ = writeln!(out, "    (anomalous value: {})", anomaly.score);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ganom_anomaly::{AnomalousInstance, AnomalyMethod, SearchPhase};
    use ganom_core::{Instance, Label, VertexId};

    fn tiny_scene() -> (Graph, LabelRegistry, Instance) {
        let mut labels = LabelRegistry::new();
        let a = labels.intern(Label::from("a"));
        let d = labels.intern(Label::from("d"));
        let on = labels.intern(Label::from("on"));

        let mut host = Graph::new();
        let va = host.add_vertex(a);
        let vd = host.add_vertex(d);
        {
            let v = host.vertex_mut(vd).unwrap();
            v.source_vertex = 2;
            v.source_example = 4;
        }
        host.vertex_mut(va).unwrap().source_example = 4;
        let e = host.add_edge(va, vd, on, false).unwrap();

        let mut inst = Instance::single(va);
        inst.insert_vertex(vd);
        inst.insert_edge(e);
        inst.anomalous_vertices.push(vd);
        (host, labels, inst)
    }

    #[test]
    fn empty_report_renders_none() {
        let (host, labels, _inst) = tiny_scene();
        let report = AnomalyReport::none(AnomalyMethod::InfoTheoretic);
        assert_eq!(
            format_report(&report, &host, &labels),
            "Anomalous Instances: NONE\n"
        );
    }

    #[test]
    fn flagged_elements_carry_the_anomaly_suffix() {
        let (host, labels, inst) = tiny_scene();
        let report = AnomalyReport {
            method: AnomalyMethod::InfoTheoretic,
            anomalies: vec![AnomalousInstance {
                instance: inst,
                score: 1.0,
                example: 4,
            }],
            phase: SearchPhase::Emitted,
        };
        let text = format_report(&report, &host, &labels);

        assert!(text.starts_with("Anomalous Instance(s):\n"));
        assert!(text.contains(" from example 5:\n"));
        assert!(text
            .contains("v 2 d <-- anomaly (original vertex: 2 , in original example 5)"));
        // The unflagged vertex and edge have no suffix.
        assert!(text.contains("\n    v 1 a\n"));
        assert!(text.contains("\n    u 1 2 on\n"));
    }

    #[test]
    fn normative_banner_numbers_the_pattern() {
        let (host, labels, _inst) = tiny_scene();
        let mut sub = Substructure::new(host.clone());
        sub.value = 1.25;
        let text = format_normative(1, &sub, &labels);
        assert!(text.starts_with("Normative Pattern (1):\n"));
        assert!(text.contains("value = 1.25000"));
        assert!(text.contains("    v 1 a\n"));
    }

    #[test]
    fn definition_vertices_renumber_from_one() {
        let (host, labels, _inst) = tiny_scene();
        let lines = format_graph(&host, &labels, "");
        assert_eq!(lines, "v 1 a\nv 2 d\nu 1 2 on\n");
    }
}
