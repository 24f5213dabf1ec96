//! Writers for the graph grammar and the machine-readable discovery output.
//!
//! [`write_graph`] emits the same grammar [`parse`](crate::parse::parse)
//! reads, so written graphs round-trip. Discovered substructures are written
//! as `S <numInstances>` stanzas followed by their definition in the same
//! grammar.

use std::io::{self, Write};

use ganom_core::{Graph, Label, LabelRegistry, Substructure};

/// Formats a label for the grammar: numbers bare, strings quoted whenever a
/// bareword would be misread (whitespace, quotes, comment chars, something
/// numeric-looking, or a directive keyword).
pub fn format_label(label: &Label) -> String {
    match label {
        Label::Num(n) => format!("{}", n),
        Label::Str(s) => {
            let keyword = matches!(s.as_str(), "v" | "e" | "d" | "u" | "XP" | "PS");
            let unsafe_chars = s.is_empty()
                || s.chars().any(|c| c.is_whitespace() || c == '"' || c == '%');
            let numeric_looking = s.parse::<f64>().is_ok();
            if keyword || unsafe_chars || numeric_looking {
                format!("\"{}\"", s)
            } else {
                s.clone()
            }
        }
    }
}

fn label_of(labels: &LabelRegistry, id: ganom_core::LabelId) -> String {
    labels
        .get(id)
        .map(format_label)
        .unwrap_or_else(|| format!("?{}", id))
}

/// Writes `graph` in the input grammar.
///
/// When the vertex array is still grouped by example (as parsed), each
/// example gets its own `XP` section with 1-based local numbering. A graph
/// whose examples have been entangled -- compression does this -- is written
/// as a single example with sequential numbering.
pub fn write_graph<W: Write>(
    w: &mut W,
    graph: &Graph,
    labels: &LabelRegistry,
) -> io::Result<()> {
    if example_grouped(graph) {
        write_by_example(w, graph, labels)
    } else {
        write_single_example(w, graph, labels)
    }
}

fn example_grouped(graph: &Graph) -> bool {
    let mut previous = 0;
    for v in graph.vertex_ids() {
        let example = graph[v].source_example;
        if example < previous {
            return false;
        }
        previous = example;
    }
    graph.edge_ids().all(|e| {
        let edge = &graph[e];
        graph[edge.v1].source_example == graph[edge.v2].source_example
    })
}

fn write_by_example<W: Write>(
    w: &mut W,
    graph: &Graph,
    labels: &LabelRegistry,
) -> io::Result<()> {
    // Local 1-based numbering per example, assigned in index order.
    let mut local = vec![0u32; graph.vertex_count()];
    let mut counts = vec![0u32; graph.example_count().max(1)];
    for v in graph.vertex_ids() {
        let example = graph[v].source_example as usize;
        counts[example] += 1;
        local[v.index()] = counts[example];
    }

    for example in 0..graph.example_count() as u32 {
        writeln!(w, "XP")?;
        for v in graph.vertex_ids() {
            let vertex = &graph[v];
            if vertex.source_example == example {
                writeln!(
                    w,
                    "v {} {}",
                    local[v.index()],
                    label_of(labels, vertex.label)
                )?;
            }
        }
        for e in graph.edge_ids() {
            let edge = &graph[e];
            if graph[edge.v1].source_example == example {
                writeln!(
                    w,
                    "{} {} {} {}",
                    if edge.directed { "d" } else { "u" },
                    local[edge.v1.index()],
                    local[edge.v2.index()],
                    label_of(labels, edge.label)
                )?;
            }
        }
    }
    Ok(())
}

fn write_single_example<W: Write>(
    w: &mut W,
    graph: &Graph,
    labels: &LabelRegistry,
) -> io::Result<()> {
    writeln!(w, "XP")?;
    for v in graph.vertex_ids() {
        writeln!(w, "v {} {}", v.0 + 1, label_of(labels, graph[v].label))?;
    }
    for e in graph.edge_ids() {
        let edge = &graph[e];
        writeln!(
            w,
            "{} {} {} {}",
            if edge.directed { "d" } else { "u" },
            edge.v1.0 + 1,
            edge.v2.0 + 1,
            label_of(labels, edge.label)
        )?;
    }
    Ok(())
}

/// Writes one discovered substructure in machine-readable form.
pub fn write_substructure<W: Write>(
    w: &mut W,
    sub: &Substructure,
    labels: &LabelRegistry,
) -> io::Result<()> {
    writeln!(w, "S {}", sub.num_instances())?;
    let def = &sub.definition;
    for v in def.vertex_ids() {
        writeln!(w, "v {} {}", v.0 + 1, label_of(labels, def[v].label))?;
    }
    for e in def.edge_ids() {
        let edge = &def[e];
        writeln!(
            w,
            "{} {} {} {}",
            if edge.directed { "d" } else { "u" },
            edge.v1.0 + 1,
            edge.v2.0 + 1,
            label_of(labels, edge.label)
        )?;
    }
    Ok(())
}

/// Writes the full discovery output, best first.
pub fn write_discoveries<W: Write>(
    w: &mut W,
    subs: &[Substructure],
    labels: &LabelRegistry,
) -> io::Result<()> {
    for sub in subs {
        write_substructure(w, sub, labels)?;
    }
    Ok(())
}

/// Serializes a graph as pretty JSON (the structural dump format).
pub fn write_graph_json<W: Write>(w: &mut W, graph: &Graph) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(w, graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_positive;

    #[test]
    fn written_graph_reparses_identically() {
        let text = "\
XP
v 1 a
v 2 \"b c\"
v 3 2.5
d 1 2 on
u 2 3 5
XP
v 1 a
v 2 a
u 1 2 on
";
        let mut labels = LabelRegistry::new();
        let parsed = parse_positive(text, &mut labels, false).unwrap();

        let mut out = Vec::new();
        write_graph(&mut out, &parsed.graph, &labels).unwrap();
        let round = String::from_utf8(out).unwrap();

        let mut labels2 = LabelRegistry::new();
        let reparsed = parse_positive(&round, &mut labels2, false).unwrap();

        assert_eq!(
            parsed.graph.vertex_count(),
            reparsed.graph.vertex_count()
        );
        assert_eq!(parsed.graph.edge_count(), reparsed.graph.edge_count());
        assert_eq!(
            parsed.graph.example_count(),
            reparsed.graph.example_count()
        );
        // Identical up to label-registry order: compare resolved labels.
        for (v1, v2) in parsed.graph.vertex_ids().zip(reparsed.graph.vertex_ids()) {
            assert_eq!(
                labels.get(parsed.graph[v1].label),
                labels2.get(reparsed.graph[v2].label)
            );
        }
        for (e1, e2) in parsed.graph.edge_ids().zip(reparsed.graph.edge_ids()) {
            let a = &parsed.graph[e1];
            let b = &reparsed.graph[e2];
            assert_eq!(a.v1, b.v1);
            assert_eq!(a.v2, b.v2);
            assert_eq!(a.directed, b.directed);
            assert_eq!(labels.get(a.label), labels2.get(b.label));
        }
    }

    #[test]
    fn label_quoting_protects_ambiguous_strings() {
        assert_eq!(format_label(&Label::from("plain")), "plain");
        assert_eq!(format_label(&Label::from("two words")), "\"two words\"");
        assert_eq!(format_label(&Label::from("17")), "\"17\"");
        assert_eq!(format_label(&Label::from("v")), "\"v\"");
        assert_eq!(format_label(&Label::Num(17.0)), "17");
        assert_eq!(format_label(&Label::Num(2.5)), "2.5");
    }

    #[test]
    fn machine_output_prefixes_instance_counts() {
        let text = "XP\nv 1 a\nv 2 b\nd 1 2 on\n";
        let mut labels = LabelRegistry::new();
        let parsed = parse_positive(text, &mut labels, false).unwrap();
        let mut sub = Substructure::new(parsed.graph.clone());
        sub.instances
            .push(std::rc::Rc::new(ganom_core::Instance::single(
                ganom_core::VertexId(0),
            )));

        let mut out = Vec::new();
        write_substructure(&mut out, &sub, &labels).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "S 1\nv 1 a\nv 2 b\nd 1 2 on\n");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            /// Arbitrary small multi-example graphs survive a write/parse
            /// round trip.
            #[test]
            fn roundtrip_preserves_counts(
                examples in proptest::collection::vec(
                    (1usize..4, proptest::collection::vec((0u32..3, 0u32..3), 0..4)),
                    1..4,
                )
            ) {
                let mut labels = LabelRegistry::new();
                let names = ["a", "b", "c"];
                let mut graph = Graph::new();
                for (example, (nv, edges)) in examples.iter().enumerate() {
                    let offset = graph.vertex_count() as u32;
                    for i in 0..*nv {
                        let id = labels.intern(Label::from(names[i % 3]));
                        let v = graph.add_vertex(id);
                        let vertex = graph.vertex_mut(v).unwrap();
                        vertex.source_example = example as u32;
                        vertex.source_vertex = i as u32 + 1;
                    }
                    let on = labels.intern(Label::from("on"));
                    for &(a, b) in edges {
                        let va = ganom_core::VertexId(offset + a % *nv as u32);
                        let vb = ganom_core::VertexId(offset + b % *nv as u32);
                        let _ = graph.add_edge(va, vb, on, false);
                    }
                }

                let mut out = Vec::new();
                write_graph(&mut out, &graph, &labels).unwrap();
                let text = String::from_utf8(out).unwrap();
                let mut labels2 = LabelRegistry::new();
                let reparsed = parse_positive(&text, &mut labels2, false).unwrap();

                prop_assert_eq!(reparsed.graph.vertex_count(), graph.vertex_count());
                prop_assert_eq!(reparsed.graph.edge_count(), graph.edge_count());
                prop_assert_eq!(reparsed.graph.example_count(), graph.example_count());
            }
        }
    }
}
