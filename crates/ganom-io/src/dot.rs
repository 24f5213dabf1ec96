//! Graphviz DOT export.
//!
//! Converts a host graph into a `petgraph` graph and delegates rendering to
//! `petgraph::dot::Dot`. Anomalous vertices and edges are drawn red;
//! undirected edges are drawn without arrowheads.

use petgraph::dot::{Config, Dot};
use petgraph::graph::Graph as PetGraph;
use petgraph::Directed;

use ganom_core::{Graph, LabelRegistry};

struct DotNode {
    label: String,
    anomalous: bool,
}

struct DotEdge {
    label: String,
    directed: bool,
    anomalous: bool,
}

impl std::fmt::Display for DotNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

impl std::fmt::Display for DotEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Renders `graph` as DOT text.
pub fn to_dot_string(graph: &Graph, labels: &LabelRegistry) -> String {
    let mut pg: PetGraph<DotNode, DotEdge, Directed> = PetGraph::new();

    let nodes: Vec<_> = graph
        .vertex_ids()
        .map(|v| {
            let vertex = &graph[v];
            pg.add_node(DotNode {
                label: labels
                    .get(vertex.label)
                    .map(|l| l.to_string())
                    .unwrap_or_default(),
                anomalous: vertex.anomalous,
            })
        })
        .collect();
    for e in graph.edge_ids() {
        let edge = &graph[e];
        pg.add_edge(
            nodes[edge.v1.index()],
            nodes[edge.v2.index()],
            DotEdge {
                label: labels
                    .get(edge.label)
                    .map(|l| l.to_string())
                    .unwrap_or_default(),
                directed: edge.directed,
                anomalous: edge.anomalous,
            },
        );
    }

    format!(
        "{}",
        Dot::with_attr_getters(
            &pg,
            &[Config::GraphContentOnly],
            &|_, edge| {
                let mut attrs = String::new();
                if !edge.weight().directed {
                    attrs.push_str("dir = \"none\" ");
                }
                if edge.weight().anomalous {
                    attrs.push_str("color = \"red\" ");
                }
                attrs
            },
            &|_, (_, node)| {
                if node.anomalous {
                    "color = \"red\" ".to_string()
                } else {
                    String::new()
                }
            },
        )
    )
}

/// Wraps the content in a `digraph` block, ready to write to a `.dot` file.
pub fn to_dot_file_string(graph: &Graph, labels: &LabelRegistry) -> String {
    format!("digraph anomalies {{\n{}}}\n", to_dot_string(graph, labels))
}
