//! Generator parameter file.
//!
//! A keyword-driven text format:
//!
//! ```text
//! Vertices 100
//! Edges 150
//! Connectivity 1
//! Coverage 0.6
//! Overlap 0.0
//! Deviation 0.5
//! SubVertexLabel 1.0 0.25
//! SubEdgeLabel 1.0 0.25
//! DelVertex 1.0 0.10
//! DelEdge 1.0 0.40
//! VertexLabels { a 0.5 b 0.5 }
//! EdgeLabels { on 1.0 }
//! Substructure {
//!   v 1 a
//!   v 2 b
//!   e 1 2 on
//! }
//! ```
//!
//! The four deviation probabilities must sum to one. `%` starts a comment.

use thiserror::Error;

use ganom_core::{Graph, Label, LabelRegistry};

/// Generator configuration failures.
#[derive(Debug, Error)]
pub enum GenError {
    /// A required section never appeared.
    #[error("{name} undefined")]
    MissingSection { name: &'static str },

    /// An unknown keyword.
    #[error("unknown token: {token}")]
    UnknownToken { token: String },

    /// A malformed operand.
    #[error("invalid {expected}: '{token}'")]
    InvalidOperand {
        expected: &'static str,
        token: String,
    },

    /// A probability outside [0, 1].
    #[error("invalid probability {value}")]
    ProbabilityRange { value: f64 },

    /// Deviation probabilities must sum to one.
    #[error("deviation probabilities sum to {sum}, expected 1")]
    ProbabilitySum { sum: f64 },

    /// Vertex or edge budget of zero.
    #[error("number of graph {what} undefined")]
    ZeroBudget { what: &'static str },

    /// A truncated list or block.
    #[error("unexpected end of input in {context}")]
    UnexpectedEnd { context: &'static str },

    /// Underlying file failure.
    #[error("cannot read parameter file: {0}")]
    Io(#[from] std::io::Error),
}

/// A label and the probability of drawing it.
#[derive(Debug, Clone)]
pub struct WeightedLabel {
    pub label: String,
    pub probability: f64,
}

/// Weight and probability of one deviation kind.
#[derive(Debug, Clone, Copy)]
pub struct DeviationKind {
    pub weight: f64,
    pub probability: f64,
}

/// Everything the generator needs for one run.
#[derive(Debug, Clone)]
pub struct GenParams {
    /// Total vertices in the final graph.
    pub vertices: usize,
    /// Total edges in the final graph.
    pub edges: usize,
    /// External connections wired per embedded instance.
    pub connectivity: usize,
    /// Fraction of the graph covered by instances.
    pub coverage: f64,
    /// Fraction of instances merged into an overlapping pair.
    pub overlap: f64,
    /// Expected deviations per instance.
    pub deviation: f64,
    /// Vertex label substitution deviation.
    pub sub_vertex_label: DeviationKind,
    /// Edge label substitution deviation.
    pub sub_edge_label: DeviationKind,
    /// Vertex deletion deviation.
    pub del_vertex: DeviationKind,
    /// Edge deletion deviation.
    pub del_edge: DeviationKind,
    /// Weight of secondary vertex deletions.
    pub del_vertex2_weight: f64,
    /// Weight of secondary edge deletions.
    pub del_edge2_weight: f64,
    /// Vertex label distribution.
    pub vertex_labels: Vec<WeightedLabel>,
    /// Edge label distribution.
    pub edge_labels: Vec<WeightedLabel>,
    /// The substructure to embed.
    pub substructure: Graph,
    /// Labels referenced by the substructure.
    pub labels: LabelRegistry,
}

/// Parses a parameter file.
pub fn parse_params(text: &str) -> Result<GenParams, GenError> {
    let tokens: Vec<String> = strip_comments(text);
    let mut i = 0;

    let mut vertices = 0usize;
    let mut edges = 0usize;
    let mut connectivity = 1usize;
    let mut coverage = 1.0;
    let mut overlap = 0.0;
    let mut deviation = 0.0;
    let mut sub_vertex_label = DeviationKind {
        weight: 1.0,
        probability: 0.25,
    };
    let mut sub_edge_label = DeviationKind {
        weight: 1.0,
        probability: 0.25,
    };
    let mut del_vertex = DeviationKind {
        weight: 1.0,
        probability: 0.10,
    };
    let mut del_edge = DeviationKind {
        weight: 1.0,
        probability: 0.40,
    };
    let mut del_vertex2_weight = 0.5;
    let mut del_edge2_weight = 0.5;
    let mut vertex_labels: Option<Vec<WeightedLabel>> = None;
    let mut edge_labels: Option<Vec<WeightedLabel>> = None;
    let mut labels = LabelRegistry::new();
    let mut substructure: Option<Graph> = None;

    while i < tokens.len() {
        let keyword = tokens[i].as_str();
        i += 1;
        match keyword {
            "Vertices" => vertices = integer(&tokens, &mut i, "vertex count")?,
            "Edges" => edges = integer(&tokens, &mut i, "edge count")?,
            "Connectivity" => connectivity = integer(&tokens, &mut i, "connectivity")?,
            "Coverage" => coverage = probability(&tokens, &mut i)?,
            "Overlap" => overlap = probability(&tokens, &mut i)?,
            "Deviation" => deviation = real(&tokens, &mut i, "deviation amount")?,
            "SubVertexLabel" => sub_vertex_label = deviation_kind(&tokens, &mut i)?,
            "SubEdgeLabel" => sub_edge_label = deviation_kind(&tokens, &mut i)?,
            "DelVertex" => del_vertex = deviation_kind(&tokens, &mut i)?,
            "DelEdge" => del_edge = deviation_kind(&tokens, &mut i)?,
            "DelVertex2" => del_vertex2_weight = real(&tokens, &mut i, "weight")?,
            "DelEdge2" => del_edge2_weight = real(&tokens, &mut i, "weight")?,
            "VertexLabels" => vertex_labels = Some(label_list(&tokens, &mut i)?),
            "EdgeLabels" => edge_labels = Some(label_list(&tokens, &mut i)?),
            "Substructure" => substructure = Some(substructure_block(&tokens, &mut i, &mut labels)?),
            other => {
                return Err(GenError::UnknownToken {
                    token: other.to_string(),
                })
            }
        }
    }

    let vertex_labels = vertex_labels.ok_or(GenError::MissingSection {
        name: "VertexLabels",
    })?;
    let edge_labels = edge_labels.ok_or(GenError::MissingSection { name: "EdgeLabels" })?;
    let substructure = substructure.ok_or(GenError::MissingSection {
        name: "Substructure",
    })?;
    if vertices == 0 {
        return Err(GenError::ZeroBudget { what: "vertices" });
    }
    if edges == 0 {
        return Err(GenError::ZeroBudget { what: "edges" });
    }
    let sum = sub_vertex_label.probability
        + sub_edge_label.probability
        + del_vertex.probability
        + del_edge.probability;
    if (sum - 1.0).abs() > 1e-6 {
        return Err(GenError::ProbabilitySum { sum });
    }

    Ok(GenParams {
        vertices,
        edges,
        connectivity,
        coverage,
        overlap,
        deviation,
        sub_vertex_label,
        sub_edge_label,
        del_vertex,
        del_edge,
        del_vertex2_weight,
        del_edge2_weight,
        vertex_labels,
        edge_labels,
        substructure,
        labels,
    })
}

fn strip_comments(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for line in text.lines() {
        let line = line.split('%').next().unwrap_or("");
        tokens.extend(line.split_whitespace().map(|t| t.to_string()));
    }
    tokens
}

fn next<'t>(
    tokens: &'t [String],
    i: &mut usize,
    context: &'static str,
) -> Result<&'t str, GenError> {
    let tok = tokens
        .get(*i)
        .ok_or(GenError::UnexpectedEnd { context })?;
    *i += 1;
    Ok(tok.as_str())
}

fn integer(tokens: &[String], i: &mut usize, expected: &'static str) -> Result<usize, GenError> {
    let tok = next(tokens, i, expected)?;
    tok.parse::<usize>().map_err(|_| GenError::InvalidOperand {
        expected,
        token: tok.to_string(),
    })
}

fn real(tokens: &[String], i: &mut usize, expected: &'static str) -> Result<f64, GenError> {
    let tok = next(tokens, i, expected)?;
    tok.parse::<f64>().map_err(|_| GenError::InvalidOperand {
        expected,
        token: tok.to_string(),
    })
}

fn probability(tokens: &[String], i: &mut usize) -> Result<f64, GenError> {
    let p = real(tokens, i, "probability")?;
    if !(0.0..=1.0).contains(&p) {
        return Err(GenError::ProbabilityRange { value: p });
    }
    Ok(p)
}

fn deviation_kind(tokens: &[String], i: &mut usize) -> Result<DeviationKind, GenError> {
    let weight = real(tokens, i, "weight")?;
    let probability = probability(tokens, i)?;
    Ok(DeviationKind {
        weight,
        probability,
    })
}

fn label_list(tokens: &[String], i: &mut usize) -> Result<Vec<WeightedLabel>, GenError> {
    let open = next(tokens, i, "label list")?;
    if open != "{" {
        return Err(GenError::InvalidOperand {
            expected: "'{' opening a label list",
            token: open.to_string(),
        });
    }
    let mut list = Vec::new();
    loop {
        let tok = next(tokens, i, "label list")?;
        if tok == "}" {
            break;
        }
        let label = tok.to_string();
        let probability = probability(tokens, i)?;
        list.push(WeightedLabel { label, probability });
    }
    if list.is_empty() {
        return Err(GenError::MissingSection { name: "label list" });
    }
    Ok(list)
}

/// Parses `{ v <n> <label> ... e <src> <dst> <label> ... }` into a graph.
fn substructure_block(
    tokens: &[String],
    i: &mut usize,
    labels: &mut LabelRegistry,
) -> Result<Graph, GenError> {
    let open = next(tokens, i, "substructure")?;
    if open != "{" {
        return Err(GenError::InvalidOperand {
            expected: "'{' opening a substructure",
            token: open.to_string(),
        });
    }
    let mut graph = Graph::new();
    loop {
        let tok = next(tokens, i, "substructure")?;
        match tok {
            "}" => break,
            "v" => {
                let number = integer(tokens, i, "vertex number")?;
                let label = next(tokens, i, "vertex label")?;
                if number != graph.vertex_count() + 1 {
                    return Err(GenError::InvalidOperand {
                        expected: "consecutive vertex number",
                        token: number.to_string(),
                    });
                }
                let id = labels.intern(Label::Str(label.to_string()));
                graph.add_vertex(id);
            }
            "e" | "d" | "u" => {
                let directed = tok == "d" || tok == "e";
                let src = integer(tokens, i, "edge source")?;
                let dst = integer(tokens, i, "edge target")?;
                let label = next(tokens, i, "edge label")?;
                if src == 0 || src > graph.vertex_count() || dst == 0 || dst > graph.vertex_count()
                {
                    return Err(GenError::InvalidOperand {
                        expected: "declared edge endpoint",
                        token: format!("{} {}", src, dst),
                    });
                }
                let id = labels.intern(Label::Str(label.to_string()));
                graph
                    .add_edge(
                        ganom_core::VertexId(src as u32 - 1),
                        ganom_core::VertexId(dst as u32 - 1),
                        id,
                        directed,
                    )
                    .expect("endpoints bounds-checked");
            }
            other => {
                return Err(GenError::UnknownToken {
                    token: other.to_string(),
                })
            }
        }
    }
    if graph.is_empty() {
        return Err(GenError::MissingSection {
            name: "Substructure",
        });
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
% sample parameters
Vertices 50
Edges 80
Connectivity 2
Coverage 0.6
Overlap 0.1
Deviation 0.5
SubVertexLabel 1.0 0.25
SubEdgeLabel 1.0 0.25
DelVertex 1.0 0.10
DelEdge 1.0 0.40
VertexLabels { a 0.5 b 0.5 }
EdgeLabels { on 1.0 }
Substructure {
  v 1 a
  v 2 b
  e 1 2 on
}
";

    #[test]
    fn parses_a_complete_file() {
        let params = parse_params(SAMPLE).unwrap();
        assert_eq!(params.vertices, 50);
        assert_eq!(params.edges, 80);
        assert_eq!(params.connectivity, 2);
        assert!((params.coverage - 0.6).abs() < 1e-12);
        assert_eq!(params.vertex_labels.len(), 2);
        assert_eq!(params.edge_labels.len(), 1);
        assert_eq!(params.substructure.vertex_count(), 2);
        assert_eq!(params.substructure.edge_count(), 1);
        assert!(params.substructure[ganom_core::EdgeId(0)].directed);
    }

    #[test]
    fn missing_sections_are_named() {
        let err = parse_params("Vertices 10\nEdges 10\n").unwrap_err();
        assert!(matches!(
            err,
            GenError::MissingSection {
                name: "VertexLabels"
            }
        ));
    }

    #[test]
    fn deviation_probabilities_must_sum_to_one() {
        let text = SAMPLE.replace("DelEdge 1.0 0.40", "DelEdge 1.0 0.10");
        let err = parse_params(&text).unwrap_err();
        assert!(matches!(err, GenError::ProbabilitySum { .. }));
    }

    #[test]
    fn zero_budgets_are_rejected() {
        let text = SAMPLE.replace("Vertices 50", "Vertices 0");
        let err = parse_params(&text).unwrap_err();
        assert!(matches!(err, GenError::ZeroBudget { what: "vertices" }));
    }

    #[test]
    fn defaults_cover_omitted_deviation_kinds() {
        let text = "\
Vertices 10
Edges 10
VertexLabels { a 1.0 }
EdgeLabels { on 1.0 }
Substructure { v 1 a }
";
        let params = parse_params(text).unwrap();
        // The built-in probabilities already sum to one.
        assert!((params.sub_vertex_label.probability - 0.25).abs() < 1e-12);
        assert!((params.del_edge.probability - 0.40).abs() < 1e-12);
        assert_eq!(params.connectivity, 1);
        assert!((params.coverage - 1.0).abs() < 1e-12);
    }
}
