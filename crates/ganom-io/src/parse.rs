//! Parser for the line-oriented graph grammar.
//!
//! The grammar is ASCII and whitespace separated:
//!
//! ```text
//! % a comment runs to end of line
//! XP                % begins a new positive example
//! v 1 node          % vertex 1 with string label "node"
//! v 2 2.5           % vertex 2 with numeric label 2.5
//! e 1 2 links       % edge; directed iff the run is configured directed
//! d 1 2 links       % always directed
//! u 1 2 links       % always undirected
//! PS                % begins a predefined substructure
//! ```
//!
//! Vertex numbers are 1-based and consecutive within their example. Labels
//! are barewords, quoted strings, or numbers; quoted labels are always
//! strings.

use std::path::Path;

use thiserror::Error;
use tracing::debug;

use ganom_core::{Graph, Label, LabelRegistry, VertexId};

/// Parse failures, each carrying the offending line number.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A token that is not a directive where one was expected.
    #[error("line {line}: unexpected token '{token}'")]
    UnexpectedToken { line: usize, token: String },

    /// A directive ended before all its operands appeared.
    #[error("line {line}: missing {expected}")]
    MissingToken { line: usize, expected: &'static str },

    /// An operand that should have been a number.
    #[error("line {line}: invalid number '{token}'")]
    InvalidNumber { line: usize, token: String },

    /// Vertex numbers must be 1-based and consecutive within an example.
    #[error("line {line}: vertex number {found} out of order (expected {expected})")]
    VertexNumber {
        line: usize,
        expected: u32,
        found: u32,
    },

    /// An edge endpoint referencing an undeclared vertex.
    #[error("line {line}: edge references undeclared vertex {vertex}")]
    UnknownVertex { line: usize, vertex: u32 },

    /// The input declared no positive examples.
    #[error("input graph contains no positive examples")]
    EmptyGraph,

    /// Underlying file read failure.
    #[error("cannot read graph file: {0}")]
    Io(#[from] std::io::Error),
}

/// The result of parsing one input file.
#[derive(Debug, Default)]
pub struct ParsedInput {
    /// All positive examples merged into one host graph; vertices carry
    /// their example index and 1-based number.
    pub graph: Graph,
    /// Predefined substructures, in file order.
    pub predefined: Vec<Graph>,
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    text: String,
    quoted: bool,
    line: usize,
}

/// Parses graph text. `e` edges are directed iff `e_directed`.
pub fn parse(
    text: &str,
    labels: &mut LabelRegistry,
    e_directed: bool,
) -> Result<ParsedInput, ParseError> {
    let tokens = tokenize(text);
    let mut parsed = ParsedInput::default();

    // Where new elements go: the host graph (current example) or the
    // predefined substructure being collected.
    enum Target {
        Example { index: u32, offset: usize, count: u32 },
        Predefined { graph: Graph, count: u32 },
    }
    let mut target: Option<Target> = None;
    let mut next_example: u32 = 0;

    let mut i = 0;
    while i < tokens.len() {
        let tok = &tokens[i];
        let line = tok.line;
        match tok.text.as_str() {
            "XP" if !tok.quoted => {
                if let Some(Target::Predefined { graph, .. }) = target.take() {
                    parsed.predefined.push(graph);
                }
                target = Some(Target::Example {
                    index: next_example,
                    offset: parsed.graph.vertex_count(),
                    count: 0,
                });
                next_example += 1;
                i += 1;
            }
            "PS" if !tok.quoted => {
                if let Some(Target::Predefined { graph, .. }) = target.take() {
                    parsed.predefined.push(graph);
                }
                target = Some(Target::Predefined {
                    graph: Graph::new(),
                    count: 0,
                });
                i += 1;
            }
            "v" if !tok.quoted => {
                let number = number_operand(&tokens, i + 1, line, "vertex number")?;
                let label_tok = operand(&tokens, i + 2, line, "vertex label")?;
                let label = labels.intern(token_label(label_tok));
                i += 3;

                // A vertex before any XP/PS opens example 0 implicitly.
                let t = target.get_or_insert_with(|| {
                    next_example += 1;
                    Target::Example {
                        index: 0,
                        offset: 0,
                        count: 0,
                    }
                });
                match t {
                    Target::Example { index, count, .. } => {
                        if number != *count + 1 {
                            return Err(ParseError::VertexNumber {
                                line,
                                expected: *count + 1,
                                found: number,
                            });
                        }
                        *count += 1;
                        let v = parsed.graph.add_vertex(label);
                        let vertex = parsed.graph.vertex_mut(v).expect("just added");
                        vertex.source_vertex = number;
                        vertex.source_example = *index;
                        vertex.original_index = v.0;
                    }
                    Target::Predefined { graph, count } => {
                        if number != *count + 1 {
                            return Err(ParseError::VertexNumber {
                                line,
                                expected: *count + 1,
                                found: number,
                            });
                        }
                        *count += 1;
                        let v = graph.add_vertex(label);
                        graph.vertex_mut(v).expect("just added").source_vertex = number;
                    }
                }
            }
            "e" | "d" | "u" if !tok.quoted => {
                let directed = match tok.text.as_str() {
                    "d" => true,
                    "u" => false,
                    _ => e_directed,
                };
                let src = number_operand(&tokens, i + 1, line, "edge source")?;
                let dst = number_operand(&tokens, i + 2, line, "edge target")?;
                let label_tok = operand(&tokens, i + 3, line, "edge label")?;
                let label = labels.intern(token_label(label_tok));
                i += 4;

                match target.as_mut() {
                    Some(Target::Example { offset, count, .. }) => {
                        let v1 = resolve(src, *offset, *count, line)?;
                        let v2 = resolve(dst, *offset, *count, line)?;
                        parsed
                            .graph
                            .add_edge(v1, v2, label, directed)
                            .expect("endpoints checked against example bounds");
                    }
                    Some(Target::Predefined { graph, count }) => {
                        let v1 = resolve(src, 0, *count, line)?;
                        let v2 = resolve(dst, 0, *count, line)?;
                        graph
                            .add_edge(v1, v2, label, directed)
                            .expect("endpoints checked against substructure bounds");
                    }
                    None => return Err(ParseError::UnknownVertex { line, vertex: src }),
                }
            }
            _ => {
                return Err(ParseError::UnexpectedToken {
                    line,
                    token: tok.text.clone(),
                })
            }
        }
    }
    if let Some(Target::Predefined { graph, .. }) = target {
        parsed.predefined.push(graph);
    }

    parsed.graph.debug_assert_adjacency();
    debug!(
        vertices = parsed.graph.vertex_count(),
        edges = parsed.graph.edge_count(),
        examples = parsed.graph.example_count(),
        predefined = parsed.predefined.len(),
        "parsed graph input"
    );
    Ok(parsed)
}

/// Parses text that must contain at least one positive-example vertex.
pub fn parse_positive(
    text: &str,
    labels: &mut LabelRegistry,
    e_directed: bool,
) -> Result<ParsedInput, ParseError> {
    let parsed = parse(text, labels, e_directed)?;
    if parsed.graph.is_empty() {
        return Err(ParseError::EmptyGraph);
    }
    Ok(parsed)
}

/// Reads and parses a graph file from disk.
pub fn read_graph_file(
    path: &Path,
    labels: &mut LabelRegistry,
    e_directed: bool,
) -> Result<ParsedInput, ParseError> {
    let text = std::fs::read_to_string(path)?;
    parse_positive(&text, labels, e_directed)
}

fn resolve(number: u32, offset: usize, count: u32, line: usize) -> Result<VertexId, ParseError> {
    if number == 0 || number > count {
        return Err(ParseError::UnknownVertex {
            line,
            vertex: number,
        });
    }
    Ok(VertexId(offset as u32 + number - 1))
}

fn operand<'t>(
    tokens: &'t [Token],
    index: usize,
    line: usize,
    expected: &'static str,
) -> Result<&'t Token, ParseError> {
    tokens
        .get(index)
        .filter(|t| t.line == line)
        .ok_or(ParseError::MissingToken { line, expected })
}

fn number_operand(
    tokens: &[Token],
    index: usize,
    line: usize,
    expected: &'static str,
) -> Result<u32, ParseError> {
    let tok = operand(tokens, index, line, expected)?;
    tok.text.parse::<u32>().map_err(|_| ParseError::InvalidNumber {
        line,
        token: tok.text.clone(),
    })
}

/// A quoted token is always a string label; a bareword that parses as a
/// double is numeric.
fn token_label(tok: &Token) -> Label {
    if tok.quoted {
        return Label::Str(tok.text.clone());
    }
    match tok.text.parse::<f64>() {
        Ok(n) if n.is_finite() => Label::Num(n),
        _ => Label::Str(tok.text.clone()),
    }
}

/// Splits input into whitespace-separated tokens, honoring `"` quoting and
/// `%` comments (quotes suppress both).
fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    for (line_idx, line) in text.lines().enumerate() {
        let line_no = line_idx + 1;
        let mut chars = line.chars().peekable();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                chars.next();
            } else if c == '%' {
                break;
            } else if c == '"' {
                chars.next();
                let mut text = String::new();
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                    text.push(c);
                }
                tokens.push(Token {
                    text,
                    quoted: true,
                    line: line_no,
                });
            } else {
                let mut text = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || c == '%' || c == '"' {
                        break;
                    }
                    text.push(c);
                    chars.next();
                }
                tokens.push(Token {
                    text,
                    quoted: false,
                    line: line_no,
                });
            }
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use ganom_core::EdgeId;

    #[test]
    fn parses_examples_and_vertex_provenance() {
        let text = "\
% two examples
XP
v 1 a
v 2 b
e 1 2 on
XP
v 1 a
v 2 b
d 2 1 on
";
        let mut labels = LabelRegistry::new();
        let parsed = parse_positive(text, &mut labels, false).unwrap();

        assert_eq!(parsed.graph.vertex_count(), 4);
        assert_eq!(parsed.graph.edge_count(), 2);
        assert_eq!(parsed.graph.example_count(), 2);

        let v2 = &parsed.graph[VertexId(2)];
        assert_eq!(v2.source_example, 1);
        assert_eq!(v2.source_vertex, 1);

        // `e` was undirected here; `d` is always directed.
        assert!(!parsed.graph[EdgeId(0)].directed);
        let e1 = &parsed.graph[EdgeId(1)];
        assert!(e1.directed);
        assert_eq!(e1.v1, VertexId(3));
        assert_eq!(e1.v2, VertexId(2));
    }

    #[test]
    fn e_respects_the_directed_configuration() {
        let text = "XP\nv 1 a\nv 2 a\ne 1 2 on\n";
        let mut labels = LabelRegistry::new();
        let parsed = parse_positive(text, &mut labels, true).unwrap();
        assert!(parsed.graph[EdgeId(0)].directed);
    }

    #[test]
    fn quoted_and_numeric_labels() {
        let text = "XP\nv 1 \"a label with spaces\"\nv 2 2.5\nv 3 17\nu 1 2 \"5\"\n";
        let mut labels = LabelRegistry::new();
        let parsed = parse_positive(text, &mut labels, false).unwrap();

        assert_eq!(
            labels.get(parsed.graph[VertexId(0)].label),
            Some(&Label::Str("a label with spaces".into()))
        );
        assert_eq!(
            labels.get(parsed.graph[VertexId(1)].label),
            Some(&Label::Num(2.5))
        );
        assert_eq!(
            labels.get(parsed.graph[VertexId(2)].label),
            Some(&Label::Num(17.0))
        );
        // The quoted "5" stays a string, distinct from numeric 5.
        assert_eq!(
            labels.get(parsed.graph[EdgeId(0)].label),
            Some(&Label::Str("5".into()))
        );
    }

    #[test]
    fn predefined_substructures_are_collected_separately() {
        let text = "\
XP
v 1 a
v 2 b
u 1 2 on
PS
v 1 a
v 2 b
u 1 2 on
PS
v 1 c
";
        let mut labels = LabelRegistry::new();
        let parsed = parse_positive(text, &mut labels, false).unwrap();

        assert_eq!(parsed.graph.vertex_count(), 2);
        assert_eq!(parsed.predefined.len(), 2);
        assert_eq!(parsed.predefined[0].vertex_count(), 2);
        assert_eq!(parsed.predefined[0].edge_count(), 1);
        assert_eq!(parsed.predefined[1].vertex_count(), 1);
    }

    #[test]
    fn out_of_order_vertex_number_is_rejected() {
        let text = "XP\nv 1 a\nv 3 b\n";
        let mut labels = LabelRegistry::new();
        let err = parse(text, &mut labels, false).unwrap_err();
        assert!(matches!(
            err,
            ParseError::VertexNumber {
                line: 3,
                expected: 2,
                found: 3
            }
        ));
    }

    #[test]
    fn edge_to_undeclared_vertex_is_rejected() {
        let text = "XP\nv 1 a\nu 1 2 on\n";
        let mut labels = LabelRegistry::new();
        let err = parse(text, &mut labels, false).unwrap_err();
        assert!(matches!(err, ParseError::UnknownVertex { vertex: 2, .. }));
    }

    #[test]
    fn empty_input_is_a_specific_error() {
        let mut labels = LabelRegistry::new();
        let err = parse_positive("% nothing here\n", &mut labels, false).unwrap_err();
        assert!(matches!(err, ParseError::EmptyGraph));
        assert_eq!(
            err.to_string(),
            "input graph contains no positive examples"
        );
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let text = "\n% leading comment\nXP % trailing\nv 1 a % another\n\n";
        let mut labels = LabelRegistry::new();
        let parsed = parse_positive(text, &mut labels, false).unwrap();
        assert_eq!(parsed.graph.vertex_count(), 1);
    }

    #[test]
    fn garbage_token_is_reported_with_its_line() {
        let text = "XP\nv 1 a\nwhat 1 2\n";
        let mut labels = LabelRegistry::new();
        let err = parse(text, &mut labels, false).unwrap_err();
        match err {
            ParseError::UnexpectedToken { line, token } => {
                assert_eq!(line, 3);
                assert_eq!(token, "what");
            }
            other => panic!("expected UnexpectedToken, got {other:?}"),
        }
    }
}
