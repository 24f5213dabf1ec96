pub mod display;
pub mod dot;
pub mod parse;
pub mod write;

// Re-export commonly used types
pub use display::{format_graph, format_normative, format_report, format_substructure};
pub use dot::{to_dot_file_string, to_dot_string};
pub use parse::{parse, parse_positive, read_graph_file, ParseError, ParsedInput};
pub use write::{
    format_label, write_discoveries, write_graph, write_graph_json, write_substructure,
};
