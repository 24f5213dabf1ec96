//! Core error types for ganom-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering
//! the failure modes of the graph data model.

use crate::id::{EdgeId, LabelId, VertexId};
use thiserror::Error;

/// Which endpoint of an edge a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointRole {
    /// The `v1` endpoint.
    Source,
    /// The `v2` endpoint.
    Target,
}

impl std::fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointRole::Source => write!(f, "source"),
            EndpointRole::Target => write!(f, "target"),
        }
    }
}

/// Core errors produced by the ganom-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An edge was added with an endpoint outside the vertex array.
    #[error("edge references nonexistent {role} vertex {vertex} (graph has {vertex_count} vertices)")]
    EndpointOutOfRange {
        role: EndpointRole,
        vertex: VertexId,
        vertex_count: usize,
    },

    /// A vertex index was not found in the graph.
    #[error("vertex not found: VertexId({id})", id = id.0)]
    VertexNotFound { id: VertexId },

    /// An edge index was not found in the graph.
    #[error("edge not found: EdgeId({id})", id = id.0)]
    EdgeNotFound { id: EdgeId },

    /// A label id was not found in the registry.
    #[error("label not found: LabelId({id})", id = id.0)]
    LabelNotFound { id: LabelId },
}
