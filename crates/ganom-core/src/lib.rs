pub mod error;
pub mod graph;
pub mod id;
pub mod instance;
pub mod label;
pub mod substructure;

// Re-export commonly used types
pub use error::{CoreError, EndpointRole};
pub use graph::{Edge, Graph, Vertex};
pub use id::{EdgeId, LabelId, VertexId};
pub use instance::{Instance, UNMAPPED};
pub use label::{Label, LabelRegistry};
pub use substructure::Substructure;
