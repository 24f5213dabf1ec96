pub mod generate;
pub mod params;

// Re-export commonly used types
pub use generate::{generate, write_instances, Deviation, EmbeddedInstance, Generated};
pub use params::{parse_params, DeviationKind, GenError, GenParams, WeightedLabel};
