pub mod compress;
pub mod discover;
pub mod evaluate;
pub mod extend;
pub mod matcher;
pub mod params;
pub mod search;

// Re-export commonly used types
pub use compress::{compress, size_of_compressed_graph};
pub use discover::{discover, Mode, SubstructureList, VALUE_EPSILON};
pub use evaluate::{lg, mdl, EvalMethod, Evaluator, LgFactTable};
pub use extend::{extend_substructure, ExtendOptions};
pub use matcher::{
    graphs_match_exactly, inexact_match, match_cost, MapTarget, MatchCosts, MatchResult, Matcher,
    SEARCH_CEILING_EXPONENT,
};
pub use params::{MineError, MineParams};
pub use search::{find_exact_instances, find_instances, seed_labels, FoundInstance};
