pub mod info;
pub mod mps;
pub mod phase;
pub mod prob;
pub mod report;

// Re-export commonly used types
pub use info::info_anomalies;
pub use mps::mps_anomalies;
pub use phase::SearchPhase;
pub use prob::prob_step;
pub use report::{
    flag_deviations, AnomalousInstance, AnomalyMethod, AnomalyParams, AnomalyReport,
    SCORE_EPSILON,
};
