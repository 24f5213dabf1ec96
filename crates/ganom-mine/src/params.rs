//! Discovery parameters.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::evaluate::EvalMethod;

/// Parameter violations detected before a run starts.
#[derive(Debug, Error)]
pub enum MineError {
    /// `min_vertices` exceeds `max_vertices`.
    #[error("minsize {min} exceeds maxsize {max}")]
    SizeBounds { min: usize, max: usize },

    /// Beam width must be positive.
    #[error("beam width must be positive")]
    BeamWidthZero,

    /// Top-K size must be positive.
    #[error("number of best substructures must be positive")]
    NumBestZero,

    /// Match threshold must lie in [0, 1].
    #[error("threshold {value} outside [0.0, 1.0]")]
    ThresholdRange { value: f64 },
}

/// Knobs for one discovery run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MineParams {
    /// Width of the child beam.
    pub beam_width: usize,
    /// Maximum substructures expanded; 0 means "derive from the host graph"
    /// (half its edge count).
    pub limit: usize,
    /// Largest definition (in vertices) worth expanding.
    pub max_vertices: usize,
    /// Smallest definition (in vertices) eligible for the best list.
    pub min_vertices: usize,
    /// Size of the best list (top-K).
    pub num_best_subs: usize,
    /// Inexact-match admission threshold, as a fraction of definition size.
    pub threshold: f64,
    /// Drop children that do not improve on their parent's value.
    pub prune: bool,
    /// Trim the beam by distinct values rather than by count.
    pub value_based: bool,
    /// Allow instances of one substructure to share vertices.
    pub allow_overlap: bool,
    /// Evaluation method.
    pub eval: EvalMethod,
}

impl Default for MineParams {
    fn default() -> Self {
        MineParams {
            beam_width: 4,
            limit: 0,
            max_vertices: usize::MAX,
            min_vertices: 1,
            num_best_subs: 3,
            threshold: 0.0,
            prune: false,
            value_based: false,
            allow_overlap: false,
            eval: EvalMethod::Mdl,
        }
    }
}

impl MineParams {
    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), MineError> {
        if self.min_vertices > self.max_vertices {
            return Err(MineError::SizeBounds {
                min: self.min_vertices,
                max: self.max_vertices,
            });
        }
        if self.beam_width == 0 {
            return Err(MineError::BeamWidthZero);
        }
        if self.num_best_subs == 0 {
            return Err(MineError::NumBestZero);
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(MineError::ThresholdRange {
                value: self.threshold,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(MineParams::default().validate().is_ok());
    }

    #[test]
    fn min_over_max_is_rejected() {
        let params = MineParams {
            min_vertices: 5,
            max_vertices: 3,
            ..MineParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(MineError::SizeBounds { min: 5, max: 3 })
        ));
    }

    #[test]
    fn threshold_outside_unit_interval_is_rejected() {
        let params = MineParams {
            threshold: 1.5,
            ..MineParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(MineError::ThresholdRange { .. })
        ));
    }
}
