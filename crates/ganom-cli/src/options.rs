//! Command-line options and their cross-validation.

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use ganom_anomaly::{AnomalyMethod, AnomalyParams};
use ganom_mine::{EvalMethod, MineError, MineParams};

/// Option misuse detected after clap parsing.
#[derive(Debug, Error)]
pub enum OptionError {
    /// `--eval` outside 1..=3.
    #[error("--eval must be 1 (MDL), 2 (SIZE) or 3 (SETCOVER), got {value}")]
    Eval { value: u32 },

    /// `--output` outside 1..=5.
    #[error("--output must be between 1 and 5, got {value}")]
    Output { value: u32 },

    /// More than one anomaly algorithm selected.
    #[error("--mdl, --mps and --prob are mutually exclusive")]
    ExclusiveMethods,

    /// `--prob` below the two iterations it needs.
    #[error("--prob requires at least 2 iterations, got {value}")]
    ProbIterations { value: usize },

    /// `--norm` is 1-based.
    #[error("--norm must be at least 1")]
    NormZero,

    /// Anomaly threshold outside [0, 1].
    #[error("anomaly threshold {value} outside [0.0, 1.0]")]
    AnomalyThreshold { value: f64 },

    /// Discovery parameter violation.
    #[error(transparent)]
    Mine(#[from] MineError),
}

/// Graph-based anomaly detection.
///
/// Discovers the normative substructure of a labeled graph and reports the
/// instances that deviate slightly from it.
#[derive(Debug, Parser)]
#[command(name = "ganom", about = "Graph-based anomaly detection")]
pub struct Cli {
    /// Input graph file.
    pub graph: PathBuf,

    /// Beam width of the discovery search.
    #[arg(long, default_value_t = 4)]
    pub beam: usize,

    /// Write the compressed graph to `<input>.cmp`.
    #[arg(long)]
    pub compress: bool,

    /// Evaluation method: 1 = MDL, 2 = SIZE, 3 = SETCOVER.
    #[arg(long, default_value_t = 1)]
    pub eval: u32,

    /// Discover/compress iterations; 0 means until nothing compresses.
    #[arg(long, default_value_t = 1)]
    pub iterations: usize,

    /// Maximum substructures expanded per discovery (default: half the edge
    /// count).
    #[arg(long)]
    pub limit: Option<usize>,

    /// Largest substructure size (vertices) considered.
    #[arg(long)]
    pub maxsize: Option<usize>,

    /// Smallest substructure size (vertices) reported.
    #[arg(long, default_value_t = 1)]
    pub minsize: usize,

    /// How many best substructures to keep per discovery.
    #[arg(long, default_value_t = 3)]
    pub nsubs: usize,

    /// Write machine-readable discoveries to this file.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Report verbosity, 1 (quiet) to 5 (everything).
    #[arg(long, default_value_t = 1)]
    pub output: u32,

    /// Allow instances of one substructure to share vertices.
    #[arg(long)]
    pub overlap: bool,

    /// Prune children that do not improve on their parent.
    #[arg(long)]
    pub prune: bool,

    /// File of predefined substructures to compress away first.
    #[arg(long)]
    pub ps: Option<PathBuf>,

    /// Inexact-match threshold for discovery grouping, 0.0 to 1.0.
    #[arg(long, default_value_t = 0.0)]
    pub threshold: f64,

    /// Treat `e` edges as undirected.
    #[arg(long)]
    pub undirected: bool,

    /// Trim the beam by distinct values instead of entry count.
    #[arg(long)]
    pub valuebased: bool,

    /// Information-theoretic anomaly detection with this match threshold.
    #[arg(long, value_name = "THRESHOLD")]
    pub mdl: Option<f64>,

    /// Probabilistic anomaly detection with this many iterations (>= 2).
    #[arg(long, value_name = "ITERATIONS")]
    pub prob: Option<usize>,

    /// Maximum-partial-substructure anomaly detection with this threshold.
    #[arg(long, value_name = "THRESHOLD")]
    pub mps: Option<f64>,

    /// Upper bound on reported anomaly scores.
    #[arg(long = "max-anomalous-score")]
    pub max_anomalous_score: Option<f64>,

    /// Lower bound on reported anomaly scores.
    #[arg(long = "min-anomalous-score")]
    pub min_anomalous_score: Option<f64>,

    /// Which best substructure is the normative pattern (1-based).
    #[arg(long, default_value_t = 1)]
    pub norm: usize,

    /// Disable the per-vertex extension skip in the MPS search.
    #[arg(long = "no-opt")]
    pub no_opt: bool,

    /// Write a Graphviz rendering of the final graph to this file.
    #[arg(long)]
    pub dot: Option<PathBuf>,
}

/// Validated run configuration assembled from the CLI options.
#[derive(Debug)]
pub struct RunConfig {
    pub mine: MineParams,
    pub anomaly: AnomalyParams,
    pub method: Option<AnomalyMethod>,
    pub iterations: usize,
    pub norm: usize,
    pub output: u32,
    /// The `.cmp` file was requested, so the final graph must be compressed.
    pub compress_output: bool,
}

impl Cli {
    /// Cross-validates the options into a runnable configuration.
    pub fn to_config(&self) -> Result<RunConfig, OptionError> {
        let eval = match self.eval {
            1 => EvalMethod::Mdl,
            2 => EvalMethod::Size,
            3 => EvalMethod::SetCover,
            value => return Err(OptionError::Eval { value }),
        };
        if !(1..=5).contains(&self.output) {
            return Err(OptionError::Output { value: self.output });
        }
        if self.norm == 0 {
            return Err(OptionError::NormZero);
        }

        let selected =
            usize::from(self.mdl.is_some()) + usize::from(self.mps.is_some()) + usize::from(self.prob.is_some());
        if selected > 1 {
            return Err(OptionError::ExclusiveMethods);
        }

        let mut iterations = self.iterations;
        let mut max_score = self.max_anomalous_score.unwrap_or(f64::INFINITY);
        let mut anomaly_threshold = 0.0;
        let method = if let Some(t) = self.mdl {
            anomaly_threshold = t;
            Some(AnomalyMethod::InfoTheoretic)
        } else if let Some(t) = self.mps {
            anomaly_threshold = t;
            Some(AnomalyMethod::Mps)
        } else if let Some(n) = self.prob {
            if n < 2 {
                return Err(OptionError::ProbIterations { value: n });
            }
            // The probabilistic score is a ratio in (0, 1].
            iterations = n;
            max_score = 1.0;
            Some(AnomalyMethod::Probabilistic)
        } else {
            None
        };
        if !(0.0..=1.0).contains(&anomaly_threshold) {
            return Err(OptionError::AnomalyThreshold {
                value: anomaly_threshold,
            });
        }

        let mine = MineParams {
            beam_width: self.beam,
            limit: self.limit.unwrap_or(0),
            max_vertices: self.maxsize.unwrap_or(usize::MAX),
            min_vertices: self.minsize,
            num_best_subs: self.nsubs,
            threshold: self.threshold,
            prune: self.prune,
            value_based: self.valuebased,
            allow_overlap: self.overlap,
            eval,
        };
        mine.validate()?;

        let anomaly = AnomalyParams {
            threshold: anomaly_threshold,
            max_score,
            min_score: self.min_anomalous_score.unwrap_or(0.0),
            optimize: !self.no_opt,
        };

        Ok(RunConfig {
            mine,
            anomaly,
            method,
            iterations,
            norm: self.norm,
            output: self.output,
            compress_output: self.compress,
        })
    }
}
