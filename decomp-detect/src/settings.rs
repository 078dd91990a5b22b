//! Configuration settings for the structure detectors.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DetectError, DetectResult};

/// Partitioning scheme requested from the external partitioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PartitionAlgorithm {
    /// Recursive bisection.
    #[default]
    Rb,

    /// Direct k-way partitioning.
    Kway,
}

impl PartitionAlgorithm {
    /// Value passed to `-ptype`.
    pub fn as_arg(&self) -> &'static str {
        match self {
            PartitionAlgorithm::Rb => "rb",
            PartitionAlgorithm::Kway => "kway",
        }
    }
}

/// Hyperedge weights for variables, by variable type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VarWeights {
    /// Binary variables.
    pub binary: u32,
    /// General integer variables.
    pub integer: u32,
    /// Implied integer variables.
    pub implied_integer: u32,
    /// Continuous variables.
    pub continuous: u32,
}

impl Default for VarWeights {
    fn default() -> Self {
        Self {
            binary: 2,
            integer: 2,
            implied_integer: 2,
            continuous: 1,
        }
    }
}

/// Hyperedge weights for constraints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsWeights {
    /// Base weight of a generic constraint.
    pub generic: u32,

    /// Fixed weight of set partitioning, covering, packing and logical-or rows.
    pub set_type: u32,

    /// Bonus factor applied to the standard deviation of a generic row's
    /// nonzero coefficients.
    pub alpha: f64,

    /// Fraction of the generic weight given to equalities; inequalities get
    /// `1 - beta`. 0.5 leaves the weight unchanged.
    pub beta: f64,
}

impl Default for ConsWeights {
    fn default() -> Self {
        Self {
            generic: 5,
            set_type: 10,
            alpha: 0.0,
            beta: 0.5,
        }
    }
}

/// Detector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorSettings {
    // === Block counts ===
    /// Smallest block count to try.
    pub min_blocks: usize,

    /// Largest block count to try.
    pub max_blocks: usize,

    // === Hypergraph weights ===
    /// Variable hyperedge weights.
    pub var_weights: VarWeights,

    /// Constraint hyperedge weights.
    pub cons_weights: ConsWeights,

    // === Partitioner ===
    /// Fraction of the vertex count added as isolated dummy vertices.
    pub dummy_fraction: f64,

    /// Unbalance factor (`-ufactor`).
    pub ubfactor: f64,

    /// Random seed handed to the partitioner.
    pub seed: u64,

    /// Recursive bisection or k-way.
    pub algorithm: PartitionAlgorithm,

    /// Path or name of the partitioner executable.
    pub partitioner_binary: PathBuf,

    /// Directory for scratch files (None = system temp dir).
    pub temp_dir: Option<PathBuf>,

    /// Delete partitioner input and output files after reading.
    pub tidy: bool,

    /// Wrap the partitioner in `timeout` when a time limit is set.
    pub use_timeout_wrapper: bool,

    // === Termination ===
    /// Wall-clock budget for the whole detection run (None = unlimited).
    pub time_limit: Option<Duration>,

    // === Output ===
    /// Log progress information.
    pub verbose: bool,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            // Block counts
            min_blocks: 2,
            max_blocks: 20,

            // Weights
            var_weights: VarWeights::default(),
            cons_weights: ConsWeights::default(),

            // Partitioner
            dummy_fraction: 0.2,
            ubfactor: 5.0,
            seed: 1,
            algorithm: PartitionAlgorithm::default(),
            partitioner_binary: PathBuf::from("hmetis"),
            temp_dir: None,
            tidy: true,
            use_timeout_wrapper: true,

            // Termination
            time_limit: None,

            // Output
            verbose: false,
        }
    }
}

impl DetectorSettings {
    /// Create settings with verbose output enabled.
    pub fn verbose() -> Self {
        let mut s = Self::default();
        s.verbose = true;
        s
    }

    /// Try every block count in `[min, max]`.
    pub fn with_block_range(mut self, min: usize, max: usize) -> Self {
        self.min_blocks = min;
        self.max_blocks = max;
        self
    }

    /// Try a single block count.
    pub fn with_blocks(self, nblocks: usize) -> Self {
        self.with_block_range(nblocks, nblocks)
    }

    /// Set time limit in seconds.
    ///
    /// Negative values mean no time at all; infinite or unrepresentable
    /// values mean no limit.
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Duration::try_from_secs_f64(seconds.max(0.0)).ok();
        self
    }

    /// Set the partitioner executable.
    pub fn with_partitioner(mut self, binary: impl Into<PathBuf>) -> Self {
        self.partitioner_binary = binary.into();
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Keep partitioner files for inspection.
    pub fn keep_files(mut self) -> Self {
        self.tidy = false;
        self
    }

    /// True when only one block count is tested.
    pub fn single_block_count(&self) -> bool {
        self.min_blocks == self.max_blocks
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> DetectResult<()> {
        if self.min_blocks < 2 {
            return Err(DetectError::InvalidSettings(format!(
                "min_blocks must be at least 2, got {}",
                self.min_blocks
            )));
        }
        if self.max_blocks < self.min_blocks {
            return Err(DetectError::InvalidSettings(format!(
                "max_blocks ({}) is smaller than min_blocks ({})",
                self.max_blocks, self.min_blocks
            )));
        }
        if !(0.0..=1.0).contains(&self.dummy_fraction) {
            return Err(DetectError::InvalidSettings(format!(
                "dummy_fraction must lie in [0, 1], got {}",
                self.dummy_fraction
            )));
        }
        if !(0.0..=1.0).contains(&self.cons_weights.beta) {
            return Err(DetectError::InvalidSettings(format!(
                "beta must lie in [0, 1], got {}",
                self.cons_weights.beta
            )));
        }
        if self.cons_weights.alpha < 0.0 || !self.cons_weights.alpha.is_finite() {
            return Err(DetectError::InvalidSettings(format!(
                "alpha must be finite and non-negative, got {}",
                self.cons_weights.alpha
            )));
        }
        if self.ubfactor <= 0.0 || !self.ubfactor.is_finite() {
            return Err(DetectError::InvalidSettings(format!(
                "ubfactor must be positive, got {}",
                self.ubfactor
            )));
        }
        Ok(())
    }
}
