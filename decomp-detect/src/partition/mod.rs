//! Hypergraph partitioning interface.
//!
//! The detectors only see [`HypergraphPartitioner`]; the external hMETIS
//! adapter is one implementation of it.

mod hmetis;

pub use hmetis::{
    num_dummy_vertices, partition_file_path, read_partition, write_input, HmetisCommand,
    HmetisPartitioner,
};

use std::time::{Duration, Instant};

use crate::error::{DetectError, DetectResult};
use crate::hypergraph::Hypergraph;
use crate::settings::DetectorSettings;

/// Block index per hypergraph vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionAssignment {
    nblocks: usize,
    blocks: Vec<usize>,
}

impl PartitionAssignment {
    /// Wrap raw block ids, checking that each lies in `[0, nblocks)`.
    pub fn new(nblocks: usize, blocks: Vec<usize>) -> DetectResult<Self> {
        if let Some((v, &b)) = blocks.iter().enumerate().find(|(_, &b)| b >= nblocks) {
            return Err(DetectError::InvalidProblem(format!(
                "vertex {} assigned to block {} but only {} blocks exist",
                v, b, nblocks
            )));
        }
        Ok(Self { nblocks, blocks })
    }

    /// Number of blocks requested.
    pub fn nblocks(&self) -> usize {
        self.nblocks
    }

    /// Block of a vertex.
    pub fn block_of(&self, vertex: usize) -> usize {
        self.blocks[vertex]
    }

    /// All block ids in vertex order.
    pub fn as_slice(&self) -> &[usize] {
        &self.blocks
    }

    /// Number of vertices covered.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// True if no vertex is covered.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of vertices per block.
    pub fn block_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.nblocks];
        for &b in &self.blocks {
            sizes[b] += 1;
        }
        sizes
    }
}

/// Result of one partitioning attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionOutcome {
    /// The partitioner produced an assignment.
    Partitioned(PartitionAssignment),

    /// The partitioner ran but reported failure; try another block count.
    Failed {
        /// Human-readable cause.
        reason: String,
    },

    /// No time was left, nothing was started.
    NotRun,
}

/// Wall-clock budget shared by all candidates of one detection run.
#[derive(Debug, Clone, Copy)]
pub struct TimeBudget {
    deadline: Option<Instant>,
}

impl TimeBudget {
    /// No limit.
    pub fn unlimited() -> Self {
        Self { deadline: None }
    }

    /// Budget ending `limit` from now (None = unlimited).
    ///
    /// A deadline past what `Instant` can represent is treated as no limit.
    pub fn starting_now(limit: Option<Duration>) -> Self {
        Self {
            deadline: limit.and_then(|d| Instant::now().checked_add(d)),
        }
    }

    /// Time left, None when unlimited.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// True if a limit exists and has run out.
    pub fn is_exhausted(&self) -> bool {
        self.remaining().map_or(false, |r| r.is_zero())
    }
}

/// Per-call information handed to a partitioner.
#[derive(Debug, Clone, Copy)]
pub struct PartitionContext<'a> {
    /// Detector settings.
    pub settings: &'a DetectorSettings,
    /// Remaining time.
    pub budget: TimeBudget,
    /// Problem and detector label used to name scratch files.
    pub label: &'a str,
}

/// Splits a hypergraph into a fixed number of balanced blocks.
pub trait HypergraphPartitioner {
    /// Name for logs.
    fn name(&self) -> &str;

    /// Partition `graph` into `nblocks` blocks.
    ///
    /// Tool failures are reported as [`PartitionOutcome::Failed`]; an `Err`
    /// means the partitioner could not be driven at all (I/O, launch) or
    /// produced unreadable output.
    fn partition(
        &self,
        graph: &Hypergraph,
        nblocks: usize,
        ctx: &PartitionContext<'_>,
    ) -> DetectResult<PartitionOutcome>;
}
