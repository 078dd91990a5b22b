//! Error types for structure detection.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while detecting a decomposition.
#[derive(Error, Debug)]
pub enum DetectError {
    /// Problem data is inconsistent (bad indices, mismatched lengths).
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    /// Detector settings are out of range.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// Scratch file for the partitioner could not be created.
    #[error("Failed to create temporary file ({context}): {source}")]
    TempFile {
        /// What the file was for.
        context: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Reading or writing a partitioner file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The partitioner process could not be launched.
    #[error("Failed to launch '{program}': {source}")]
    Spawn {
        /// Program that was executed.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Partition output file is truncated or contains a bad block id.
    #[error("Malformed partition file {} (line {line}): {reason}", path.display())]
    MalformedPartition {
        /// Partition file.
        path: PathBuf,
        /// 1-based line number of the offending entry.
        line: usize,
        /// Description of the defect.
        reason: String,
    },
}

impl DetectError {
    /// Returns true if the error only invalidates the current block-count
    /// candidate, so the driver may go on with the next one.
    pub fn is_candidate_local(&self) -> bool {
        matches!(self, DetectError::MalformedPartition { .. })
    }
}

/// Result type for detection operations.
pub type DetectResult<T> = Result<T, DetectError>;
