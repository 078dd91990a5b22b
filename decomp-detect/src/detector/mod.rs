//! Structure detectors and the loop that runs them.

mod connected;
mod driver;
mod hypergraph;

pub use connected::ConnectedDetector;
pub use driver::{CandidateOutcome, CandidateResult, DetectorDriver, DriverRun, DriverState};
pub use hypergraph::HypergraphDetector;

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::decomposition::{Decomposition, DecompositionSink};
use crate::model::{DetectionScope, ProblemSource};

/// Result status of one detector call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionStatus {
    /// A decomposition was found.
    Success,
    /// The detector ran but found no structure.
    DidNotFind,
    /// The detector could not run.
    Error,
}

/// What a detector did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Detector name.
    pub detector: String,
    /// Result status.
    pub status: DetectionStatus,
    /// Best decomposition, until handed to a sink.
    pub decomposition: Option<Decomposition>,
    /// One entry per block count tried.
    pub candidates: Vec<CandidateResult>,
    /// Error message for [`DetectionStatus::Error`].
    pub error: Option<String>,
    /// Wall-clock time spent.
    pub elapsed: Duration,
}

impl DetectionReport {
    pub(crate) fn found(detector: &str, decomp: Decomposition, candidates: Vec<CandidateResult>, start: Instant) -> Self {
        Self {
            detector: detector.to_string(),
            status: DetectionStatus::Success,
            decomposition: Some(decomp),
            candidates,
            error: None,
            elapsed: start.elapsed(),
        }
    }

    pub(crate) fn not_found(detector: &str, candidates: Vec<CandidateResult>, start: Instant) -> Self {
        Self {
            detector: detector.to_string(),
            status: DetectionStatus::DidNotFind,
            decomposition: None,
            candidates,
            error: None,
            elapsed: start.elapsed(),
        }
    }

    pub(crate) fn failed(detector: &str, error: impl ToString, start: Instant) -> Self {
        Self {
            detector: detector.to_string(),
            status: DetectionStatus::Error,
            decomposition: None,
            candidates: Vec::new(),
            error: Some(error.to_string()),
            elapsed: start.elapsed(),
        }
    }

    /// True on success.
    pub fn is_success(&self) -> bool {
        self.status == DetectionStatus::Success
    }
}

/// A structure detector.
pub trait Detector {
    /// Short identifier, used in logs and scratch file names.
    fn name(&self) -> &str;

    /// Look for block structure in the in-scope part of `problem`.
    fn detect(&self, problem: &dyn ProblemSource, scope: &DetectionScope) -> DetectionReport;
}

/// Run every detector in order and hand each decomposition found to `sink`.
///
/// A detector ending in [`DetectionStatus::Error`] is logged and the next one
/// runs. The returned reports no longer hold their decompositions.
pub fn run_detectors(
    problem: &dyn ProblemSource,
    scope: &DetectionScope,
    detectors: &[Box<dyn Detector>],
    sink: &mut dyn DecompositionSink,
) -> Vec<DetectionReport> {
    let mut reports = Vec::with_capacity(detectors.len());
    for detector in detectors {
        let mut report = detector.detect(problem, scope);
        match report.status {
            DetectionStatus::Success => {
                log::info!(
                    "Detector {} found a decomposition in {:.2}s",
                    report.detector,
                    report.elapsed.as_secs_f64()
                );
            }
            DetectionStatus::DidNotFind => {
                log::info!("Detector {} found no structure", report.detector);
            }
            DetectionStatus::Error => {
                log::warn!(
                    "Detector {} failed: {}",
                    report.detector,
                    report.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
        if let Some(decomp) = report.decomposition.take() {
            sink.accept(decomp);
        }
        reports.push(report);
    }
    reports
}
