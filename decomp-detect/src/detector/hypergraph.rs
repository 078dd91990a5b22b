//! Hypergraph partitioning detectors.

use std::time::Instant;

use super::{DetectionReport, Detector, DetectorDriver};
use crate::hypergraph::HypergraphKind;
use crate::model::{DetectionScope, ProblemSource, ProblemView};
use crate::partition::{HmetisPartitioner, HypergraphPartitioner};
use crate::settings::DetectorSettings;

/// Partitioning-based detector for one hypergraph encoding.
///
/// - `hrgpartition`: row hypergraph, linking constraints
/// - `hcgpartition`: column hypergraph, linking variables
/// - `hrcgpartition`: row-column hypergraph, arrowhead structure
pub struct HypergraphDetector {
    kind: HypergraphKind,
    settings: DetectorSettings,
    partitioner: Box<dyn HypergraphPartitioner>,
}

impl HypergraphDetector {
    /// Detector for `kind`, partitioning with hMETIS.
    pub fn new(kind: HypergraphKind, settings: DetectorSettings) -> Self {
        Self {
            kind,
            settings,
            partitioner: Box::new(HmetisPartitioner::new()),
        }
    }

    /// `hrgpartition`.
    pub fn rows(settings: DetectorSettings) -> Self {
        Self::new(HypergraphKind::Row, settings)
    }

    /// `hcgpartition`.
    pub fn columns(settings: DetectorSettings) -> Self {
        Self::new(HypergraphKind::Column, settings)
    }

    /// `hrcgpartition`.
    pub fn arrowhead(settings: DetectorSettings) -> Self {
        Self::new(HypergraphKind::RowColumn, settings)
    }

    /// All three families sharing one set of settings.
    pub fn all(settings: &DetectorSettings) -> Vec<Self> {
        vec![
            Self::rows(settings.clone()),
            Self::columns(settings.clone()),
            Self::arrowhead(settings.clone()),
        ]
    }

    /// Replace the partitioner.
    pub fn with_partitioner(mut self, partitioner: Box<dyn HypergraphPartitioner>) -> Self {
        self.partitioner = partitioner;
        self
    }

    /// Hypergraph encoding used.
    pub fn kind(&self) -> HypergraphKind {
        self.kind
    }

    /// Settings in use.
    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }
}

impl Detector for HypergraphDetector {
    fn name(&self) -> &str {
        match self.kind {
            HypergraphKind::Row => "hrgpartition",
            HypergraphKind::Column => "hcgpartition",
            HypergraphKind::RowColumn => "hrcgpartition",
        }
    }

    fn detect(&self, problem: &dyn ProblemSource, scope: &DetectionScope) -> DetectionReport {
        let start = Instant::now();
        let name = self.name();

        if let Err(e) = self.settings.validate() {
            return DetectionReport::failed(name, e, start);
        }
        let view = match ProblemView::new(problem, scope) {
            Ok(view) => view,
            Err(e) => return DetectionReport::failed(name, e, start),
        };

        if self.settings.verbose {
            log::info!(
                "Detecting {} structure in {} ({} vars, {} conss) with {}",
                self.kind.tag(),
                problem.problem_name(),
                problem.num_vars(),
                problem.num_conss(),
                self.partitioner.name()
            );
        }

        let mut driver = DetectorDriver::new(name, self.kind, &self.settings, self.partitioner.as_ref());
        match driver.run(view) {
            Ok(run) => match run.best {
                Some(best) => DetectionReport::found(name, best, run.candidates, start),
                None => DetectionReport::not_found(name, run.candidates, start),
            },
            Err(e) => DetectionReport::failed(name, e, start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{CandidateOutcome, CandidateResult, DetectionStatus};
    use crate::model::{SparseProblem, SparseProblemBuilder};

    fn two_pairs() -> SparseProblem {
        let mut b = SparseProblemBuilder::new("p");
        let x = b.add_binary("x");
        let y = b.add_binary("y");
        b.add_le("c0", &[(x, 1.0), (y, 1.0)], 1.0);
        b.add_le("c1", &[(x, 1.0), (y, -1.0)], 0.0);
        b.build().unwrap()
    }

    #[test]
    fn test_family_names() {
        let names: Vec<String> = HypergraphDetector::all(&DetectorSettings::default())
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        assert_eq!(names, vec!["hrgpartition", "hcgpartition", "hrcgpartition"]);
    }

    #[test]
    fn test_invalid_settings_report_error() {
        let mut b = SparseProblemBuilder::new("p");
        let x = b.add_binary("x");
        let y = b.add_binary("y");
        b.add_le("c", &[(x, 1.0), (y, 1.0)], 1.0);
        let prob = b.build().unwrap();

        let det = HypergraphDetector::rows(DetectorSettings::default().with_block_range(4, 2));
        let report = det.detect(&prob, &DetectionScope::full());
        assert_eq!(report.status, DetectionStatus::Error);
        assert!(report.error.is_some());
    }

    #[test]
    fn test_missing_binary_reports_error() {
        let prob = two_pairs();
        let settings = DetectorSettings::default()
            .with_blocks(2)
            .with_partitioner("/nonexistent/hmetis-binary");
        let report = HypergraphDetector::rows(settings).detect(&prob, &DetectionScope::full());
        assert_eq!(report.status, DetectionStatus::Error);
        assert!(report.decomposition.is_none());
    }

    #[test]
    fn test_exhausted_budget_stops_candidates() {
        let settings = DetectorSettings::default()
            .with_block_range(2, 3)
            .with_time_limit(0.0)
            .with_partitioner("/nonexistent/hmetis-binary");
        let report = HypergraphDetector::rows(settings).detect(&two_pairs(), &DetectionScope::full());

        assert_eq!(report.status, DetectionStatus::DidNotFind);
        assert_eq!(
            report.candidates,
            vec![CandidateResult {
                nblocks: 2,
                outcome: CandidateOutcome::NotRun,
            }]
        );
    }

    #[test]
    fn test_huge_time_limit_runs_unbounded() {
        for limit in [f64::INFINITY, 1e19] {
            let settings = DetectorSettings::default()
                .with_blocks(2)
                .with_time_limit(limit)
                .with_partitioner("/nonexistent/hmetis-binary");
            let report = HypergraphDetector::rows(settings).detect(&two_pairs(), &DetectionScope::full());
            // reaches the launch instead of giving up on the budget
            assert_eq!(report.status, DetectionStatus::Error);
        }
    }
}
