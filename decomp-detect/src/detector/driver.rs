//! Candidate loop over block counts.

use serde::{Deserialize, Serialize};

use crate::decomposition::{Decomposition, DecompositionAssembler, DecompositionScorer, Provenance, Scores};
use crate::error::DetectResult;
use crate::hypergraph::{Hypergraph, HypergraphBuilder, HypergraphKind};
use crate::mapping::map_partition;
use crate::model::ProblemView;
use crate::partition::{HypergraphPartitioner, PartitionContext, PartitionOutcome, TimeBudget};
use crate::settings::DetectorSettings;

/// Where the driver currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Not started.
    Idle,
    /// Encoding the problem as a hypergraph.
    BuildingGraph,
    /// Waiting for the partitioner.
    Partitioning(usize),
    /// Translating vertex blocks onto the problem.
    Mapping(usize),
    /// Building the decomposition.
    Assembling(usize),
    /// Computing scores.
    Scoring(usize),
    /// Finished, successfully or not.
    Done,
}

/// What became of one block count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CandidateOutcome {
    /// A decomposition was built and scored.
    Scored(Scores),
    /// Partitioning or mapping failed for this block count only.
    Failed(String),
    /// More blocks than hypergraph vertices.
    Skipped,
    /// The time budget ran out first.
    NotRun,
}

/// One block count and its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    /// Block count tried.
    pub nblocks: usize,
    /// What happened.
    pub outcome: CandidateOutcome,
}

/// Result of a full driver run.
#[derive(Debug, Clone)]
pub struct DriverRun {
    /// Lowest scoring decomposition, if any candidate succeeded.
    pub best: Option<Decomposition>,
    /// One entry per block count looked at.
    pub candidates: Vec<CandidateResult>,
    /// Hypergraph size as (vertices, edges, pins).
    pub graph_size: (usize, usize, usize),
}

/// Drives hypergraph construction, partitioning, mapping, assembly and
/// scoring over the configured block-count range.
///
/// The hypergraph is built once; every candidate yields a fresh
/// decomposition and the best one is kept as is.
pub struct DetectorDriver<'a> {
    detector: &'a str,
    kind: HypergraphKind,
    settings: &'a DetectorSettings,
    partitioner: &'a dyn HypergraphPartitioner,
    state: DriverState,
}

impl<'a> DetectorDriver<'a> {
    /// Driver for one detector.
    pub fn new(
        detector: &'a str,
        kind: HypergraphKind,
        settings: &'a DetectorSettings,
        partitioner: &'a dyn HypergraphPartitioner,
    ) -> Self {
        Self {
            detector,
            kind,
            settings,
            partitioner,
            state: DriverState::Idle,
        }
    }

    /// Current state.
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Try every block count in `[min_blocks, max_blocks]`.
    ///
    /// Only errors that make further candidates pointless (scratch files,
    /// launching the partitioner) are returned; everything else is recorded
    /// in the candidate list.
    pub fn run(&mut self, view: ProblemView<'_>) -> DetectResult<DriverRun> {
        let result = self.run_candidates(view);
        self.state = DriverState::Done;
        result
    }

    fn run_candidates(&mut self, view: ProblemView<'_>) -> DetectResult<DriverRun> {
        let settings = self.settings;
        let budget = TimeBudget::starting_now(settings.time_limit);

        self.state = DriverState::BuildingGraph;
        let graph = HypergraphBuilder::new(view, settings).build(self.kind);
        let graph_size = (graph.num_vertices(), graph.num_edges(), graph.num_pins());

        if settings.verbose {
            log::info!(
                "{}: {} hypergraph with {} vertices, {} edges, {} pins",
                self.detector,
                self.kind.tag(),
                graph_size.0,
                graph_size.1,
                graph_size.2
            );
        }

        let mut run = DriverRun {
            best: None,
            candidates: Vec::new(),
            graph_size,
        };
        if graph.is_empty() {
            log::debug!("{}: empty hypergraph, nothing to partition", self.detector);
            return Ok(run);
        }

        let label = format!("{}-{}", view.source().problem_name(), self.detector);
        let scorer = DecompositionScorer::new(view);

        for nblocks in settings.min_blocks..=settings.max_blocks {
            if nblocks > graph.num_vertices() {
                log::debug!(
                    "{}: skipping {} blocks for {} vertices",
                    self.detector,
                    nblocks,
                    graph.num_vertices()
                );
                run.candidates.push(CandidateResult {
                    nblocks,
                    outcome: CandidateOutcome::Skipped,
                });
                continue;
            }

            let ctx = PartitionContext {
                settings,
                budget,
                label: &label,
            };
            let outcome = match self.attempt(view, &graph, nblocks, &ctx, &scorer)? {
                Attempt::Built(decomp, scores) => {
                    if settings.verbose {
                        log::info!("{}: {} blocks, {}", self.detector, nblocks, scores);
                    }
                    let better = run
                        .best
                        .as_ref()
                        .map_or(true, |best| decomp.total_score() < best.total_score());
                    if better {
                        run.best = Some(decomp);
                    }
                    CandidateOutcome::Scored(scores)
                }
                Attempt::Failed(reason) => {
                    log::warn!("{}: {} blocks failed: {}", self.detector, nblocks, reason);
                    CandidateOutcome::Failed(reason)
                }
                Attempt::NotRun => {
                    log::warn!("{}: time limit reached before {} blocks", self.detector, nblocks);
                    run.candidates.push(CandidateResult {
                        nblocks,
                        outcome: CandidateOutcome::NotRun,
                    });
                    break;
                }
            };
            run.candidates.push(CandidateResult { nblocks, outcome });
        }

        if settings.verbose {
            match &run.best {
                Some(best) => log::info!(
                    "{}: best decomposition has {} blocks (score {:.6})",
                    self.detector,
                    best.nblocks,
                    best.total_score()
                ),
                None => log::info!("{}: no decomposition found", self.detector),
            }
        }
        Ok(run)
    }

    /// One block count: partition, map, assemble, score.
    fn attempt(
        &mut self,
        view: ProblemView<'_>,
        graph: &Hypergraph,
        nblocks: usize,
        ctx: &PartitionContext<'_>,
        scorer: &DecompositionScorer<'_>,
    ) -> DetectResult<Attempt> {
        self.state = DriverState::Partitioning(nblocks);
        let assignment = match self.partitioner.partition(graph, nblocks, ctx) {
            Ok(PartitionOutcome::Partitioned(assignment)) => assignment,
            Ok(PartitionOutcome::Failed { reason }) => return Ok(Attempt::Failed(reason)),
            Ok(PartitionOutcome::NotRun) => return Ok(Attempt::NotRun),
            Err(e) if e.is_candidate_local() => return Ok(Attempt::Failed(e.to_string())),
            Err(e) => return Err(e),
        };

        self.state = DriverState::Mapping(nblocks);
        let mapped = match map_partition(graph, &assignment) {
            Ok(mapped) => mapped,
            Err(e) => return Ok(Attempt::Failed(e.to_string())),
        };
        log::debug!(
            "{}: {} blocks, block sizes {:?}, {} linking variables",
            self.detector,
            nblocks,
            assignment.block_sizes(),
            mapped.num_linking_vars()
        );

        self.state = DriverState::Assembling(nblocks);
        let provenance = Provenance {
            detector: self.detector.to_string(),
            hypergraph: Some(self.kind),
            scores: None,
        };
        let mut decomp = DecompositionAssembler::new(view).assemble(&mapped, provenance);

        self.state = DriverState::Scoring(nblocks);
        let scores = scorer.score_with_cut(&decomp, graph.cut_cost(assignment.as_slice()));
        decomp.provenance.scores = Some(scores);
        Ok(Attempt::Built(decomp, scores))
    }
}

enum Attempt {
    Built(Decomposition, Scores),
    Failed(String),
    NotRun,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DetectError;
    use crate::model::{DetectionScope, SparseProblem, SparseProblemBuilder};
    use crate::partition::PartitionAssignment;
    use std::cell::RefCell;

    /// Splits vertices into contiguous runs; fails for the listed counts.
    struct Contiguous {
        fail: Vec<usize>,
        calls: RefCell<Vec<usize>>,
    }

    impl Contiguous {
        fn new(fail: Vec<usize>) -> Self {
            Self {
                fail,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl HypergraphPartitioner for Contiguous {
        fn name(&self) -> &str {
            "contiguous"
        }

        fn partition(
            &self,
            graph: &Hypergraph,
            nblocks: usize,
            _ctx: &PartitionContext<'_>,
        ) -> DetectResult<PartitionOutcome> {
            self.calls.borrow_mut().push(nblocks);
            if self.fail.contains(&nblocks) {
                return Ok(PartitionOutcome::Failed {
                    reason: "exit status 1".to_string(),
                });
            }
            let n = graph.num_vertices();
            let blocks = (0..n).map(|v| v * nblocks / n).collect();
            Ok(PartitionOutcome::Partitioned(PartitionAssignment::new(nblocks, blocks)?))
        }
    }

    struct Unlaunchable;

    impl HypergraphPartitioner for Unlaunchable {
        fn name(&self) -> &str {
            "unlaunchable"
        }

        fn partition(&self, _: &Hypergraph, _: usize, _: &PartitionContext<'_>) -> DetectResult<PartitionOutcome> {
            Err(DetectError::Spawn {
                program: "missing".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }
    }

    /// Four independent 2x2 blocks.
    fn four_blocks() -> SparseProblem {
        let mut b = SparseProblemBuilder::new("four");
        for k in 0..4 {
            let x = b.add_binary(format!("x{}", 2 * k));
            let y = b.add_binary(format!("x{}", 2 * k + 1));
            b.add_le(format!("a{}", k), &[(x, 1.0), (y, 1.0)], 1.0);
            b.add_ge(format!("b{}", k), &[(x, 2.0), (y, 1.0)], 1.0);
        }
        b.build().unwrap()
    }

    fn run(prob: &SparseProblem, settings: &DetectorSettings, partitioner: &dyn HypergraphPartitioner) -> DetectResult<DriverRun> {
        let scope = DetectionScope::full();
        let view = ProblemView::new(prob, &scope).unwrap();
        let mut driver = DetectorDriver::new("test", HypergraphKind::Row, settings, partitioner);
        assert_eq!(driver.state(), DriverState::Idle);
        let result = driver.run(view);
        assert_eq!(driver.state(), DriverState::Done);
        result
    }

    #[test]
    fn test_best_candidate_is_kept() {
        let prob = four_blocks();
        let settings = DetectorSettings::default().with_block_range(2, 4);
        let part = Contiguous::new(vec![]);
        let run = run(&prob, &settings, &part).unwrap();

        assert_eq!(run.candidates.len(), 3);
        let best = run.best.unwrap();
        // 2 and 4 blocks both split cleanly; the first one wins the tie
        assert_eq!(best.nblocks, 2);
        assert_eq!(best.num_linking_conss(), 0);
        assert_eq!(best.provenance.hypergraph, Some(HypergraphKind::Row));
        assert!(best.scores().is_some());
        // 3 blocks cuts through a pair
        match &run.candidates[1].outcome {
            CandidateOutcome::Scored(s) => assert!(s.border_area > 0.0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_failed_candidate_is_skipped() {
        let prob = four_blocks();
        let settings = DetectorSettings::default().with_block_range(2, 4);
        let part = Contiguous::new(vec![2]);
        let run = run(&prob, &settings, &part).unwrap();

        assert_eq!(run.candidates[0].outcome, CandidateOutcome::Failed("exit status 1".to_string()));
        // every block of the 3 and 4 block splits is fully dense, so both
        // total 0 and the earlier one is kept
        let best = run.best.unwrap();
        assert_eq!(best.nblocks, 3);
        assert_eq!(best.total_score(), 0.0);
        assert!(matches!(run.candidates[2].outcome, CandidateOutcome::Scored(s) if s.total() == 0.0));
        assert_eq!(*part.calls.borrow(), vec![2, 3, 4]);
    }

    #[test]
    fn test_single_block_count_failure() {
        let prob = four_blocks();
        let settings = DetectorSettings::default().with_blocks(3);
        let run = run(&prob, &settings, &Contiguous::new(vec![3])).unwrap();
        assert!(run.best.is_none());
        assert_eq!(run.candidates.len(), 1);
    }

    #[test]
    fn test_too_many_blocks_skipped() {
        let prob = four_blocks();
        let settings = DetectorSettings::default().with_block_range(8, 10);
        let part = Contiguous::new(vec![]);
        let run = run(&prob, &settings, &part).unwrap();
        // 8 variable vertices
        assert_eq!(run.graph_size.0, 8);
        assert_eq!(run.candidates[1].outcome, CandidateOutcome::Skipped);
        assert_eq!(run.candidates[2].outcome, CandidateOutcome::Skipped);
        assert_eq!(*part.calls.borrow(), vec![8]);
    }

    #[test]
    fn test_launch_error_aborts() {
        let prob = four_blocks();
        let settings = DetectorSettings::default().with_block_range(2, 3);
        assert!(matches!(run(&prob, &settings, &Unlaunchable), Err(DetectError::Spawn { .. })));
    }

    #[test]
    fn test_empty_hypergraph() {
        let mut b = SparseProblemBuilder::new("flat");
        let x = b.add_binary("x");
        b.add_le("c", &[(x, 1.0)], 1.0);
        let prob = b.build().unwrap();
        let part = Contiguous::new(vec![]);
        let run = run(&prob, &DetectorSettings::default(), &part).unwrap();
        assert!(run.best.is_none());
        assert!(run.candidates.is_empty());
        assert!(part.calls.borrow().is_empty());
    }
}
