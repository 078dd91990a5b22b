//! Full detection runs with an exact in-process partitioner.

use decomp_detect::decomposition::DecompositionKind;
use decomp_detect::detector::{CandidateOutcome, DetectionStatus};
use decomp_detect::error::{DetectError, DetectResult};
use decomp_detect::hypergraph::Hypergraph;
use decomp_detect::partition::{PartitionAssignment, PartitionContext, PartitionOutcome};
use decomp_detect::{
    run_detectors, BlockAssignment, ConnectedDetector, Decomposition, DecompositionPool, DetectionScope,
    Detector, DetectorSettings, HypergraphDetector, HypergraphKind, HypergraphPartitioner, ProblemSource,
    SparseProblem, SparseProblemBuilder, VarType,
};
use sprs::CsMat;

/// Minimum cut over all assignments with blocks of size 1..=ceil(n/k).
///
/// Exponential; only for tiny hypergraphs.
struct ExactPartitioner;

impl HypergraphPartitioner for ExactPartitioner {
    fn name(&self) -> &str {
        "exact"
    }

    fn partition(
        &self,
        graph: &Hypergraph,
        nblocks: usize,
        _ctx: &PartitionContext<'_>,
    ) -> DetectResult<PartitionOutcome> {
        let n = graph.num_vertices();
        assert!(n <= 12, "hypergraph too large for exhaustive search");
        let cap = (n + nblocks - 1) / nblocks;
        let total = nblocks.pow(n as u32);

        let mut best: Option<(u64, Vec<usize>)> = None;
        let mut blocks = vec![0; n];
        for code in 0..total {
            let mut c = code;
            for v in (0..n).rev() {
                blocks[v] = c % nblocks;
                c /= nblocks;
            }
            let mut sizes = vec![0; nblocks];
            for &b in &blocks {
                sizes[b] += 1;
            }
            if sizes.iter().any(|&s| s == 0 || s > cap) {
                continue;
            }
            let cut = graph.cut_cost(&blocks);
            if best.as_ref().map_or(true, |(b, _)| cut < *b) {
                best = Some((cut, blocks.clone()));
            }
        }

        match best {
            Some((_, blocks)) => Ok(PartitionOutcome::Partitioned(PartitionAssignment::new(nblocks, blocks)?)),
            None => Ok(PartitionOutcome::Failed {
                reason: "no balanced assignment".to_string(),
            }),
        }
    }
}

/// Always fails to launch.
struct MissingBinary;

impl HypergraphPartitioner for MissingBinary {
    fn name(&self) -> &str {
        "missing"
    }

    fn partition(&self, _: &Hypergraph, _: usize, _: &PartitionContext<'_>) -> DetectResult<PartitionOutcome> {
        Err(DetectError::Spawn {
            program: "hmetis".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }
}

fn exact(kind: HypergraphKind, settings: DetectorSettings) -> HypergraphDetector {
    HypergraphDetector::new(kind, settings).with_partitioner(Box::new(ExactPartitioner))
}

/// c1: x1 + x2 <= 5, c2: x3 + x4 <= 5, optionally c3: x1 + x3 = 1
fn scenario(coupled: bool) -> SparseProblem {
    let mut b = SparseProblemBuilder::new("scenario");
    let x: Vec<usize> = (1..=4).map(|i| b.add_integer(format!("x{}", i), 10.0)).collect();
    b.add_le("c1", &[(x[0], 1.0), (x[1], 1.0)], 5.0);
    b.add_le("c2", &[(x[2], 1.0), (x[3], 1.0)], 5.0);
    if coupled {
        b.add_eq("c3", &[(x[0], 1.0), (x[2], 1.0)], 1.0);
    }
    b.build().unwrap()
}

fn detect_one(det: &dyn Detector, prob: &dyn ProblemSource) -> Decomposition {
    let report = det.detect(prob, &DetectionScope::full());
    assert_eq!(report.status, DetectionStatus::Success, "{:?}", report.error);
    report.decomposition.unwrap()
}

fn assert_partitioned(d: &Decomposition, prob: &dyn ProblemSource) {
    let mut vars = vec![0; prob.num_vars()];
    for &v in d.block_vars.iter().flatten().chain(&d.linking_vars).chain(&d.untouched_vars) {
        vars[v] += 1;
    }
    assert!(vars.iter().all(|&n| n == 1), "variable coverage {:?}", vars);

    let mut conss = vec![0; prob.num_conss()];
    for &c in d.block_conss.iter().flatten().chain(&d.linking_conss).chain(&d.empty_conss) {
        conss[c] += 1;
    }
    assert!(conss.iter().all(|&n| n == 1), "constraint coverage {:?}", conss);

    for (b, members) in d.block_vars.iter().enumerate() {
        for &v in members {
            assert_eq!(d.var_block(v), BlockAssignment::Block(b));
        }
    }
    for &c in &d.linking_conss {
        assert!(d.cons_block(c).is_linking());
    }
}

#[test]
fn test_separable_problem() {
    let prob = scenario(false);
    let d = detect_one(&exact(HypergraphKind::Row, DetectorSettings::default().with_blocks(2)), &prob);

    assert_eq!(d.nblocks, 2);
    for b in 0..2 {
        assert_eq!(d.block_vars[b].len(), 2);
        assert_eq!(d.block_conss[b].len(), 1);
    }
    assert_eq!(d.num_linking_conss(), 0);
    assert_eq!(d.num_linking_vars(), 0);
    assert_eq!(d.kind, DecompositionKind::Diagonal);
    assert_eq!(d.scores().unwrap().border_area, 0.0);
    assert_partitioned(&d, &prob);
}

#[test]
fn test_coupling_constraint_becomes_linking() {
    let prob = scenario(true);
    let d = detect_one(&exact(HypergraphKind::Row, DetectorSettings::default().with_blocks(2)), &prob);

    assert_eq!(d.linking_conss, vec![2]);
    assert_eq!(d.block_conss.iter().map(Vec::len).sum::<usize>(), 2);
    assert_eq!(d.kind, DecompositionKind::Bordered);
    let scores = d.scores().unwrap();
    assert!(scores.border_area > 0.0);
    // the equality c3 has cost 5
    assert_eq!(scores.min_cut_weight, 5);
    assert_partitioned(&d, &prob);
}

#[test]
fn test_fixed_constraint_is_empty() {
    let mut b = SparseProblemBuilder::new("fixed");
    let x: Vec<usize> = (0..6).map(|i| b.add_integer(format!("x{}", i), 10.0)).collect();
    b.add_le("c0", &[(x[0], 1.0), (x[1], 1.0)], 5.0);
    b.add_le("c1", &[(x[2], 1.0), (x[3], 1.0)], 5.0);
    b.add_le("c2", &[(x[4], 1.0), (x[5], 1.0)], 5.0);
    let mut prob = b.build().unwrap();
    prob.fix_var(4, 1.0);
    prob.fix_var(5, 2.0);

    // every variable sits in one constraint, so the column hypergraph has no edges
    for kind in [HypergraphKind::Row, HypergraphKind::RowColumn] {
        let d = detect_one(&exact(kind, DetectorSettings::default().with_blocks(2)), &prob);
        assert_eq!(d.empty_conss, vec![2], "{:?}", kind);
        assert!(!d.linking_conss.contains(&2));
        assert!(d.untouched_vars.contains(&4) && d.untouched_vars.contains(&5));
        assert_partitioned(&d, &prob);
    }
}

#[test]
fn test_all_encodings_cover_problem() {
    let prob = scenario(true);
    for kind in [HypergraphKind::Row, HypergraphKind::Column, HypergraphKind::RowColumn] {
        let d = detect_one(&exact(kind, DetectorSettings::default().with_block_range(2, 3)), &prob);
        assert_eq!(d.provenance.hypergraph, Some(kind));
        assert_partitioned(&d, &prob);
        let s = d.scores().unwrap();
        assert!((0.0..=1.0).contains(&s.border_area));
        assert!((0.0..=1.0).contains(&s.density_score));
        assert!((0.5..=1.0).contains(&s.linking_score));
    }
}

#[test]
fn test_detection_is_repeatable() {
    let prob = scenario(true);
    let det = exact(HypergraphKind::RowColumn, DetectorSettings::default().with_block_range(2, 3));
    let first = detect_one(&det, &prob);
    let second = detect_one(&det, &prob);
    assert_eq!(first, second);
}

#[test]
fn test_candidates_recorded_per_block_count() {
    let prob = scenario(true);
    // Row hypergraph has 4 vertices
    let det = exact(HypergraphKind::Row, DetectorSettings::default().with_block_range(2, 6));
    let report = det.detect(&prob, &DetectionScope::full());
    let outcomes: Vec<_> = report.candidates.iter().map(|c| (c.nblocks, &c.outcome)).collect();
    assert_eq!(outcomes.len(), 5);
    assert!(matches!(outcomes[0], (2, CandidateOutcome::Scored(_))));
    assert!(matches!(outcomes[2], (4, CandidateOutcome::Scored(_))));
    assert_eq!(outcomes[3], (5, &CandidateOutcome::Skipped));
    assert_eq!(outcomes[4], (6, &CandidateOutcome::Skipped));
    assert_eq!(report.decomposition.unwrap().nblocks, 2);
}

#[test]
fn test_no_structure_and_errors() {
    let mut b = SparseProblemBuilder::new("bounds");
    let x = b.add_binary("x");
    let y = b.add_binary("y");
    b.add_le("cx", &[(x, 1.0)], 1.0);
    b.add_le("cy", &[(y, 1.0)], 1.0);
    let prob = b.build().unwrap();

    let report = exact(HypergraphKind::Row, DetectorSettings::default()).detect(&prob, &DetectionScope::full());
    assert_eq!(report.status, DetectionStatus::DidNotFind);

    let failing = HypergraphDetector::rows(DetectorSettings::default().with_blocks(2))
        .with_partitioner(Box::new(MissingBinary));
    let report = failing.detect(&scenario(true), &DetectionScope::full());
    assert_eq!(report.status, DetectionStatus::Error);
    assert!(report.error.unwrap().contains("hmetis"));
}

#[test]
fn test_pool_picks_best_across_detectors() {
    let prob = scenario(false);
    let settings = DetectorSettings::default().with_blocks(2);
    let detectors: Vec<Box<dyn Detector>> = vec![
        Box::new(exact(HypergraphKind::RowColumn, settings.clone())),
        Box::new(ConnectedDetector::new()),
        Box::new(HypergraphDetector::rows(settings).with_partitioner(Box::new(MissingBinary))),
    ];
    let mut pool = DecompositionPool::new();
    let reports = run_detectors(&prob, &DetectionScope::full(), &detectors, &mut pool);

    let statuses: Vec<_> = reports.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![DetectionStatus::Success, DetectionStatus::Success, DetectionStatus::Error]
    );
    assert_eq!(pool.len(), 2);
    // both are diagonal with score 0; the first handed off wins
    let best = pool.into_best().unwrap();
    assert_eq!(best.provenance.detector, "hrcgpartition");
    assert_eq!(best.total_score(), 0.0);
}

#[test]
fn test_scope_excludes_constraints() {
    let prob = scenario(true);
    let scope = DetectionScope::full().without_constraints(3, [2]);
    let report = exact(HypergraphKind::Row, DetectorSettings::default().with_blocks(2)).detect(&prob, &scope);
    let d = report.decomposition.unwrap();
    assert!(d.linking_conss.is_empty());
    assert_eq!(d.block_conss.iter().map(Vec::len).sum::<usize>(), 2);
    assert_eq!(d.cons_block(2), BlockAssignment::Unassigned);
}

#[test]
fn test_problem_from_csc_matrix() {
    // rows: c0 = x0 + x1, c1 = x2 + x3, c2 = x1 + x2
    let a = CsMat::new_csc(
        (3, 4),
        vec![0, 1, 3, 5, 6],
        vec![0, 0, 2, 1, 2, 1],
        vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
    );
    let prob = SparseProblem::from_csc(
        "csc",
        &a,
        vec![f64::NEG_INFINITY; 3],
        vec![4.0; 3],
        vec![VarType::Continuous; 4],
        vec![0.0; 4],
        vec![10.0; 4],
    )
    .unwrap();

    let d = detect_one(&exact(HypergraphKind::Row, DetectorSettings::default().with_blocks(2)), &prob);
    assert_eq!(d.linking_conss, vec![2]);
    assert_partitioned(&d, &prob);

    let json = serde_json::to_string(&d).unwrap();
    let back: Decomposition = serde_json::from_str(&json).unwrap();
    assert_eq!(back.block_conss, d.block_conss);
    assert_eq!(back.cons_map, d.cons_map);
}
