//! Connected-components detector: independent blocks without a border.

use std::time::Instant;

use super::{DetectionReport, Detector};
use crate::decomposition::{DecompositionAssembler, DecompositionScorer, Provenance};
use crate::mapping::BlockAssignment;
use crate::model::{DetectionScope, ProblemSource, ProblemView};

/// Finds independent blocks: constraints sharing an active variable end up
/// in the same block. Needs no partitioner and never produces a border.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectedDetector {
    verbose: bool,
}

impl ConnectedDetector {
    /// New detector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Log the components found.
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }
}

impl Detector for ConnectedDetector {
    fn name(&self) -> &str {
        "connected"
    }

    fn detect(&self, problem: &dyn ProblemSource, scope: &DetectionScope) -> DetectionReport {
        let start = Instant::now();
        let view = match ProblemView::new(problem, scope) {
            Ok(view) => view,
            Err(e) => return DetectionReport::failed(self.name(), e, start),
        };

        let (nblocks, var_map, cons_map) = components(view);
        if self.verbose {
            log::info!("{}: {} independent components", problem.problem_name(), nblocks);
        }
        if nblocks < 2 {
            return DetectionReport::not_found(self.name(), Vec::new(), start);
        }

        let provenance = Provenance {
            detector: self.name().to_string(),
            hypergraph: None,
            scores: None,
        };
        let mut decomp = DecompositionAssembler::new(view).from_maps(nblocks, var_map, cons_map, provenance);
        decomp.provenance.scores = Some(DecompositionScorer::new(view).score(&decomp));
        DetectionReport::found(self.name(), decomp, Vec::new(), start)
    }
}

/// Label connected components, numbered by their first constraint.
fn components(view: ProblemView<'_>) -> (usize, Vec<BlockAssignment>, Vec<BlockAssignment>) {
    let mut uf = UnionFind::new(view.num_conss());
    let mut first_cons = vec![usize::MAX; view.num_vars()];

    for cons in view.conss() {
        for (var, _) in view.active_row(cons) {
            if first_cons[var] == usize::MAX {
                first_cons[var] = cons;
            } else {
                uf.union(first_cons[var], cons);
            }
        }
    }

    let mut block_of_root = vec![usize::MAX; view.num_conss()];
    let mut nblocks = 0;
    let mut cons_map = vec![BlockAssignment::Unassigned; view.num_conss()];
    for cons in view.conss() {
        if view.num_active(cons) == 0 {
            continue;
        }
        let root = uf.find(cons);
        if block_of_root[root] == usize::MAX {
            block_of_root[root] = nblocks;
            nblocks += 1;
        }
        cons_map[cons] = BlockAssignment::Block(block_of_root[root]);
    }

    let var_map = first_cons
        .iter()
        .map(|&cons| if cons == usize::MAX { BlockAssignment::Unassigned } else { cons_map[cons] })
        .collect();

    (nblocks, var_map, cons_map)
}

struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}
