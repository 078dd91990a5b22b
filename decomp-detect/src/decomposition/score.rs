//! Quality measures for ranking candidate decompositions.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Decomposition;
use crate::mapping::BlockAssignment;
use crate::model::ProblemView;

/// Quality numbers of one decomposition. Lower is better for all three
/// factors of [`Scores::total`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    /// Share of the matrix area covered by the border, in `[0, 1]`.
    pub border_area: f64,
    /// One minus the smallest block density, in `[0, 1]`.
    pub density_score: f64,
    /// Distribution of linking variables over blocks, in `[0.5, 1]`.
    pub linking_score: f64,
    /// Cost of the hyperedges cut by the raw partition.
    pub min_cut_weight: u64,
}

impl Scores {
    /// Combined ranking key.
    pub fn total(&self) -> f64 {
        self.border_area * self.density_score * self.linking_score
    }
}

impl fmt::Display for Scores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "border {:.4} density {:.4} linking {:.4} cut {} total {:.6}",
            self.border_area,
            self.density_score,
            self.linking_score,
            self.min_cut_weight,
            self.total()
        )
    }
}

/// Computes [`Scores`] from a decomposition and its problem.
pub struct DecompositionScorer<'a> {
    view: ProblemView<'a>,
}

impl<'a> DecompositionScorer<'a> {
    /// Scorer for a problem view.
    pub fn new(view: ProblemView<'a>) -> Self {
        Self { view }
    }

    /// Score without hypergraph information (cut weight 0).
    pub fn score(&self, decomp: &Decomposition) -> Scores {
        self.score_with_cut(decomp, 0)
    }

    /// Score, recording the cut weight of the partition it came from.
    pub fn score_with_cut(&self, decomp: &Decomposition, min_cut_weight: u64) -> Scores {
        Scores {
            border_area: border_area(decomp),
            density_score: self.density_score(decomp),
            linking_score: self.linking_score(decomp),
            min_cut_weight,
        }
    }

    fn density_score(&self, decomp: &Decomposition) -> f64 {
        let mut touched = vec![false; self.view.num_vars()];
        let mut min_density = f64::INFINITY;

        for (b, conss) in decomp.block_conss.iter().enumerate() {
            let mut nonzeros = 0usize;
            let mut nvars = 0usize;
            for &cons in conss {
                for (var, _) in self.view.active_row(cons) {
                    if decomp.var_map[var] != BlockAssignment::Block(b) {
                        continue;
                    }
                    nonzeros += 1;
                    if !touched[var] {
                        touched[var] = true;
                        nvars += 1;
                    }
                }
            }
            for &cons in conss {
                for (var, _) in self.view.active_row(cons) {
                    touched[var] = false;
                }
            }

            let size = nvars * conss.len();
            let density = if size == 0 { 0.0 } else { nonzeros as f64 / size as f64 };
            min_density = min_density.min(density);
        }

        if min_density.is_finite() {
            1.0 - min_density
        } else {
            1.0
        }
    }

    /// `0.5 + 0.5 * prod_b (linking vars touched by block b / all linking vars)`,
    /// lower is better.
    ///
    /// The product vanishes as soon as one block touches none of the linking
    /// variables, so concentrating the linking variables in few blocks gives
    /// the best value of 0.5, and spreading every one of them over all blocks
    /// gives the worst value of 1.0. No linking variables also scores 0.5.
    fn linking_score(&self, decomp: &Decomposition) -> f64 {
        let nlinking = decomp.linking_vars.len();
        if nlinking == 0 || decomp.nblocks == 0 {
            return 0.5;
        }

        let mut seen = vec![usize::MAX; self.view.num_vars()];
        let mut product = 1.0;
        for (b, conss) in decomp.block_conss.iter().enumerate() {
            let mut count = 0usize;
            for &cons in conss {
                for (var, _) in self.view.active_row(cons) {
                    if decomp.var_map[var].is_linking() && seen[var] != b {
                        seen[var] = b;
                        count += 1;
                    }
                }
            }
            product *= count as f64 / nlinking as f64;
        }
        0.5 + 0.5 * product
    }
}

/// (Lc·nV + Lv·(nC − Lc)) / (nV·nC) over assigned variables and constraints.
fn border_area(decomp: &Decomposition) -> f64 {
    let nvars = decomp.num_assigned_vars();
    let nconss = decomp.num_assigned_conss();
    if nvars == 0 || nconss == 0 {
        return 0.0;
    }
    let lc = decomp.num_linking_conss();
    let lv = decomp.num_linking_vars();
    let area = lc * nvars + lv * (nconss - lc);
    area as f64 / (nvars as f64 * nconss as f64)
}
