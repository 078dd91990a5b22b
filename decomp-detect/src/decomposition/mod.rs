//! Decomposition result, assembly, scoring and hand-off.

mod assemble;
mod pool;
mod score;

pub use assemble::DecompositionAssembler;
pub use pool::{DecompositionPool, DecompositionSink};
pub use score::{DecompositionScorer, Scores};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hypergraph::HypergraphKind;
use crate::mapping::BlockAssignment;

/// Shape of the border of a decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecompositionKind {
    /// Independent blocks, no border.
    Diagonal,
    /// Linking constraints only.
    Bordered,
    /// Linking variables, possibly with linking constraints.
    Arrowhead,
}

impl DecompositionKind {
    /// Kind implied by the size of the border.
    pub fn from_border(num_linking_conss: usize, num_linking_vars: usize) -> Self {
        match (num_linking_conss, num_linking_vars) {
            (0, 0) => DecompositionKind::Diagonal,
            (_, 0) => DecompositionKind::Bordered,
            _ => DecompositionKind::Arrowhead,
        }
    }
}

/// Where a decomposition came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Detector name.
    pub detector: String,
    /// Hypergraph encoding used, if any.
    pub hypergraph: Option<HypergraphKind>,
    /// Quality scores, once computed.
    pub scores: Option<Scores>,
}

/// A block-structured view of the constraint matrix.
///
/// Every variable of the problem is listed exactly once: in a block, in the
/// linking variables or in the untouched variables. Every in-scope
/// constraint is listed exactly once: in a block, in the linking
/// constraints or, if it has no active variable, in the empty constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decomposition {
    /// Number of blocks.
    pub nblocks: usize,
    /// Variables per block.
    pub block_vars: Vec<Vec<usize>>,
    /// Constraints per block.
    pub block_conss: Vec<Vec<usize>>,
    /// Variables in the border.
    pub linking_vars: Vec<usize>,
    /// Constraints in the border (master constraints).
    pub linking_conss: Vec<usize>,
    /// In-scope constraints without active variables.
    pub empty_conss: Vec<usize>,
    /// Variables that no processed constraint touches (fixed, out of scope,
    /// objective-only).
    pub untouched_vars: Vec<usize>,
    /// Variable to block lookup.
    pub var_map: Vec<BlockAssignment>,
    /// Constraint to block lookup.
    pub cons_map: Vec<BlockAssignment>,
    /// Border shape.
    pub kind: DecompositionKind,
    /// Origin and scores.
    pub provenance: Provenance,
}

impl Decomposition {
    /// Number of linking variables.
    pub fn num_linking_vars(&self) -> usize {
        self.linking_vars.len()
    }

    /// Number of linking constraints.
    pub fn num_linking_conss(&self) -> usize {
        self.linking_conss.len()
    }

    /// Variables placed in blocks or the border.
    pub fn num_assigned_vars(&self) -> usize {
        self.block_vars.iter().map(Vec::len).sum::<usize>() + self.linking_vars.len()
    }

    /// Constraints placed in blocks or the border.
    pub fn num_assigned_conss(&self) -> usize {
        self.block_conss.iter().map(Vec::len).sum::<usize>() + self.linking_conss.len()
    }

    /// Block of a variable.
    pub fn var_block(&self, var: usize) -> BlockAssignment {
        self.var_map[var]
    }

    /// Block of a constraint.
    pub fn cons_block(&self, cons: usize) -> BlockAssignment {
        self.cons_map[cons]
    }

    /// Blocks that received no constraint.
    pub fn empty_blocks(&self) -> Vec<usize> {
        (0..self.nblocks)
            .filter(|&b| self.block_conss[b].is_empty())
            .collect()
    }

    /// Scores, if computed.
    pub fn scores(&self) -> Option<&Scores> {
        self.provenance.scores.as_ref()
    }

    /// Combined score, +inf if not scored.
    pub fn total_score(&self) -> f64 {
        self.scores().map_or(f64::INFINITY, Scores::total)
    }
}

impl fmt::Display for Decomposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} decomposition by {} with {} blocks ({:?})",
            match self.kind {
                DecompositionKind::Diagonal => "diagonal",
                DecompositionKind::Bordered => "bordered",
                DecompositionKind::Arrowhead => "arrowhead",
            },
            self.provenance.detector,
            self.nblocks,
            self.provenance.hypergraph.map(|k| k.tag()).unwrap_or("-"),
        )?;
        for b in 0..self.nblocks {
            writeln!(
                f,
                "  block {:>3}: {:>6} vars {:>6} conss",
                b,
                self.block_vars[b].len(),
                self.block_conss[b].len()
            )?;
        }
        write!(
            f,
            "  linking:   {:>6} vars {:>6} conss",
            self.linking_vars.len(),
            self.linking_conss.len()
        )?;
        if let Some(s) = self.scores() {
            write!(f, "\n  scores:    {}", s)?;
        }
        Ok(())
    }
}
