//! Collecting decompositions and picking the best one.

use super::Decomposition;

/// Receives decompositions handed off by detectors.
pub trait DecompositionSink {
    /// Take ownership of a finished decomposition.
    fn accept(&mut self, decomp: Decomposition);
}

impl DecompositionSink for Vec<Decomposition> {
    fn accept(&mut self, decomp: Decomposition) {
        self.push(decomp);
    }
}

/// Collects decompositions from several detectors and picks the best.
#[derive(Debug, Clone, Default)]
pub struct DecompositionPool {
    decomps: Vec<Decomposition>,
}

impl DecompositionPool {
    /// Empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of decompositions held.
    pub fn len(&self) -> usize {
        self.decomps.len()
    }

    /// True if nothing was handed off.
    pub fn is_empty(&self) -> bool {
        self.decomps.is_empty()
    }

    /// Decompositions in hand-off order.
    pub fn iter(&self) -> impl Iterator<Item = &Decomposition> {
        self.decomps.iter()
    }

    /// Lowest total score; the earliest wins ties.
    pub fn best(&self) -> Option<&Decomposition> {
        self.best_index().map(|i| &self.decomps[i])
    }

    /// Consume the pool, keeping the best decomposition.
    pub fn into_best(mut self) -> Option<Decomposition> {
        let i = self.best_index()?;
        Some(self.decomps.swap_remove(i))
    }

    /// All decompositions in hand-off order.
    pub fn into_vec(self) -> Vec<Decomposition> {
        self.decomps
    }

    fn best_index(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, d) in self.decomps.iter().enumerate() {
            let total = d.total_score();
            match best {
                Some((_, b)) if total >= b => {}
                _ => best = Some((i, total)),
            }
        }
        best.map(|(i, _)| i)
    }
}

impl DecompositionSink for DecompositionPool {
    fn accept(&mut self, decomp: Decomposition) {
        self.decomps.push(decomp);
    }
}
