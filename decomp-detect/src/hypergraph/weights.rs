//! Hyperedge cost computation.

use crate::model::{classify_constraint, ProblemView, VarType};
use crate::settings::{ConsWeights, DetectorSettings, VarWeights};

/// Population standard deviation of a set of coefficients (0 if empty).
pub fn coefficient_stddev(coefs: &[f64]) -> f64 {
    if coefs.is_empty() {
        return 0.0;
    }
    let n = coefs.len() as f64;
    let mean = coefs.iter().sum::<f64>() / n;
    let var = coefs.iter().map(|c| (c - mean) * (c - mean)).sum::<f64>() / n;
    var.sqrt()
}

/// Edge cost policy derived from the detector settings.
#[derive(Debug, Clone, Copy)]
pub struct EdgeWeights {
    var: VarWeights,
    cons: ConsWeights,
}

impl EdgeWeights {
    /// Weights from the detector settings.
    pub fn from_settings(settings: &DetectorSettings) -> Self {
        Self {
            var: settings.var_weights,
            cons: settings.cons_weights,
        }
    }

    /// Cost of a variable hyperedge.
    pub fn var_weight(&self, ty: VarType) -> u32 {
        match ty {
            VarType::Binary => self.var.binary,
            VarType::Integer => self.var.integer,
            VarType::ImpliedInteger => self.var.implied_integer,
            VarType::Continuous => self.var.continuous,
        }
    }

    /// Cost of a constraint hyperedge.
    ///
    /// Set-type rows get the fixed set weight. Generic rows get the base
    /// weight plus `alpha` times the deviation of their active coefficients,
    /// scaled by `2 * beta` for equalities and `2 * (1 - beta)` otherwise.
    pub fn cons_weight(&self, view: &ProblemView<'_>, cons: usize) -> u32 {
        let src = view.source();
        if classify_constraint(src, cons).is_set_type() {
            return self.cons.set_type;
        }

        let mut weight = self.cons.generic as f64;
        if self.cons.alpha > 0.0 {
            let coefs: Vec<f64> = view.active_row(cons).map(|(_, c)| c).collect();
            weight += self.cons.alpha * coefficient_stddev(&coefs);
        }

        let fraction = if src.is_equality(cons) {
            self.cons.beta
        } else {
            1.0 - self.cons.beta
        };
        (weight * 2.0 * fraction).round().max(0.0) as u32
    }
}
