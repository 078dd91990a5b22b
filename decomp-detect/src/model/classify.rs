//! Constraint classification used for hyperedge weights.

use serde::{Deserialize, Serialize};

use super::problem::{ProblemSource, VarType};

/// Structural kind of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsKind {
    /// Anything not covered below.
    Generic,
    /// `sum x_j = 1` over binaries.
    SetPartitioning,
    /// `sum x_j >= 1` over binaries.
    SetCovering,
    /// `sum x_j <= 1` over binaries.
    SetPacking,
    /// Logical-or constraint as declared by the host.
    LogicalOr,
}

impl ConsKind {
    /// Set partitioning, covering, packing or logical-or.
    pub fn is_set_type(&self) -> bool {
        !matches!(self, ConsKind::Generic)
    }
}

/// Classify a constraint from its active entries and sides.
///
/// A host hint always wins. Otherwise a row whose active coefficients are all
/// 1 on binary variables is a set partitioning/covering/packing row depending
/// on its sides. Rows without active variables are generic.
pub fn classify_constraint(src: &dyn ProblemSource, cons: usize) -> ConsKind {
    if let Some(kind) = src.cons_kind_hint(cons) {
        return kind;
    }

    let mut nactive = 0;
    for &(var, coef) in src.row(cons) {
        if !src.is_active(var) {
            continue;
        }
        if coef != 1.0 || src.var_type(var) != VarType::Binary {
            return ConsKind::Generic;
        }
        nactive += 1;
    }
    if nactive == 0 {
        return ConsKind::Generic;
    }

    let (lhs, rhs) = (src.lhs(cons), src.rhs(cons));
    match (lhs == 1.0, rhs == 1.0) {
        (true, true) => ConsKind::SetPartitioning,
        (true, false) if rhs == f64::INFINITY => ConsKind::SetCovering,
        (false, true) if lhs == f64::NEG_INFINITY => ConsKind::SetPacking,
        _ => ConsKind::Generic,
    }
}
