//! Restricting detection to part of a problem.

use super::problem::ProblemSource;
use crate::error::{DetectError, DetectResult};

/// Subset of constraints and variables a detector may use.
///
/// Detection on a sub-problem leaves already-assigned constraints and
/// variables out of scope; out-of-scope variables are treated like fixed ones.
#[derive(Debug, Clone, Default)]
pub struct DetectionScope {
    conss: Option<Vec<bool>>,
    vars: Option<Vec<bool>>,
}

impl DetectionScope {
    /// The whole problem.
    pub fn full() -> Self {
        Self::default()
    }

    /// Keep only the listed constraints.
    pub fn only_constraints(mut self, num_conss: usize, conss: impl IntoIterator<Item = usize>) -> Self {
        let mut mask = vec![false; num_conss];
        for c in conss {
            mask[c] = true;
        }
        self.conss = Some(mask);
        self
    }

    /// Drop the listed constraints.
    pub fn without_constraints(mut self, num_conss: usize, conss: impl IntoIterator<Item = usize>) -> Self {
        let mask = self.conss.get_or_insert_with(|| vec![true; num_conss]);
        for c in conss {
            mask[c] = false;
        }
        self
    }

    /// Drop the listed variables.
    pub fn without_variables(mut self, num_vars: usize, vars: impl IntoIterator<Item = usize>) -> Self {
        let mask = self.vars.get_or_insert_with(|| vec![true; num_vars]);
        for v in vars {
            mask[v] = false;
        }
        self
    }

    /// True if no restriction applies.
    pub fn is_full(&self) -> bool {
        self.conss.is_none() && self.vars.is_none()
    }

    /// Is the constraint in scope?
    pub fn contains_cons(&self, cons: usize) -> bool {
        self.conss.as_ref().map_or(true, |m| m[cons])
    }

    /// Is the variable in scope?
    pub fn contains_var(&self, var: usize) -> bool {
        self.vars.as_ref().map_or(true, |m| m[var])
    }
}

/// A problem source seen through a scope.
#[derive(Clone, Copy)]
pub struct ProblemView<'a> {
    source: &'a dyn ProblemSource,
    scope: &'a DetectionScope,
}

impl<'a> ProblemView<'a> {
    /// Create a view, checking that the scope masks fit the problem.
    pub fn new(source: &'a dyn ProblemSource, scope: &'a DetectionScope) -> DetectResult<Self> {
        if let Some(mask) = &scope.conss {
            if mask.len() != source.num_conss() {
                return Err(DetectError::InvalidProblem(format!(
                    "scope covers {} constraints, problem has {}",
                    mask.len(),
                    source.num_conss()
                )));
            }
        }
        if let Some(mask) = &scope.vars {
            if mask.len() != source.num_vars() {
                return Err(DetectError::InvalidProblem(format!(
                    "scope covers {} variables, problem has {}",
                    mask.len(),
                    source.num_vars()
                )));
            }
        }
        Ok(Self { source, scope })
    }

    /// Underlying problem.
    pub fn source(&self) -> &'a dyn ProblemSource {
        self.source
    }

    /// Scope in use.
    pub fn scope(&self) -> &'a DetectionScope {
        self.scope
    }

    /// Number of variables of the full problem.
    pub fn num_vars(&self) -> usize {
        self.source.num_vars()
    }

    /// Number of constraints of the full problem.
    pub fn num_conss(&self) -> usize {
        self.source.num_conss()
    }

    /// In-scope constraints in index order.
    pub fn conss(&self) -> impl Iterator<Item = usize> + 'a {
        let scope = self.scope;
        (0..self.source.num_conss()).filter(move |&c| scope.contains_cons(c))
    }

    /// In-scope variables in index order.
    pub fn vars(&self) -> impl Iterator<Item = usize> + 'a {
        let scope = self.scope;
        (0..self.source.num_vars()).filter(move |&v| scope.contains_var(v))
    }

    /// In scope and neither fixed nor aggregated.
    pub fn is_relevant_var(&self, var: usize) -> bool {
        self.scope.contains_var(var) && self.source.is_active(var)
    }

    /// Relevant `(var, coef)` entries of a constraint.
    pub fn active_row(&self, cons: usize) -> impl Iterator<Item = (usize, f64)> + 'a {
        let view = *self;
        self.source
            .row(cons)
            .iter()
            .copied()
            .filter(move |&(var, _)| view.is_relevant_var(var))
    }

    /// Number of relevant entries of a constraint.
    pub fn num_active(&self, cons: usize) -> usize {
        self.active_row(cons).count()
    }
}
