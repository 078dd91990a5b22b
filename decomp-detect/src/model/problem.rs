//! Problem source trait and the sparse reference implementation.

use serde::{Deserialize, Serialize};
use sprs::{CsMat, TriMat};

use super::classify::ConsKind;
use crate::error::{DetectError, DetectResult};

/// Sparse matrix in CSC format.
pub type SparseCsc = CsMat<f64>;

/// Variable type as reported by the host solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarType {
    /// Binary variable (0 or 1)
    Binary,
    /// Integer variable
    Integer,
    /// Continuous variable that is integral in every feasible solution
    ImpliedInteger,
    /// Continuous variable
    Continuous,
}

/// Read access to the constraint matrix of a MIP.
///
/// Constraints and variables are addressed by stable 0-based indices.
/// Rows are `lhs <= a^T x <= rhs`.
pub trait ProblemSource {
    /// Name used to label scratch files and reports.
    fn problem_name(&self) -> &str;

    /// Number of variables.
    fn num_vars(&self) -> usize;

    /// Number of constraints.
    fn num_conss(&self) -> usize;

    /// Nonzero entries `(var, coef)` of a constraint, fixed variables included.
    fn row(&self, cons: usize) -> &[(usize, f64)];

    /// Left-hand side (may be -inf).
    fn lhs(&self, cons: usize) -> f64;

    /// Right-hand side (may be +inf).
    fn rhs(&self, cons: usize) -> f64;

    /// Variable type.
    fn var_type(&self, var: usize) -> VarType;

    /// False for fixed or aggregated variables.
    fn is_active(&self, var: usize) -> bool;

    /// Constraint kind known to the host (e.g. a logical-or constraint).
    fn cons_kind_hint(&self, _cons: usize) -> Option<ConsKind> {
        None
    }

    /// True for `lhs == rhs` rows.
    fn is_equality(&self, cons: usize) -> bool {
        let (lhs, rhs) = (self.lhs(cons), self.rhs(cons));
        lhs.is_finite() && lhs == rhs
    }

    /// Variable name.
    fn var_name(&self, var: usize) -> String {
        format!("x{}", var)
    }

    /// Constraint name.
    fn cons_name(&self, cons: usize) -> String {
        format!("c{}", cons)
    }

    /// Total number of stored nonzeros.
    fn num_nonzeros(&self) -> usize {
        (0..self.num_conss()).map(|c| self.row(c).len()).sum()
    }
}

/// Row-major copy of a sparse constraint matrix with bounds and types.
#[derive(Debug, Clone)]
pub struct SparseProblem {
    /// Problem name
    pub name: String,
    /// Row start offsets into `entries` (length m + 1)
    row_ptr: Vec<usize>,
    /// Nonzero entries (var, coef), grouped by row, sorted by var
    entries: Vec<(usize, f64)>,
    /// Constraint lower bounds (length m)
    pub con_lower: Vec<f64>,
    /// Constraint upper bounds (length m)
    pub con_upper: Vec<f64>,
    /// Variable types (length n)
    pub var_types: Vec<VarType>,
    /// Variable lower bounds (length n)
    pub var_lower: Vec<f64>,
    /// Variable upper bounds (length n)
    pub var_upper: Vec<f64>,
    /// Variable names
    pub var_names: Vec<String>,
    /// Constraint names
    pub con_names: Vec<String>,
    kind_hints: Vec<Option<ConsKind>>,
    aggregated: Vec<bool>,
}

impl SparseProblem {
    /// Build from an m × n matrix in CSC (or CSR) format.
    ///
    /// Explicit zeros are dropped; duplicate entries must already be summed.
    #[allow(clippy::too_many_arguments)]
    pub fn from_csc(
        name: impl Into<String>,
        a: &SparseCsc,
        con_lower: Vec<f64>,
        con_upper: Vec<f64>,
        var_types: Vec<VarType>,
        var_lower: Vec<f64>,
        var_upper: Vec<f64>,
    ) -> DetectResult<Self> {
        let (m, n) = (a.rows(), a.cols());

        if con_lower.len() != m || con_upper.len() != m {
            return Err(DetectError::InvalidProblem(format!(
                "constraint bounds have lengths {}/{} but matrix has {} rows",
                con_lower.len(),
                con_upper.len(),
                m
            )));
        }
        if var_types.len() != n || var_lower.len() != n || var_upper.len() != n {
            return Err(DetectError::InvalidProblem(format!(
                "variable data has lengths {}/{}/{} but matrix has {} columns",
                var_types.len(),
                var_lower.len(),
                var_upper.len(),
                n
            )));
        }
        for i in 0..m {
            if con_lower[i] > con_upper[i] {
                return Err(DetectError::InvalidProblem(format!(
                    "constraint {} has lhs {} > rhs {}",
                    i, con_lower[i], con_upper[i]
                )));
            }
        }

        let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); m];
        for (&val, (row, col)) in a.iter() {
            if val != 0.0 {
                rows[row].push((col, val));
            }
        }

        let mut row_ptr = Vec::with_capacity(m + 1);
        let mut entries = Vec::with_capacity(a.nnz());
        row_ptr.push(0);
        for mut row in rows {
            row.sort_by_key(|&(var, _)| var);
            entries.extend(row);
            row_ptr.push(entries.len());
        }

        Ok(Self {
            name: name.into(),
            row_ptr,
            entries,
            con_lower,
            con_upper,
            var_names: (0..n).map(|j| format!("x{}", j)).collect(),
            con_names: (0..m).map(|i| format!("c{}", i)).collect(),
            var_types,
            var_lower,
            var_upper,
            kind_hints: vec![None; m],
            aggregated: vec![false; n],
        })
    }

    /// Mark a variable as aggregated (it no longer counts as active).
    pub fn mark_aggregated(&mut self, var: usize) {
        self.aggregated[var] = true;
    }

    /// Fix a variable to a value.
    pub fn fix_var(&mut self, var: usize, value: f64) {
        self.var_lower[var] = value;
        self.var_upper[var] = value;
    }

    /// Record the host's kind for a constraint.
    pub fn set_cons_kind_hint(&mut self, cons: usize, kind: ConsKind) {
        self.kind_hints[cons] = Some(kind);
    }

    /// Number of stored nonzeros.
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }
}

impl ProblemSource for SparseProblem {
    fn problem_name(&self) -> &str {
        &self.name
    }

    fn num_vars(&self) -> usize {
        self.var_types.len()
    }

    fn num_conss(&self) -> usize {
        self.con_lower.len()
    }

    fn row(&self, cons: usize) -> &[(usize, f64)] {
        &self.entries[self.row_ptr[cons]..self.row_ptr[cons + 1]]
    }

    fn lhs(&self, cons: usize) -> f64 {
        self.con_lower[cons]
    }

    fn rhs(&self, cons: usize) -> f64 {
        self.con_upper[cons]
    }

    fn var_type(&self, var: usize) -> VarType {
        self.var_types[var]
    }

    fn is_active(&self, var: usize) -> bool {
        let fixed = self.var_lower[var].is_finite() && self.var_lower[var] == self.var_upper[var];
        !fixed && !self.aggregated[var]
    }

    fn cons_kind_hint(&self, cons: usize) -> Option<ConsKind> {
        self.kind_hints[cons]
    }

    fn var_name(&self, var: usize) -> String {
        self.var_names[var].clone()
    }

    fn cons_name(&self, cons: usize) -> String {
        self.con_names[cons].clone()
    }

    fn num_nonzeros(&self) -> usize {
        self.entries.len()
    }
}

/// Incremental builder for [`SparseProblem`].
#[derive(Debug, Clone, Default)]
pub struct SparseProblemBuilder {
    name: String,
    var_types: Vec<VarType>,
    var_lower: Vec<f64>,
    var_upper: Vec<f64>,
    var_names: Vec<String>,
    triplets: Vec<(usize, usize, f64)>,
    con_lower: Vec<f64>,
    con_upper: Vec<f64>,
    con_names: Vec<String>,
    kind_hints: Vec<(usize, ConsKind)>,
}

impl SparseProblemBuilder {
    /// Start an empty problem.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a variable, returning its index.
    pub fn add_var(&mut self, name: impl Into<String>, ty: VarType, lower: f64, upper: f64) -> usize {
        self.var_types.push(ty);
        self.var_lower.push(lower);
        self.var_upper.push(upper);
        self.var_names.push(name.into());
        self.var_types.len() - 1
    }

    /// Add a binary variable.
    pub fn add_binary(&mut self, name: impl Into<String>) -> usize {
        self.add_var(name, VarType::Binary, 0.0, 1.0)
    }

    /// Add a non-negative integer variable.
    pub fn add_integer(&mut self, name: impl Into<String>, upper: f64) -> usize {
        self.add_var(name, VarType::Integer, 0.0, upper)
    }

    /// Add a non-negative continuous variable.
    pub fn add_continuous(&mut self, name: impl Into<String>) -> usize {
        self.add_var(name, VarType::Continuous, 0.0, f64::INFINITY)
    }

    /// Add a row `lhs <= sum coef*x <= rhs`, returning its index.
    pub fn add_row(&mut self, name: impl Into<String>, coefs: &[(usize, f64)], lhs: f64, rhs: f64) -> usize {
        let row = self.con_lower.len();
        for &(var, coef) in coefs {
            self.triplets.push((row, var, coef));
        }
        self.con_lower.push(lhs);
        self.con_upper.push(rhs);
        self.con_names.push(name.into());
        row
    }

    /// Add `sum coef*x <= rhs`.
    pub fn add_le(&mut self, name: impl Into<String>, coefs: &[(usize, f64)], rhs: f64) -> usize {
        self.add_row(name, coefs, f64::NEG_INFINITY, rhs)
    }

    /// Add `sum coef*x >= lhs`.
    pub fn add_ge(&mut self, name: impl Into<String>, coefs: &[(usize, f64)], lhs: f64) -> usize {
        self.add_row(name, coefs, lhs, f64::INFINITY)
    }

    /// Add `sum coef*x = rhs`.
    pub fn add_eq(&mut self, name: impl Into<String>, coefs: &[(usize, f64)], rhs: f64) -> usize {
        self.add_row(name, coefs, rhs, rhs)
    }

    /// Tag the last added row with a host constraint kind.
    pub fn hint_last_row(&mut self, kind: ConsKind) {
        if let Some(row) = self.con_lower.len().checked_sub(1) {
            self.kind_hints.push((row, kind));
        }
    }

    /// Number of variables added so far.
    pub fn num_vars(&self) -> usize {
        self.var_types.len()
    }

    /// Finish the problem.
    pub fn build(self) -> DetectResult<SparseProblem> {
        let m = self.con_lower.len();
        let n = self.var_types.len();

        let mut tri = TriMat::new((m, n));
        for (row, col, val) in self.triplets {
            if col >= n {
                return Err(DetectError::InvalidProblem(format!(
                    "row {} references variable {} but only {} variables exist",
                    row, col, n
                )));
            }
            tri.add_triplet(row, col, val);
        }
        let a: SparseCsc = tri.to_csc();

        let mut prob = SparseProblem::from_csc(
            self.name,
            &a,
            self.con_lower,
            self.con_upper,
            self.var_types,
            self.var_lower,
            self.var_upper,
        )?;
        prob.var_names = self.var_names;
        prob.con_names = self.con_names;
        for (row, kind) in self.kind_hints {
            prob.set_cons_kind_hint(row, kind);
        }
        Ok(prob)
    }
}
