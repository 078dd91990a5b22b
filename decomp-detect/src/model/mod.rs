//! Constraint matrix access for the detectors.
//!
//! The detectors never own the problem: they read it through
//! [`ProblemSource`], optionally restricted by a [`DetectionScope`].

mod classify;
mod problem;
mod view;

pub use classify::{classify_constraint, ConsKind};
pub use problem::{ProblemSource, SparseCsc, SparseProblem, SparseProblemBuilder, VarType};
pub use view::{DetectionScope, ProblemView};
