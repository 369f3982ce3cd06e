//! The outcomes of a call to [`Solver::satisfy`](crate::Solver::satisfy) and
//! of solution iteration.

pub mod solution_iterator;

use crate::basic_types::Solution;

/// The result of a call to [`Solver::satisfy`](crate::Solver::satisfy).
#[derive(Debug)]
pub enum SatisfactionResult {
    /// A solution was found; the solver state has been restored to the root.
    Satisfiable(Solution),
    /// There is no solution to the problem.
    Unsatisfiable,
    /// It is not known whether a solution exists; the termination condition
    /// triggered before the search tree was exhausted. This is distinct from
    /// [`SatisfactionResult::Unsatisfiable`].
    Unknown,
}
