use thiserror::Error;

/// Errors related to adding constraints to the solver.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstraintOperationError {
    /// The constraint was found to be inconsistent with the root-level domains
    /// while it was being posted.
    #[error("Adding the constraint led to a root-level conflict")]
    InfeasibleConstraint,
    /// A constraint was posted while the solver is already in an infeasible
    /// state.
    #[error("Adding a constraint to an infeasible solver")]
    InfeasibleState,
}
