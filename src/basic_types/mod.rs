mod constraint_operation_error;
mod hash_structures;
mod inconsistency;
mod solution;
mod trail;

pub use constraint_operation_error::ConstraintOperationError;
pub(crate) use hash_structures::*;
pub use inconsistency::EmptyDomain;
pub use inconsistency::Inconsistency;
pub use inconsistency::PropagationStatus;
pub use solution::ProblemSolution;
pub use solution::Solution;
pub use solution::SolutionReference;
pub(crate) use trail::Trail;
