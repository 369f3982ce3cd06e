use crate::basic_types::SolutionReference;
use crate::branching::SelectionContext;
use crate::engine::predicates::Predicate;
use crate::engine::variables::DomainId;

/// A trait for defining a branching strategy, i.e. how the search proceeds
/// through the tree of decisions.
///
/// A decision is a pair of alternative mutations: the returned [`Predicate`]
/// is the left branch, and the kernel applies its negation as the right branch
/// when the left one fails. It is required that the decision shrinks the
/// domain of at least one variable, otherwise the search does not terminate.
pub trait Brancher {
    /// Returns the next decision, or [`None`] if all variables under
    /// consideration are assigned (in which case the current state is a
    /// solution).
    ///
    /// This method **cannot** perform the mutation itself; it only suggests it
    /// in the form of a [`Predicate`].
    fn next_decision(&mut self, context: &mut SelectionContext) -> Option<Predicate>;

    /// A function which is called after a conflict has been found and
    /// processed.
    fn on_conflict(&mut self) {}

    /// Called after the kernel backtracked to an earlier search node.
    fn on_backtrack(&mut self) {}

    /// This method is called when a solution is found.
    fn on_solution(&mut self, _solution: SolutionReference) {}

    /// A function which is called after a [`DomainId`] is unassigned during
    /// backtracking (i.e. it was fixed but is no longer). This method can be
    /// called multiple times in a single backtracking operation.
    fn on_unassign_integer(&mut self, _variable: DomainId, _value: i64) {}
}
