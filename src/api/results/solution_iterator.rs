use crate::api::Solver;
use crate::basic_types::Solution;
use crate::basic_types::SolutionReference;
use crate::branching::Brancher;
use crate::engine::kernel::CoreSolveResult;
use crate::engine::termination::TerminationCondition;

/// A struct which allows the retrieval of multiple solutions to a problem.
/// After a solution is found, the next call resumes the search at the point
/// where that solution was found, so each solution is enumerated once.
#[derive(Debug)]
pub struct SolutionIterator<'solver, 'brancher, 'termination, B: Brancher, T> {
    solver: &'solver mut Solver,
    brancher: &'brancher mut B,
    termination: &'termination mut T,
    has_solution: bool,
    finished: bool,
}

/// The result of a call to [`SolutionIterator::next_solution`].
#[derive(Debug)]
pub enum IteratedSolution {
    /// A new solution was identified.
    Solution(Solution),
    /// No more solutions exist.
    Finished,
    /// The problem has no solution at all.
    Unsatisfiable,
    /// The termination condition triggered before the search finished.
    Unknown,
}

impl<'solver, 'brancher, 'termination, B, T> SolutionIterator<'solver, 'brancher, 'termination, B, T>
where
    B: Brancher,
    T: TerminationCondition,
{
    pub(crate) fn new(
        solver: &'solver mut Solver,
        brancher: &'brancher mut B,
        termination: &'termination mut T,
    ) -> Self {
        SolutionIterator {
            solver,
            brancher,
            termination,
            has_solution: false,
            finished: false,
        }
    }

    /// Find a new solution.
    pub fn next_solution(&mut self) -> IteratedSolution {
        if self.finished {
            return IteratedSolution::Finished;
        }

        // Resume past the previous solution by refuting its last decision.
        if self.has_solution && !self.solver.kernel_mut().resolve_conflict(self.brancher) {
            self.finished = true;
            return IteratedSolution::Finished;
        }

        match self
            .solver
            .kernel_mut()
            .solve_internal(self.brancher, self.termination)
        {
            CoreSolveResult::Satisfiable => {
                self.has_solution = true;
                let assignments = &self.solver.kernel().assignments;
                self.brancher
                    .on_solution(SolutionReference::new(assignments));
                IteratedSolution::Solution(Solution::new(assignments.clone()))
            }
            CoreSolveResult::Unsatisfiable => {
                self.finished = true;
                if self.has_solution {
                    IteratedSolution::Finished
                } else {
                    IteratedSolution::Unsatisfiable
                }
            }
            CoreSolveResult::Unknown => IteratedSolution::Unknown,
        }
    }
}

impl<B: Brancher, T> Drop for SolutionIterator<'_, '_, '_, B, T> {
    fn drop(&mut self) {
        // Leave the solver in the root state for subsequent operations.
        self.solver.kernel_mut().backtrack_to_root(self.brancher);
    }
}
