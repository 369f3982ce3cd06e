//! # Gourd
//!
//! Gourd is a finite-domain constraint programming core for combinatorial
//! search: vehicle routing, scheduling with resource and precedence
//! constraints, and packing problems. It provides the propagation kernel that
//! keeps integer, interval, and sequence variables bound-consistent under a
//! network of constraints, with every mutation journaled on a trail so the
//! whole state is reversible across branching decisions.
//!
//! # Using the solver
//! The first step to solving a problem is **adding variables**:
//! ```rust
//! # use gourd_solver::Solver;
//! let mut solver = Solver::default();
//!
//! let a = solver.new_bounded_integer(0, 10);
//! let b = solver.new_bounded_integer(0, 10);
//! ```
//!
//! Then we can **add constraints**:
//! ```rust
//! # use gourd_solver::Solver;
//! # use gourd_solver::constraints;
//! # let mut solver = Solver::default();
//! # let a = solver.new_bounded_integer(0, 10);
//! # let b = solver.new_bounded_integer(0, 10);
//! // a + b = 7
//! solver
//!     .add_constraint(constraints::equals(vec![a, b], 7))
//!     .post()
//!     .expect("the constraint is consistent at the root");
//! ```
//!
//! **Finding a solution** requires a decision builder and a termination
//! condition, which determine the search strategy and when the solver gives
//! up:
//! ```rust
//! # use gourd_solver::Solver;
//! # use gourd_solver::constraints;
//! # use gourd_solver::results::SatisfactionResult;
//! # use gourd_solver::termination::Indefinite;
//! # use gourd_solver::ProblemSolution;
//! # let mut solver = Solver::default();
//! # let a = solver.new_bounded_integer(0, 10);
//! # let b = solver.new_bounded_integer(0, 10);
//! # solver.add_constraint(constraints::equals(vec![a, b], 7)).post().unwrap();
//! let mut brancher = solver.default_brancher();
//! let mut termination = Indefinite;
//!
//! match solver.satisfy(&mut brancher, &mut termination) {
//!     SatisfactionResult::Satisfiable(solution) => {
//!         assert_eq!(7, solution.get_integer_value(a) + solution.get_integer_value(b));
//!     }
//!     _ => panic!("this problem has a solution"),
//! }
//! ```
//!
//! ## Feature flags
//! - `debug-checks`: enable expensive internal assertions. Turning this on
//!   slows the solver down by orders of magnitude, so it is off by default.

pub mod asserts;
mod api;
mod assignment;
pub(crate) mod basic_types;
pub mod branching;
pub mod constraints;
pub mod containers;
pub(crate) mod engine;
pub mod intervals;
pub mod math;
pub mod model;
pub(crate) mod propagators;
pub mod sequences;
mod variable_names;

pub use api::Solver;
pub use assignment::Assignment;
pub use assignment::IntVarElement;
pub use assignment::IntervalElement;
pub use assignment::SequenceElement;
pub use basic_types::ConstraintOperationError;
pub use basic_types::EmptyDomain;
pub use basic_types::Inconsistency;
pub use basic_types::ProblemSolution;
pub use basic_types::Solution;
pub use basic_types::SolutionReference;
pub use engine::Assignments;

pub mod predicates {
    //! Atomic statements over integer variables, used to express decisions.
    pub use crate::engine::predicates::Predicate;
    pub use crate::engine::predicates::PredicateConstructor;
}

pub mod results {
    //! The outcomes of the search API.
    pub use crate::api::results::solution_iterator::IteratedSolution;
    pub use crate::api::results::solution_iterator::SolutionIterator;
    pub use crate::api::results::SatisfactionResult;
}

pub mod termination {
    //! Limit objects polled by the search driver.
    pub use crate::engine::termination::Combinator;
    pub use crate::engine::termination::DecisionBudget;
    pub use crate::engine::termination::Indefinite;
    pub use crate::engine::termination::TerminationCondition;
    pub use crate::engine::termination::TimeBudget;
}

pub mod variables {
    //! The integer variable machinery: concrete domains and the affine and
    //! Boolean views over them.
    pub use crate::engine::variables::AffineView;
    pub use crate::engine::variables::DomainId;
    pub use crate::engine::variables::IntegerVariable;
    pub use crate::engine::variables::Literal;
    pub use crate::engine::variables::TransformableVariable;
    pub use crate::engine::DomainEvent;
    pub use crate::engine::DomainEvents;
}
