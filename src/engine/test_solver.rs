#![cfg(test)]
//! This module exposes helpers that aid testing of propagators. The
//! [`TestSolver`] allows setting up specific scenarios under which to test the
//! various operations of a propagator.

use crate::basic_types::ConstraintOperationError;
use crate::basic_types::EmptyDomain;
use crate::basic_types::PropagationStatus;
use crate::branching::Brancher;
use crate::branching::SelectionContext;
use crate::engine::kernel::SolverKernel;
use crate::engine::predicates::Predicate;
use crate::engine::propagation::Propagator;
use crate::engine::variables::DomainId;
use crate::engine::variables::IntegerVariable;
use crate::engine::variables::Literal;

/// A container for variables and propagators, which drives the propagation
/// fixpoint without the search layer on top.
#[derive(Default)]
pub(crate) struct TestSolver {
    pub(crate) kernel: SolverKernel,
}

/// A [`Brancher`] which never takes a decision, for exercising backtracking in
/// isolation.
struct NoBrancher;

impl Brancher for NoBrancher {
    fn next_decision(&mut self, _context: &mut SelectionContext) -> Option<Predicate> {
        None
    }
}

impl TestSolver {
    pub(crate) fn new_variable(&mut self, lower_bound: i64, upper_bound: i64) -> DomainId {
        self.kernel.new_bounded_integer(lower_bound, upper_bound)
    }

    pub(crate) fn new_literal(&mut self) -> Literal {
        Literal::new(self.new_variable(0, 1))
    }

    pub(crate) fn new_propagator(
        &mut self,
        propagator: impl Propagator + 'static,
    ) -> Result<(), ConstraintOperationError> {
        self.kernel.add_propagator(propagator)
    }

    pub(crate) fn propagate(&mut self) -> PropagationStatus {
        self.kernel.propagate()
    }

    pub(crate) fn lower_bound<Var: IntegerVariable>(&self, var: &Var) -> i64 {
        var.lower_bound(&self.kernel.assignments)
    }

    pub(crate) fn upper_bound<Var: IntegerVariable>(&self, var: &Var) -> i64 {
        var.upper_bound(&self.kernel.assignments)
    }

    pub(crate) fn contains<Var: IntegerVariable>(&self, var: &Var, value: i64) -> bool {
        var.contains(&self.kernel.assignments, value)
    }

    pub(crate) fn set_lower_bound(
        &mut self,
        var: DomainId,
        bound: i64,
    ) -> Result<(), EmptyDomain> {
        self.kernel.assignments.tighten_lower_bound(var, bound)
    }

    pub(crate) fn set_upper_bound(
        &mut self,
        var: DomainId,
        bound: i64,
    ) -> Result<(), EmptyDomain> {
        self.kernel.assignments.tighten_upper_bound(var, bound)
    }

    pub(crate) fn set_value(&mut self, var: DomainId, value: i64) -> Result<(), EmptyDomain> {
        self.kernel.assignments.make_assignment(var, value)
    }

    pub(crate) fn set_literal(
        &mut self,
        literal: Literal,
        truth_value: bool,
    ) -> Result<(), EmptyDomain> {
        self.set_value(literal.domain_id(), truth_value as i64)
    }

    pub(crate) fn increase_decision_level(&mut self) {
        self.kernel.declare_new_decision_level();
    }

    pub(crate) fn backtrack(&mut self, level: usize) {
        self.kernel.backtrack(level, &mut NoBrancher);
    }

    pub(crate) fn assert_bounds<Var: IntegerVariable>(&self, var: &Var, lb: i64, ub: i64) {
        let actual_lb = self.lower_bound(var);
        let actual_ub = self.upper_bound(var);

        assert_eq!(
            (lb, ub), (actual_lb, actual_ub),
            "The expected bounds [{lb}..{ub}] did not match the actual bounds [{actual_lb}..{actual_ub}]"
        );
    }
}
