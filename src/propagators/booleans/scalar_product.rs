use itertools::Itertools;

use crate::basic_types::Inconsistency;
use crate::basic_types::PropagationStatus;
use crate::engine::domain_events::DomainEvents;
use crate::engine::propagation::contexts::PropagationContextMut;
use crate::engine::propagation::LocalId;
use crate::engine::propagation::PostContext;
use crate::engine::propagation::Priority;
use crate::engine::propagation::Propagator;
use crate::engine::propagation::ReadDomains;
use crate::engine::stateful::StatefulInt;
use crate::engine::variables::IntegerVariable;
use crate::engine::variables::Literal;
use crate::gourd_assert_simple;
use crate::math::cap_add;
use crate::math::cap_sub;

/// Shared bookkeeping of the positive Boolean scalar products: the sum of
/// coefficients whose literal is fixed to true, the sum of coefficients whose
/// literal can still be true, and the index of the highest unfixed literal.
/// Coefficients are sorted ascending, so walking down from the top visits the
/// largest remaining coefficients first.
#[derive(Clone, Debug)]
struct ScalarProductState {
    sum_of_ones: StatefulInt,
    sum_possible: StatefulInt,
    top_index: StatefulInt,
    /// Per literal: 0 while free, 1 once counted true, -1 once counted false.
    counted: Box<[StatefulInt]>,
}

impl ScalarProductState {
    fn post(context: &mut PostContext<'_>, num_literals: usize, coefficient_sum: i64) -> Self {
        ScalarProductState {
            sum_of_ones: context.new_stateful_int(0),
            sum_possible: context.new_stateful_int(coefficient_sum),
            top_index: context.new_stateful_int(num_literals as i64 - 1),
            counted: (0..num_literals)
                .map(|_| context.new_stateful_int(0))
                .collect_vec()
                .into(),
        }
    }

    /// Fold the literal at `index` into the counters if it has become fixed,
    /// once.
    fn count_fixed(
        &self,
        context: &mut PropagationContextMut<'_>,
        literals: &[Literal],
        coefficients: &[i64],
        index: usize,
    ) {
        if context.value(self.counted[index]) != 0 {
            return;
        }
        let literal = &literals[index];
        if literal.lower_bound(context.assignments) == 1 {
            context.add_assign(self.sum_of_ones, coefficients[index]);
            context.assign(self.counted[index], 1);
        } else if literal.upper_bound(context.assignments) == 0 {
            context.add_assign(self.sum_possible, -coefficients[index]);
            context.assign(self.counted[index], -1);
        }
    }

    /// Move the top index down past fixed literals and return it.
    fn settle_top(&self, context: &mut PropagationContextMut<'_>, literals: &[Literal]) -> i64 {
        let mut top = context.value(self.top_index);
        while top >= 0 && context.is_fixed(&literals[top as usize]) {
            top -= 1;
        }
        context.assign(self.top_index, top);
        top
    }
}

/// Propagator for `\sum c_i * b_i <= rhs` with positive coefficients over
/// Boolean variables. Whenever the remaining slack drops below the largest
/// remaining coefficient, every literal whose coefficient exceeds the slack is
/// forced to false.
#[derive(Clone, Debug)]
pub(crate) struct PositiveBooleanScalarProductLeqPropagator {
    literals: Box<[Literal]>,
    coefficients: Box<[i64]>,
    rhs: i64,
    state: Option<ScalarProductState>,
}

impl PositiveBooleanScalarProductLeqPropagator {
    /// The coefficients must be positive and sorted ascending; the
    /// normalization pass in the constraint factory takes care of this.
    pub(crate) fn new(literals: Box<[Literal]>, coefficients: Box<[i64]>, rhs: i64) -> Self {
        gourd_assert_simple!(literals.len() == coefficients.len());
        gourd_assert_simple!(coefficients.windows(2).all(|w| w[0] <= w[1]));
        gourd_assert_simple!(coefficients.iter().all(|&c| c > 0));

        PositiveBooleanScalarProductLeqPropagator {
            literals,
            coefficients,
            rhs,
            state: None,
        }
    }

    fn enforce(&self, context: &mut PropagationContextMut<'_>) -> PropagationStatus {
        let state = self.state.as_ref().unwrap();

        let sum_of_ones = context.value(state.sum_of_ones);
        if sum_of_ones > self.rhs {
            return Err(Inconsistency::Conflict);
        }
        let slack = cap_sub(self.rhs, sum_of_ones);

        let mut top = state.settle_top(context, &self.literals);
        while top >= 0 && self.coefficients[top as usize] > slack {
            context.set_upper_bound(&self.literals[top as usize], 0)?;
            top -= 1;
            while top >= 0 && context.is_fixed(&self.literals[top as usize]) {
                top -= 1;
            }
        }
        context.assign(state.top_index, top);

        Ok(())
    }
}

impl Propagator for PositiveBooleanScalarProductLeqPropagator {
    fn name(&self) -> &str {
        "PositiveBooleanScalProdLeq"
    }

    fn post(&mut self, context: &mut PostContext<'_>) {
        self.literals.iter().enumerate().for_each(|(i, literal)| {
            let _ = context.register(
                literal,
                DomainEvents::ASSIGN,
                LocalId::from(i as u32),
                Priority::Normal,
            );
        });

        let coefficient_sum = self.coefficients.iter().fold(0, |sum, &c| cap_add(sum, c));
        self.state = Some(ScalarProductState::post(
            context,
            self.literals.len(),
            coefficient_sum,
        ));
    }

    fn initial_propagate(&mut self, mut context: PropagationContextMut<'_>) -> PropagationStatus {
        let state = self.state.as_ref().unwrap().clone();
        for index in 0..self.literals.len() {
            state.count_fixed(&mut context, &self.literals, &self.coefficients, index);
        }
        self.enforce(&mut context)
    }

    fn propagate(
        &mut self,
        mut context: PropagationContextMut<'_>,
        demon: LocalId,
    ) -> PropagationStatus {
        let state = self.state.as_ref().unwrap().clone();
        state.count_fixed(
            &mut context,
            &self.literals,
            &self.coefficients,
            demon.unpack() as usize,
        );
        self.enforce(&mut context)
    }
}

/// Propagator for `\sum c_i * b_i == target` with positive coefficients over
/// Boolean variables; the slack is two-sided.
#[derive(Clone, Debug)]
pub(crate) struct PositiveBooleanScalarProductEqualPropagator<Target> {
    literals: Box<[Literal]>,
    coefficients: Box<[i64]>,
    target: Target,
    state: Option<ScalarProductState>,
}

impl<Target> PositiveBooleanScalarProductEqualPropagator<Target>
where
    Target: IntegerVariable,
{
    /// The coefficients must be positive and sorted ascending.
    pub(crate) fn new(literals: Box<[Literal]>, coefficients: Box<[i64]>, target: Target) -> Self {
        gourd_assert_simple!(literals.len() == coefficients.len());
        gourd_assert_simple!(coefficients.windows(2).all(|w| w[0] <= w[1]));
        gourd_assert_simple!(coefficients.iter().all(|&c| c > 0));

        PositiveBooleanScalarProductEqualPropagator {
            literals,
            coefficients,
            target,
            state: None,
        }
    }

    fn target_local(&self) -> u32 {
        self.literals.len() as u32
    }

    fn enforce(&self, context: &mut PropagationContextMut<'_>) -> PropagationStatus {
        let state = self.state.as_ref().unwrap();

        let sum_of_ones = context.value(state.sum_of_ones);
        let sum_possible = context.value(state.sum_possible);

        context.set_lower_bound(&self.target, sum_of_ones)?;
        context.set_upper_bound(&self.target, sum_possible)?;

        let target_min = context.lower_bound(&self.target);
        let target_max = context.upper_bound(&self.target);

        let mut index = state.settle_top(context, &self.literals);
        while index >= 0 {
            let i = index as usize;
            if !context.is_fixed(&self.literals[i]) {
                let coefficient = self.coefficients[i];
                if cap_add(sum_of_ones, coefficient) > target_max {
                    // Adding this coefficient overshoots the target.
                    context.set_upper_bound(&self.literals[i], 0)?;
                } else if cap_sub(sum_possible, coefficient) < target_min {
                    // Dropping this coefficient makes the target unreachable.
                    context.set_lower_bound(&self.literals[i], 1)?;
                } else {
                    // Smaller coefficients cannot trigger either rule.
                    break;
                }
            }
            index -= 1;
        }

        Ok(())
    }
}

impl<Target: 'static> Propagator for PositiveBooleanScalarProductEqualPropagator<Target>
where
    Target: IntegerVariable,
{
    fn name(&self) -> &str {
        "PositiveBooleanScalProdEq"
    }

    fn post(&mut self, context: &mut PostContext<'_>) {
        self.literals.iter().enumerate().for_each(|(i, literal)| {
            let _ = context.register(
                literal,
                DomainEvents::ASSIGN,
                LocalId::from(i as u32),
                Priority::Normal,
            );
        });
        let _ = context.register(
            &self.target,
            DomainEvents::RANGE,
            LocalId::from(self.target_local()),
            Priority::Normal,
        );

        let coefficient_sum = self.coefficients.iter().fold(0, |sum, &c| cap_add(sum, c));
        self.state = Some(ScalarProductState::post(
            context,
            self.literals.len(),
            coefficient_sum,
        ));
    }

    fn initial_propagate(&mut self, mut context: PropagationContextMut<'_>) -> PropagationStatus {
        let state = self.state.as_ref().unwrap().clone();
        for index in 0..self.literals.len() {
            state.count_fixed(&mut context, &self.literals, &self.coefficients, index);
        }
        self.enforce(&mut context)
    }

    fn propagate(
        &mut self,
        mut context: PropagationContextMut<'_>,
        demon: LocalId,
    ) -> PropagationStatus {
        let state = self.state.as_ref().unwrap().clone();
        if demon.unpack() != self.target_local() {
            state.count_fixed(
                &mut context,
                &self.literals,
                &self.coefficients,
                demon.unpack() as usize,
            );
        }
        self.enforce(&mut context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_solver::TestSolver;

    #[test]
    fn a_too_large_coefficient_fails() {
        let mut solver = TestSolver::default();
        let literals: Vec<_> = (0..4).map(|_| solver.new_literal()).collect();

        solver
            .new_propagator(PositiveBooleanScalarProductLeqPropagator::new(
                literals.clone().into_boxed_slice(),
                [1, 2, 4, 8].into(),
                7,
            ))
            .expect("no empty domains");

        // The coefficient 8 exceeds the slack outright.
        assert_eq!(0, solver.upper_bound(&literals[3]));

        solver.set_literal(literals[1], true).expect("non-empty");
        solver.propagate().expect("consistent");

        // Slack is now 5; the remaining coefficients 1 and 4 still fit.
        assert_eq!(1, solver.upper_bound(&literals[0]));
        assert_eq!(1, solver.upper_bound(&literals[2]));
    }

    #[test]
    fn free_literals_within_the_slack_are_not_forced() {
        let mut solver = TestSolver::default();
        let literals: Vec<_> = (0..3).map(|_| solver.new_literal()).collect();

        solver
            .new_propagator(PositiveBooleanScalarProductLeqPropagator::new(
                literals.clone().into_boxed_slice(),
                [1, 2, 4].into(),
                7,
            ))
            .expect("no empty domains");

        for literal in &literals {
            assert_eq!(0, solver.lower_bound(literal));
            assert_eq!(1, solver.upper_bound(literal));
        }
    }

    #[test]
    fn overshooting_the_fixed_sum_fails() {
        let mut solver = TestSolver::default();
        let literals: Vec<_> = (0..4).map(|_| solver.new_literal()).collect();

        solver
            .new_propagator(PositiveBooleanScalarProductLeqPropagator::new(
                literals.clone().into_boxed_slice(),
                [1, 2, 4, 8].into(),
                7,
            ))
            .expect("no empty domains");

        // Literal 3 was already forced to false when the constraint was
        // posted, so re-fixing it to true is a direct contradiction.
        assert!(solver.set_literal(literals[3], true).is_err());
    }

    #[test]
    fn the_two_sided_slack_squeezes_the_target() {
        let mut solver = TestSolver::default();
        let literals: Vec<_> = (0..3).map(|_| solver.new_literal()).collect();
        let target = solver.new_variable(0, 100);

        solver
            .new_propagator(PositiveBooleanScalarProductEqualPropagator::new(
                literals.clone().into_boxed_slice(),
                [2, 3, 5].into(),
                target,
            ))
            .expect("no empty domains");

        solver.assert_bounds(&target, 0, 10);

        solver.set_literal(literals[2], true).expect("non-empty");
        solver.propagate().expect("consistent");
        solver.assert_bounds(&target, 5, 10);
    }

    #[test]
    fn an_unreachable_target_forces_the_large_coefficients() {
        let mut solver = TestSolver::default();
        let literals: Vec<_> = (0..3).map(|_| solver.new_literal()).collect();
        let target = solver.new_variable(9, 10);

        solver
            .new_propagator(PositiveBooleanScalarProductEqualPropagator::new(
                literals.clone().into_boxed_slice(),
                [2, 3, 5].into(),
                target,
            ))
            .expect("no empty domains");

        // Without the coefficient 5 the maximum reachable sum is 5 < 9.
        assert_eq!(1, solver.lower_bound(&literals[2]));
    }
}
