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
use crate::math::cap_add;
use crate::math::cap_sub;
use crate::math::INT64_MAX;
use crate::math::INT64_MIN;

/// Propagator for the constraint `\sum x_i <= c`.
///
/// The lower bound of the left-hand side is maintained incrementally in a
/// reversible cell; when the initial bound computation saturates, the
/// propagator switches to recomputing the sum every pass instead of applying
/// deltas, since deltas on a clamped value drift.
#[derive(Clone, Debug)]
pub(crate) struct LinearLessOrEqualPropagator<Var> {
    x: Box<[Var]>,
    c: i64,
    /// The lower bound of the sum of the left-hand side. This is incremental
    /// state.
    lower_bound_left_hand_side: StatefulInt,
    /// The value at index `i` is the cached lower bound for `x[i]`.
    current_bounds: Box<[StatefulInt]>,
    /// Set when the initial sum saturated; disables the delta path.
    recompute_every_pass: bool,
}

impl<Var> LinearLessOrEqualPropagator<Var>
where
    Var: IntegerVariable,
{
    pub(crate) fn new(x: Box<[Var]>, c: i64) -> Self {
        // incremental state is initialised in `Propagator::post`.
        LinearLessOrEqualPropagator {
            x,
            c,
            lower_bound_left_hand_side: StatefulInt::default(),
            current_bounds: Box::default(),
            recompute_every_pass: false,
        }
    }

    fn sum_of_lower_bounds(&self, context: &PropagationContextMut<'_>) -> i64 {
        self.x
            .iter()
            .fold(0, |sum, x_i| cap_add(sum, context.lower_bound(x_i)))
    }

    fn prune(&self, context: &mut PropagationContextMut<'_>, sum: i64) -> PropagationStatus {
        if sum > self.c {
            return Err(Inconsistency::Conflict);
        }

        for x_i in self.x.iter() {
            let residual = cap_sub(sum, context.lower_bound(x_i));
            let bound = cap_sub(self.c, residual);

            if context.upper_bound(x_i) > bound {
                context.set_upper_bound(x_i, bound)?;
            }
        }

        Ok(())
    }
}

impl<Var: 'static> Propagator for LinearLessOrEqualPropagator<Var>
where
    Var: IntegerVariable,
{
    fn name(&self) -> &str {
        "LinearLeq"
    }

    fn post(&mut self, context: &mut PostContext<'_>) {
        let mut lower_bound_left_hand_side = 0_i64;
        self.current_bounds = self
            .x
            .iter()
            .enumerate()
            .map(|(i, x_i)| {
                let _ = context.register(
                    x_i,
                    DomainEvents::LOWER_BOUND,
                    LocalId::from(i as u32),
                    Priority::Normal,
                );
                let bound = x_i.lower_bound(context.assignments);
                lower_bound_left_hand_side = cap_add(lower_bound_left_hand_side, bound);
                context.new_stateful_int(bound)
            })
            .collect_vec()
            .into();

        self.recompute_every_pass =
            lower_bound_left_hand_side == INT64_MAX || lower_bound_left_hand_side == INT64_MIN;
        self.lower_bound_left_hand_side = context.new_stateful_int(lower_bound_left_hand_side);
    }

    fn initial_propagate(&mut self, mut context: PropagationContextMut<'_>) -> PropagationStatus {
        let sum = self.sum_of_lower_bounds(&context);
        self.prune(&mut context, sum)
    }

    fn propagate(
        &mut self,
        mut context: PropagationContextMut<'_>,
        demon: LocalId,
    ) -> PropagationStatus {
        let sum = if self.recompute_every_pass {
            self.sum_of_lower_bounds(&context)
        } else {
            let index = demon.unpack() as usize;
            let old_bound = context.value(self.current_bounds[index]);
            let new_bound = context.lower_bound(&self.x[index]);

            if new_bound > old_bound {
                context.add_assign(self.lower_bound_left_hand_side, new_bound - old_bound);
                context.assign(self.current_bounds[index], new_bound);
            }

            context.value(self.lower_bound_left_hand_side)
        };

        self.prune(&mut context, sum)
    }
}

/// Propagator for the constraint `\sum x_i == c`, obtained by pruning against
/// both the lower and the upper bound sums every pass.
#[derive(Clone, Debug)]
pub(crate) struct LinearEqualPropagator<Var> {
    x: Box<[Var]>,
    c: i64,
}

impl<Var> LinearEqualPropagator<Var>
where
    Var: IntegerVariable,
{
    pub(crate) fn new(x: Box<[Var]>, c: i64) -> Self {
        LinearEqualPropagator { x, c }
    }
}

impl<Var: 'static> Propagator for LinearEqualPropagator<Var>
where
    Var: IntegerVariable,
{
    fn name(&self) -> &str {
        "LinearEq"
    }

    fn post(&mut self, context: &mut PostContext<'_>) {
        self.x.iter().enumerate().for_each(|(i, x_i)| {
            let _ = context.register(
                x_i,
                DomainEvents::RANGE,
                LocalId::from(i as u32),
                Priority::Normal,
            );
        });
    }

    fn initial_propagate(&mut self, mut context: PropagationContextMut<'_>) -> PropagationStatus {
        let lower_bound_sum = self
            .x
            .iter()
            .fold(0, |sum, x_i| cap_add(sum, context.lower_bound(x_i)));
        let upper_bound_sum = self
            .x
            .iter()
            .fold(0, |sum, x_i| cap_add(sum, context.upper_bound(x_i)));

        if lower_bound_sum > self.c || upper_bound_sum < self.c {
            return Err(Inconsistency::Conflict);
        }

        for x_i in self.x.iter() {
            // The residual sums with x_i taken out bound its feasible range.
            let residual_min = cap_sub(lower_bound_sum, context.lower_bound(x_i));
            let residual_max = cap_sub(upper_bound_sum, context.upper_bound(x_i));

            context.set_lower_bound(x_i, cap_sub(self.c, residual_max))?;
            context.set_upper_bound(x_i, cap_sub(self.c, residual_min))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_solver::TestSolver;

    #[test]
    fn bounds_are_propagated_for_leq() {
        let mut solver = TestSolver::default();
        let x = solver.new_variable(1, 5);
        let y = solver.new_variable(0, 10);

        solver
            .new_propagator(LinearLessOrEqualPropagator::new([x, y].into(), 7))
            .expect("no empty domains");

        solver.assert_bounds(&x, 1, 5);
        solver.assert_bounds(&y, 0, 6);
    }

    #[test]
    fn incremental_updates_reach_the_same_fixpoint() {
        let mut solver = TestSolver::default();
        let x = solver.new_variable(1, 5);
        let y = solver.new_variable(0, 10);

        solver
            .new_propagator(LinearLessOrEqualPropagator::new([x, y].into(), 7))
            .expect("no empty domains");

        solver.set_lower_bound(x, 4).expect("non-empty domain");
        solver.propagate().expect("non-empty domain");

        solver.assert_bounds(&y, 0, 3);
    }

    #[test]
    fn violated_leq_fails() {
        let mut solver = TestSolver::default();
        let x = solver.new_variable(5, 5);
        let y = solver.new_variable(3, 3);

        let result = solver.new_propagator(LinearLessOrEqualPropagator::new([x, y].into(), 7));
        assert!(result.is_err());
    }

    #[test]
    fn saturating_bounds_do_not_prune_spuriously() {
        let mut solver = TestSolver::default();
        let x = solver.new_variable(INT64_MIN, INT64_MIN);
        let y = solver.new_variable(-1, -1);

        solver
            .new_propagator(LinearLessOrEqualPropagator::new([x, y].into(), INT64_MIN))
            .expect("the clamped sum stays below the right-hand side");
    }

    #[test]
    fn equality_prunes_both_sides() {
        let mut solver = TestSolver::default();
        let a = solver.new_variable(0, 10);
        let b = solver.new_variable(0, 10);

        solver
            .new_propagator(LinearEqualPropagator::new([a, b].into(), 7))
            .expect("no empty domains");

        solver.assert_bounds(&a, 0, 7);
        solver.assert_bounds(&b, 0, 7);

        solver.set_lower_bound(a, 5).expect("non-empty domain");
        solver.propagate().expect("non-empty domain");

        solver.assert_bounds(&b, 0, 2);
    }
}
