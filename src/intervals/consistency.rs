use crate::basic_types::PropagationStatus;
use crate::engine::domain_events::DomainEvents;
use crate::engine::propagation::contexts::PropagationContextMut;
use crate::engine::propagation::LocalId;
use crate::engine::propagation::PostContext;
use crate::engine::propagation::Priority;
use crate::engine::propagation::Propagator;
use crate::engine::propagation::ReadDomains;
use crate::engine::variables::IntegerVariable;
use crate::intervals::Interval;
use crate::math::cap_add;
use crate::math::cap_sub;

/// Maintains the internal consistency of one interval variable: the three
/// ranges are projected onto `start + duration = end` on every push, and an
/// optional interval whose ranges can no longer fit flips to unperformed.
#[derive(Clone, Debug)]
pub(crate) struct IntervalConsistencyPropagator {
    interval: Interval,
}

impl IntervalConsistencyPropagator {
    pub(crate) fn new(interval: Interval) -> Self {
        IntervalConsistencyPropagator { interval }
    }
}

impl Propagator for IntervalConsistencyPropagator {
    fn name(&self) -> &str {
        "IntervalConsistency"
    }

    fn post(&mut self, context: &mut PostContext<'_>) {
        let demon = context.register(
            &self.interval.start,
            DomainEvents::RANGE,
            LocalId::from(0),
            Priority::Var,
        );
        context.watch_with(demon, &self.interval.duration, DomainEvents::RANGE);
        context.watch_with(demon, &self.interval.end, DomainEvents::RANGE);
        context.watch_with(demon, &self.interval.performed, DomainEvents::ASSIGN);
    }

    fn initial_propagate(&mut self, mut context: PropagationContextMut<'_>) -> PropagationStatus {
        let interval = self.interval;

        if interval.performed.upper_bound(context.assignments) == 0 {
            return Ok(());
        }

        let mut start_min = context.lower_bound(&interval.start);
        let mut start_max = context.upper_bound(&interval.start);
        let mut duration_min = context.lower_bound(&interval.duration);
        let mut duration_max = context.upper_bound(&interval.duration);
        let mut end_min = context.lower_bound(&interval.end);
        let mut end_max = context.upper_bound(&interval.end);

        // Refine each of the three ranges from the other two until nothing
        // moves.
        loop {
            let mut changed = false;
            let mut tighten = |bound: &mut i64, candidate: i64, is_min: bool| {
                if is_min && candidate > *bound || !is_min && candidate < *bound {
                    *bound = candidate;
                    changed = true;
                }
            };

            tighten(&mut end_min, cap_add(start_min, duration_min), true);
            tighten(&mut end_max, cap_add(start_max, duration_max), false);
            tighten(&mut start_min, cap_sub(end_min, duration_max), true);
            tighten(&mut start_max, cap_sub(end_max, duration_min), false);
            tighten(&mut duration_min, cap_sub(end_min, start_max), true);
            tighten(&mut duration_max, cap_sub(end_max, start_min), false);

            if !changed {
                break;
            }
        }

        if start_min > start_max || duration_min > duration_max || end_min > end_max {
            // An empty range on an optional interval means it is not
            // performed; on a mandatory one this write fails.
            return context
                .set_upper_bound(&interval.performed, 0)
                .map_err(Into::into);
        }

        context.set_bounds(&interval.start, start_min, start_max)?;
        context.set_bounds(&interval.duration, duration_min, duration_max)?;
        context.set_bounds(&interval.end, end_min, end_max)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_solver::TestSolver;
    use crate::engine::variables::Literal;

    fn new_interval(
        solver: &mut TestSolver,
        start: (i64, i64),
        duration: (i64, i64),
        end: (i64, i64),
        optional: bool,
    ) -> Interval {
        let start = solver.new_variable(start.0, start.1);
        let duration = solver.new_variable(duration.0, duration.1);
        let end = solver.new_variable(end.0, end.1);
        let performed = if optional {
            solver.new_literal()
        } else {
            Literal::new(solver.new_variable(1, 1))
        };
        let interval = Interval {
            start,
            duration,
            end,
            performed,
        };
        solver
            .new_propagator(IntervalConsistencyPropagator::new(interval))
            .expect("no root conflict");
        interval
    }

    #[test]
    fn initial_projection_tightens_the_end() {
        let mut solver = TestSolver::default();
        let interval = new_interval(&mut solver, (0, 10), (3, 5), (0, 20), true);

        solver.assert_bounds(&interval.start, 0, 10);
        solver.assert_bounds(&interval.duration, 3, 5);
        solver.assert_bounds(&interval.end, 3, 15);
    }

    #[test]
    fn tightening_the_end_pushes_start_and_duration() {
        let mut solver = TestSolver::default();
        let interval = new_interval(&mut solver, (0, 10), (3, 5), (0, 20), true);

        solver.set_upper_bound(interval.end, 4).expect("non-empty");
        solver.propagate().expect("consistent");

        solver.assert_bounds(&interval.start, 0, 1);
        solver.assert_bounds(&interval.duration, 3, 4);
        solver.assert_bounds(&interval.end, 3, 4);
    }

    #[test]
    fn an_impossible_optional_interval_becomes_unperformed() {
        let mut solver = TestSolver::default();
        let interval = new_interval(&mut solver, (0, 2), (10, 10), (0, 5), true);

        assert_eq!(0, solver.upper_bound(&interval.performed));
    }

    #[test]
    fn an_impossible_mandatory_interval_fails() {
        let mut solver = TestSolver::default();

        let start = solver.new_variable(0, 2);
        let duration = solver.new_variable(10, 10);
        let end = solver.new_variable(0, 5);
        let performed = Literal::new(solver.new_variable(1, 1));
        let interval = Interval {
            start,
            duration,
            end,
            performed,
        };

        let result = solver.new_propagator(IntervalConsistencyPropagator::new(interval));
        assert!(result.is_err());
    }
}
