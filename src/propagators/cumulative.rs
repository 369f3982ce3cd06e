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
use crate::engine::variables::IntegerVariable;
use crate::gourd_assert_simple;

/// A task of the cumulative resource: a start variable with a fixed processing
/// time and a fixed demand.
#[derive(Clone, Debug)]
pub(crate) struct CumulativeTask<Var> {
    pub(crate) start: Var,
    pub(crate) duration: i64,
    pub(crate) demand: i64,
}

/// Time-table propagator for the cumulative constraint: the mandatory parts of
/// the tasks build a resource profile, overload of the profile fails, and a
/// task whose demand does not fit on top of a profile segment it must overlap
/// is pushed past that segment.
///
/// This is the redundant-constraint strength used by the non-overlap
/// propagator, one instance per axis.
#[derive(Clone, Debug)]
pub(crate) struct CumulativePropagator<Var> {
    tasks: Box<[CumulativeTask<Var>]>,
    capacity: i64,
}

impl<Var> CumulativePropagator<Var>
where
    Var: IntegerVariable,
{
    pub(crate) fn new(tasks: Box<[CumulativeTask<Var>]>, capacity: i64) -> Self {
        gourd_assert_simple!(tasks.iter().all(|task| task.duration >= 0));
        gourd_assert_simple!(tasks.iter().all(|task| task.demand >= 0));
        CumulativePropagator { tasks, capacity }
    }

    /// The mandatory part of a task, if it has one: the time range it covers
    /// under every remaining placement.
    fn mandatory_part(
        &self,
        context: &PropagationContextMut<'_>,
        task: &CumulativeTask<Var>,
    ) -> Option<(i64, i64)> {
        let latest_start = context.upper_bound(&task.start);
        let earliest_end = context.lower_bound(&task.start) + task.duration;
        (latest_start < earliest_end).then_some((latest_start, earliest_end))
    }

    /// The profile of mandatory demand over time, as maximal segments
    /// `(start, end, height)` with non-zero height.
    fn build_profile(&self, context: &PropagationContextMut<'_>) -> Vec<(i64, i64, i64)> {
        let mut deltas: Vec<(i64, i64)> = Vec::new();
        for task in self.tasks.iter() {
            if task.demand == 0 {
                continue;
            }
            if let Some((start, end)) = self.mandatory_part(context, task) {
                deltas.push((start, task.demand));
                deltas.push((end, -task.demand));
            }
        }
        deltas.sort_unstable();

        let mut profile = Vec::new();
        let mut height = 0;
        let mut previous_time = None;
        for (time, delta) in deltas {
            if let Some(previous) = previous_time {
                if previous < time && height > 0 {
                    profile.push((previous, time, height));
                }
            }
            height += delta;
            previous_time = Some(time);
        }
        profile
    }
}

impl<Var: 'static> Propagator for CumulativePropagator<Var>
where
    Var: IntegerVariable,
{
    fn name(&self) -> &str {
        "Cumulative"
    }

    fn post(&mut self, context: &mut PostContext<'_>) {
        self.tasks.iter().enumerate().for_each(|(i, task)| {
            let _ = context.register(
                &task.start,
                DomainEvents::RANGE,
                LocalId::from(i as u32),
                Priority::Normal,
            );
        });
    }

    fn initial_propagate(&mut self, mut context: PropagationContextMut<'_>) -> PropagationStatus {
        let profile = self.build_profile(&context);

        if profile.iter().any(|&(_, _, height)| height > self.capacity) {
            return Err(Inconsistency::Conflict);
        }

        // Push a task past the profile segments its demand does not fit on
        // top of, skipping segments its own mandatory part contributes to.
        let mandatory_parts = self
            .tasks
            .iter()
            .map(|task| self.mandatory_part(&context, task))
            .collect_vec();

        for (task, mandatory_part) in self.tasks.iter().zip(mandatory_parts) {
            if task.demand == 0 || task.duration == 0 {
                continue;
            }

            let mut earliest_start = context.lower_bound(&task.start);
            for &(segment_start, segment_end, height) in &profile {
                let own_contribution = mandatory_part
                    .is_some_and(|(start, end)| start < segment_end && segment_start < end);
                if own_contribution || height + task.demand <= self.capacity {
                    continue;
                }
                // The task cannot overlap this segment; if every placement
                // from its earliest start would, it has to wait the segment
                // out.
                if earliest_start + task.duration > segment_start && earliest_start < segment_end {
                    earliest_start = segment_end;
                }
            }
            context.set_lower_bound(&task.start, earliest_start)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_solver::TestSolver;

    #[test]
    fn an_overloaded_profile_fails() {
        let mut solver = TestSolver::default();
        let s0 = solver.new_variable(0, 0);
        let s1 = solver.new_variable(1, 1);

        let tasks = [
            CumulativeTask {
                start: s0,
                duration: 4,
                demand: 2,
            },
            CumulativeTask {
                start: s1,
                duration: 2,
                demand: 2,
            },
        ];

        let result = solver.new_propagator(CumulativePropagator::new(tasks.into(), 3));
        assert!(result.is_err());
    }

    #[test]
    fn a_task_is_pushed_past_a_full_segment() {
        let mut solver = TestSolver::default();
        let s0 = solver.new_variable(0, 0);
        let s1 = solver.new_variable(0, 6);

        let tasks = [
            CumulativeTask {
                start: s0,
                duration: 5,
                demand: 2,
            },
            CumulativeTask {
                start: s1,
                duration: 3,
                demand: 2,
            },
        ];

        solver
            .new_propagator(CumulativePropagator::new(tasks.into(), 3))
            .expect("no empty domains");

        // Task 1 cannot run while task 0 occupies the resource.
        assert_eq!(5, solver.lower_bound(&s1));
    }

    #[test]
    fn parallel_tasks_within_capacity_are_untouched() {
        let mut solver = TestSolver::default();
        let s0 = solver.new_variable(0, 0);
        let s1 = solver.new_variable(0, 6);

        let tasks = [
            CumulativeTask {
                start: s0,
                duration: 5,
                demand: 1,
            },
            CumulativeTask {
                start: s1,
                duration: 3,
                demand: 1,
            },
        ];

        solver
            .new_propagator(CumulativePropagator::new(tasks.into(), 3))
            .expect("no empty domains");

        assert_eq!(0, solver.lower_bound(&s1));
    }
}
