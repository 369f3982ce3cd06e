//! Sequence variables: a reversible ranking over a set of interval variables.
//! Ranked intervals form the prefix of the final order; everything unranked
//! comes after the ranked prefix.

use crate::basic_types::EmptyDomain;
use crate::basic_types::PropagationStatus;
use crate::containers::StorageKey;
use crate::engine::domain_events::DomainEvents;
use crate::engine::propagation::contexts::PropagationContextMut;
use crate::engine::propagation::LocalId;
use crate::engine::propagation::PostContext;
use crate::engine::propagation::Priority;
use crate::engine::propagation::Propagator;
use crate::engine::stateful::StatefulInt;
use crate::engine::stateful::StatefulValues;
use crate::engine::Assignments;
use crate::intervals::Interval;
use crate::intervals::IntervalVariable;
use crate::math::INT64_MIN;

/// A handle to a sequence variable registered with the solver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SequenceId {
    pub(crate) id: u32,
}

impl StorageKey for SequenceId {
    fn index(&self) -> usize {
        self.id as usize
    }

    fn create_from_index(index: usize) -> Self {
        SequenceId { id: index as u32 }
    }
}

/// The reversible ranking state of one sequence. The rank cells are shared
/// with the ordering propagator by handle; the values live in the kernel's
/// stateful store so the trail restores them on backtrack.
#[derive(Debug, Clone)]
pub(crate) struct SequenceState {
    pub(crate) intervals: Vec<Interval>,
    /// Per interval: -1 while unranked, otherwise its position in the ranked
    /// prefix.
    pub(crate) rank_of: Vec<StatefulInt>,
    pub(crate) num_ranked: StatefulInt,
}

impl SequenceState {
    pub(crate) fn new(intervals: Vec<Interval>, stateful: &mut StatefulValues) -> Self {
        let rank_of = intervals.iter().map(|_| stateful.grow(-1)).collect();
        SequenceState {
            intervals,
            rank_of,
            num_ranked: stateful.grow(0),
        }
    }

    pub(crate) fn is_ranked(&self, stateful: &StatefulValues, index: usize) -> bool {
        stateful.read(self.rank_of[index]) >= 0
    }

    pub(crate) fn num_ranked(&self, stateful: &StatefulValues) -> i64 {
        stateful.read(self.num_ranked)
    }

    /// The indices of intervals that can still occur, ranked prefix first and
    /// the unranked rest ordered by earliest possible start.
    pub(crate) fn fill_sequence(
        &self,
        stateful: &StatefulValues,
        assignments: &Assignments,
        out: &mut Vec<usize>,
    ) {
        out.clear();

        let mut ranked: Vec<(i64, usize)> = (0..self.intervals.len())
            .filter_map(|index| {
                let position = stateful.read(self.rank_of[index]);
                (position >= 0).then_some((position, index))
            })
            .collect();
        ranked.sort_unstable();
        out.extend(ranked.iter().map(|&(_, index)| index));

        let mut unranked: Vec<(i64, usize)> = (0..self.intervals.len())
            .filter(|&index| stateful.read(self.rank_of[index]) < 0)
            .filter(|&index| self.intervals[index].may_be_performed(assignments))
            .map(|index| (self.intervals[index].start_min(assignments), index))
            .collect();
        unranked.sort_unstable();
        out.extend(unranked.iter().map(|&(_, index)| index));
    }
}

/// Push every interval behind the ranked prefix: ranked intervals are chained
/// in rank order, and all unranked intervals start no earlier than the chain's
/// horizon. An optional interval that no longer fits becomes unperformed.
pub(crate) fn enforce_ranking(
    intervals: &[Interval],
    rank_of: &[StatefulInt],
    stateful: &StatefulValues,
    assignments: &mut Assignments,
) -> Result<(), EmptyDomain> {
    let mut ranked: Vec<(i64, usize)> = (0..intervals.len())
        .filter_map(|index| {
            let position = stateful.read(rank_of[index]);
            (position >= 0).then_some((position, index))
        })
        .collect();
    ranked.sort_unstable();

    let mut horizon = INT64_MIN;
    for &(_, index) in &ranked {
        let interval = intervals[index];
        if !interval.may_be_performed(assignments) {
            continue;
        }
        push_start(interval, horizon, assignments)?;
        if interval.must_be_performed(assignments) {
            horizon = horizon.max(interval.end_min(assignments));
        }
    }

    for index in 0..intervals.len() {
        if stateful.read(rank_of[index]) >= 0 {
            continue;
        }
        let interval = intervals[index];
        if interval.may_be_performed(assignments) {
            push_start(interval, horizon, assignments)?;
        }
    }

    Ok(())
}

fn push_start(
    interval: Interval,
    bound: i64,
    assignments: &mut Assignments,
) -> Result<(), EmptyDomain> {
    if bound <= interval.start_min(assignments) {
        return Ok(());
    }
    if bound > interval.start_max(assignments) && !interval.must_be_performed(assignments) {
        return interval.set_performed(assignments, false);
    }
    interval.set_start_min(assignments, bound)
}

/// The demon behind a sequence variable: wakes on any member change and
/// re-establishes the ranked-prefix ordering.
#[derive(Debug, Clone)]
pub(crate) struct SequenceOrderingPropagator {
    intervals: Vec<Interval>,
    rank_of: Vec<StatefulInt>,
}

impl SequenceOrderingPropagator {
    pub(crate) fn new(state: &SequenceState) -> Self {
        SequenceOrderingPropagator {
            intervals: state.intervals.clone(),
            rank_of: state.rank_of.clone(),
        }
    }
}

impl Propagator for SequenceOrderingPropagator {
    fn name(&self) -> &str {
        "SequenceOrdering"
    }

    fn post(&mut self, context: &mut PostContext<'_>) {
        for (index, interval) in self.intervals.iter().enumerate() {
            let demon = context.register(
                &interval.start,
                DomainEvents::RANGE,
                LocalId::from(index as u32),
                Priority::Normal,
            );
            context.watch_with(demon, &interval.end, DomainEvents::RANGE);
            context.watch_with(demon, &interval.performed, DomainEvents::ASSIGN);
        }
    }

    fn initial_propagate(&mut self, context: PropagationContextMut<'_>) -> PropagationStatus {
        enforce_ranking(
            &self.intervals,
            &self.rank_of,
            context.stateful,
            context.assignments,
        )
        .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_solver::TestSolver;
    use crate::engine::variables::Literal;

    fn interval(solver: &mut TestSolver, start: (i64, i64), duration: i64) -> Interval {
        let start_var = solver.new_variable(start.0, start.1);
        let duration_var = solver.new_variable(duration, duration);
        let end_var = solver.new_variable(start.0 + duration, start.1 + duration);
        Interval {
            start: start_var,
            duration: duration_var,
            end: end_var,
            performed: Literal::new(solver.new_variable(1, 1)),
        }
    }

    #[test]
    fn ranking_first_pushes_the_remaining_intervals() {
        let mut solver = TestSolver::default();
        let a = interval(&mut solver, (0, 10), 3);
        let b = interval(&mut solver, (0, 10), 2);

        let state = SequenceState::new(vec![a, b], &mut solver.kernel.stateful);
        solver
            .new_propagator(SequenceOrderingPropagator::new(&state))
            .expect("no root conflict");

        // Rank a to the front; b must come after a's earliest end.
        solver.kernel.stateful.assign(state.rank_of[0], 0);
        solver.kernel.stateful.assign(state.num_ranked, 1);
        enforce_ranking(
            &state.intervals,
            &state.rank_of,
            &solver.kernel.stateful,
            &mut solver.kernel.assignments,
        )
        .expect("consistent");
        solver.propagate().expect("consistent");

        assert_eq!(3, solver.lower_bound(&b.start));
        assert_eq!(0, solver.lower_bound(&a.start));
    }

    #[test]
    fn fill_sequence_lists_ranked_then_unranked_by_start() {
        let mut solver = TestSolver::default();
        let a = interval(&mut solver, (5, 10), 1);
        let b = interval(&mut solver, (0, 10), 1);
        let c = interval(&mut solver, (2, 10), 1);

        let state = SequenceState::new(vec![a, b, c], &mut solver.kernel.stateful);

        solver.kernel.stateful.assign(state.rank_of[0], 0);
        solver.kernel.stateful.assign(state.num_ranked, 1);

        let mut out = Vec::new();
        state.fill_sequence(&solver.kernel.stateful, &solver.kernel.assignments, &mut out);

        assert_eq!(vec![0, 1, 2], out);
    }
}
