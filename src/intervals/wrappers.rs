use log::error;

use crate::basic_types::EmptyDomain;
use crate::engine::Assignments;
use crate::intervals::IntervalVariable;
use crate::math::cap_add;
use crate::math::cap_sub;
use crate::math::INT64_MAX;
use crate::math::INT64_MIN;

/// A view that flips the sign of all time coordinates of a base interval, so
/// algorithms that assume a forward time axis can reuse themselves
/// symmetrically: the mirrored start is the negated end, and vice versa.
#[derive(Clone, Copy, Debug)]
pub struct MirrorInterval<I> {
    interval: I,
}

impl<I: IntervalVariable> MirrorInterval<I> {
    pub fn new(interval: I) -> Self {
        MirrorInterval { interval }
    }
}

impl<I: IntervalVariable> IntervalVariable for MirrorInterval<I> {
    fn start_min(&self, assignments: &Assignments) -> i64 {
        -self.interval.end_max(assignments)
    }

    fn start_max(&self, assignments: &Assignments) -> i64 {
        -self.interval.end_min(assignments)
    }

    fn duration_min(&self, assignments: &Assignments) -> i64 {
        self.interval.duration_min(assignments)
    }

    fn duration_max(&self, assignments: &Assignments) -> i64 {
        self.interval.duration_max(assignments)
    }

    fn end_min(&self, assignments: &Assignments) -> i64 {
        -self.interval.start_max(assignments)
    }

    fn end_max(&self, assignments: &Assignments) -> i64 {
        -self.interval.start_min(assignments)
    }

    fn may_be_performed(&self, assignments: &Assignments) -> bool {
        self.interval.may_be_performed(assignments)
    }

    fn must_be_performed(&self, assignments: &Assignments) -> bool {
        self.interval.must_be_performed(assignments)
    }

    fn set_start_min(
        &self,
        assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        self.interval.set_end_max(assignments, -value)
    }

    fn set_start_max(
        &self,
        assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        self.interval.set_end_min(assignments, -value)
    }

    fn set_duration_min(
        &self,
        assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        self.interval.set_duration_min(assignments, value)
    }

    fn set_duration_max(
        &self,
        assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        self.interval.set_duration_max(assignments, value)
    }

    fn set_end_min(&self, assignments: &mut Assignments, value: i64) -> Result<(), EmptyDomain> {
        self.interval.set_start_max(assignments, -value)
    }

    fn set_end_max(&self, assignments: &mut Assignments, value: i64) -> Result<(), EmptyDomain> {
        self.interval.set_start_min(assignments, -value)
    }

    fn set_performed(
        &self,
        assignments: &mut Assignments,
        performed: bool,
    ) -> Result<(), EmptyDomain> {
        self.interval.set_performed(assignments, performed)
    }
}

fn reject_relaxed_write(wrapper: &str, operation: &str) -> ! {
    error!("{operation} is not supported on {wrapper}");
    panic!("{operation} is not supported on {wrapper}");
}

/// A view over an optional interval which reports `+inf` for the max-side
/// bounds while `performed` is still undecided; once the interval must be
/// performed it behaves identically to the underlying one. Precedence
/// propagators use this to stay sound in the presence of optionality.
///
/// Writes on the relaxed side are programming errors, not failures.
#[derive(Clone, Copy, Debug)]
pub struct RelaxedMaxInterval<I> {
    interval: I,
}

impl<I: IntervalVariable> RelaxedMaxInterval<I> {
    pub fn new(interval: I) -> Self {
        RelaxedMaxInterval { interval }
    }
}

impl<I: IntervalVariable> IntervalVariable for RelaxedMaxInterval<I> {
    fn start_min(&self, assignments: &Assignments) -> i64 {
        self.interval.start_min(assignments)
    }

    fn start_max(&self, assignments: &Assignments) -> i64 {
        if self.interval.must_be_performed(assignments) {
            self.interval.start_max(assignments)
        } else {
            INT64_MAX
        }
    }

    fn duration_min(&self, assignments: &Assignments) -> i64 {
        self.interval.duration_min(assignments)
    }

    fn duration_max(&self, assignments: &Assignments) -> i64 {
        self.interval.duration_max(assignments)
    }

    fn end_min(&self, assignments: &Assignments) -> i64 {
        self.interval.end_min(assignments)
    }

    fn end_max(&self, assignments: &Assignments) -> i64 {
        if self.interval.must_be_performed(assignments) {
            self.interval.end_max(assignments)
        } else {
            INT64_MAX
        }
    }

    fn may_be_performed(&self, assignments: &Assignments) -> bool {
        self.interval.may_be_performed(assignments)
    }

    fn must_be_performed(&self, assignments: &Assignments) -> bool {
        self.interval.must_be_performed(assignments)
    }

    fn set_start_min(
        &self,
        assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        self.interval.set_start_min(assignments, value)
    }

    fn set_start_max(&self, _: &mut Assignments, _: i64) -> Result<(), EmptyDomain> {
        reject_relaxed_write("RelaxedMaxInterval", "set_start_max")
    }

    fn set_duration_min(
        &self,
        assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        self.interval.set_duration_min(assignments, value)
    }

    fn set_duration_max(
        &self,
        assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        self.interval.set_duration_max(assignments, value)
    }

    fn set_end_min(&self, assignments: &mut Assignments, value: i64) -> Result<(), EmptyDomain> {
        self.interval.set_end_min(assignments, value)
    }

    fn set_end_max(&self, _: &mut Assignments, _: i64) -> Result<(), EmptyDomain> {
        reject_relaxed_write("RelaxedMaxInterval", "set_end_max")
    }

    fn set_performed(
        &self,
        assignments: &mut Assignments,
        performed: bool,
    ) -> Result<(), EmptyDomain> {
        self.interval.set_performed(assignments, performed)
    }
}

/// The min-side counterpart of [`RelaxedMaxInterval`]: reports `-inf` for the
/// min-side bounds while `performed` is still undecided.
#[derive(Clone, Copy, Debug)]
pub struct RelaxedMinInterval<I> {
    interval: I,
}

impl<I: IntervalVariable> RelaxedMinInterval<I> {
    pub fn new(interval: I) -> Self {
        RelaxedMinInterval { interval }
    }
}

impl<I: IntervalVariable> IntervalVariable for RelaxedMinInterval<I> {
    fn start_min(&self, assignments: &Assignments) -> i64 {
        if self.interval.must_be_performed(assignments) {
            self.interval.start_min(assignments)
        } else {
            INT64_MIN
        }
    }

    fn start_max(&self, assignments: &Assignments) -> i64 {
        self.interval.start_max(assignments)
    }

    fn duration_min(&self, assignments: &Assignments) -> i64 {
        self.interval.duration_min(assignments)
    }

    fn duration_max(&self, assignments: &Assignments) -> i64 {
        self.interval.duration_max(assignments)
    }

    fn end_min(&self, assignments: &Assignments) -> i64 {
        if self.interval.must_be_performed(assignments) {
            self.interval.end_min(assignments)
        } else {
            INT64_MIN
        }
    }

    fn end_max(&self, assignments: &Assignments) -> i64 {
        self.interval.end_max(assignments)
    }

    fn may_be_performed(&self, assignments: &Assignments) -> bool {
        self.interval.may_be_performed(assignments)
    }

    fn must_be_performed(&self, assignments: &Assignments) -> bool {
        self.interval.must_be_performed(assignments)
    }

    fn set_start_min(&self, _: &mut Assignments, _: i64) -> Result<(), EmptyDomain> {
        reject_relaxed_write("RelaxedMinInterval", "set_start_min")
    }

    fn set_start_max(
        &self,
        assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        self.interval.set_start_max(assignments, value)
    }

    fn set_duration_min(
        &self,
        assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        self.interval.set_duration_min(assignments, value)
    }

    fn set_duration_max(
        &self,
        assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        self.interval.set_duration_max(assignments, value)
    }

    fn set_end_min(&self, _: &mut Assignments, _: i64) -> Result<(), EmptyDomain> {
        reject_relaxed_write("RelaxedMinInterval", "set_end_min")
    }

    fn set_end_max(&self, assignments: &mut Assignments, value: i64) -> Result<(), EmptyDomain> {
        self.interval.set_end_max(assignments, value)
    }

    fn set_performed(
        &self,
        assignments: &mut Assignments,
        performed: bool,
    ) -> Result<(), EmptyDomain> {
        self.interval.set_performed(assignments, performed)
    }
}

/// Which anchor of the base interval a [`SyncedInterval`] follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncPoint {
    Start,
    End,
}

/// An interval of fixed duration whose start is a constant offset from either
/// the start or the end of a base interval. Start writes on the wrapper
/// translate to writes on the chosen anchor of the base.
#[derive(Clone, Copy, Debug)]
pub struct SyncedInterval<I> {
    interval: I,
    offset: i64,
    duration: i64,
    sync: SyncPoint,
}

impl<I: IntervalVariable> SyncedInterval<I> {
    pub fn new(interval: I, sync: SyncPoint, offset: i64, duration: i64) -> Self {
        SyncedInterval {
            interval,
            offset,
            duration,
            sync,
        }
    }

    pub fn sync_point(&self) -> SyncPoint {
        self.sync
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    fn anchor_min(&self, assignments: &Assignments) -> i64 {
        match self.sync {
            SyncPoint::Start => self.interval.start_min(assignments),
            SyncPoint::End => self.interval.end_min(assignments),
        }
    }

    fn anchor_max(&self, assignments: &Assignments) -> i64 {
        match self.sync {
            SyncPoint::Start => self.interval.start_max(assignments),
            SyncPoint::End => self.interval.end_max(assignments),
        }
    }

    fn set_anchor_min(
        &self,
        assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        match self.sync {
            SyncPoint::Start => self.interval.set_start_min(assignments, value),
            SyncPoint::End => self.interval.set_end_min(assignments, value),
        }
    }

    fn set_anchor_max(
        &self,
        assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        match self.sync {
            SyncPoint::Start => self.interval.set_start_max(assignments, value),
            SyncPoint::End => self.interval.set_end_max(assignments, value),
        }
    }
}

impl<I: IntervalVariable> IntervalVariable for SyncedInterval<I> {
    fn start_min(&self, assignments: &Assignments) -> i64 {
        cap_add(self.anchor_min(assignments), self.offset)
    }

    fn start_max(&self, assignments: &Assignments) -> i64 {
        cap_add(self.anchor_max(assignments), self.offset)
    }

    fn duration_min(&self, _assignments: &Assignments) -> i64 {
        self.duration
    }

    fn duration_max(&self, _assignments: &Assignments) -> i64 {
        self.duration
    }

    fn end_min(&self, assignments: &Assignments) -> i64 {
        cap_add(self.start_min(assignments), self.duration)
    }

    fn end_max(&self, assignments: &Assignments) -> i64 {
        cap_add(self.start_max(assignments), self.duration)
    }

    fn may_be_performed(&self, assignments: &Assignments) -> bool {
        self.interval.may_be_performed(assignments)
    }

    fn must_be_performed(&self, assignments: &Assignments) -> bool {
        self.interval.must_be_performed(assignments)
    }

    fn set_start_min(
        &self,
        assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        self.set_anchor_min(assignments, cap_sub(value, self.offset))
    }

    fn set_start_max(
        &self,
        assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        self.set_anchor_max(assignments, cap_sub(value, self.offset))
    }

    fn set_duration_min(
        &self,
        _assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        if value > self.duration {
            Err(EmptyDomain)
        } else {
            Ok(())
        }
    }

    fn set_duration_max(
        &self,
        _assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        if value < self.duration {
            Err(EmptyDomain)
        } else {
            Ok(())
        }
    }

    fn set_end_min(&self, assignments: &mut Assignments, value: i64) -> Result<(), EmptyDomain> {
        self.set_start_min(assignments, cap_sub(value, self.duration))
    }

    fn set_end_max(&self, assignments: &mut Assignments, value: i64) -> Result<(), EmptyDomain> {
        self.set_start_max(assignments, cap_sub(value, self.duration))
    }

    fn set_performed(
        &self,
        assignments: &mut Assignments,
        performed: bool,
    ) -> Result<(), EmptyDomain> {
        self.interval.set_performed(assignments, performed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_solver::TestSolver;
    use crate::engine::variables::Literal;
    use crate::intervals::Interval;

    fn bundle(solver: &mut TestSolver, optional: bool) -> Interval {
        let start = solver.new_variable(2, 10);
        let duration = solver.new_variable(3, 3);
        let end = solver.new_variable(5, 13);
        let performed = if optional {
            solver.new_literal()
        } else {
            Literal::new(solver.new_variable(1, 1))
        };
        Interval {
            start,
            duration,
            end,
            performed,
        }
    }

    #[test]
    fn the_mirror_flips_the_time_axis() {
        let mut solver = TestSolver::default();
        let interval = bundle(&mut solver, false);
        let mirror = MirrorInterval::new(interval);

        let assignments = &solver.kernel.assignments;
        assert_eq!(-13, mirror.start_min(assignments));
        assert_eq!(-5, mirror.start_max(assignments));
        assert_eq!(-10, mirror.end_min(assignments));
        assert_eq!(-2, mirror.end_max(assignments));
    }

    #[test]
    fn mirror_writes_translate_to_the_opposite_side() {
        let mut solver = TestSolver::default();
        let interval = bundle(&mut solver, false);
        let mirror = MirrorInterval::new(interval);

        mirror
            .set_start_min(&mut solver.kernel.assignments, -12)
            .expect("non-empty");

        assert_eq!(12, solver.upper_bound(&interval.end));
    }

    #[test]
    fn relaxed_max_reports_infinity_while_undecided() {
        let mut solver = TestSolver::default();
        let interval = bundle(&mut solver, true);
        let relaxed = RelaxedMaxInterval::new(interval);

        let assignments = &solver.kernel.assignments;
        assert_eq!(INT64_MAX, relaxed.start_max(assignments));
        assert_eq!(INT64_MAX, relaxed.end_max(assignments));
        assert_eq!(2, relaxed.start_min(assignments));
    }

    #[test]
    fn relaxed_max_follows_the_base_once_performed() {
        let mut solver = TestSolver::default();
        let interval = bundle(&mut solver, true);
        let relaxed = RelaxedMaxInterval::new(interval);

        interval
            .set_performed(&mut solver.kernel.assignments, true)
            .expect("non-empty");

        let assignments = &solver.kernel.assignments;
        assert_eq!(10, relaxed.start_max(assignments));
        assert_eq!(13, relaxed.end_max(assignments));
    }

    #[test]
    #[should_panic(expected = "set_end_max is not supported")]
    fn relaxed_side_writes_are_programming_errors() {
        let mut solver = TestSolver::default();
        let interval = bundle(&mut solver, true);
        let relaxed = RelaxedMaxInterval::new(interval);

        let _ = relaxed.set_end_max(&mut solver.kernel.assignments, 4);
    }

    #[test]
    fn a_synced_interval_follows_the_anchor() {
        let mut solver = TestSolver::default();
        let interval = bundle(&mut solver, false);

        let on_start = SyncedInterval::new(interval, SyncPoint::Start, 4, 2);
        let on_end = SyncedInterval::new(interval, SyncPoint::End, -1, 2);

        let assignments = &solver.kernel.assignments;
        assert_eq!(6, on_start.start_min(assignments));
        assert_eq!(14, on_start.start_max(assignments));
        assert_eq!(8, on_start.end_min(assignments));

        assert_eq!(4, on_end.start_min(assignments));
        assert_eq!(12, on_end.start_max(assignments));
    }

    #[test]
    fn synced_start_writes_reach_the_base_anchor() {
        let mut solver = TestSolver::default();
        let interval = bundle(&mut solver, false);

        let synced = SyncedInterval::new(interval, SyncPoint::Start, 4, 2);
        synced
            .set_start_min(&mut solver.kernel.assignments, 9)
            .expect("non-empty");

        assert_eq!(5, solver.lower_bound(&interval.start));
    }
}
