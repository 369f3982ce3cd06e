use crate::basic_types::EmptyDomain;
use crate::containers::StorageKey;
use crate::engine::variables::DomainId;
use crate::engine::variables::IntegerVariable;
use crate::engine::variables::Literal;
use crate::engine::Assignments;
use crate::gourd_assert_moderate;

/// A handle to an interval variable registered with the solver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IntervalId {
    pub(crate) id: u32,
}

impl StorageKey for IntervalId {
    fn index(&self) -> usize {
        self.id as usize
    }

    fn create_from_index(index: usize) -> Self {
        IntervalId { id: index as u32 }
    }
}

/// The read/write surface every interval form exposes. The concrete
/// [`Interval`] is a bundle of integer domains; the mirror, relaxed, and
/// synced wrappers reinterpret a base interval without introducing independent
/// state.
pub trait IntervalVariable: Clone {
    fn start_min(&self, assignments: &Assignments) -> i64;
    fn start_max(&self, assignments: &Assignments) -> i64;
    fn duration_min(&self, assignments: &Assignments) -> i64;
    fn duration_max(&self, assignments: &Assignments) -> i64;
    fn end_min(&self, assignments: &Assignments) -> i64;
    fn end_max(&self, assignments: &Assignments) -> i64;

    /// Whether the interval can still be performed.
    fn may_be_performed(&self, assignments: &Assignments) -> bool;

    /// Whether the interval is known to be performed.
    fn must_be_performed(&self, assignments: &Assignments) -> bool;

    fn set_start_min(&self, assignments: &mut Assignments, value: i64)
        -> Result<(), EmptyDomain>;
    fn set_start_max(&self, assignments: &mut Assignments, value: i64)
        -> Result<(), EmptyDomain>;
    fn set_duration_min(
        &self,
        assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain>;
    fn set_duration_max(
        &self,
        assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain>;
    fn set_end_min(&self, assignments: &mut Assignments, value: i64) -> Result<(), EmptyDomain>;
    fn set_end_max(&self, assignments: &mut Assignments, value: i64) -> Result<(), EmptyDomain>;

    /// Fix the performed status of the interval.
    fn set_performed(
        &self,
        assignments: &mut Assignments,
        performed: bool,
    ) -> Result<(), EmptyDomain>;
}

/// An interval variable: four logical dimensions, each a reversible range,
/// kept mutually consistent on the projection `start + duration = end` by an
/// always-posted consistency propagator.
///
/// `performed` is tri-valued through a 0-1 domain: undecided while the domain
/// is `[0, 1]`. When `performed` becomes false the remaining dimensions are
/// semantically undefined but physically preserved for restoration; reading
/// them is a programming error which the debug assertions catch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Interval {
    pub start: DomainId,
    pub duration: DomainId,
    pub end: DomainId,
    pub performed: Literal,
}

impl Interval {
    fn debug_check_readable(&self, assignments: &Assignments) {
        gourd_assert_moderate!(
            self.performed.upper_bound(assignments) == 1,
            "reading a dimension of an unperformed interval"
        );
    }
}

impl IntervalVariable for Interval {
    fn start_min(&self, assignments: &Assignments) -> i64 {
        self.debug_check_readable(assignments);
        self.start.lower_bound(assignments)
    }

    fn start_max(&self, assignments: &Assignments) -> i64 {
        self.debug_check_readable(assignments);
        self.start.upper_bound(assignments)
    }

    fn duration_min(&self, assignments: &Assignments) -> i64 {
        self.debug_check_readable(assignments);
        self.duration.lower_bound(assignments)
    }

    fn duration_max(&self, assignments: &Assignments) -> i64 {
        self.debug_check_readable(assignments);
        self.duration.upper_bound(assignments)
    }

    fn end_min(&self, assignments: &Assignments) -> i64 {
        self.debug_check_readable(assignments);
        self.end.lower_bound(assignments)
    }

    fn end_max(&self, assignments: &Assignments) -> i64 {
        self.debug_check_readable(assignments);
        self.end.upper_bound(assignments)
    }

    fn may_be_performed(&self, assignments: &Assignments) -> bool {
        self.performed.upper_bound(assignments) == 1
    }

    fn must_be_performed(&self, assignments: &Assignments) -> bool {
        self.performed.lower_bound(assignments) == 1
    }

    fn set_start_min(
        &self,
        assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        self.start.set_lower_bound(assignments, value)
    }

    fn set_start_max(
        &self,
        assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        self.start.set_upper_bound(assignments, value)
    }

    fn set_duration_min(
        &self,
        assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        self.duration.set_lower_bound(assignments, value)
    }

    fn set_duration_max(
        &self,
        assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        self.duration.set_upper_bound(assignments, value)
    }

    fn set_end_min(&self, assignments: &mut Assignments, value: i64) -> Result<(), EmptyDomain> {
        self.end.set_lower_bound(assignments, value)
    }

    fn set_end_max(&self, assignments: &mut Assignments, value: i64) -> Result<(), EmptyDomain> {
        self.end.set_upper_bound(assignments, value)
    }

    fn set_performed(
        &self,
        assignments: &mut Assignments,
        performed: bool,
    ) -> Result<(), EmptyDomain> {
        if performed {
            self.performed.set_lower_bound(assignments, 1)
        } else {
            self.performed.set_upper_bound(assignments, 0)
        }
    }
}
