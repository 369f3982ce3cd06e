use enumset::EnumSet;

use crate::basic_types::EmptyDomain;
use crate::basic_types::HashSet;
use crate::basic_types::Trail;
use crate::containers::KeyedVec;
use crate::engine::domain_events::DomainEvent;
use crate::engine::event_sink::EventSink;
use crate::engine::variables::DomainId;
use crate::gourd_assert_moderate;
use crate::gourd_assert_simple;

/// The solver-owned store of integer variable domains together with the trail
/// that makes every domain write reversible.
///
/// All mutations go through [`Assignments::tighten_lower_bound`] and friends;
/// there is no bypass. Each write journals the prior bounds on the trail and
/// records the corresponding [`DomainEvent`]s in the event sink, from which
/// the kernel schedules demons.
///
/// While a variable is *in process* (its own demons are running), writes to it
/// are redirected into a shadow range and consolidated into a single
/// [`Assignments::set_range`] when the processing pass ends. This prevents
/// re-entrant demon firing within one pass.
#[derive(Clone, Default, Debug)]
pub struct Assignments {
    trail: Trail<TrailEntry>,
    domains: KeyedVec<DomainId, IntegerDomain>,
    events: EventSink,
}

#[derive(Clone, Copy, Debug)]
struct TrailEntry {
    domain_id: DomainId,
    /// Explicitly store the bounds before the write was applied so that it is
    /// easy to restore them when backtracking.
    old_lower_bound: i64,
    old_upper_bound: i64,
    /// `Some(v)` when this entry was created by an inner value removal.
    removed_value: Option<i64>,
}

impl Assignments {
    pub(crate) fn increase_decision_level(&mut self) {
        self.trail.push_checkpoint()
    }

    pub fn get_decision_level(&self) -> usize {
        self.trail.depth()
    }

    pub fn num_domains(&self) -> u32 {
        self.domains.len() as u32
    }

    pub(crate) fn domains(&self) -> impl Iterator<Item = DomainId> {
        self.domains.keys()
    }

    pub(crate) fn num_trail_entries(&self) -> usize {
        self.trail.len()
    }

    /// Registers the domain of a new integer variable.
    pub(crate) fn grow(&mut self, lower_bound: i64, upper_bound: i64) -> DomainId {
        gourd_assert_simple!(lower_bound <= upper_bound, "Cannot create an empty domain.");

        let id = DomainId {
            id: self.num_domains(),
        };

        let _ = self
            .domains
            .push(IntegerDomain::new(lower_bound, upper_bound, id));
        self.events.grow();

        id
    }
}

// Methods for getting info about the domains.
impl Assignments {
    pub fn get_lower_bound(&self, domain_id: DomainId) -> i64 {
        self.domains[domain_id].lower_bound
    }

    pub fn get_upper_bound(&self, domain_id: DomainId) -> i64 {
        self.domains[domain_id].upper_bound
    }

    /// The lower bound the variable had at the start of its current processing
    /// pass; demons use this to compute deltas.
    pub fn get_old_lower_bound(&self, domain_id: DomainId) -> i64 {
        self.domains[domain_id].old_lower_bound
    }

    /// The upper bound the variable had at the start of its current processing
    /// pass.
    pub fn get_old_upper_bound(&self, domain_id: DomainId) -> i64 {
        self.domains[domain_id].old_upper_bound
    }

    pub fn get_assigned_value(&self, domain_id: DomainId) -> i64 {
        gourd_assert_simple!(self.is_domain_assigned(domain_id));
        self.domains[domain_id].lower_bound
    }

    pub fn is_value_in_domain(&self, domain_id: DomainId, value: i64) -> bool {
        self.domains[domain_id].contains(value)
    }

    pub fn is_domain_assigned(&self, domain_id: DomainId) -> bool {
        self.get_lower_bound(domain_id) == self.get_upper_bound(domain_id)
    }

    pub fn is_domain_assigned_to_value(&self, domain_id: DomainId, value: i64) -> bool {
        self.is_domain_assigned(domain_id) && self.get_lower_bound(domain_id) == value
    }
}

// Methods to change the domains.
impl Assignments {
    pub(crate) fn tighten_lower_bound(
        &mut self,
        domain_id: DomainId,
        new_lower_bound: i64,
    ) -> Result<(), EmptyDomain> {
        let domain = &mut self.domains[domain_id];

        if let ProcessState::Processing {
            postponed_lower_bound,
            postponed_upper_bound,
        } = &mut domain.state
        {
            // The variable's own demons are running; the write is recorded in
            // the shadow range and applied once the processing pass ends.
            *postponed_lower_bound = (*postponed_lower_bound).max(new_lower_bound);
            return if *postponed_lower_bound > *postponed_upper_bound {
                Err(EmptyDomain)
            } else {
                Ok(())
            };
        }

        if new_lower_bound <= domain.lower_bound {
            return domain.verify_consistency();
        }

        if !self.events.has_pending(domain_id) {
            domain.old_lower_bound = domain.lower_bound;
            domain.old_upper_bound = domain.upper_bound;
        }

        self.trail.record(TrailEntry {
            domain_id,
            old_lower_bound: domain.lower_bound,
            old_upper_bound: domain.upper_bound,
            removed_value: None,
        });

        domain.set_lower_bound(new_lower_bound, &mut self.events);
        domain.verify_consistency()
    }

    pub(crate) fn tighten_upper_bound(
        &mut self,
        domain_id: DomainId,
        new_upper_bound: i64,
    ) -> Result<(), EmptyDomain> {
        let domain = &mut self.domains[domain_id];

        if let ProcessState::Processing {
            postponed_lower_bound,
            postponed_upper_bound,
        } = &mut domain.state
        {
            *postponed_upper_bound = (*postponed_upper_bound).min(new_upper_bound);
            return if *postponed_lower_bound > *postponed_upper_bound {
                Err(EmptyDomain)
            } else {
                Ok(())
            };
        }

        if new_upper_bound >= domain.upper_bound {
            return domain.verify_consistency();
        }

        if !self.events.has_pending(domain_id) {
            domain.old_lower_bound = domain.lower_bound;
            domain.old_upper_bound = domain.upper_bound;
        }

        self.trail.record(TrailEntry {
            domain_id,
            old_lower_bound: domain.lower_bound,
            old_upper_bound: domain.upper_bound,
            removed_value: None,
        });

        domain.set_upper_bound(new_upper_bound, &mut self.events);
        domain.verify_consistency()
    }

    /// Intersect the domain with `[lower_bound, upper_bound]`.
    pub(crate) fn set_range(
        &mut self,
        domain_id: DomainId,
        lower_bound: i64,
        upper_bound: i64,
    ) -> Result<(), EmptyDomain> {
        gourd_assert_simple!(lower_bound <= upper_bound);
        self.tighten_lower_bound(domain_id, lower_bound)?;
        self.tighten_upper_bound(domain_id, upper_bound)
    }

    /// Collapse the domain to `{value}`; fails when the value is not in the
    /// domain.
    pub(crate) fn make_assignment(
        &mut self,
        domain_id: DomainId,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        self.tighten_lower_bound(domain_id, value)?;
        self.tighten_upper_bound(domain_id, value)
    }

    pub(crate) fn remove_value_from_domain(
        &mut self,
        domain_id: DomainId,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        let domain = &self.domains[domain_id];

        if !domain.contains(value) {
            return domain.verify_consistency();
        }

        // A removal at a bound is a bound write; the bound walks past any
        // holes that become exposed.
        if value == domain.lower_bound {
            return self.tighten_lower_bound(domain_id, value + 1);
        }
        if value == domain.upper_bound {
            return self.tighten_upper_bound(domain_id, value - 1);
        }

        let domain = &mut self.domains[domain_id];

        if !self.events.has_pending(domain_id) {
            domain.old_lower_bound = domain.lower_bound;
            domain.old_upper_bound = domain.upper_bound;
        }

        self.trail.record(TrailEntry {
            domain_id,
            old_lower_bound: domain.lower_bound,
            old_upper_bound: domain.upper_bound,
            removed_value: Some(value),
        });

        let _ = domain.holes.insert(value);
        self.events.event_occurred(DomainEvent::Removal, domain_id);

        domain.verify_consistency()
    }
}

// The in-process protocol and event handoff to the kernel.
impl Assignments {
    /// Pop the next variable with pending events, in FIFO order of first
    /// modification.
    pub(crate) fn pop_pending(&mut self) -> Option<(DomainId, EnumSet<DomainEvent>)> {
        self.events.pop()
    }

    pub(crate) fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Mark the variable as in process. Until
    /// [`Assignments::finish_processing`] (or [`Assignments::abort_processing`]
    /// on failure) is called, writes to this variable land in its shadow
    /// range.
    pub(crate) fn begin_processing(&mut self, domain_id: DomainId) {
        let domain = &mut self.domains[domain_id];
        gourd_assert_moderate!(matches!(domain.state, ProcessState::Idle));
        domain.state = ProcessState::Processing {
            postponed_lower_bound: domain.lower_bound,
            postponed_upper_bound: domain.upper_bound,
        };
    }

    /// Exit the processing window and return the consolidated shadow range if
    /// any postponed write tightened it.
    pub(crate) fn finish_processing(&mut self, domain_id: DomainId) -> Option<(i64, i64)> {
        let domain = &mut self.domains[domain_id];
        match std::mem::replace(&mut domain.state, ProcessState::Idle) {
            ProcessState::Processing {
                postponed_lower_bound,
                postponed_upper_bound,
            } => {
                if postponed_lower_bound > domain.lower_bound
                    || postponed_upper_bound < domain.upper_bound
                {
                    Some((postponed_lower_bound, postponed_upper_bound))
                } else {
                    None
                }
            }
            ProcessState::Idle => None,
        }
    }

    /// The cleaner action: drops the shadow range without applying it. Runs
    /// when a demon fails while the variable is in process, before the trail
    /// rolls back.
    pub(crate) fn abort_processing(&mut self, domain_id: DomainId) {
        self.domains[domain_id].state = ProcessState::Idle;
    }

    /// Commit the previous-pass bounds of the variable: after this call,
    /// `old_lower_bound`/`old_upper_bound` coincide with the current bounds
    /// until the variable is modified again.
    pub(crate) fn commit_pass(&mut self, domain_id: DomainId) {
        let domain = &mut self.domains[domain_id];
        domain.old_lower_bound = domain.lower_bound;
        domain.old_upper_bound = domain.upper_bound;
    }

    /// Discard all pending events, e.g. after a failure unwound the queues.
    pub(crate) fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Synchronises the domains with the fact that backtracking to
    /// `new_decision_level` is taking place. Returns the variables which were
    /// fixed before backtracking and are no longer fixed afterwards, together
    /// with the value they were fixed to.
    pub(crate) fn synchronise(&mut self, new_decision_level: usize) -> Vec<(DomainId, i64)> {
        let mut unfixed_variables = Vec::new();

        let domains = &mut self.domains;
        self.trail.pop_to(new_decision_level).for_each(|entry| {
            let domain = &mut domains[entry.domain_id];
            gourd_assert_moderate!(matches!(domain.state, ProcessState::Idle));

            let fixed_before = domain.lower_bound == domain.upper_bound;
            let value_before = domain.lower_bound;

            if let Some(value) = entry.removed_value {
                let _ = domain.holes.remove(&value);
            }
            domain.lower_bound = entry.old_lower_bound;
            domain.upper_bound = entry.old_upper_bound;
            domain.old_lower_bound = entry.old_lower_bound;
            domain.old_upper_bound = entry.old_upper_bound;

            if fixed_before && domain.lower_bound != domain.upper_bound {
                unfixed_variables.push((entry.domain_id, value_before));
            }
        });

        unfixed_variables
    }
}

#[derive(Clone, Debug)]
enum ProcessState {
    Idle,
    Processing {
        postponed_lower_bound: i64,
        postponed_upper_bound: i64,
    },
}

/// A single integer domain: the current bounds, the bounds at the start of the
/// current processing pass, and the set of interior holes.
///
/// When the domain is in an empty state, `lower_bound > upper_bound`; the trail
/// restores a consistent state on backtracking.
#[derive(Clone, Debug)]
struct IntegerDomain {
    id: DomainId,

    lower_bound: i64,
    upper_bound: i64,
    old_lower_bound: i64,
    old_upper_bound: i64,

    /// Values strictly between the bounds which have been removed. Values
    /// outside the bounds are never kept here; a removal at a bound moves the
    /// bound instead.
    holes: HashSet<i64>,

    state: ProcessState,
}

impl IntegerDomain {
    fn new(lower_bound: i64, upper_bound: i64, id: DomainId) -> IntegerDomain {
        IntegerDomain {
            id,
            lower_bound,
            upper_bound,
            old_lower_bound: lower_bound,
            old_upper_bound: upper_bound,
            holes: HashSet::default(),
            state: ProcessState::Idle,
        }
    }

    fn contains(&self, value: i64) -> bool {
        self.lower_bound <= value && value <= self.upper_bound && !self.holes.contains(&value)
    }

    fn set_lower_bound(&mut self, value: i64, events: &mut EventSink) {
        gourd_assert_moderate!(value > self.lower_bound);

        events.event_occurred(DomainEvent::LowerBound, self.id);

        self.lower_bound = value;
        while self.lower_bound <= self.upper_bound && self.holes.contains(&self.lower_bound) {
            self.lower_bound += 1;
        }

        if self.lower_bound == self.upper_bound {
            events.event_occurred(DomainEvent::Assign, self.id);
        }
    }

    fn set_upper_bound(&mut self, value: i64, events: &mut EventSink) {
        gourd_assert_moderate!(value < self.upper_bound);

        events.event_occurred(DomainEvent::UpperBound, self.id);

        self.upper_bound = value;
        while self.lower_bound <= self.upper_bound && self.holes.contains(&self.upper_bound) {
            self.upper_bound -= 1;
        }

        if self.lower_bound == self.upper_bound {
            events.event_occurred(DomainEvent::Assign, self.id);
        }
    }

    fn verify_consistency(&self) -> Result<(), EmptyDomain> {
        if self.lower_bound > self.upper_bound {
            Err(EmptyDomain)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_bound_change_triggers_lower_bound_event() {
        let mut assignments = Assignments::default();
        let d1 = assignments.grow(1, 5);

        assignments
            .tighten_lower_bound(d1, 2)
            .expect("non-empty domain");

        let (domain, events) = assignments.pop_pending().expect("pending variable");
        assert_eq!(d1, domain);
        assert_eq!(EnumSet::only(DomainEvent::LowerBound), events);
    }

    #[test]
    fn bounds_change_can_also_trigger_assign_event() {
        let mut assignments = Assignments::default();
        let d1 = assignments.grow(1, 5);
        let d2 = assignments.grow(1, 5);

        assignments
            .tighten_lower_bound(d1, 5)
            .expect("non-empty domain");
        assignments
            .tighten_upper_bound(d2, 1)
            .expect("non-empty domain");

        let (_, events_d1) = assignments.pop_pending().expect("pending variable");
        assert_eq!(DomainEvent::LowerBound | DomainEvent::Assign, events_d1);
        let (_, events_d2) = assignments.pop_pending().expect("pending variable");
        assert_eq!(DomainEvent::UpperBound | DomainEvent::Assign, events_d2);
    }

    #[test]
    fn an_overlapping_write_is_a_no_op_and_consumes_no_trail_space() {
        let mut assignments = Assignments::default();
        let d1 = assignments.grow(1, 5);

        assignments
            .tighten_lower_bound(d1, 1)
            .expect("non-empty domain");

        assert_eq!(0, assignments.num_trail_entries());
        assert!(assignments.pop_pending().is_none());
    }

    #[test]
    fn removing_a_bound_value_moves_the_bound() {
        let mut assignments = Assignments::default();
        let d1 = assignments.grow(1, 5);

        assignments
            .remove_value_from_domain(d1, 1)
            .expect("non-empty domain");

        assert_eq!(2, assignments.get_lower_bound(d1));
    }

    #[test]
    fn a_bound_write_skips_holes() {
        let mut assignments = Assignments::default();
        let d1 = assignments.grow(1, 5);

        assignments
            .remove_value_from_domain(d1, 3)
            .expect("non-empty domain");
        assignments
            .tighten_lower_bound(d1, 3)
            .expect("non-empty domain");

        assert_eq!(4, assignments.get_lower_bound(d1));
    }

    #[test]
    fn assigning_to_a_hole_fails() {
        let mut assignments = Assignments::default();
        let d1 = assignments.grow(1, 5);

        assignments
            .remove_value_from_domain(d1, 3)
            .expect("non-empty domain");

        assert!(assignments.make_assignment(d1, 3).is_err());
    }

    #[test]
    fn backtracking_restores_bounds_and_holes() {
        let mut assignments = Assignments::default();
        let d1 = assignments.grow(1, 5);

        assignments.increase_decision_level();

        assignments
            .remove_value_from_domain(d1, 3)
            .expect("non-empty domain");
        assignments
            .tighten_lower_bound(d1, 4)
            .expect("non-empty domain");
        assignments.clear_events();

        let _ = assignments.synchronise(0);

        assert_eq!(1, assignments.get_lower_bound(d1));
        assert_eq!(5, assignments.get_upper_bound(d1));
        assert!(assignments.is_value_in_domain(d1, 3));
    }

    #[test]
    fn backtracking_reports_unfixed_variables() {
        let mut assignments = Assignments::default();
        let d1 = assignments.grow(1, 5);

        assignments.increase_decision_level();
        assignments.make_assignment(d1, 2).expect("non-empty domain");
        assignments.clear_events();

        let unfixed = assignments.synchronise(0);
        assert_eq!(vec![(d1, 2)], unfixed);
    }

    #[test]
    fn writes_during_processing_are_postponed_and_consolidated() {
        let mut assignments = Assignments::default();
        let d1 = assignments.grow(0, 10);

        assignments.begin_processing(d1);
        assignments
            .tighten_lower_bound(d1, 3)
            .expect("non-empty shadow");
        assignments
            .tighten_upper_bound(d1, 7)
            .expect("non-empty shadow");
        assignments
            .tighten_lower_bound(d1, 2)
            .expect("non-empty shadow");

        // The visible bounds are unchanged while the variable is in process.
        assert_eq!(0, assignments.get_lower_bound(d1));
        assert_eq!(10, assignments.get_upper_bound(d1));

        let shadow = assignments.finish_processing(d1);
        assert_eq!(Some((3, 7)), shadow);
        assert_eq!(0, assignments.num_trail_entries());
    }

    #[test]
    fn contradicting_postponed_writes_fail_eagerly() {
        let mut assignments = Assignments::default();
        let d1 = assignments.grow(0, 10);

        assignments.begin_processing(d1);
        assignments
            .tighten_lower_bound(d1, 8)
            .expect("non-empty shadow");
        assert!(assignments.tighten_upper_bound(d1, 4).is_err());

        assignments.abort_processing(d1);
        assert_eq!(0, assignments.get_lower_bound(d1));
    }

    #[test]
    fn old_bounds_are_the_bounds_at_the_start_of_the_pass() {
        let mut assignments = Assignments::default();
        let d1 = assignments.grow(0, 10);

        assignments
            .tighten_lower_bound(d1, 3)
            .expect("non-empty domain");
        assignments
            .tighten_lower_bound(d1, 5)
            .expect("non-empty domain");

        assert_eq!(0, assignments.get_old_lower_bound(d1));
        assert_eq!(5, assignments.get_lower_bound(d1));

        let _ = assignments.pop_pending();
        assignments.commit_pass(d1);

        assert_eq!(5, assignments.get_old_lower_bound(d1));
    }
}
