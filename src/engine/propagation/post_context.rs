use super::Demon;
use super::DemonId;
use super::LocalId;
use super::Priority;
use super::PropagatorId;
use crate::containers::KeyedVec;
use crate::engine::domain_events::DomainEvents;
use crate::engine::propagation::contexts::HasAssignments;
use crate::engine::stateful::StatefulInt;
use crate::engine::stateful::StatefulValues;
use crate::engine::variables::IntegerVariable;
use crate::engine::watch_lists::WatchLists;
use crate::engine::watch_lists::Watchers;
use crate::engine::Assignments;

/// The context given to [`Propagator::post`](super::Propagator::post). It is
/// used to register demons on variable events and to allocate the reversible
/// cells that hold the propagator's incremental state.
#[derive(Debug)]
pub(crate) struct PostContext<'a> {
    pub(crate) assignments: &'a Assignments,
    pub(crate) stateful: &'a mut StatefulValues,
    watch_lists: &'a mut WatchLists,
    demons: &'a mut KeyedVec<DemonId, Demon>,
    propagator_id: PropagatorId,
}

impl<'a> PostContext<'a> {
    pub(crate) fn new(
        assignments: &'a Assignments,
        stateful: &'a mut StatefulValues,
        watch_lists: &'a mut WatchLists,
        demons: &'a mut KeyedVec<DemonId, Demon>,
        propagator_id: PropagatorId,
    ) -> Self {
        PostContext {
            assignments,
            stateful,
            watch_lists,
            demons,
            propagator_id,
        }
    }

    /// Register a demon of the owning propagator on the given events of the
    /// variable. When one of the events fires, the kernel calls
    /// [`Propagator::propagate`](super::Propagator::propagate) with
    /// `local_id`, according to the demon's priority.
    pub(crate) fn register<Var: IntegerVariable>(
        &mut self,
        var: &Var,
        events: DomainEvents,
        local_id: LocalId,
        priority: Priority,
    ) -> DemonId {
        let demon = self.demons.push(Demon {
            propagator: self.propagator_id,
            local_id,
            priority,
            scheduled: false,
        });

        let mut watchers = Watchers::new(demon, self.watch_lists, self.stateful);
        var.watch_all(&mut watchers, events.get_events());

        demon
    }

    /// Subscribe an already-registered demon to events on a further variable.
    pub(crate) fn watch_with<Var: IntegerVariable>(
        &mut self,
        demon: DemonId,
        var: &Var,
        events: DomainEvents,
    ) {
        let mut watchers = Watchers::new(demon, self.watch_lists, self.stateful);
        var.watch_all(&mut watchers, events.get_events());
    }

    /// Allocate a reversible cell for the propagator's incremental state.
    pub(crate) fn new_stateful_int(&mut self, initial_value: i64) -> StatefulInt {
        self.stateful.grow(initial_value)
    }
}

impl HasAssignments for PostContext<'_> {
    fn assignments(&self) -> &Assignments {
        self.assignments
    }
}
