use enumset::EnumSet;

use crate::containers::KeyedVec;
use crate::engine::domain_events::DomainEvent;
use crate::engine::propagation::DemonId;
use crate::engine::stateful::RevList;
use crate::engine::stateful::StatefulValues;
use crate::engine::variables::DomainId;

/// The per-variable listener lists, keyed by event class. Registration is
/// reversible: a constraint posted during search unsubscribes automatically
/// when the trail rolls back past the registration.
#[derive(Default, Debug)]
pub(crate) struct WatchLists {
    watchers: KeyedVec<DomainId, DomainWatchList>,
}

#[derive(Debug)]
struct DomainWatchList {
    lower_bound: RevList<DemonId>,
    upper_bound: RevList<DemonId>,
    assign: RevList<DemonId>,
    removal: RevList<DemonId>,
}

impl WatchLists {
    pub(crate) fn grow(&mut self, stateful: &mut StatefulValues) {
        let _ = self.watchers.push(DomainWatchList {
            lower_bound: RevList::new(stateful),
            upper_bound: RevList::new(stateful),
            assign: RevList::new(stateful),
            removal: RevList::new(stateful),
        });
    }

    fn watch(
        &mut self,
        demon: DemonId,
        domain: DomainId,
        events: EnumSet<DomainEvent>,
        stateful: &mut StatefulValues,
    ) {
        let lists = &mut self.watchers[domain];
        for event in events.iter() {
            match event {
                DomainEvent::LowerBound => lists.lower_bound.push(stateful, demon),
                DomainEvent::UpperBound => lists.upper_bound.push(stateful, demon),
                DomainEvent::Assign => lists.assign.push(stateful, demon),
                DomainEvent::Removal => lists.removal.push(stateful, demon),
            }
        }
    }

    /// Collect the demons subscribed to any of the fired event classes, in
    /// subscription order per class. A demon subscribed to several fired
    /// classes appears once per class; the scheduling layer deduplicates.
    pub(crate) fn affected(
        &self,
        domain: DomainId,
        events: EnumSet<DomainEvent>,
        stateful: &StatefulValues,
        out: &mut Vec<DemonId>,
    ) {
        let lists = &self.watchers[domain];
        for event in events.iter() {
            let list = match event {
                DomainEvent::LowerBound => &lists.lower_bound,
                DomainEvent::UpperBound => &lists.upper_bound,
                DomainEvent::Assign => &lists.assign,
                DomainEvent::Removal => &lists.removal,
            };
            out.extend(list.iter(stateful).copied());
        }
    }
}

/// Used to register a demon for notifications about events to a particular
/// variable.
#[derive(Debug)]
pub struct Watchers<'a> {
    demon: DemonId,
    watch_lists: &'a mut WatchLists,
    stateful: &'a mut StatefulValues,
}

impl<'a> Watchers<'a> {
    pub(crate) fn new(
        demon: DemonId,
        watch_lists: &'a mut WatchLists,
        stateful: &'a mut StatefulValues,
    ) -> Self {
        Watchers {
            demon,
            watch_lists,
            stateful,
        }
    }

    pub(crate) fn watch_all(&mut self, domain: DomainId, events: EnumSet<DomainEvent>) {
        self.watch_lists
            .watch(self.demon, domain, events, self.stateful)
    }
}
