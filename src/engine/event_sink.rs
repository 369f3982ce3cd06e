use std::collections::VecDeque;

use enumset::EnumSet;

use crate::containers::KeyedVec;
use crate::engine::domain_events::DomainEvent;
use crate::engine::variables::DomainId;

/// While demons run, the domain changes they perform are captured as events in
/// the event sink. Each changed variable is queued for processing exactly once;
/// duplicate events on the same variable are merged into its pending set.
///
/// The FIFO order of the queue is the variable-priority order of the
/// propagation pass.
#[derive(Default, Clone, Debug)]
pub(crate) struct EventSink {
    pending: KeyedVec<DomainId, EnumSet<DomainEvent>>,
    queue: VecDeque<DomainId>,
}

impl EventSink {
    pub(crate) fn grow(&mut self) {
        let _ = self.pending.push(EnumSet::new());
    }

    pub(crate) fn event_occurred(&mut self, event: DomainEvent, domain: DomainId) {
        let elem = &mut self.pending[domain];

        if elem.is_empty() {
            self.queue.push_back(domain);
        }
        let _ = elem.insert(event);
    }

    pub(crate) fn has_pending(&self, domain: DomainId) -> bool {
        !self.pending[domain].is_empty()
    }

    /// Pop the next variable with pending events, together with the merged set
    /// of events that occurred since it was last processed.
    pub(crate) fn pop(&mut self) -> Option<(DomainId, EnumSet<DomainEvent>)> {
        let domain = self.queue.pop_front()?;
        let events = std::mem::take(&mut self.pending[domain]);
        Some((domain, events))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        while let Some(domain) = self.queue.pop_front() {
            self.pending[domain] = EnumSet::new();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_captured_event_is_observed_in_the_pop() {
        let mut sink = EventSink::default();
        sink.grow();
        sink.grow();

        sink.event_occurred(DomainEvent::LowerBound, DomainId::new(0));
        sink.event_occurred(DomainEvent::UpperBound, DomainId::new(1));

        let (first, first_events) = sink.pop().expect("expected a pending variable");
        assert_eq!(DomainId::new(0), first);
        assert_eq!(EnumSet::only(DomainEvent::LowerBound), first_events);

        let (second, _) = sink.pop().expect("expected a pending variable");
        assert_eq!(DomainId::new(1), second);
        assert!(sink.pop().is_none());
    }

    #[test]
    fn duplicate_events_are_merged_into_one_entry() {
        let mut sink = EventSink::default();
        sink.grow();

        sink.event_occurred(DomainEvent::LowerBound, DomainId::new(0));
        sink.event_occurred(DomainEvent::LowerBound, DomainId::new(0));
        sink.event_occurred(DomainEvent::Assign, DomainId::new(0));

        let (_, events) = sink.pop().expect("expected a pending variable");
        assert_eq!(DomainEvent::LowerBound | DomainEvent::Assign, events);
        assert!(sink.pop().is_none());
    }

    #[test]
    fn clearing_the_sink_discards_pending_events() {
        let mut sink = EventSink::default();
        sink.grow();

        sink.event_occurred(DomainEvent::LowerBound, DomainId::new(0));
        sink.clear();

        assert!(sink.pop().is_none());
        assert!(!sink.has_pending(DomainId::new(0)));
    }
}
