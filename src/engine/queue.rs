use std::collections::VecDeque;

use crate::containers::KeyedVec;
use crate::engine::propagation::Demon;
use crate::engine::propagation::DemonId;
use crate::engine::propagation::Priority;
use crate::gourd_assert_moderate;

/// The demon queues for the normal and delayed priorities. Variable-priority
/// demons never pass through here: they run inside the processing window of
/// the variable that woke them.
///
/// A demon is enqueued at most once per enqueue cycle; the `scheduled` flag in
/// the demon arena makes re-scheduling before execution a no-op.
#[derive(Default, Debug)]
pub(crate) struct DemonQueue {
    normal: VecDeque<DemonId>,
    delayed: VecDeque<DemonId>,
}

impl DemonQueue {
    pub(crate) fn schedule(&mut self, demon_id: DemonId, demons: &mut KeyedVec<DemonId, Demon>) {
        let demon = &mut demons[demon_id];
        gourd_assert_moderate!(demon.priority != Priority::Var);

        if demon.scheduled {
            return;
        }
        demon.scheduled = true;

        match demon.priority {
            Priority::Var => unreachable!("variable-priority demons are run in place"),
            Priority::Normal => self.normal.push_back(demon_id),
            Priority::Delayed => self.delayed.push_back(demon_id),
        }
    }

    pub(crate) fn pop_normal(&mut self, demons: &mut KeyedVec<DemonId, Demon>) -> Option<DemonId> {
        let demon_id = self.normal.pop_front()?;
        demons[demon_id].scheduled = false;
        Some(demon_id)
    }

    pub(crate) fn pop_delayed(&mut self, demons: &mut KeyedVec<DemonId, Demon>) -> Option<DemonId> {
        let demon_id = self.delayed.pop_front()?;
        demons[demon_id].scheduled = false;
        Some(demon_id)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.normal.is_empty() && self.delayed.is_empty()
    }

    /// Unwind the queues after a failure; the scheduled flags are reset so the
    /// next enqueue cycle starts clean.
    pub(crate) fn clear(&mut self, demons: &mut KeyedVec<DemonId, Demon>) {
        for demon_id in self.normal.drain(..).chain(self.delayed.drain(..)) {
            demons[demon_id].scheduled = false;
        }
    }
}
