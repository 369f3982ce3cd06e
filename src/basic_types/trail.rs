use std::iter::Rev;
use std::vec::Drain;

use crate::gourd_assert_simple;

/// The journal of reversible writes, segmented into search nodes by
/// checkpoints.
///
/// Every store with reversible state records an undo entry here per write.
/// Entering a search node pushes a checkpoint; [`Trail::pop_to`] rewinds to an
/// earlier checkpoint and hands the entries written since back in reverse
/// order, so the owning store can restore each cell to exactly the value it
/// had at that point.
#[derive(Clone, Debug)]
pub(crate) struct Trail<Entry> {
    entries: Vec<Entry>,
    /// The journal length at the moment each open search node was entered.
    /// The depth of this stack is the current decision level.
    checkpoints: Vec<usize>,
}

impl<Entry> Default for Trail<Entry> {
    fn default() -> Self {
        Trail {
            entries: Vec::default(),
            checkpoints: Vec::default(),
        }
    }
}

impl<Entry> Trail<Entry> {
    /// Mark a restore point: writes from here on belong to a new search node.
    pub(crate) fn push_checkpoint(&mut self) {
        self.checkpoints.push(self.entries.len());
    }

    /// The number of open checkpoints, i.e. the current decision level.
    pub(crate) fn depth(&self) -> usize {
        self.checkpoints.len()
    }

    /// The number of journaled writes across all nodes.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Journal one reversible write in the current node.
    pub(crate) fn record(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// Rewind to the given checkpoint, yielding the journaled writes in
    /// reverse order of recording. All checkpoints above it are discarded.
    pub(crate) fn pop_to(&mut self, checkpoint: usize) -> Rev<Drain<'_, Entry>> {
        gourd_assert_simple!(checkpoint < self.depth());

        let node_start = self.checkpoints[checkpoint];

        self.checkpoints.truncate(checkpoint);
        self.entries.drain(node_start..).rev()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_writes_accumulate_across_nodes() {
        let mut trail = Trail::default();

        trail.record(1);
        trail.push_checkpoint();
        trail.record(2);

        assert_eq!(2, trail.len());
        assert_eq!(1, trail.depth());
    }

    #[test]
    fn popping_discards_the_writes_of_abandoned_nodes() {
        let mut trail = Trail::default();

        trail.push_checkpoint();
        trail.record(1);
        let _ = trail.pop_to(0);

        assert_eq!(0, trail.len());
        assert_eq!(0, trail.depth());
    }

    #[test]
    fn popping_skips_intermediate_checkpoints() {
        let mut trail = Trail::default();
        trail.record(1);

        trail.push_checkpoint();
        trail.record(2);
        trail.push_checkpoint();
        trail.record(3);
        trail.push_checkpoint();
        trail.record(4);

        let _ = trail.pop_to(1);

        assert_eq!(2, trail.len());
        assert_eq!(1, trail.depth());
    }

    #[test]
    fn popped_writes_come_back_in_reverse_order_of_recording() {
        let mut trail = Trail::default();
        trail.record(1);

        trail.push_checkpoint();
        trail.record(2);
        trail.push_checkpoint();
        trail.record(3);
        trail.push_checkpoint();
        trail.record(4);

        let popped = trail.pop_to(0).collect::<Vec<_>>();
        assert_eq!(vec![4, 3, 2], popped);
    }
}
