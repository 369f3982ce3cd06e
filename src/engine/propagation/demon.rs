use super::LocalId;
use super::PropagatorId;
use crate::containers::StorageKey;

/// The scheduling class of a demon.
///
/// Variable-priority demons run inside the processing window of the variable
/// that woke them; normal demons run once all variable processing has drained;
/// delayed demons run only when both other classes are exhausted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Priority {
    Var,
    Normal,
    Delayed,
}

/// A handle to a demon in the kernel-owned arena. Demons are registered when a
/// constraint is posted and referenced by handle from the subscription lists,
/// which avoids cyclic ownership between variables and constraints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct DemonId(pub(crate) u32);

impl StorageKey for DemonId {
    fn index(&self) -> usize {
        self.0 as usize
    }

    fn create_from_index(index: usize) -> Self {
        DemonId(index as u32)
    }
}

/// The dispatch record for a registered demon: which propagator to call, the
/// propagator-local selector, and the scheduling class.
#[derive(Clone, Debug)]
pub(crate) struct Demon {
    pub(crate) propagator: PropagatorId,
    pub(crate) local_id: LocalId,
    pub(crate) priority: Priority,
    /// A demon is scheduled at most once per enqueue cycle; re-scheduling
    /// before execution is a no-op.
    pub(crate) scheduled: bool,
}
