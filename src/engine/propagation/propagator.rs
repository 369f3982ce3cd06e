use super::LocalId;
use super::PostContext;
use crate::basic_types::PropagationStatus;
use crate::engine::propagation::contexts::PropagationContextMut;

/// All constraints are enforced through propagators, which implement this
/// trait.
///
/// A propagator is a stateful object: any mutable state it keeps across
/// propagation passes must live in reversible cells allocated through the
/// [`PostContext`], so that the trail restores it on backtracking.
///
/// The lifecycle is: [`Propagator::post`] subscribes the propagator's demons
/// to variable events, then [`Propagator::initial_propagate`] seeds bounds.
/// Afterwards the kernel calls [`Propagator::propagate`] with the local id of
/// whichever demon fired.
pub(crate) trait Propagator {
    /// Return the name of the propagator; this is a convenience method used
    /// for printing.
    fn name(&self) -> &str;

    /// Subscribe demons to variable events and allocate reversible state.
    fn post(&mut self, context: &mut PostContext<'_>);

    /// Seed bounds when the constraint is added to the solver. The kernel
    /// treats a failure here as a root-level conflict.
    fn initial_propagate(&mut self, context: PropagationContextMut<'_>) -> PropagationStatus;

    /// Run the demon registered under `demon`. Propagators are not required
    /// to reach their own fixpoint in one call; tightening a watched variable
    /// re-schedules the demon.
    ///
    /// By default this repropagates the whole constraint from scratch.
    fn propagate(
        &mut self,
        context: PropagationContextMut<'_>,
        demon: LocalId,
    ) -> PropagationStatus {
        let _ = demon;
        self.initial_propagate(context)
    }
}
