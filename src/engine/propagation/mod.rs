//! The propagator protocol: demons, priorities, registration, and the
//! contexts through which propagators talk to the solver.

pub(crate) mod contexts;
mod demon;
mod local_id;
mod post_context;
mod propagator;
mod propagator_id;
mod store;

pub use demon::Priority;
pub(crate) use demon::Demon;
pub(crate) use demon::DemonId;
pub(crate) use local_id::LocalId;
pub(crate) use post_context::PostContext;
pub(crate) use propagator::Propagator;
pub(crate) use propagator_id::PropagatorId;
pub(crate) use store::PropagatorStore;

pub(crate) use contexts::PropagationContext;
pub(crate) use contexts::PropagationContextMut;
pub(crate) use contexts::ReadDomains;
