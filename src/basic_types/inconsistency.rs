/// The error case of a domain operation which left a variable without values.
///
/// An empty domain is the normal backtracking signal, not a user-facing error:
/// the kernel unwinds the event queue and reverts the trail to the last
/// decision when it observes one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmptyDomain;

/// A logical contradiction detected during propagation, either because a
/// domain became empty or because a propagator concluded its constraint can no
/// longer be satisfied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Inconsistency {
    EmptyDomain,
    /// The propagator found the current state inconsistent without writing an
    /// empty domain, e.g. an energy check which exceeds the available area.
    Conflict,
}

impl From<EmptyDomain> for Inconsistency {
    fn from(_: EmptyDomain) -> Self {
        Inconsistency::EmptyDomain
    }
}

/// The result of a propagation step; `Err` signals `fail`.
pub type PropagationStatus = Result<(), Inconsistency>;
