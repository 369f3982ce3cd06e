use enumset::EnumSet;

use super::AffineView;
use super::DomainId;
use crate::basic_types::EmptyDomain;
use crate::engine::domain_events::DomainEvent;
use crate::engine::watch_lists::Watchers;
use crate::engine::Assignments;

/// A trait for the narrow set of operations every integer variable form must
/// implement. [`DomainId`] is the concrete domain; [`AffineView`] and
/// [`Literal`](crate::engine::variables::Literal) reinterpret one through a
/// linear transformation without introducing independent state.
pub trait IntegerVariable: Clone {
    type AffineView: IntegerVariable;

    /// Get the lower bound of the variable.
    fn lower_bound(&self, assignments: &Assignments) -> i64;

    /// Get the upper bound of the variable.
    fn upper_bound(&self, assignments: &Assignments) -> i64;

    /// Get the lower bound the variable had at the start of its current
    /// processing pass.
    fn old_lower_bound(&self, assignments: &Assignments) -> i64;

    /// Get the upper bound the variable had at the start of its current
    /// processing pass.
    fn old_upper_bound(&self, assignments: &Assignments) -> i64;

    /// Determine whether the value is in the domain of this variable.
    fn contains(&self, assignments: &Assignments, value: i64) -> bool;

    /// Remove a value from the domain of this variable.
    fn remove(&self, assignments: &mut Assignments, value: i64) -> Result<(), EmptyDomain>;

    /// Tighten the lower bound of the domain of this variable.
    fn set_lower_bound(&self, assignments: &mut Assignments, value: i64)
        -> Result<(), EmptyDomain>;

    /// Tighten the upper bound of the domain of this variable.
    fn set_upper_bound(&self, assignments: &mut Assignments, value: i64)
        -> Result<(), EmptyDomain>;

    /// Register a demon for the given events on this variable. Views with a
    /// negative scale swap the bound events before subscribing.
    fn watch_all(&self, watchers: &mut Watchers<'_>, events: EnumSet<DomainEvent>);
}

/// A variable which can be transformed into an [`AffineView`] over itself.
pub trait TransformableVariable<View> {
    /// Get a variable which domain is scaled compared to the domain of `self`.
    fn scaled(&self, scale: i64) -> View;

    /// Get a variable which domain has a constant offset to the domain of
    /// `self`.
    fn offset(&self, offset: i64) -> View;
}

impl IntegerVariable for DomainId {
    type AffineView = AffineView<Self>;

    fn lower_bound(&self, assignments: &Assignments) -> i64 {
        assignments.get_lower_bound(*self)
    }

    fn upper_bound(&self, assignments: &Assignments) -> i64 {
        assignments.get_upper_bound(*self)
    }

    fn old_lower_bound(&self, assignments: &Assignments) -> i64 {
        assignments.get_old_lower_bound(*self)
    }

    fn old_upper_bound(&self, assignments: &Assignments) -> i64 {
        assignments.get_old_upper_bound(*self)
    }

    fn contains(&self, assignments: &Assignments, value: i64) -> bool {
        assignments.is_value_in_domain(*self, value)
    }

    fn remove(&self, assignments: &mut Assignments, value: i64) -> Result<(), EmptyDomain> {
        assignments.remove_value_from_domain(*self, value)
    }

    fn set_lower_bound(
        &self,
        assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        assignments.tighten_lower_bound(*self, value)
    }

    fn set_upper_bound(
        &self,
        assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        assignments.tighten_upper_bound(*self, value)
    }

    fn watch_all(&self, watchers: &mut Watchers<'_>, events: EnumSet<DomainEvent>) {
        watchers.watch_all(*self, events);
    }
}

impl TransformableVariable<AffineView<DomainId>> for DomainId {
    fn scaled(&self, scale: i64) -> AffineView<DomainId> {
        AffineView::new(*self, scale, 0)
    }

    fn offset(&self, offset: i64) -> AffineView<DomainId> {
        AffineView::new(*self, 1, offset)
    }
}
