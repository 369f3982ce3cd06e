use std::ops::Not;

use enumset::EnumSet;

use super::AffineView;
use super::DomainId;
use super::IntegerVariable;
use super::TransformableVariable;
use crate::basic_types::EmptyDomain;
use crate::engine::domain_events::DomainEvent;
use crate::engine::watch_lists::Watchers;
use crate::engine::Assignments;

/// A Boolean variable as a view over a `[0, 1]` integer domain. Literals that
/// evaluate to true have value 1; the negation of a literal is an affine view
/// `1 - x` over the same domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Literal {
    integer_variable: AffineView<DomainId>,
}

impl Literal {
    pub(crate) fn new(domain_id: DomainId) -> Literal {
        Literal {
            integer_variable: domain_id.scaled(1),
        }
    }

    /// The underlying 0-1 domain. Note that for a negated literal this is
    /// still the positive variable's domain.
    pub fn domain_id(&self) -> DomainId {
        self.integer_variable.inner
    }
}

impl Not for Literal {
    type Output = Literal;

    fn not(self) -> Self::Output {
        Literal {
            integer_variable: self.integer_variable.scaled(-1).offset(1),
        }
    }
}

impl IntegerVariable for Literal {
    type AffineView = AffineView<Self>;

    fn lower_bound(&self, assignments: &Assignments) -> i64 {
        self.integer_variable.lower_bound(assignments)
    }

    fn upper_bound(&self, assignments: &Assignments) -> i64 {
        self.integer_variable.upper_bound(assignments)
    }

    fn old_lower_bound(&self, assignments: &Assignments) -> i64 {
        self.integer_variable.old_lower_bound(assignments)
    }

    fn old_upper_bound(&self, assignments: &Assignments) -> i64 {
        self.integer_variable.old_upper_bound(assignments)
    }

    fn contains(&self, assignments: &Assignments, value: i64) -> bool {
        self.integer_variable.contains(assignments, value)
    }

    fn remove(&self, assignments: &mut Assignments, value: i64) -> Result<(), EmptyDomain> {
        self.integer_variable.remove(assignments, value)
    }

    fn set_lower_bound(
        &self,
        assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        self.integer_variable.set_lower_bound(assignments, value)
    }

    fn set_upper_bound(
        &self,
        assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        self.integer_variable.set_upper_bound(assignments, value)
    }

    fn watch_all(&self, watchers: &mut Watchers<'_>, events: EnumSet<DomainEvent>) {
        self.integer_variable.watch_all(watchers, events)
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.integer_variable)
    }
}
