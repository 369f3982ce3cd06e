use enumset::EnumSet;

use super::IntegerVariable;
use super::TransformableVariable;
use crate::basic_types::EmptyDomain;
use crate::engine::domain_events::DomainEvent;
use crate::engine::watch_lists::Watchers;
use crate::engine::Assignments;
use crate::math::cap_add;
use crate::math::cap_mul;
use crate::math::div_ceil;
use crate::math::div_floor;
use crate::gourd_assert_simple;

/// Models the expression `y = ax + b`, by expressing the domain of `y` as a
/// transformation of the domain of `x`.
#[derive(Clone, Copy, Hash, Eq, PartialEq)]
pub struct AffineView<Inner> {
    pub(crate) inner: Inner,
    scale: i64,
    offset: i64,
}

enum Rounding {
    Up,
    Down,
}

impl<Inner> AffineView<Inner> {
    pub fn new(inner: Inner, scale: i64, offset: i64) -> Self {
        gourd_assert_simple!(scale != 0, "affine views require a non-zero scale");
        AffineView {
            inner,
            scale,
            offset,
        }
    }

    /// Apply the inverse transformation of this view on a value, to go from
    /// the value in the domain of `self` to a value in the domain of
    /// `self.inner`.
    fn invert(&self, value: i64, rounding: Rounding) -> i64 {
        let inverted_translation = value - self.offset;

        match rounding {
            Rounding::Up => div_ceil(inverted_translation, self.scale),
            Rounding::Down => div_floor(inverted_translation, self.scale),
        }
    }

    fn map(&self, value: i64) -> i64 {
        cap_add(cap_mul(self.scale, value), self.offset)
    }
}

impl<View> IntegerVariable for AffineView<View>
where
    View: IntegerVariable,
{
    type AffineView = Self;

    fn lower_bound(&self, assignments: &Assignments) -> i64 {
        if self.scale < 0 {
            self.map(self.inner.upper_bound(assignments))
        } else {
            self.map(self.inner.lower_bound(assignments))
        }
    }

    fn upper_bound(&self, assignments: &Assignments) -> i64 {
        if self.scale < 0 {
            self.map(self.inner.lower_bound(assignments))
        } else {
            self.map(self.inner.upper_bound(assignments))
        }
    }

    fn old_lower_bound(&self, assignments: &Assignments) -> i64 {
        if self.scale < 0 {
            self.map(self.inner.old_upper_bound(assignments))
        } else {
            self.map(self.inner.old_lower_bound(assignments))
        }
    }

    fn old_upper_bound(&self, assignments: &Assignments) -> i64 {
        if self.scale < 0 {
            self.map(self.inner.old_lower_bound(assignments))
        } else {
            self.map(self.inner.old_upper_bound(assignments))
        }
    }

    fn contains(&self, assignments: &Assignments, value: i64) -> bool {
        if (value - self.offset) % self.scale == 0 {
            let inverted = self.invert(value, Rounding::Up);
            self.inner.contains(assignments, inverted)
        } else {
            false
        }
    }

    fn remove(&self, assignments: &mut Assignments, value: i64) -> Result<(), EmptyDomain> {
        if (value - self.offset) % self.scale == 0 {
            let inverted = self.invert(value, Rounding::Up);
            self.inner.remove(assignments, inverted)
        } else {
            Ok(())
        }
    }

    fn set_lower_bound(
        &self,
        assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        if self.scale >= 0 {
            self.inner
                .set_lower_bound(assignments, self.invert(value, Rounding::Up))
        } else {
            self.inner
                .set_upper_bound(assignments, self.invert(value, Rounding::Down))
        }
    }

    fn set_upper_bound(
        &self,
        assignments: &mut Assignments,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        if self.scale >= 0 {
            self.inner
                .set_upper_bound(assignments, self.invert(value, Rounding::Down))
        } else {
            self.inner
                .set_lower_bound(assignments, self.invert(value, Rounding::Up))
        }
    }

    fn watch_all(&self, watchers: &mut Watchers<'_>, mut events: EnumSet<DomainEvent>) {
        if self.scale < 0 {
            let bounds = DomainEvent::LowerBound | DomainEvent::UpperBound;
            let intersection = events.intersection(bounds);
            if intersection.len() == 1 {
                events = events.symmetrical_difference(bounds);
            }
        }

        self.inner.watch_all(watchers, events);
    }
}

impl<View> TransformableVariable<AffineView<View>> for AffineView<View>
where
    View: IntegerVariable,
{
    fn scaled(&self, scale: i64) -> AffineView<View> {
        let mut result = self.clone();
        result.scale *= scale;
        result.offset *= scale;
        result
    }

    fn offset(&self, offset: i64) -> AffineView<View> {
        let mut result = self.clone();
        result.offset += offset;
        result
    }
}

impl<View: std::fmt::Debug> std::fmt::Debug for AffineView<View> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.scale == -1 {
            write!(f, "-")?;
        } else if self.scale != 1 {
            write!(f, "{} * ", self.scale)?;
        }

        write!(f, "({:?})", self.inner)?;

        match self.offset.cmp(&0) {
            std::cmp::Ordering::Less => write!(f, " - {}", -self.offset)?,
            std::cmp::Ordering::Greater => write!(f, " + {}", self.offset)?,
            std::cmp::Ordering::Equal => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaling_the_bounds_of_a_variable() {
        let mut assignments = Assignments::default();
        let x = assignments.grow(2, 5);

        let view = AffineView::new(x, 3, 0);

        assert_eq!(6, view.lower_bound(&assignments));
        assert_eq!(15, view.upper_bound(&assignments));
    }

    #[test]
    fn negative_scales_swap_the_bounds() {
        let mut assignments = Assignments::default();
        let x = assignments.grow(2, 5);

        let view = AffineView::new(x, -1, 0);

        assert_eq!(-5, view.lower_bound(&assignments));
        assert_eq!(-2, view.upper_bound(&assignments));
    }

    #[test]
    fn writes_through_a_negated_view_are_reflected() {
        let mut assignments = Assignments::default();
        let x = assignments.grow(0, 10);

        let view = AffineView::new(x, -1, 0);
        view.set_lower_bound(&mut assignments, -7)
            .expect("non-empty domain");

        assert_eq!(7, assignments.get_upper_bound(x));
    }

    #[test]
    fn bounds_are_rounded_into_the_inner_domain() {
        let mut assignments = Assignments::default();
        let x = assignments.grow(0, 10);

        let view = AffineView::new(x, 2, 0);
        view.set_lower_bound(&mut assignments, 5)
            .expect("non-empty domain");

        // [x * 2 >= 5] is rounded to [x >= 3].
        assert_eq!(3, assignments.get_lower_bound(x));
        assert_eq!(6, view.lower_bound(&assignments));
    }

    #[test]
    fn values_not_on_the_scale_grid_are_not_contained() {
        let mut assignments = Assignments::default();
        let x = assignments.grow(0, 10);

        let view = AffineView::new(x, 2, 1);

        assert!(view.contains(&assignments, 7));
        assert!(!view.contains(&assignments, 8));
    }
}
