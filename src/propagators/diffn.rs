use fixedbitset::FixedBitSet;

use crate::basic_types::Inconsistency;
use crate::basic_types::PropagationStatus;
use crate::engine::domain_events::DomainEvents;
use crate::engine::propagation::contexts::PropagationContextMut;
use crate::engine::propagation::LocalId;
use crate::engine::propagation::PostContext;
use crate::engine::propagation::Priority;
use crate::engine::propagation::Propagator;
use crate::engine::propagation::ReadDomains;
use crate::engine::variables::IntegerVariable;
use crate::math::cap_add;
use crate::math::cap_mul;
use crate::math::cap_sub;

/// One rectangle of the non-overlap constraint: position and size variables
/// per axis.
#[derive(Clone, Debug)]
pub struct Rectangle<Var> {
    pub x: Var,
    pub y: Var,
    pub width: Var,
    pub height: Var,
}

/// The occupation of one rectangle along one axis.
#[derive(Clone, Copy, Debug)]
struct AxisBounds {
    position_min: i64,
    position_max: i64,
    size_min: i64,
    size_max: i64,
}

impl AxisBounds {
    /// The window the rectangle can possibly occupy on this axis.
    fn extent(&self) -> (i64, i64) {
        (
            self.position_min,
            cap_add(self.position_max, self.size_max),
        )
    }

    /// The mandatory core on this axis: covered under every remaining
    /// placement. Non-empty iff `position_max < position_min + size_min`.
    fn core(&self) -> Option<(i64, i64)> {
        let core_start = self.position_max;
        let core_end = cap_add(self.position_min, self.size_min);
        (core_start < core_end).then_some((core_start, core_end))
    }
}

/// Propagator for pairwise non-overlap of rectangles.
///
/// Cheap per-rectangle demons only flag the rectangle; a single delayed demon
/// then processes all flagged rectangles at once: it recomputes their
/// neighborhoods, applies an area-based energy check, and pushes neighbors out
/// of mandatory cores. The flags are plain scratch state, not trailed: a
/// failing pass re-flags the rectangles it had not reached yet, so they are
/// re-examined after backtracking.
#[derive(Clone, Debug)]
pub(crate) struct NonOverlapPropagator<Var> {
    rectangles: Box<[Rectangle<Var>]>,
    flagged: FixedBitSet,
}

impl<Var> NonOverlapPropagator<Var>
where
    Var: IntegerVariable,
{
    pub(crate) fn new(rectangles: Box<[Rectangle<Var>]>) -> Self {
        let mut flagged = FixedBitSet::with_capacity(rectangles.len());
        flagged.insert_range(..);
        NonOverlapPropagator {
            rectangles,
            flagged,
        }
    }

    fn process_local_id(&self) -> u32 {
        self.rectangles.len() as u32
    }

    fn axis_bounds(
        context: &PropagationContextMut<'_>,
        position: &Var,
        size: &Var,
    ) -> AxisBounds {
        AxisBounds {
            position_min: context.lower_bound(position),
            position_max: context.upper_bound(position),
            size_min: context.lower_bound(size),
            size_max: context.upper_bound(size),
        }
    }

    fn horizontal(context: &PropagationContextMut<'_>, rectangle: &Rectangle<Var>) -> AxisBounds {
        Self::axis_bounds(context, &rectangle.x, &rectangle.width)
    }

    fn vertical(context: &PropagationContextMut<'_>, rectangle: &Rectangle<Var>) -> AxisBounds {
        Self::axis_bounds(context, &rectangle.y, &rectangle.height)
    }

    /// The rectangles whose possible extents intersect the given rectangle's
    /// extents on both axes.
    fn neighbors(
        &self,
        context: &PropagationContextMut<'_>,
        subject: usize,
    ) -> Vec<usize> {
        let horizontal = Self::horizontal(context, &self.rectangles[subject]).extent();
        let vertical = Self::vertical(context, &self.rectangles[subject]).extent();

        (0..self.rectangles.len())
            .filter(|&other| other != subject)
            .filter(|&other| {
                let other_horizontal = Self::horizontal(context, &self.rectangles[other]).extent();
                let other_vertical = Self::vertical(context, &self.rectangles[other]).extent();
                intersects(horizontal, other_horizontal) && intersects(vertical, other_vertical)
            })
            .collect()
    }

    /// Fail when the guaranteed areas within the joint bounding box exceed the
    /// area of the box.
    fn energy_check(
        &self,
        context: &PropagationContextMut<'_>,
        subject: usize,
        neighbors: &[usize],
    ) -> PropagationStatus {
        let mut box_horizontal = Self::horizontal(context, &self.rectangles[subject]).extent();
        let mut box_vertical = Self::vertical(context, &self.rectangles[subject]).extent();
        let mut energy = 0;

        for &index in neighbors.iter().chain(std::iter::once(&subject)) {
            let rectangle = &self.rectangles[index];
            let horizontal = Self::horizontal(context, rectangle);
            let vertical = Self::vertical(context, rectangle);

            let extent_horizontal = horizontal.extent();
            let extent_vertical = vertical.extent();
            box_horizontal = (
                box_horizontal.0.min(extent_horizontal.0),
                box_horizontal.1.max(extent_horizontal.1),
            );
            box_vertical = (
                box_vertical.0.min(extent_vertical.0),
                box_vertical.1.max(extent_vertical.1),
            );

            energy = cap_add(energy, cap_mul(horizontal.size_min, vertical.size_min));
        }

        let box_area = cap_mul(
            cap_sub(box_horizontal.1, box_horizontal.0),
            cap_sub(box_vertical.1, box_vertical.0),
        );

        if energy > box_area {
            return Err(Inconsistency::Conflict);
        }
        Ok(())
    }

    /// Push `other` out of the mandatory core `(core_start, core_end)` along
    /// the axis given by `position`/`size`: it ends up entirely before or
    /// entirely after the core, whichever remains possible.
    fn separate_along(
        context: &mut PropagationContextMut<'_>,
        position: &Var,
        size: &Var,
        core_start: i64,
        core_end: i64,
    ) -> PropagationStatus {
        let bounds = AxisBounds {
            position_min: context.lower_bound(position),
            position_max: context.upper_bound(position),
            size_min: context.lower_bound(size),
            size_max: context.upper_bound(size),
        };

        let fits_before = cap_add(bounds.position_min, bounds.size_min) <= core_start;
        let fits_after = bounds.position_max >= core_end;

        match (fits_before, fits_after) {
            (false, false) => Err(Inconsistency::Conflict),
            (false, true) => {
                context.set_lower_bound(position, core_end)?;
                Ok(())
            }
            (true, false) => {
                // Must end at or before the core; the size shrinks along if
                // needed.
                context.set_upper_bound(position, cap_sub(core_start, bounds.size_min))?;
                context.set_upper_bound(size, cap_sub(core_start, bounds.position_min))?;
                Ok(())
            }
            (true, true) => Ok(()),
        }
    }

    fn process(&mut self, context: &mut PropagationContextMut<'_>) -> PropagationStatus {
        let flagged: Vec<usize> = self.flagged.ones().collect();
        self.flagged.clear();

        for (position, &subject) in flagged.iter().enumerate() {
            if let Err(conflict) = self.process_rectangle(context, subject) {
                // Keep the rectangles this pass did not reach (including the
                // failing one) flagged, so the next pass re-examines them.
                for &unreached in &flagged[position..] {
                    self.flagged.insert(unreached);
                }
                return Err(conflict);
            }
        }

        Ok(())
    }

    fn process_rectangle(
        &self,
        context: &mut PropagationContextMut<'_>,
        subject: usize,
    ) -> PropagationStatus {
        let neighbors = self.neighbors(context, subject);

        self.energy_check(context, subject, &neighbors)?;

        let subject_horizontal = Self::horizontal(context, &self.rectangles[subject]);
        let subject_vertical = Self::vertical(context, &self.rectangles[subject]);
        let (Some(x_core), Some(y_core)) = (subject_horizontal.core(), subject_vertical.core())
        else {
            return Ok(());
        };

        for &other in &neighbors {
            let other_horizontal = Self::horizontal(context, &self.rectangles[other]);
            let other_vertical = Self::vertical(context, &self.rectangles[other]);

            let overlap_x = other_horizontal
                .core()
                .is_some_and(|core| intersects(core, x_core));
            let overlap_y = other_vertical
                .core()
                .is_some_and(|core| intersects(core, y_core));

            match (overlap_x, overlap_y) {
                (true, true) => return Err(Inconsistency::Conflict),
                (true, false) => {
                    let rectangle = &self.rectangles[other];
                    Self::separate_along(
                        context,
                        &rectangle.y,
                        &rectangle.height,
                        y_core.0,
                        y_core.1,
                    )?;
                }
                (false, true) => {
                    let rectangle = &self.rectangles[other];
                    Self::separate_along(
                        context,
                        &rectangle.x,
                        &rectangle.width,
                        x_core.0,
                        x_core.1,
                    )?;
                }
                (false, false) => {}
            }
        }

        Ok(())
    }
}

fn intersects(left: (i64, i64), right: (i64, i64)) -> bool {
    left.0 < right.1 && right.0 < left.1
}

impl<Var: 'static> Propagator for NonOverlapPropagator<Var>
where
    Var: IntegerVariable,
{
    fn name(&self) -> &str {
        "NonOverlap"
    }

    fn post(&mut self, context: &mut PostContext<'_>) {
        // The flagging demons are cheap and run at variable priority; the
        // processing demon is scheduled once per cycle at delayed priority.
        let process = context.register(
            &self.rectangles[0].x,
            DomainEvents::RANGE,
            LocalId::from(self.process_local_id()),
            Priority::Delayed,
        );

        for (index, rectangle) in self.rectangles.iter().enumerate() {
            let flag = context.register(
                &rectangle.x,
                DomainEvents::RANGE,
                LocalId::from(index as u32),
                Priority::Var,
            );
            context.watch_with(flag, &rectangle.y, DomainEvents::RANGE);
            context.watch_with(flag, &rectangle.width, DomainEvents::RANGE);
            context.watch_with(flag, &rectangle.height, DomainEvents::RANGE);

            if index > 0 {
                context.watch_with(process, &rectangle.x, DomainEvents::RANGE);
            }
            context.watch_with(process, &rectangle.y, DomainEvents::RANGE);
            context.watch_with(process, &rectangle.width, DomainEvents::RANGE);
            context.watch_with(process, &rectangle.height, DomainEvents::RANGE);
        }
    }

    fn initial_propagate(&mut self, mut context: PropagationContextMut<'_>) -> PropagationStatus {
        self.flagged.insert_range(..);
        self.process(&mut context)
    }

    fn propagate(
        &mut self,
        mut context: PropagationContextMut<'_>,
        demon: LocalId,
    ) -> PropagationStatus {
        if demon.unpack() == self.process_local_id() {
            self.process(&mut context)
        } else {
            self.flagged.insert(demon.unpack() as usize);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_solver::TestSolver;
    use crate::engine::variables::DomainId;

    fn fixed_size_rectangle(
        solver: &mut TestSolver,
        x: (i64, i64),
        y: (i64, i64),
        width: i64,
        height: i64,
    ) -> Rectangle<DomainId> {
        Rectangle {
            x: solver.new_variable(x.0, x.1),
            y: solver.new_variable(y.0, y.1),
            width: solver.new_variable(width, width),
            height: solver.new_variable(height, height),
        }
    }

    #[test]
    fn overlapping_mandatory_cores_fail() {
        let mut solver = TestSolver::default();
        let a = fixed_size_rectangle(&mut solver, (0, 0), (0, 0), 2, 2);
        let b = fixed_size_rectangle(&mut solver, (1, 1), (1, 1), 2, 2);

        let result = solver.new_propagator(NonOverlapPropagator::new([a, b].into()));
        assert!(result.is_err());
    }

    #[test]
    fn a_neighbor_is_pushed_out_of_the_core() {
        let mut solver = TestSolver::default();
        // a occupies [0, 2) x [0, 2) under every placement; b is on the same
        // row and must end up to its right.
        let a = fixed_size_rectangle(&mut solver, (0, 0), (0, 0), 2, 2);
        let b = fixed_size_rectangle(&mut solver, (1, 5), (0, 0), 2, 2);

        solver
            .new_propagator(NonOverlapPropagator::new([a, b.clone()].into()))
            .expect("no empty domains");

        assert_eq!(2, solver.lower_bound(&b.x));
    }

    #[test]
    fn the_energy_check_catches_overfull_regions() {
        let mut solver = TestSolver::default();
        // Three 2x2 rectangles in a 3x3 region: 12 units of area in 9.
        let a = fixed_size_rectangle(&mut solver, (0, 1), (0, 1), 2, 2);
        let b = fixed_size_rectangle(&mut solver, (0, 1), (0, 1), 2, 2);
        let c = fixed_size_rectangle(&mut solver, (0, 1), (0, 1), 2, 2);

        let result = solver.new_propagator(NonOverlapPropagator::new([a, b, c].into()));
        assert!(result.is_err());
    }

    #[test]
    fn separated_rectangles_are_left_alone() {
        let mut solver = TestSolver::default();
        let a = fixed_size_rectangle(&mut solver, (0, 0), (0, 0), 2, 2);
        let b = fixed_size_rectangle(&mut solver, (5, 8), (0, 3), 2, 2);

        solver
            .new_propagator(NonOverlapPropagator::new([a, b.clone()].into()))
            .expect("no empty domains");

        assert_eq!(5, solver.lower_bound(&b.x));
        assert_eq!(0, solver.lower_bound(&b.y));
    }
}
