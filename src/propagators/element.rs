use crate::basic_types::PropagationStatus;
use crate::engine::domain_events::DomainEvents;
use crate::engine::propagation::contexts::PropagationContextMut;
use crate::engine::propagation::LocalId;
use crate::engine::propagation::PostContext;
use crate::engine::propagation::Priority;
use crate::engine::propagation::Propagator;
use crate::engine::propagation::ReadDomains;
use crate::engine::variables::IntegerVariable;
use crate::math::INT64_MAX;
use crate::math::INT64_MIN;

/// Propagator for the element constraint `values[index] == target` over a
/// fixed array of constants. This is the light version: the target bounds are
/// the extremes over the index domain, and index values whose entry falls
/// outside the target range are punched out of the domain.
#[derive(Clone, Debug)]
pub(crate) struct ElementPropagator<IndexVar, TargetVar> {
    index: IndexVar,
    values: Box<[i64]>,
    target: TargetVar,
}

const ID_INDEX: u32 = 0;
const ID_TARGET: u32 = 1;

impl<IndexVar, TargetVar> ElementPropagator<IndexVar, TargetVar>
where
    IndexVar: IntegerVariable,
    TargetVar: IntegerVariable,
{
    pub(crate) fn new(index: IndexVar, values: Box<[i64]>, target: TargetVar) -> Self {
        ElementPropagator {
            index,
            values,
            target,
        }
    }

    fn enforce(&self, context: &mut PropagationContextMut<'_>) -> PropagationStatus {
        context.set_lower_bound(&self.index, 0)?;
        context.set_upper_bound(&self.index, self.values.len() as i64 - 1)?;

        // Punch out index values whose entry cannot be the target.
        let target_min = context.lower_bound(&self.target);
        let target_max = context.upper_bound(&self.target);
        for (i, &value) in self.values.iter().enumerate() {
            if (value < target_min || value > target_max)
                && context.contains(&self.index, i as i64)
            {
                context.remove(&self.index, i as i64)?;
            }
        }

        // The target ranges over the entries still indexable.
        let mut minimum = INT64_MAX;
        let mut maximum = INT64_MIN;
        for (i, &value) in self.values.iter().enumerate() {
            if context.contains(&self.index, i as i64) {
                minimum = minimum.min(value);
                maximum = maximum.max(value);
            }
        }

        context.set_lower_bound(&self.target, minimum)?;
        context.set_upper_bound(&self.target, maximum)?;

        Ok(())
    }
}

impl<IndexVar: 'static, TargetVar: 'static> Propagator for ElementPropagator<IndexVar, TargetVar>
where
    IndexVar: IntegerVariable,
    TargetVar: IntegerVariable,
{
    fn name(&self) -> &str {
        "Element"
    }

    fn post(&mut self, context: &mut PostContext<'_>) {
        let _ = context.register(
            &self.index,
            DomainEvents::ANY,
            LocalId::from(ID_INDEX),
            Priority::Normal,
        );
        let _ = context.register(
            &self.target,
            DomainEvents::RANGE,
            LocalId::from(ID_TARGET),
            Priority::Normal,
        );
    }

    fn initial_propagate(&mut self, mut context: PropagationContextMut<'_>) -> PropagationStatus {
        self.enforce(&mut context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_solver::TestSolver;

    #[test]
    fn the_target_ranges_over_the_indexable_entries() {
        let mut solver = TestSolver::default();
        let index = solver.new_variable(0, 10);
        let target = solver.new_variable(-100, 100);

        solver
            .new_propagator(ElementPropagator::new(index, [4, 9, 2, 7].into(), target))
            .expect("no empty domains");

        solver.assert_bounds(&index, 0, 3);
        solver.assert_bounds(&target, 2, 9);
    }

    #[test]
    fn narrowing_the_target_punches_out_index_values() {
        let mut solver = TestSolver::default();
        let index = solver.new_variable(0, 3);
        let target = solver.new_variable(-100, 100);

        solver
            .new_propagator(ElementPropagator::new(index, [4, 9, 2, 7].into(), target))
            .expect("no empty domains");

        solver.set_upper_bound(target, 5).expect("non-empty");
        solver.propagate().expect("consistent");

        assert!(!solver.contains(&index, 1));
        assert!(!solver.contains(&index, 3));
        solver.assert_bounds(&target, 2, 4);
    }

    #[test]
    fn a_fixed_index_fixes_the_target() {
        let mut solver = TestSolver::default();
        let index = solver.new_variable(0, 3);
        let target = solver.new_variable(-100, 100);

        solver
            .new_propagator(ElementPropagator::new(index, [4, 9, 2, 7].into(), target))
            .expect("no empty domains");

        solver.set_value(index, 2).expect("non-empty");
        solver.propagate().expect("consistent");

        solver.assert_bounds(&target, 2, 2);
    }
}
