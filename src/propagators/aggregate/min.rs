use itertools::Itertools;

use super::tree::TreeLayout;
use crate::basic_types::Inconsistency;
use crate::basic_types::PropagationStatus;
use crate::engine::domain_events::DomainEvents;
use crate::engine::propagation::contexts::PropagationContextMut;
use crate::engine::propagation::LocalId;
use crate::engine::propagation::PostContext;
use crate::engine::propagation::Priority;
use crate::engine::propagation::Propagator;
use crate::engine::propagation::ReadDomains;
use crate::engine::stateful::StatefulInt;
use crate::engine::variables::IntegerVariable;
use crate::math::INT64_MAX;

/// Propagator for `min(x_i) == y` over a balanced k-ary tree.
///
/// An internal node holds the componentwise minimum of its children, so the
/// root mirrors `[min x_i.min, min x_i.max]`, which is exactly the legal range
/// of `y`. A leaf event recomputes the ancestor path in `O(B log n)`. On the
/// way down, a raised `y.min` applies to every leaf, while a lowered `y.max`
/// can only be carried by a child whose minimum still reaches it: with a
/// single candidate the bound is forced onto it, with none the constraint
/// fails.
///
/// `max(x_i) == y` is this propagator over negated views.
#[derive(Clone, Debug)]
pub(crate) struct TreeMinPropagator<Var, Target> {
    terms: Box<[Var]>,
    target: Target,
    layout: TreeLayout,
    node_min: Box<[StatefulInt]>,
    node_max: Box<[StatefulInt]>,
}

impl<Var, Target> TreeMinPropagator<Var, Target>
where
    Var: IntegerVariable,
    Target: IntegerVariable,
{
    pub(crate) fn new(terms: Box<[Var]>, target: Target, fan_out: usize) -> Self {
        let layout = TreeLayout::new(terms.len().max(1), fan_out);
        TreeMinPropagator {
            terms,
            target,
            layout,
            node_min: Box::default(),
            node_max: Box::default(),
        }
    }

    fn target_local(&self) -> u32 {
        self.terms.len() as u32
    }

    /// Refresh the ancestor path of leaf `index` after its bounds changed.
    fn refresh_path(&self, context: &mut PropagationContextMut<'_>, index: usize) {
        let node = self.layout.node(0, index);
        context.assign(self.node_min[node], context.lower_bound(&self.terms[index]));
        context.assign(self.node_max[node], context.upper_bound(&self.terms[index]));

        let (mut level, mut index) = (0, index);
        while level < self.layout.root_level() {
            let (parent_level, parent_index) = self.layout.parent(level, index);

            let mut minimum = INT64_MAX;
            let mut maximum = INT64_MAX;
            for child_index in self.layout.children(parent_level, parent_index) {
                let child = self.layout.node(parent_level - 1, child_index);
                minimum = minimum.min(context.value(self.node_min[child]));
                maximum = maximum.min(context.value(self.node_max[child]));
            }

            let parent = self.layout.node(parent_level, parent_index);
            context.assign(self.node_min[parent], minimum);
            context.assign(self.node_max[parent], maximum);

            level = parent_level;
            index = parent_index;
        }
    }

    fn tighten(&self, context: &mut PropagationContextMut<'_>) -> PropagationStatus {
        let root_min = context.value(self.node_min[self.layout.root()]);
        let root_max = context.value(self.node_max[self.layout.root()]);

        context.set_lower_bound(&self.target, root_min)?;
        context.set_upper_bound(&self.target, root_max)?;

        // Every term is at least the minimum.
        let target_min = context.lower_bound(&self.target);
        if target_min > root_min {
            self.lift_leaves(context, self.layout.root_level(), 0, target_min)?;
        }

        // Some term has to reach down to the maximum.
        let target_max = context.upper_bound(&self.target);
        if target_max < root_max {
            self.force_candidate(context, self.layout.root_level(), 0, target_max)?;
        }

        Ok(())
    }

    /// Raise the lower bound of every leaf under the node to `bound`.
    fn lift_leaves(
        &self,
        context: &mut PropagationContextMut<'_>,
        level: usize,
        index: usize,
        bound: i64,
    ) -> PropagationStatus {
        if level == 0 {
            context.set_lower_bound(&self.terms[index], bound)?;
            return Ok(());
        }

        for child_index in self.layout.children(level, index) {
            let child = self.layout.node(level - 1, child_index);
            if context.value(self.node_min[child]) < bound {
                self.lift_leaves(context, level - 1, child_index, bound)?;
            }
        }

        Ok(())
    }

    /// Walk towards the unique leaf that can still achieve `bound`, if there
    /// is one, and cap it there.
    fn force_candidate(
        &self,
        context: &mut PropagationContextMut<'_>,
        level: usize,
        index: usize,
        bound: i64,
    ) -> PropagationStatus {
        if level == 0 {
            context.set_upper_bound(&self.terms[index], bound)?;
            return Ok(());
        }

        let mut candidate = None;
        for child_index in self.layout.children(level, index) {
            let child = self.layout.node(level - 1, child_index);
            if context.value(self.node_min[child]) <= bound {
                if candidate.is_some() {
                    // More than one child can carry the minimum; nothing can
                    // be concluded yet.
                    return Ok(());
                }
                candidate = Some(child_index);
            }
        }

        match candidate {
            Some(child_index) => self.force_candidate(context, level - 1, child_index, bound),
            None => Err(Inconsistency::Conflict),
        }
    }
}

impl<Var: 'static, Target: 'static> Propagator for TreeMinPropagator<Var, Target>
where
    Var: IntegerVariable,
    Target: IntegerVariable,
{
    fn name(&self) -> &str {
        "TreeMin"
    }

    fn post(&mut self, context: &mut PostContext<'_>) {
        self.terms.iter().enumerate().for_each(|(i, term)| {
            let _ = context.register(
                term,
                DomainEvents::RANGE,
                LocalId::from(i as u32),
                Priority::Normal,
            );
        });
        let _ = context.register(
            &self.target,
            DomainEvents::RANGE,
            LocalId::from(self.target_local()),
            Priority::Normal,
        );

        let mut minimums = Vec::with_capacity(self.layout.num_nodes());
        let mut maximums = Vec::with_capacity(self.layout.num_nodes());

        for term in self.terms.iter() {
            minimums.push(term.lower_bound(context.assignments));
            maximums.push(term.upper_bound(context.assignments));
        }
        if self.terms.is_empty() {
            minimums.push(INT64_MAX);
            maximums.push(INT64_MAX);
        }

        for level in 1..self.layout.num_levels() {
            for index in 0..self.layout.level_size(level) {
                let mut minimum = INT64_MAX;
                let mut maximum = INT64_MAX;
                for child_index in self.layout.children(level, index) {
                    let child = self.layout.node(level - 1, child_index);
                    minimum = minimum.min(minimums[child]);
                    maximum = maximum.min(maximums[child]);
                }
                minimums.push(minimum);
                maximums.push(maximum);
            }
        }

        self.node_min = minimums
            .into_iter()
            .map(|bound| context.new_stateful_int(bound))
            .collect_vec()
            .into();
        self.node_max = maximums
            .into_iter()
            .map(|bound| context.new_stateful_int(bound))
            .collect_vec()
            .into();
    }

    fn initial_propagate(&mut self, mut context: PropagationContextMut<'_>) -> PropagationStatus {
        if self.terms.is_empty() {
            return Ok(());
        }
        self.tighten(&mut context)
    }

    fn propagate(
        &mut self,
        mut context: PropagationContextMut<'_>,
        demon: LocalId,
    ) -> PropagationStatus {
        if self.terms.is_empty() {
            return Ok(());
        }

        if demon.unpack() != self.target_local() {
            self.refresh_path(&mut context, demon.unpack() as usize);
        }

        self.tighten(&mut context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_solver::TestSolver;
    use crate::propagators::aggregate::tree::DEFAULT_FAN_OUT;

    #[test]
    fn the_target_mirrors_the_minimum_of_the_terms() {
        let mut solver = TestSolver::default();
        let x0 = solver.new_variable(2, 5);
        let x1 = solver.new_variable(3, 7);
        let x2 = solver.new_variable(1, 4);
        let y = solver.new_variable(-100, 100);

        solver
            .new_propagator(TreeMinPropagator::new(
                [x0, x1, x2].into(),
                y,
                DEFAULT_FAN_OUT,
            ))
            .expect("no empty domains");

        solver.assert_bounds(&y, 1, 4);
    }

    #[test]
    fn raising_the_target_minimum_lifts_every_term() {
        let mut solver = TestSolver::default();
        let x0 = solver.new_variable(2, 5);
        let x1 = solver.new_variable(3, 7);
        let x2 = solver.new_variable(1, 4);
        let y = solver.new_variable(-100, 100);

        solver
            .new_propagator(TreeMinPropagator::new(
                [x0, x1, x2].into(),
                y,
                DEFAULT_FAN_OUT,
            ))
            .expect("no empty domains");

        solver.set_lower_bound(y, 3).expect("non-empty domain");
        solver.propagate().expect("non-empty domain");

        solver.assert_bounds(&x0, 3, 5);
        solver.assert_bounds(&x1, 3, 7);
        solver.assert_bounds(&x2, 3, 4);
        solver.assert_bounds(&y, 3, 4);
    }

    #[test]
    fn a_single_candidate_carries_the_target_maximum() {
        let mut solver = TestSolver::default();
        let x0 = solver.new_variable(5, 9);
        let x1 = solver.new_variable(2, 8);
        let y = solver.new_variable(-100, 3);

        solver
            .new_propagator(TreeMinPropagator::new([x0, x1].into(), y, DEFAULT_FAN_OUT))
            .expect("no empty domains");

        // Only x1 can reach below 3.
        solver.assert_bounds(&x1, 2, 3);
        solver.assert_bounds(&x0, 5, 9);
    }

    #[test]
    fn no_candidate_for_the_target_maximum_fails() {
        let mut solver = TestSolver::default();
        let x0 = solver.new_variable(5, 9);
        let x1 = solver.new_variable(4, 8);
        let y = solver.new_variable(0, 3);

        let result =
            solver.new_propagator(TreeMinPropagator::new([x0, x1].into(), y, DEFAULT_FAN_OUT));
        assert!(result.is_err());
    }

    #[test]
    fn a_small_fan_out_behaves_identically() {
        let mut solver = TestSolver::default();
        let terms: Vec<_> = (0..9)
            .map(|i| solver.new_variable(i, 10 + i))
            .collect();
        let y = solver.new_variable(-100, 100);

        solver
            .new_propagator(TreeMinPropagator::new(
                terms.clone().into_boxed_slice(),
                y,
                2,
            ))
            .expect("no empty domains");

        solver.assert_bounds(&y, 0, 10);

        solver.set_lower_bound(y, 4).expect("non-empty domain");
        solver.propagate().expect("non-empty domain");

        for term in &terms {
            assert!(solver.lower_bound(term) >= 4);
        }
    }
}
