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
use crate::math::cap_add;
use crate::math::cap_sub;
use crate::math::INT64_MAX;
use crate::math::INT64_MIN;

/// Propagator for `\sum x_i == y` over a balanced k-ary tree.
///
/// Leaf `i` mirrors the bounds of `x_i`; an internal node holds the
/// componentwise sum of its children in reversible cells, so a leaf change
/// updates the root in `O(log n)` by adding the delta along the ancestor path.
/// Changes of `y` back-propagate by residuals: each child's feasible range is
/// what remains of the requirement after its siblings contribute their
/// extremes.
///
/// When the initial bound computation saturates any node, the delta path is
/// unsound (deltas on a clamped value drift), so the propagator recomputes the
/// node sums every pass instead. Both branches have the same observable
/// semantics.
#[derive(Clone, Debug)]
pub(crate) struct TreeSumPropagator<Var, Target> {
    terms: Box<[Var]>,
    target: Target,
    layout: TreeLayout,
    /// Reversible `(min, max)` sums per flat node; leaves first.
    node_min: Box<[StatefulInt]>,
    node_max: Box<[StatefulInt]>,
    recompute_every_pass: bool,
}

impl<Var, Target> TreeSumPropagator<Var, Target>
where
    Var: IntegerVariable,
    Target: IntegerVariable,
{
    pub(crate) fn new(terms: Box<[Var]>, target: Target, fan_out: usize) -> Self {
        let layout = TreeLayout::new(terms.len().max(1), fan_out);
        TreeSumPropagator {
            terms,
            target,
            layout,
            node_min: Box::default(),
            node_max: Box::default(),
            recompute_every_pass: false,
        }
    }

    fn target_local(&self) -> u32 {
        self.terms.len() as u32
    }

    /// Recompute every node sum from the current leaf bounds.
    fn recompute(&self, context: &mut PropagationContextMut<'_>) {
        for (i, term) in self.terms.iter().enumerate() {
            let node = self.layout.node(0, i);
            let lower_bound = context.lower_bound(term);
            let upper_bound = context.upper_bound(term);
            context.assign(self.node_min[node], lower_bound);
            context.assign(self.node_max[node], upper_bound);
        }

        for level in 1..self.layout.num_levels() {
            for index in 0..self.layout.level_size(level) {
                let mut sum_min = 0;
                let mut sum_max = 0;
                for child_index in self.layout.children(level, index) {
                    let child = self.layout.node(level - 1, child_index);
                    sum_min = cap_add(sum_min, context.value(self.node_min[child]));
                    sum_max = cap_add(sum_max, context.value(self.node_max[child]));
                }
                let node = self.layout.node(level, index);
                context.assign(self.node_min[node], sum_min);
                context.assign(self.node_max[node], sum_max);
            }
        }
    }

    /// Apply the delta of leaf `index` along its ancestor path.
    fn apply_leaf_delta(&self, context: &mut PropagationContextMut<'_>, index: usize) {
        let node = self.layout.node(0, index);
        let old_min = context.value(self.node_min[node]);
        let old_max = context.value(self.node_max[node]);
        let new_min = context.lower_bound(&self.terms[index]);
        let new_max = context.upper_bound(&self.terms[index]);

        let delta_min = new_min - old_min;
        let delta_max = new_max - old_max;
        if delta_min == 0 && delta_max == 0 {
            return;
        }

        context.assign(self.node_min[node], new_min);
        context.assign(self.node_max[node], new_max);

        let (mut level, mut index) = (0, index);
        while level < self.layout.root_level() {
            let (parent_level, parent_index) = self.layout.parent(level, index);
            let parent = self.layout.node(parent_level, parent_index);
            context.add_assign(self.node_min[parent], delta_min);
            context.add_assign(self.node_max[parent], delta_max);
            level = parent_level;
            index = parent_index;
        }
    }

    /// Tighten `y` from the root and back-propagate the requirement to the
    /// leaves.
    fn tighten(&self, context: &mut PropagationContextMut<'_>) -> PropagationStatus {
        let root_min = context.value(self.node_min[self.layout.root()]);
        let root_max = context.value(self.node_max[self.layout.root()]);

        context.set_lower_bound(&self.target, root_min)?;
        context.set_upper_bound(&self.target, root_max)?;

        let required_min = context.lower_bound(&self.target).max(root_min);
        let required_max = context.upper_bound(&self.target).min(root_max);
        if required_min > required_max {
            return Err(Inconsistency::Conflict);
        }

        if self.terms.is_empty() {
            return Ok(());
        }

        self.push_down(
            context,
            self.layout.root_level(),
            0,
            required_min,
            required_max,
        )
    }

    /// Residual back-propagation: the requirement on a node, minus the
    /// extremes of all siblings, bounds each child.
    fn push_down(
        &self,
        context: &mut PropagationContextMut<'_>,
        level: usize,
        index: usize,
        required_min: i64,
        required_max: i64,
    ) -> PropagationStatus {
        if level == 0 {
            let term = &self.terms[index];
            context.set_lower_bound(term, required_min)?;
            context.set_upper_bound(term, required_max)?;
            return Ok(());
        }

        let node = self.layout.node(level, index);
        let node_min = context.value(self.node_min[node]);
        let node_max = context.value(self.node_max[node]);

        let children = self.layout.children(level, index);

        // Sibling sums per child. On the fast path they are the node sums
        // minus the child; once any sum has saturated that subtraction drifts,
        // so the safe branch accumulates prefix/suffix sums instead.
        let sibling_sums: Vec<(i64, i64)> = if self.recompute_every_pass {
            let bounds: Vec<(i64, i64)> = children
                .clone()
                .map(|child_index| {
                    let child = self.layout.node(level - 1, child_index);
                    (
                        context.value(self.node_min[child]),
                        context.value(self.node_max[child]),
                    )
                })
                .collect();

            let mut suffix = vec![(0, 0); bounds.len() + 1];
            for (i, &(child_min, child_max)) in bounds.iter().enumerate().rev() {
                suffix[i] = (
                    cap_add(suffix[i + 1].0, child_min),
                    cap_add(suffix[i + 1].1, child_max),
                );
            }

            let mut prefix = (0, 0);
            bounds
                .iter()
                .enumerate()
                .map(|(i, &(child_min, child_max))| {
                    let siblings = (
                        cap_add(prefix.0, suffix[i + 1].0),
                        cap_add(prefix.1, suffix[i + 1].1),
                    );
                    prefix = (cap_add(prefix.0, child_min), cap_add(prefix.1, child_max));
                    siblings
                })
                .collect()
        } else {
            children
                .clone()
                .map(|child_index| {
                    let child = self.layout.node(level - 1, child_index);
                    (
                        node_min - context.value(self.node_min[child]),
                        node_max - context.value(self.node_max[child]),
                    )
                })
                .collect()
        };

        for (offset, child_index) in children.enumerate() {
            let child = self.layout.node(level - 1, child_index);
            let child_min = context.value(self.node_min[child]);
            let child_max = context.value(self.node_max[child]);

            let (siblings_min, siblings_max) = sibling_sums[offset];

            let child_required_min = cap_sub(required_min, siblings_max);
            let child_required_max = cap_sub(required_max, siblings_min);

            if child_required_min > child_min || child_required_max < child_max {
                self.push_down(
                    context,
                    level - 1,
                    child_index,
                    child_required_min.max(child_min),
                    child_required_max.min(child_max),
                )?;
            }
        }

        Ok(())
    }
}

impl<Var: 'static, Target: 'static> Propagator for TreeSumPropagator<Var, Target>
where
    Var: IntegerVariable,
    Target: IntegerVariable,
{
    fn name(&self) -> &str {
        "TreeSum"
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

        // Seed the node sums bottom-up from the current leaf bounds.
        let num_nodes = self.layout.num_nodes();
        let mut minimums = Vec::with_capacity(num_nodes);
        let mut maximums = Vec::with_capacity(num_nodes);

        for term in self.terms.iter() {
            minimums.push(term.lower_bound(context.assignments));
            maximums.push(term.upper_bound(context.assignments));
        }
        if self.terms.is_empty() {
            minimums.push(0);
            maximums.push(0);
        }

        for level in 1..self.layout.num_levels() {
            for index in 0..self.layout.level_size(level) {
                let mut sum_min = 0;
                let mut sum_max = 0;
                for child_index in self.layout.children(level, index) {
                    let child = self.layout.node(level - 1, child_index);
                    sum_min = cap_add(sum_min, minimums[child]);
                    sum_max = cap_add(sum_max, maximums[child]);
                }
                minimums.push(sum_min);
                maximums.push(sum_max);
            }
        }

        self.recompute_every_pass = minimums
            .iter()
            .chain(maximums.iter())
            .any(|&bound| bound == INT64_MIN || bound == INT64_MAX);

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
        if self.recompute_every_pass {
            self.recompute(&mut context);
        }
        self.tighten(&mut context)
    }

    fn propagate(
        &mut self,
        mut context: PropagationContextMut<'_>,
        demon: LocalId,
    ) -> PropagationStatus {
        if self.recompute_every_pass {
            self.recompute(&mut context);
        } else if demon.unpack() != self.target_local() {
            self.apply_leaf_delta(&mut context, demon.unpack() as usize);
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
    fn the_target_mirrors_the_sum_of_the_terms() {
        let mut solver = TestSolver::default();
        let a = solver.new_variable(0, 10);
        let b = solver.new_variable(0, 10);
        let y = solver.new_variable(7, 7);

        solver
            .new_propagator(TreeSumPropagator::new([a, b].into(), y, DEFAULT_FAN_OUT))
            .expect("no empty domains");

        solver.assert_bounds(&a, 0, 7);
        solver.assert_bounds(&b, 0, 7);
    }

    #[test]
    fn a_leaf_change_back_propagates_through_the_residuals() {
        let mut solver = TestSolver::default();
        let a = solver.new_variable(0, 10);
        let b = solver.new_variable(0, 10);
        let y = solver.new_variable(7, 7);

        solver
            .new_propagator(TreeSumPropagator::new([a, b].into(), y, DEFAULT_FAN_OUT))
            .expect("no empty domains");

        solver.set_lower_bound(a, 5).expect("non-empty domain");
        solver.propagate().expect("non-empty domain");

        solver.assert_bounds(&b, 0, 2);
    }

    #[test]
    fn the_target_bounds_follow_the_term_bounds() {
        let mut solver = TestSolver::default();
        let a = solver.new_variable(1, 4);
        let b = solver.new_variable(2, 3);
        let c = solver.new_variable(0, 5);
        let y = solver.new_variable(-100, 100);

        solver
            .new_propagator(TreeSumPropagator::new(
                [a, b, c].into(),
                y,
                DEFAULT_FAN_OUT,
            ))
            .expect("no empty domains");

        solver.assert_bounds(&y, 3, 12);
    }

    #[test]
    fn a_pinned_target_forces_every_leaf_to_its_extreme() {
        let mut solver = TestSolver::default();
        let a = solver.new_variable(0, 4);
        let b = solver.new_variable(0, 3);
        let y = solver.new_variable(7, 7);

        solver
            .new_propagator(TreeSumPropagator::new([a, b].into(), y, DEFAULT_FAN_OUT))
            .expect("no empty domains");

        solver.assert_bounds(&a, 4, 4);
        solver.assert_bounds(&b, 3, 3);
    }

    #[test]
    fn a_small_fan_out_behaves_identically() {
        let mut solver = TestSolver::default();
        let terms: Vec<_> = (0..9).map(|_| solver.new_variable(0, 2)).collect();
        let y = solver.new_variable(17, 18);

        solver
            .new_propagator(TreeSumPropagator::new(
                terms.clone().into_boxed_slice(),
                y,
                2,
            ))
            .expect("no empty domains");

        // Nine terms of at most 2 must sum to at least 17, so each is at
        // least 1.
        for term in &terms {
            solver.assert_bounds(term, 1, 2);
        }
    }

    #[test]
    fn disjoint_target_range_fails() {
        let mut solver = TestSolver::default();
        let a = solver.new_variable(0, 2);
        let b = solver.new_variable(0, 2);
        let y = solver.new_variable(10, 12);

        let result =
            solver.new_propagator(TreeSumPropagator::new([a, b].into(), y, DEFAULT_FAN_OUT));
        assert!(result.is_err());
    }

    #[test]
    fn saturated_initial_bounds_use_the_recompute_branch() {
        let mut solver = TestSolver::default();
        let a = solver.new_variable(INT64_MAX - 1, INT64_MAX);
        let b = solver.new_variable(0, 10);
        let y = solver.new_variable(INT64_MAX - 1, INT64_MAX);

        // The root max saturates, so the residuals come from the sibling
        // sums rather than the clamped root: b <= y.max - a.min = 1 is still
        // derived, and nothing is pruned through the clamped value.
        solver
            .new_propagator(TreeSumPropagator::new([a, b].into(), y, DEFAULT_FAN_OUT))
            .expect("no empty domains");

        solver.assert_bounds(&b, 0, 1);
    }
}
