use crate::basic_types::Inconsistency;
use crate::basic_types::PropagationStatus;
use crate::engine::domain_events::DomainEvents;
use crate::engine::propagation::contexts::PropagationContextMut;
use crate::engine::propagation::LocalId;
use crate::engine::propagation::PostContext;
use crate::engine::propagation::Priority;
use crate::engine::propagation::Propagator;
use crate::engine::propagation::ReadDomains;
use crate::engine::stateful::RevBitSet;
use crate::engine::stateful::StatefulInt;
use crate::engine::variables::IntegerVariable;
use crate::engine::variables::Literal;
use crate::gourd_assert_simple;

/// Propagator for `\sum b_i >= 1`: a reversible bitset tracks the positions
/// that can still be true. When it runs empty the constraint fails; when one
/// position remains, it is forced to true.
#[derive(Clone, Debug)]
pub(crate) struct BooleanAtLeastOnePropagator {
    literals: Box<[Literal]>,
    candidates: Option<RevBitSet>,
}

impl BooleanAtLeastOnePropagator {
    pub(crate) fn new(literals: Box<[Literal]>) -> Self {
        BooleanAtLeastOnePropagator {
            literals,
            candidates: None,
        }
    }

    fn check_candidates(&self, context: &mut PropagationContextMut<'_>) -> PropagationStatus {
        let candidates = self.candidates.as_ref().unwrap();

        if candidates.cardinality(context.stateful) == 0 {
            return Err(Inconsistency::Conflict);
        }
        if candidates.cardinality_at_most(context.stateful, 1) {
            let index = candidates.first(context.stateful).unwrap();
            context.set_lower_bound(&self.literals[index], 1)?;
        }
        Ok(())
    }
}

impl Propagator for BooleanAtLeastOnePropagator {
    fn name(&self) -> &str {
        "BooleanAtLeastOne"
    }

    fn post(&mut self, context: &mut PostContext<'_>) {
        gourd_assert_simple!(!self.literals.is_empty());

        self.candidates = Some(RevBitSet::new_full(context.stateful, self.literals.len()));
        self.literals.iter().enumerate().for_each(|(i, literal)| {
            let _ = context.register(
                literal,
                DomainEvents::ASSIGN,
                LocalId::from(i as u32),
                Priority::Normal,
            );
        });
    }

    fn initial_propagate(&mut self, mut context: PropagationContextMut<'_>) -> PropagationStatus {
        for (i, literal) in self.literals.iter().enumerate() {
            if literal.upper_bound(context.assignments) == 0 {
                self.candidates
                    .as_ref()
                    .unwrap()
                    .clear(context.stateful, i);
            }
        }
        self.check_candidates(&mut context)
    }

    fn propagate(
        &mut self,
        mut context: PropagationContextMut<'_>,
        demon: LocalId,
    ) -> PropagationStatus {
        let index = demon.unpack() as usize;
        if self.literals[index].upper_bound(context.assignments) == 0 {
            self.candidates
                .as_ref()
                .unwrap()
                .clear(context.stateful, index);
            return self.check_candidates(&mut context);
        }
        Ok(())
    }
}

/// Propagator for `\sum b_i == target` where the target is itself a variable.
/// The count of literals fixed to true and the count still possible are
/// maintained reversibly; the target is squeezed between them, and a tight
/// target forces all free literals one way.
#[derive(Clone, Debug)]
pub(crate) struct BooleanSumEqualPropagator<Target> {
    literals: Box<[Literal]>,
    target: Target,
    /// Number of literals fixed to true.
    num_true: StatefulInt,
    /// Number of literals not fixed to false.
    num_possible: StatefulInt,
    /// Per literal: 0 while free, 1 once counted true, -1 once counted false.
    counted: Box<[StatefulInt]>,
}

impl<Target> BooleanSumEqualPropagator<Target>
where
    Target: IntegerVariable,
{
    pub(crate) fn new(literals: Box<[Literal]>, target: Target) -> Self {
        BooleanSumEqualPropagator {
            literals,
            target,
            num_true: StatefulInt::default(),
            num_possible: StatefulInt::default(),
            counted: Box::default(),
        }
    }

    fn target_local(&self) -> u32 {
        self.literals.len() as u32
    }

    /// Fold the fixed literal at `index` into the counters, once.
    fn count_fixed(&self, context: &mut PropagationContextMut<'_>, index: usize) {
        if context.value(self.counted[index]) != 0 {
            return;
        }
        let literal = &self.literals[index];
        if literal.lower_bound(context.assignments) == 1 {
            context.add_assign(self.num_true, 1);
            context.assign(self.counted[index], 1);
        } else if literal.upper_bound(context.assignments) == 0 {
            context.add_assign(self.num_possible, -1);
            context.assign(self.counted[index], -1);
        }
    }

    fn tighten(&self, context: &mut PropagationContextMut<'_>) -> PropagationStatus {
        let num_true = context.value(self.num_true);
        let num_possible = context.value(self.num_possible);

        context.set_lower_bound(&self.target, num_true)?;
        context.set_upper_bound(&self.target, num_possible)?;

        let target_min = context.lower_bound(&self.target);
        let target_max = context.upper_bound(&self.target);

        if target_min == num_possible {
            // Every free literal is needed.
            for literal in self.literals.iter() {
                if !context.is_fixed(literal) {
                    context.set_lower_bound(literal, 1)?;
                }
            }
        } else if target_max == num_true {
            // No free literal may be added.
            for literal in self.literals.iter() {
                if !context.is_fixed(literal) {
                    context.set_upper_bound(literal, 0)?;
                }
            }
        }

        Ok(())
    }
}

impl<Target: 'static> Propagator for BooleanSumEqualPropagator<Target>
where
    Target: IntegerVariable,
{
    fn name(&self) -> &str {
        "BooleanSumEqual"
    }

    fn post(&mut self, context: &mut PostContext<'_>) {
        self.literals.iter().enumerate().for_each(|(i, literal)| {
            let _ = context.register(
                literal,
                DomainEvents::ASSIGN,
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

        self.num_true = context.new_stateful_int(0);
        self.num_possible = context.new_stateful_int(self.literals.len() as i64);
        self.counted = self
            .literals
            .iter()
            .map(|_| context.new_stateful_int(0))
            .collect::<Vec<_>>()
            .into();
    }

    fn initial_propagate(&mut self, mut context: PropagationContextMut<'_>) -> PropagationStatus {
        for index in 0..self.literals.len() {
            self.count_fixed(&mut context, index);
        }
        self.tighten(&mut context)
    }

    fn propagate(
        &mut self,
        mut context: PropagationContextMut<'_>,
        demon: LocalId,
    ) -> PropagationStatus {
        if demon.unpack() != self.target_local() {
            self.count_fixed(&mut context, demon.unpack() as usize);
        }
        self.tighten(&mut context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_solver::TestSolver;

    #[test]
    fn the_last_candidate_is_forced_to_true() {
        let mut solver = TestSolver::default();
        let literals: Vec<_> = (0..3).map(|_| solver.new_literal()).collect();

        solver
            .new_propagator(BooleanAtLeastOnePropagator::new(
                literals.clone().into_boxed_slice(),
            ))
            .expect("no empty domains");

        solver.set_literal(literals[0], false).expect("non-empty");
        solver.set_literal(literals[2], false).expect("non-empty");
        solver.propagate().expect("consistent");

        assert_eq!(1, solver.lower_bound(&literals[1]));
    }

    #[test]
    fn all_false_fails() {
        let mut solver = TestSolver::default();
        let literals: Vec<_> = (0..3).map(|_| solver.new_literal()).collect();

        solver
            .new_propagator(BooleanAtLeastOnePropagator::new(
                literals.clone().into_boxed_slice(),
            ))
            .expect("no empty domains");

        solver.set_literal(literals[0], false).expect("non-empty");
        solver.set_literal(literals[1], false).expect("non-empty");
        // Forcing literal 2 to true conflicts with fixing it false.
        solver.set_literal(literals[2], false).expect("non-empty");

        assert!(solver.propagate().is_err());
    }

    #[test]
    fn the_candidate_set_is_restored_on_backtrack() {
        let mut solver = TestSolver::default();
        let literals: Vec<_> = (0..3).map(|_| solver.new_literal()).collect();

        solver
            .new_propagator(BooleanAtLeastOnePropagator::new(
                literals.clone().into_boxed_slice(),
            ))
            .expect("no empty domains");

        solver.increase_decision_level();
        solver.set_literal(literals[0], false).expect("non-empty");
        solver.set_literal(literals[2], false).expect("non-empty");
        solver.propagate().expect("consistent");
        assert_eq!(1, solver.lower_bound(&literals[1]));

        solver.backtrack(0);
        assert_eq!(0, solver.lower_bound(&literals[1]));
    }

    #[test]
    fn the_count_squeezes_the_target() {
        let mut solver = TestSolver::default();
        let literals: Vec<_> = (0..4).map(|_| solver.new_literal()).collect();
        let target = solver.new_variable(0, 10);

        solver
            .new_propagator(BooleanSumEqualPropagator::new(
                literals.clone().into_boxed_slice(),
                target,
            ))
            .expect("no empty domains");

        solver.assert_bounds(&target, 0, 4);

        solver.set_literal(literals[0], true).expect("non-empty");
        solver.set_literal(literals[1], false).expect("non-empty");
        solver.propagate().expect("consistent");

        solver.assert_bounds(&target, 1, 3);
    }

    #[test]
    fn a_tight_target_forces_the_free_literals() {
        let mut solver = TestSolver::default();
        let literals: Vec<_> = (0..3).map(|_| solver.new_literal()).collect();
        let target = solver.new_variable(3, 3);

        solver
            .new_propagator(BooleanSumEqualPropagator::new(
                literals.clone().into_boxed_slice(),
                target,
            ))
            .expect("no empty domains");

        for literal in &literals {
            assert_eq!(1, solver.lower_bound(literal));
        }
    }
}
