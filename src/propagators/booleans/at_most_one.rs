use crate::basic_types::PropagationStatus;
use crate::engine::domain_events::DomainEvents;
use crate::engine::propagation::contexts::PropagationContextMut;
use crate::engine::propagation::LocalId;
use crate::engine::propagation::PostContext;
use crate::engine::propagation::Priority;
use crate::engine::propagation::Propagator;
use crate::engine::stateful::RevSwitch;
use crate::engine::variables::IntegerVariable;
use crate::engine::variables::Literal;

/// Propagator for `\sum b_i <= 1`: the first literal that becomes true forces
/// all others to false. Once that happened the constraint is in an absorbing
/// state, marked with a reversible switch so later events are ignored until
/// backtracking.
#[derive(Clone, Debug)]
pub(crate) struct BooleanAtMostOnePropagator {
    literals: Box<[Literal]>,
    settled: RevSwitch,
}

impl BooleanAtMostOnePropagator {
    pub(crate) fn new(literals: Box<[Literal]>) -> Self {
        BooleanAtMostOnePropagator {
            literals,
            settled: RevSwitch::default(),
        }
    }

    fn propagate_from(
        &self,
        context: &mut PropagationContextMut<'_>,
        true_index: usize,
    ) -> PropagationStatus {
        for (i, literal) in self.literals.iter().enumerate() {
            if i != true_index {
                context.set_upper_bound(literal, 0)?;
            }
        }
        self.settled.switch(context.stateful);
        Ok(())
    }
}

impl Propagator for BooleanAtMostOnePropagator {
    fn name(&self) -> &str {
        "BooleanAtMostOne"
    }

    fn post(&mut self, context: &mut PostContext<'_>) {
        self.settled = RevSwitch::new(context.stateful);
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
        let true_index = (0..self.literals.len())
            .find(|&i| self.literals[i].lower_bound(context.assignments) == 1);

        if let Some(true_index) = true_index {
            self.propagate_from(&mut context, true_index)?;
        }
        Ok(())
    }

    fn propagate(
        &mut self,
        mut context: PropagationContextMut<'_>,
        demon: LocalId,
    ) -> PropagationStatus {
        if self.settled.is_switched(context.stateful) {
            return Ok(());
        }

        let index = demon.unpack() as usize;
        if self.literals[index].lower_bound(context.assignments) == 1 {
            self.propagate_from(&mut context, index)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_solver::TestSolver;

    #[test]
    fn a_true_literal_forces_all_others_to_false() {
        let mut solver = TestSolver::default();
        let literals: Vec<_> = (0..5).map(|_| solver.new_literal()).collect();

        solver
            .new_propagator(BooleanAtMostOnePropagator::new(
                literals.clone().into_boxed_slice(),
            ))
            .expect("no empty domains");

        solver.set_literal(literals[2], true).expect("non-empty");
        solver.propagate().expect("consistent");

        for (i, literal) in literals.iter().enumerate() {
            if i != 2 {
                assert_eq!(0, solver.upper_bound(literal));
            }
        }
    }

    #[test]
    fn two_true_literals_fail() {
        let mut solver = TestSolver::default();
        let literals: Vec<_> = (0..3).map(|_| solver.new_literal()).collect();

        solver
            .new_propagator(BooleanAtMostOnePropagator::new(
                literals.clone().into_boxed_slice(),
            ))
            .expect("no empty domains");

        solver.set_literal(literals[0], true).expect("non-empty");
        solver.set_literal(literals[1], true).expect("non-empty");

        assert!(solver.propagate().is_err());
    }

    #[test]
    fn the_forcing_is_undone_on_backtrack() {
        let mut solver = TestSolver::default();
        let literals: Vec<_> = (0..3).map(|_| solver.new_literal()).collect();

        solver
            .new_propagator(BooleanAtMostOnePropagator::new(
                literals.clone().into_boxed_slice(),
            ))
            .expect("no empty domains");

        solver.increase_decision_level();
        solver.set_literal(literals[0], true).expect("non-empty");
        solver.propagate().expect("consistent");
        assert_eq!(0, solver.upper_bound(&literals[1]));

        solver.backtrack(0);
        assert_eq!(1, solver.upper_bound(&literals[1]));
        assert_eq!(0, solver.lower_bound(&literals[0]));
    }
}
