use crate::branching::Brancher;
use crate::branching::SelectionContext;
use crate::engine::predicates::Predicate;
use crate::engine::predicates::PredicateConstructor;
use crate::engine::variables::DomainId;

/// The default decision builder: select the first unfixed variable in the
/// given order and assign it its minimum value. The refutation removes that
/// value, so the search enumerates the domain bottom-up.
#[derive(Debug, Clone)]
pub struct InputOrderMinValueBrancher {
    variables: Vec<DomainId>,
}

impl InputOrderMinValueBrancher {
    pub fn new(variables: Vec<DomainId>) -> Self {
        InputOrderMinValueBrancher { variables }
    }
}

impl Brancher for InputOrderMinValueBrancher {
    fn next_decision(&mut self, context: &mut SelectionContext) -> Option<Predicate> {
        self.variables
            .iter()
            .find(|&&variable| !context.is_fixed(&variable))
            .map(|variable| variable.equality_predicate(context.lower_bound(variable)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Assignments;

    #[test]
    fn the_first_unfixed_variable_is_selected() {
        let mut assignments = Assignments::default();
        let x = assignments.grow(3, 3);
        let y = assignments.grow(0, 5);

        let mut brancher = InputOrderMinValueBrancher::new(vec![x, y]);
        let decision = brancher.next_decision(&mut SelectionContext::new(&assignments));

        assert_eq!(Some(y.equality_predicate(0)), decision);
    }

    #[test]
    fn no_decision_is_returned_when_all_variables_are_fixed() {
        let mut assignments = Assignments::default();
        let x = assignments.grow(3, 3);

        let mut brancher = InputOrderMinValueBrancher::new(vec![x]);
        let decision = brancher.next_decision(&mut SelectionContext::new(&assignments));

        assert_eq!(None, decision);
    }
}
