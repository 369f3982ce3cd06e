use enumset::EnumSet;
use log::debug;

use crate::basic_types::ConstraintOperationError;
use crate::basic_types::EmptyDomain;
use crate::basic_types::PropagationStatus;
use crate::branching::Brancher;
use crate::branching::SelectionContext;
use crate::containers::KeyedVec;
use crate::engine::domain_events::DomainEvent;
use crate::engine::predicates::Predicate;
use crate::engine::propagation::Demon;
use crate::engine::propagation::DemonId;
use crate::engine::propagation::PostContext;
use crate::engine::propagation::PropagationContextMut;
use crate::engine::propagation::Propagator;
use crate::engine::propagation::PropagatorStore;
use crate::engine::propagation::Priority;
use crate::engine::queue::DemonQueue;
use crate::engine::stateful::StatefulValues;
use crate::engine::termination::TerminationCondition;
use crate::engine::variables::DomainId;
use crate::engine::watch_lists::WatchLists;
use crate::engine::Assignments;
use crate::gourd_assert_moderate;
use crate::gourd_assert_simple;
use crate::variable_names::VariableNames;

/// The outcome of one run of the search driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CoreSolveResult {
    /// All variables under the brancher's consideration are fixed; the
    /// solution can be read from the assignments.
    Satisfiable,
    /// The search tree is exhausted without a solution.
    Unsatisfiable,
    /// A limit was hit before the search tree was exhausted.
    Unknown,
}

/// The solver kernel: owns the trail-backed stores, the variable and
/// propagator registries, the demon queues, and the decision stack, and drives
/// both the propagation fixpoint and the depth-first search.
#[derive(Default)]
pub(crate) struct SolverKernel {
    pub(crate) assignments: Assignments,
    pub(crate) stateful: StatefulValues,
    pub(crate) propagators: PropagatorStore,
    pub(crate) demons: KeyedVec<DemonId, Demon>,
    pub(crate) watch_lists: WatchLists,
    pub(crate) variable_names: VariableNames,
    queue: DemonQueue,
    /// The decision taken at each level; index i holds the decision that
    /// opened level i + 1.
    decisions: Vec<Predicate>,
    /// Monotonic count of demon executions, consulted by limit bookkeeping.
    num_steps: u64,
    /// Set when a constraint was found infeasible at the root; search is
    /// pointless from then on.
    root_infeasible: bool,
    /// Scratch buffer for collecting affected demons, reused across passes.
    scratch_demons: Vec<DemonId>,
}

impl SolverKernel {
    pub(crate) fn new_bounded_integer(&mut self, lower_bound: i64, upper_bound: i64) -> DomainId {
        let domain_id = self.assignments.grow(lower_bound, upper_bound);
        self.watch_lists.grow(&mut self.stateful);
        domain_id
    }

    pub(crate) fn num_steps(&self) -> u64 {
        self.num_steps
    }

    pub(crate) fn get_decision_level(&self) -> usize {
        self.assignments.get_decision_level()
    }

    pub(crate) fn is_root_infeasible(&self) -> bool {
        self.root_infeasible
    }

    /// Post a constraint: allocate the propagator, let it subscribe its
    /// demons, seed bounds, and run the propagation to a fixpoint. A failure
    /// at this point is a root-level conflict.
    pub(crate) fn add_propagator(
        &mut self,
        propagator: impl Propagator + 'static,
    ) -> Result<(), ConstraintOperationError> {
        if self.root_infeasible {
            return Err(ConstraintOperationError::InfeasibleState);
        }

        let boxed: Box<dyn Propagator> = Box::new(propagator);
        let propagator_id = self.propagators.alloc(boxed);

        let mut context = PostContext::new(
            &self.assignments,
            &mut self.stateful,
            &mut self.watch_lists,
            &mut self.demons,
            propagator_id,
        );
        self.propagators[propagator_id].post(&mut context);

        let status = self.propagators[propagator_id].initial_propagate(
            PropagationContextMut::new(&mut self.assignments, &mut self.stateful),
        );

        let status = status.and_then(|_| self.propagate());

        if status.is_err() {
            self.clean_up_after_failure();
            if self.get_decision_level() == 0 {
                self.root_infeasible = true;
            }
            debug!(
                "posting {} led to a conflict",
                self.propagators[propagator_id].name()
            );
            return Err(ConstraintOperationError::InfeasibleConstraint);
        }

        Ok(())
    }

    /// Run the event queue to a fixpoint. Variable-priority work drains before
    /// any normal demon runs, and normal drains before delayed.
    pub(crate) fn propagate(&mut self) -> PropagationStatus {
        let result = loop {
            if let Some((domain, events)) = self.next_pending_domain() {
                if let Err(e) = self.process_domain(domain, events) {
                    break Err(e);
                }
            } else if let Some(demon_id) = self.queue.pop_normal(&mut self.demons) {
                if let Err(e) = self.run_demon(demon_id) {
                    break Err(e);
                }
            } else if let Some(demon_id) = self.queue.pop_delayed(&mut self.demons) {
                if let Err(e) = self.run_demon(demon_id) {
                    break Err(e);
                }
            } else {
                break Ok(());
            }
        };

        if result.is_err() {
            self.clean_up_after_failure();
        }
        result
    }

    fn next_pending_domain(&mut self) -> Option<(DomainId, EnumSet<DomainEvent>)> {
        self.assignments.pop_pending()
    }

    /// Process one variable: run its variable-priority demons inside the
    /// in-process window, schedule the rest, then consolidate the postponed
    /// writes through a single range write outside the window.
    fn process_domain(
        &mut self,
        domain: DomainId,
        events: EnumSet<DomainEvent>,
    ) -> PropagationStatus {
        let mut affected = std::mem::take(&mut self.scratch_demons);
        affected.clear();
        self.watch_lists
            .affected(domain, events, &self.stateful, &mut affected);

        self.assignments.begin_processing(domain);

        let mut result: PropagationStatus = Ok(());
        let mut batch_len = 0;
        for index in 0..affected.len() {
            let demon_id = affected[index];
            // A demon subscribed to several fired classes appears once.
            if affected[..batch_len].contains(&demon_id) {
                continue;
            }
            affected.swap(batch_len, index);
            batch_len += 1;

            match self.demons[demon_id].priority {
                Priority::Var => {
                    if let Err(e) = self.run_demon(demon_id) {
                        result = Err(e);
                        break;
                    }
                }
                Priority::Normal | Priority::Delayed => {
                    self.queue.schedule(demon_id, &mut self.demons);
                }
            }
        }

        affected.clear();
        self.scratch_demons = affected;

        match result {
            Ok(()) => {
                let shadow = self.assignments.finish_processing(domain);
                self.assignments.commit_pass(domain);
                if let Some((lower_bound, upper_bound)) = shadow {
                    // This write fires the variable's own listeners one more
                    // time, now outside the in-process window.
                    self.assignments.set_range(domain, lower_bound, upper_bound)?;
                }
                Ok(())
            }
            Err(e) => {
                // The cleaner: drop the shadow range before the trail rolls
                // back.
                self.assignments.abort_processing(domain);
                Err(e)
            }
        }
    }

    fn run_demon(&mut self, demon_id: DemonId) -> PropagationStatus {
        self.num_steps += 1;
        let propagator = self.demons[demon_id].propagator;
        let local_id = self.demons[demon_id].local_id;
        self.propagators[propagator].propagate(
            PropagationContextMut::new(&mut self.assignments, &mut self.stateful),
            local_id,
        )
    }

    /// Unwind the event queue and pending events after a failure.
    fn clean_up_after_failure(&mut self) {
        self.queue.clear(&mut self.demons);
        self.assignments.clear_events();
    }

    pub(crate) fn declare_new_decision_level(&mut self) {
        gourd_assert_moderate!(
            self.queue.is_empty() && !self.assignments.has_pending_events(),
            "branching requires a completed propagation pass"
        );
        self.assignments.increase_decision_level();
        self.stateful.increase_decision_level();
    }

    pub(crate) fn apply_predicate(&mut self, predicate: Predicate) -> Result<(), EmptyDomain> {
        match predicate {
            Predicate::LowerBound {
                domain_id,
                lower_bound,
            } => self.assignments.tighten_lower_bound(domain_id, lower_bound),
            Predicate::UpperBound {
                domain_id,
                upper_bound,
            } => self.assignments.tighten_upper_bound(domain_id, upper_bound),
            Predicate::NotEqual {
                domain_id,
                not_equal_constant,
            } => self
                .assignments
                .remove_value_from_domain(domain_id, not_equal_constant),
            Predicate::Equal {
                domain_id,
                equality_constant,
            } => self
                .assignments
                .make_assignment(domain_id, equality_constant),
        }
    }

    pub(crate) fn backtrack(&mut self, backtrack_level: usize, brancher: &mut impl Brancher) {
        gourd_assert_simple!(backtrack_level < self.get_decision_level());

        self.queue.clear(&mut self.demons);
        self.assignments.clear_events();

        let unfixed_variables = self.assignments.synchronise(backtrack_level);
        self.stateful.synchronise(backtrack_level);
        self.decisions.truncate(backtrack_level);

        unfixed_variables
            .into_iter()
            .for_each(|(domain_id, value)| brancher.on_unassign_integer(domain_id, value));
        brancher.on_backtrack();
    }

    pub(crate) fn backtrack_to_root(&mut self, brancher: &mut impl Brancher) {
        if self.get_decision_level() > 0 {
            self.backtrack(0, brancher);
        }
    }

    /// The search driver: repeat propagation and branching until a solution,
    /// exhaustion, or a limit.
    pub(crate) fn solve_internal(
        &mut self,
        brancher: &mut impl Brancher,
        termination: &mut impl TerminationCondition,
    ) -> CoreSolveResult {
        if self.root_infeasible {
            return CoreSolveResult::Unsatisfiable;
        }

        loop {
            if termination.should_stop() {
                debug!("terminating search after {} steps", self.num_steps);
                self.backtrack_to_root(brancher);
                return CoreSolveResult::Unknown;
            }

            match self.propagate() {
                Ok(()) => {
                    let decision = brancher
                        .next_decision(&mut SelectionContext::new(&self.assignments));

                    match decision {
                        Some(predicate) => {
                            termination.decision_has_been_made();
                            self.declare_new_decision_level();
                            self.decisions.push(predicate);
                            if self.apply_predicate(predicate).is_err() {
                                self.clean_up_after_failure();
                                brancher.on_conflict();
                                if !self.resolve_conflict(brancher) {
                                    return CoreSolveResult::Unsatisfiable;
                                }
                            }
                        }
                        None => {
                            return CoreSolveResult::Satisfiable;
                        }
                    }
                }
                Err(_) => {
                    brancher.on_conflict();
                    if !self.resolve_conflict(brancher) {
                        return CoreSolveResult::Unsatisfiable;
                    }
                }
            }
        }
    }

    /// Chronological backtracking: unwind decisions until one can be refuted.
    /// Returns false when the decision stack is exhausted, i.e. the search
    /// tree holds no further alternatives.
    pub(crate) fn resolve_conflict(&mut self, brancher: &mut impl Brancher) -> bool {
        loop {
            let Some(decision) = self.decisions.last().copied() else {
                return false;
            };

            self.backtrack(self.get_decision_level() - 1, brancher);

            // The refutation is a deduction at the parent level, not a new
            // decision.
            match self.apply_predicate(!decision) {
                Ok(()) => return true,
                Err(_) => {
                    self.clean_up_after_failure();
                    if self.get_decision_level() == 0 {
                        return false;
                    }
                }
            }
        }
    }
}
