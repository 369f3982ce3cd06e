use log::debug;

use crate::assignment::Assignment;
use crate::basic_types::ConstraintOperationError;
use crate::basic_types::EmptyDomain;
use crate::basic_types::Solution;
use crate::basic_types::SolutionReference;
use crate::branching::Brancher;
use crate::branching::InputOrderMinValueBrancher;
use crate::constraints::Constraint;
use crate::constraints::ConstraintPoster;
use crate::containers::KeyedVec;
use crate::engine::kernel::CoreSolveResult;
use crate::engine::kernel::SolverKernel;
use crate::engine::propagation::Propagator;
use crate::engine::termination::TerminationCondition;
use crate::engine::variables::DomainId;
use crate::engine::variables::IntegerVariable;
use crate::engine::variables::Literal;
use crate::gourd_assert_simple;
use crate::intervals::consistency::IntervalConsistencyPropagator;
use crate::intervals::Interval;
use crate::intervals::IntervalId;
use crate::intervals::IntervalVariable;
use crate::intervals::MirrorInterval;
use crate::intervals::RelaxedMaxInterval;
use crate::intervals::RelaxedMinInterval;
use crate::intervals::SyncPoint;
use crate::intervals::SyncedInterval;
use crate::math::cap_add;
use crate::model::arguments;
use crate::model::tags;
use crate::model::Argument;
use crate::model::ModelRecord;
use crate::model::ModelVisitor;
use crate::api::results::solution_iterator::SolutionIterator;
use crate::api::results::SatisfactionResult;
use crate::sequences::enforce_ranking;
use crate::sequences::SequenceId;
use crate::sequences::SequenceOrderingPropagator;
use crate::sequences::SequenceState;

/// The entry point to the solver: create variables, intervals, and sequences,
/// post constraints, and run the search.
#[derive(Default)]
pub struct Solver {
    kernel: SolverKernel,
    intervals: KeyedVec<IntervalId, IntervalEntry>,
    sequences: KeyedVec<SequenceId, SequenceEntry>,
    records: Vec<ModelRecord>,
}

#[derive(Debug, Clone)]
struct IntervalEntry {
    interval: Interval,
    name: String,
}

#[derive(Debug, Clone)]
struct SequenceEntry {
    state: SequenceState,
    name: String,
}

// Model API: variables.
impl Solver {
    /// Create a new integer variable with the given bounds.
    pub fn new_bounded_integer(&mut self, lower_bound: i64, upper_bound: i64) -> DomainId {
        self.kernel.new_bounded_integer(lower_bound, upper_bound)
    }

    /// Create a new named integer variable; the name keys the variable in
    /// serialized assignments.
    pub fn new_named_bounded_integer(
        &mut self,
        lower_bound: i64,
        upper_bound: i64,
        name: impl Into<String>,
    ) -> DomainId {
        let domain_id = self.new_bounded_integer(lower_bound, upper_bound);
        self.kernel.variable_names.add_integer(domain_id, name.into());
        domain_id
    }

    /// Create a new Boolean variable.
    pub fn new_literal(&mut self) -> Literal {
        Literal::new(self.new_bounded_integer(0, 1))
    }

    pub fn new_named_literal(&mut self, name: impl Into<String>) -> Literal {
        Literal::new(self.new_named_bounded_integer(0, 1, name))
    }

    pub fn lower_bound(&self, var: DomainId) -> i64 {
        self.kernel.assignments.get_lower_bound(var)
    }

    pub fn upper_bound(&self, var: DomainId) -> i64 {
        self.kernel.assignments.get_upper_bound(var)
    }

    pub(crate) fn is_boolean(&self, var: DomainId) -> bool {
        self.lower_bound(var) >= 0 && self.upper_bound(var) <= 1
    }

    pub(crate) fn fix_variable(
        &mut self,
        var: DomainId,
        value: i64,
    ) -> Result<(), ConstraintOperationError> {
        self.kernel
            .assignments
            .make_assignment(var, value)
            .map_err(|_| ConstraintOperationError::InfeasibleConstraint)
    }
}

// Model API: intervals and sequences.
impl Solver {
    fn register_interval(
        &mut self,
        interval: Interval,
        name: String,
    ) -> Result<Interval, ConstraintOperationError> {
        let _ = self.intervals.push(IntervalEntry { interval, name });
        self.kernel
            .add_propagator(IntervalConsistencyPropagator::new(interval))?;
        Ok(interval)
    }

    /// Create an interval with variable start, duration, and end; optional
    /// when requested. The three ranges are kept mutually consistent on
    /// `start + duration = end`.
    #[allow(clippy::too_many_arguments)]
    pub fn new_interval_variable(
        &mut self,
        start: (i64, i64),
        duration: (i64, i64),
        end: (i64, i64),
        optional: bool,
        name: impl Into<String>,
    ) -> Result<Interval, ConstraintOperationError> {
        let start = self.new_bounded_integer(start.0, start.1);
        let duration = self.new_bounded_integer(duration.0, duration.1);
        let end = self.new_bounded_integer(end.0, end.1);
        let performed = if optional {
            self.new_literal()
        } else {
            Literal::new(self.new_bounded_integer(1, 1))
        };

        self.register_interval(
            Interval {
                start,
                duration,
                end,
                performed,
            },
            name.into(),
        )
    }

    /// Create an always-performed interval with a fixed duration.
    pub fn new_fixed_duration_interval(
        &mut self,
        start_min: i64,
        start_max: i64,
        duration: i64,
        name: impl Into<String>,
    ) -> Result<Interval, ConstraintOperationError> {
        self.new_interval_variable(
            (start_min, start_max),
            (duration, duration),
            (cap_add(start_min, duration), cap_add(start_max, duration)),
            false,
            name,
        )
    }

    /// Create an optional interval with a fixed duration.
    pub fn new_optional_fixed_duration_interval(
        &mut self,
        start_min: i64,
        start_max: i64,
        duration: i64,
        name: impl Into<String>,
    ) -> Result<Interval, ConstraintOperationError> {
        self.new_interval_variable(
            (start_min, start_max),
            (duration, duration),
            (cap_add(start_min, duration), cap_add(start_max, duration)),
            true,
            name,
        )
    }

    /// Create an always-performed interval whose start is the given variable;
    /// the end is derived as `start + duration`.
    pub fn new_interval_from_start(
        &mut self,
        start: DomainId,
        duration: i64,
        name: impl Into<String>,
    ) -> Result<Interval, ConstraintOperationError> {
        let start_min = self.lower_bound(start);
        let start_max = self.upper_bound(start);
        let duration_var = self.new_bounded_integer(duration, duration);
        let end = self.new_bounded_integer(cap_add(start_min, duration), cap_add(start_max, duration));
        let performed = Literal::new(self.new_bounded_integer(1, 1));

        self.register_interval(
            Interval {
                start,
                duration: duration_var,
                end,
                performed,
            },
            name.into(),
        )
    }

    /// Create a fully fixed interval; any range write excluding the constants
    /// fails.
    pub fn new_fixed_interval(
        &mut self,
        start: i64,
        duration: i64,
        name: impl Into<String>,
    ) -> Result<Interval, ConstraintOperationError> {
        let end = cap_add(start, duration);
        self.new_interval_variable((start, start), (duration, duration), (end, end), false, name)
    }

    /// A view of the interval with the time axis flipped.
    pub fn mirror(&mut self, interval: Interval) -> MirrorInterval<Interval> {
        self.push_record(ModelRecord::Expression {
            tag: tags::MIRROR_OPERATION,
            arguments: vec![Argument::VariableArray(
                arguments::VARIABLES,
                vec![interval.start, interval.end],
            )],
        });
        MirrorInterval::new(interval)
    }

    /// A view of the interval which reports `+inf` for the max-side bounds
    /// while its performedness is undecided.
    pub fn relaxed_max(&mut self, interval: Interval) -> RelaxedMaxInterval<Interval> {
        self.push_record(ModelRecord::Expression {
            tag: tags::RELAXED_MAX_OPERATION,
            arguments: vec![Argument::VariableArray(
                arguments::VARIABLES,
                vec![interval.start, interval.end],
            )],
        });
        RelaxedMaxInterval::new(interval)
    }

    /// A view of the interval which reports `-inf` for the min-side bounds
    /// while its performedness is undecided.
    pub fn relaxed_min(&mut self, interval: Interval) -> RelaxedMinInterval<Interval> {
        self.push_record(ModelRecord::Expression {
            tag: tags::RELAXED_MIN_OPERATION,
            arguments: vec![Argument::VariableArray(
                arguments::VARIABLES,
                vec![interval.start, interval.end],
            )],
        });
        RelaxedMinInterval::new(interval)
    }

    /// An interval of fixed duration whose start follows the start of the
    /// base interval at a constant offset.
    pub fn start_synced_on_start(
        &mut self,
        interval: Interval,
        offset: i64,
        duration: i64,
    ) -> SyncedInterval<Interval> {
        self.push_record(ModelRecord::Expression {
            tag: tags::START_SYNC_ON_START_OPERATION,
            arguments: vec![
                Argument::VariableArray(arguments::VARIABLES, vec![interval.start]),
                Argument::Integer(arguments::OFFSET, offset),
                Argument::Integer(arguments::DURATION, duration),
            ],
        });
        SyncedInterval::new(interval, SyncPoint::Start, offset, duration)
    }

    /// An interval of fixed duration whose start follows the end of the base
    /// interval at a constant offset.
    pub fn start_synced_on_end(
        &mut self,
        interval: Interval,
        offset: i64,
        duration: i64,
    ) -> SyncedInterval<Interval> {
        self.push_record(ModelRecord::Expression {
            tag: tags::START_SYNC_ON_END_OPERATION,
            arguments: vec![
                Argument::VariableArray(arguments::VARIABLES, vec![interval.end]),
                Argument::Integer(arguments::OFFSET, offset),
                Argument::Integer(arguments::DURATION, duration),
            ],
        });
        SyncedInterval::new(interval, SyncPoint::End, offset, duration)
    }

    pub(crate) fn must_be_performed(&self, interval: &Interval) -> bool {
        interval.must_be_performed(&self.kernel.assignments)
    }

    /// Create a sequence variable ranking the given intervals.
    pub fn new_sequence(
        &mut self,
        intervals: Vec<Interval>,
        name: impl Into<String>,
    ) -> Result<SequenceId, ConstraintOperationError> {
        let state = SequenceState::new(intervals, &mut self.kernel.stateful);
        let propagator = SequenceOrderingPropagator::new(&state);
        let sequence = self.sequences.push(SequenceEntry {
            state,
            name: name.into(),
        });
        self.kernel.add_propagator(propagator)?;
        Ok(sequence)
    }

    /// Rank the interval at `index` first among the not-yet-ranked intervals
    /// of the sequence: it comes after every ranked interval and before
    /// everything else. The ranking is reversible; it is undone when search
    /// backtracks past this point.
    pub fn rank_first(&mut self, sequence: SequenceId, index: usize) -> Result<(), EmptyDomain> {
        let entry = &self.sequences[sequence];
        gourd_assert_simple!(
            !entry.state.is_ranked(&self.kernel.stateful, index),
            "an interval can be ranked only once"
        );

        let position = entry.state.num_ranked(&self.kernel.stateful);
        let rank_cell = entry.state.rank_of[index];
        let count_cell = entry.state.num_ranked;
        let interval = entry.state.intervals[index];

        self.kernel.stateful.assign(rank_cell, position);
        self.kernel.stateful.assign(count_cell, position + 1);

        // Ranking implies the interval is performed.
        interval.set_performed(&mut self.kernel.assignments, true)?;

        let entry = &self.sequences[sequence];
        enforce_ranking(
            &entry.state.intervals,
            &entry.state.rank_of,
            &self.kernel.stateful,
            &mut self.kernel.assignments,
        )?;

        self.kernel.propagate().map_err(|_| EmptyDomain)
    }

    /// Fill `out` with the indices of the intervals that can still occur:
    /// the ranked prefix in rank order, then the rest ordered by earliest
    /// start.
    pub fn fill_sequence(&self, sequence: SequenceId, out: &mut Vec<usize>) {
        self.sequences[sequence].state.fill_sequence(
            &self.kernel.stateful,
            &self.kernel.assignments,
            out,
        );
    }
}

// Model API: constraints and the model visitor.
impl Solver {
    /// Add a constraint to the solver; returns a poster to finalise the
    /// operation.
    pub fn add_constraint<C: Constraint>(&mut self, constraint: C) -> ConstraintPoster<'_, C> {
        ConstraintPoster::new(self, constraint)
    }

    pub(crate) fn add_propagator_internal(
        &mut self,
        propagator: impl Propagator + 'static,
    ) -> Result<(), ConstraintOperationError> {
        self.kernel.add_propagator(propagator)
    }

    pub(crate) fn push_record(&mut self, record: ModelRecord) {
        self.records.push(record);
    }

    /// Replay the recorded model through the visitor.
    pub fn accept(&self, visitor: &mut dyn ModelVisitor) {
        for record in &self.records {
            record.replay(visitor);
        }
    }
}

// Search API.
impl Solver {
    /// The default decision builder: input order over all registered
    /// variables, assigning minimum values.
    pub fn default_brancher(&self) -> InputOrderMinValueBrancher {
        InputOrderMinValueBrancher::new(self.kernel.assignments.domains().collect())
    }

    /// Search for a solution with the given decision builder, until the
    /// termination condition triggers.
    pub fn satisfy(
        &mut self,
        brancher: &mut impl Brancher,
        termination: &mut impl TerminationCondition,
    ) -> SatisfactionResult {
        match self.kernel.solve_internal(brancher, termination) {
            CoreSolveResult::Satisfiable => {
                let solution = Solution::new(self.kernel.assignments.clone());
                brancher.on_solution(SolutionReference::new(&self.kernel.assignments));
                self.kernel.backtrack_to_root(brancher);
                debug!("found a solution after {} steps", self.kernel.num_steps());
                SatisfactionResult::Satisfiable(solution)
            }
            CoreSolveResult::Unsatisfiable => SatisfactionResult::Unsatisfiable,
            CoreSolveResult::Unknown => SatisfactionResult::Unknown,
        }
    }

    /// Iterate over solutions one by one; each call to
    /// [`SolutionIterator::next_solution`] resumes the search where the
    /// previous solution was found.
    pub fn get_solution_iterator<'solver, 'brancher, 'termination, B, T>(
        &'solver mut self,
        brancher: &'brancher mut B,
        termination: &'termination mut T,
    ) -> SolutionIterator<'solver, 'brancher, 'termination, B, T>
    where
        B: Brancher,
        T: TerminationCondition,
    {
        SolutionIterator::new(self, brancher, termination)
    }

    pub(crate) fn kernel_mut(&mut self) -> &mut SolverKernel {
        &mut self.kernel
    }

    pub(crate) fn kernel(&self) -> &SolverKernel {
        &self.kernel
    }
}

// Assignment API.
impl Solver {
    /// Create an assignment element for each given variable, interval, and
    /// sequence, named after the variables.
    pub fn new_assignment(&self) -> Assignment {
        Assignment::default()
    }

    /// Add an integer variable to the assignment.
    pub fn add_to_assignment(&self, assignment: &mut Assignment, var: DomainId) {
        let name = self
            .kernel
            .variable_names
            .get_int_name(var)
            .unwrap_or_default()
            .to_owned();
        assignment.add_integer_element(var, name);
    }

    /// Add an interval variable to the assignment.
    pub fn add_interval_to_assignment(&self, assignment: &mut Assignment, interval: Interval) {
        let name = self
            .intervals
            .iter()
            .find(|entry| entry.interval == interval)
            .map(|entry| entry.name.clone())
            .unwrap_or_default();
        assignment.add_interval_element(interval, name);
    }

    /// Add a sequence variable to the assignment.
    pub fn add_sequence_to_assignment(&self, assignment: &mut Assignment, sequence: SequenceId) {
        let name = self.sequences[sequence].name.clone();
        assignment.add_sequence_element(sequence, name);
    }

    /// Mark an integer variable as the objective element of the assignment.
    pub fn add_objective_to_assignment(&self, assignment: &mut Assignment, var: DomainId) {
        let name = self
            .kernel
            .variable_names
            .get_int_name(var)
            .unwrap_or_default()
            .to_owned();
        assignment.set_objective_element(var, name);
    }

    /// Copy the current state of every element's variable into the
    /// assignment.
    pub fn save_to(&self, assignment: &mut Assignment) {
        let assignments = &self.kernel.assignments;

        for element in assignment.integer_elements.iter_mut() {
            element.min = assignments.get_lower_bound(element.var);
            element.max = assignments.get_upper_bound(element.var);
        }

        for element in assignment.interval_elements.iter_mut() {
            let interval = element.interval;
            element.start_min = assignments.get_lower_bound(interval.start);
            element.start_max = assignments.get_upper_bound(interval.start);
            element.duration_min = assignments.get_lower_bound(interval.duration);
            element.duration_max = assignments.get_upper_bound(interval.duration);
            element.end_min = assignments.get_lower_bound(interval.end);
            element.end_max = assignments.get_upper_bound(interval.end);
            element.performed_min = interval.performed.lower_bound(assignments);
            element.performed_max = interval.performed.upper_bound(assignments);
        }

        for element in assignment.sequence_elements.iter_mut() {
            let mut ranking = Vec::new();
            self.sequences[element.sequence].state.fill_sequence(
                &self.kernel.stateful,
                assignments,
                &mut ranking,
            );
            element.ranking = ranking.into_iter().map(|index| index as i64).collect();
        }

        if let Some(objective) = assignment.objective.as_mut() {
            objective.min = assignments.get_lower_bound(objective.var);
            objective.max = assignments.get_upper_bound(objective.var);
        }
    }

    /// Push every active element's snapshot back into its variable. The
    /// demon queue stays frozen while the elements are written; a single
    /// propagation pass runs once all of them are in place.
    pub fn restore_from(&mut self, assignment: &Assignment) -> Result<(), EmptyDomain> {
        for element in assignment
            .integer_elements
            .iter()
            .chain(assignment.objective.iter())
        {
            if !element.active {
                continue;
            }
            // A loaded element can hold an inverted range; that is a plain
            // contradiction, not a programming error.
            if element.min > element.max {
                return Err(EmptyDomain);
            }
            self.kernel
                .assignments
                .set_range(element.var, element.min, element.max)?;
        }

        for element in &assignment.interval_elements {
            if !element.active {
                continue;
            }
            if element.start_min > element.start_max
                || element.duration_min > element.duration_max
                || element.end_min > element.end_max
                || element.performed_min > element.performed_max
            {
                return Err(EmptyDomain);
            }
            let interval = element.interval;
            self.kernel
                .assignments
                .set_range(interval.start, element.start_min, element.start_max)?;
            self.kernel.assignments.set_range(
                interval.duration,
                element.duration_min,
                element.duration_max,
            )?;
            self.kernel
                .assignments
                .set_range(interval.end, element.end_min, element.end_max)?;
            self.kernel.assignments.set_range(
                interval.performed.domain_id(),
                element.performed_min,
                element.performed_max,
            )?;
        }

        for element in &assignment.sequence_elements {
            if !element.active {
                continue;
            }
            for &index in &element.ranking {
                let entry = &self.sequences[element.sequence];
                if !entry.state.is_ranked(&self.kernel.stateful, index as usize) {
                    let position = entry.state.num_ranked(&self.kernel.stateful);
                    let rank_cell = entry.state.rank_of[index as usize];
                    let count_cell = entry.state.num_ranked;
                    self.kernel.stateful.assign(rank_cell, position);
                    self.kernel.stateful.assign(count_cell, position + 1);
                }
            }
        }

        self.kernel.propagate().map_err(|_| EmptyDomain)
    }
}

impl std::fmt::Debug for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solver")
            .field("num_domains", &self.kernel.assignments.num_domains())
            .field("num_propagators", &self.kernel.propagators.num_propagators())
            .finish()
    }
}
