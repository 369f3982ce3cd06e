//! The constraints the solver provides out of the box.
//!
//! A constraint is a relation over variables, enforced through one or more
//! propagators. The factory functions here return lightweight descriptions;
//! posting them through [`Solver::add_constraint`] runs a normalization pass
//! (absorb fixed variables, sort coefficients, split signs) and picks the
//! propagator that fits the normalized shape, e.g. a Boolean scalar product
//! instead of the generic sum tree.

mod poster;

pub use poster::ConstraintPoster;

use crate::api::Solver;
use crate::basic_types::ConstraintOperationError;
use crate::engine::variables::AffineView;
use crate::engine::variables::DomainId;
use crate::engine::variables::IntegerVariable;
use crate::engine::variables::Literal;
use crate::engine::variables::TransformableVariable;
use crate::intervals::Interval;
use crate::math::cap_add;
use crate::math::cap_mul;
use crate::math::cap_sub;
use crate::model::arguments;
use crate::model::tags;
use crate::model::Argument;
use crate::model::ModelRecord;
use crate::propagators::aggregate::TreeMinPropagator;
use crate::propagators::aggregate::TreeSumPropagator;
use crate::propagators::aggregate::DEFAULT_FAN_OUT;
use crate::propagators::booleans::BooleanAtLeastOnePropagator;
use crate::propagators::booleans::BooleanAtMostOnePropagator;
use crate::propagators::booleans::BooleanSumEqualPropagator;
use crate::propagators::booleans::PositiveBooleanScalarProductEqualPropagator;
use crate::propagators::booleans::PositiveBooleanScalarProductLeqPropagator;
use crate::propagators::CumulativePropagator;
use crate::propagators::CumulativeTask;
use crate::propagators::ElementPropagator;
use crate::propagators::LinearEqualPropagator;
use crate::propagators::LinearLessOrEqualPropagator;
use crate::propagators::NonOverlapPropagator;
pub use crate::propagators::Rectangle;

/// A [`Constraint`] is a relation over variables. It disqualifies certain
/// partial assignments from making it into a solution of the problem.
pub trait Constraint {
    /// Add the [`Constraint`] to the [`Solver`].
    ///
    /// This method returns a [`ConstraintOperationError`] if the addition of
    /// the [`Constraint`] led to a root-level conflict.
    fn post(self, solver: &mut Solver) -> Result<(), ConstraintOperationError>;
}

/// Creates the constraint `\sum terms == rhs`.
pub fn equals(terms: Vec<DomainId>, rhs: i64) -> impl Constraint {
    Equals { terms, rhs }
}

/// Creates the constraint `\sum terms <= rhs`.
pub fn less_than_or_equals(terms: Vec<DomainId>, rhs: i64) -> impl Constraint {
    LessThanOrEquals { terms, rhs }
}

/// Creates the constraint `\sum terms == target`.
pub fn sum(terms: Vec<DomainId>, target: DomainId) -> impl Constraint {
    Sum { terms, target }
}

/// Creates the constraint `min(terms) == target`.
pub fn minimum(terms: Vec<DomainId>, target: DomainId) -> impl Constraint {
    Minimum { terms, target }
}

/// Creates the constraint `max(terms) == target`.
pub fn maximum(terms: Vec<DomainId>, target: DomainId) -> impl Constraint {
    Maximum { terms, target }
}

/// Creates the constraint `\sum coefficients[i] * terms[i] <= rhs`.
pub fn scalar_product_less_than_or_equals(
    terms: Vec<DomainId>,
    coefficients: Vec<i64>,
    rhs: i64,
) -> impl Constraint {
    ScalarProductLeq {
        terms,
        coefficients,
        rhs,
    }
}

/// Creates the constraint `\sum coefficients[i] * terms[i] == target`.
pub fn scalar_product(
    terms: Vec<DomainId>,
    coefficients: Vec<i64>,
    target: DomainId,
) -> impl Constraint {
    ScalarProductEqual {
        terms,
        coefficients,
        target,
    }
}

/// Creates the constraint `\sum literals <= 1`.
pub fn at_most_one(literals: Vec<Literal>) -> impl Constraint {
    AtMostOne { literals }
}

/// Creates the constraint `\sum literals >= 1`.
pub fn at_least_one(literals: Vec<Literal>) -> impl Constraint {
    AtLeastOne { literals }
}

/// Creates the constraint `\sum literals == 1`.
pub fn exactly_one(literals: Vec<Literal>) -> impl Constraint {
    ExactlyOne { literals }
}

/// Creates the constraint `values[index] == target` over an array of
/// constants.
pub fn element(index: DomainId, values: Vec<i64>, target: DomainId) -> impl Constraint {
    Element {
        index,
        values,
        target,
    }
}

/// Creates the pairwise non-overlap constraint over rectangles.
pub fn non_overlap(rectangles: Vec<Rectangle<DomainId>>) -> impl Constraint {
    NonOverlap { rectangles }
}

/// Creates the constraint that the given always-performed intervals do not
/// overlap in time.
pub fn disjunctive(intervals: Vec<Interval>) -> impl Constraint {
    Disjunctive { intervals }
}

struct Equals {
    terms: Vec<DomainId>,
    rhs: i64,
}

impl Constraint for Equals {
    fn post(self, solver: &mut Solver) -> Result<(), ConstraintOperationError> {
        solver.push_record(ModelRecord::Constraint {
            tag: tags::SUM_EQUAL,
            arguments: vec![
                Argument::VariableArray(arguments::VARIABLES, self.terms.clone()),
                Argument::Integer(arguments::VALUE, self.rhs),
            ],
        });
        solver.add_propagator_internal(LinearEqualPropagator::new(self.terms.into(), self.rhs))
    }
}

struct LessThanOrEquals {
    terms: Vec<DomainId>,
    rhs: i64,
}

impl Constraint for LessThanOrEquals {
    fn post(self, solver: &mut Solver) -> Result<(), ConstraintOperationError> {
        solver.push_record(ModelRecord::Constraint {
            tag: tags::SCAL_PROD_LESS_OR_EQUAL,
            arguments: vec![
                Argument::VariableArray(arguments::VARIABLES, self.terms.clone()),
                Argument::IntegerArray(arguments::COEFFICIENTS, vec![1; self.terms.len()]),
                Argument::Integer(arguments::VALUE, self.rhs),
            ],
        });
        solver
            .add_propagator_internal(LinearLessOrEqualPropagator::new(self.terms.into(), self.rhs))
    }
}

struct Sum {
    terms: Vec<DomainId>,
    target: DomainId,
}

impl Constraint for Sum {
    fn post(self, solver: &mut Solver) -> Result<(), ConstraintOperationError> {
        solver.push_record(ModelRecord::Constraint {
            tag: tags::SUM_EQUAL,
            arguments: vec![
                Argument::VariableArray(arguments::VARIABLES, self.terms.clone()),
                Argument::VariableArray(arguments::TARGET, vec![self.target]),
            ],
        });

        if self.terms.iter().all(|&term| solver.is_boolean(term)) {
            let literals: Vec<Literal> = self.terms.iter().map(|&term| Literal::new(term)).collect();
            solver.add_propagator_internal(BooleanSumEqualPropagator::new(
                literals.into(),
                self.target,
            ))
        } else {
            solver.add_propagator_internal(TreeSumPropagator::new(
                self.terms.into(),
                self.target,
                DEFAULT_FAN_OUT,
            ))
        }
    }
}

struct Minimum {
    terms: Vec<DomainId>,
    target: DomainId,
}

impl Constraint for Minimum {
    fn post(self, solver: &mut Solver) -> Result<(), ConstraintOperationError> {
        solver.push_record(ModelRecord::Constraint {
            tag: tags::MIN_EQUAL,
            arguments: vec![
                Argument::VariableArray(arguments::VARIABLES, self.terms.clone()),
                Argument::VariableArray(arguments::TARGET, vec![self.target]),
            ],
        });
        solver.add_propagator_internal(TreeMinPropagator::new(
            self.terms.into(),
            self.target,
            DEFAULT_FAN_OUT,
        ))
    }
}

struct Maximum {
    terms: Vec<DomainId>,
    target: DomainId,
}

impl Constraint for Maximum {
    fn post(self, solver: &mut Solver) -> Result<(), ConstraintOperationError> {
        solver.push_record(ModelRecord::Constraint {
            tag: tags::MAX_EQUAL,
            arguments: vec![
                Argument::VariableArray(arguments::VARIABLES, self.terms.clone()),
                Argument::VariableArray(arguments::TARGET, vec![self.target]),
            ],
        });

        // max(x) == y is min(-x) == -y over negated views.
        let negated: Vec<AffineView<DomainId>> =
            self.terms.iter().map(|term| term.scaled(-1)).collect();
        solver.add_propagator_internal(TreeMinPropagator::new(
            negated.into(),
            self.target.scaled(-1),
            DEFAULT_FAN_OUT,
        ))
    }
}

/// The outcome of the normalization pass shared by the scalar products: fixed
/// variables are absorbed into the constant, zero coefficients are dropped,
/// and the remaining term list is sorted by ascending coefficient.
struct NormalizedScalarProduct {
    terms: Vec<(DomainId, i64)>,
    /// The sum of `coefficient * value` over absorbed fixed variables.
    constant: i64,
    all_boolean: bool,
    all_positive: bool,
}

fn normalize(solver: &Solver, terms: &[DomainId], coefficients: &[i64]) -> NormalizedScalarProduct {
    assert_eq!(
        terms.len(),
        coefficients.len(),
        "a scalar product needs one coefficient per variable"
    );

    let mut normalized = Vec::new();
    let mut constant = 0;
    for (&term, &coefficient) in terms.iter().zip(coefficients) {
        if coefficient == 0 {
            continue;
        }
        if solver.lower_bound(term) == solver.upper_bound(term) {
            constant = cap_add(constant, cap_mul(coefficient, solver.lower_bound(term)));
        } else {
            normalized.push((term, coefficient));
        }
    }
    normalized.sort_by_key(|&(_, coefficient)| coefficient);

    NormalizedScalarProduct {
        all_boolean: normalized.iter().all(|&(term, _)| solver.is_boolean(term)),
        all_positive: normalized.iter().all(|&(_, coefficient)| coefficient > 0),
        terms: normalized,
        constant,
    }
}

struct ScalarProductLeq {
    terms: Vec<DomainId>,
    coefficients: Vec<i64>,
    rhs: i64,
}

impl Constraint for ScalarProductLeq {
    fn post(self, solver: &mut Solver) -> Result<(), ConstraintOperationError> {
        solver.push_record(ModelRecord::Constraint {
            tag: tags::SCAL_PROD_LESS_OR_EQUAL,
            arguments: vec![
                Argument::VariableArray(arguments::VARIABLES, self.terms.clone()),
                Argument::IntegerArray(arguments::COEFFICIENTS, self.coefficients.clone()),
                Argument::Integer(arguments::VALUE, self.rhs),
            ],
        });

        let normalized = normalize(solver, &self.terms, &self.coefficients);
        let rhs = cap_sub(self.rhs, normalized.constant);

        if normalized.all_boolean && normalized.all_positive {
            let (literals, coefficients): (Vec<Literal>, Vec<i64>) = normalized
                .terms
                .iter()
                .map(|&(term, coefficient)| (Literal::new(term), coefficient))
                .unzip();
            return solver.add_propagator_internal(PositiveBooleanScalarProductLeqPropagator::new(
                literals.into(),
                coefficients.into(),
                rhs,
            ));
        }

        let views: Vec<AffineView<DomainId>> = normalized
            .terms
            .iter()
            .map(|&(term, coefficient)| term.scaled(coefficient))
            .collect();
        solver.add_propagator_internal(LinearLessOrEqualPropagator::new(views.into(), rhs))
    }
}

struct ScalarProductEqual {
    terms: Vec<DomainId>,
    coefficients: Vec<i64>,
    target: DomainId,
}

impl Constraint for ScalarProductEqual {
    fn post(self, solver: &mut Solver) -> Result<(), ConstraintOperationError> {
        solver.push_record(ModelRecord::Constraint {
            tag: tags::SCAL_PROD_EQUAL,
            arguments: vec![
                Argument::VariableArray(arguments::VARIABLES, self.terms.clone()),
                Argument::IntegerArray(arguments::COEFFICIENTS, self.coefficients.clone()),
                Argument::VariableArray(arguments::TARGET, vec![self.target]),
            ],
        });

        let normalized = normalize(solver, &self.terms, &self.coefficients);
        // The absorbed constant moves to the target side.
        let target = self.target.offset(cap_sub(0, normalized.constant));

        if normalized.all_boolean && normalized.all_positive {
            let (literals, coefficients): (Vec<Literal>, Vec<i64>) = normalized
                .terms
                .iter()
                .map(|&(term, coefficient)| (Literal::new(term), coefficient))
                .unzip();
            return solver.add_propagator_internal(
                PositiveBooleanScalarProductEqualPropagator::new(
                    literals.into(),
                    coefficients.into(),
                    target,
                ),
            );
        }

        if normalized.all_boolean {
            // Split by sign and glue the two positive halves with difference
            // variables: positive - negative == target.
            let mut positive = Vec::new();
            let mut negative = Vec::new();
            for &(term, coefficient) in &normalized.terms {
                if coefficient > 0 {
                    positive.push((Literal::new(term), coefficient));
                } else {
                    negative.push((Literal::new(term), -coefficient));
                }
            }
            // Negating the coefficients reversed their order.
            negative.sort_by_key(|&(_, coefficient)| coefficient);

            let positive_sum = positive.iter().fold(0, |sum, &(_, c)| cap_add(sum, c));
            let negative_sum = negative.iter().fold(0, |sum, &(_, c)| cap_add(sum, c));
            let positive_var = solver.new_bounded_integer(0, positive_sum);
            let negative_var = solver.new_bounded_integer(0, negative_sum);

            for ((literals, coefficients), var) in [
                (positive.into_iter().unzip::<_, _, Vec<_>, Vec<_>>(), positive_var),
                (negative.into_iter().unzip::<_, _, Vec<_>, Vec<_>>(), negative_var),
            ] {
                if literals.is_empty() {
                    solver.fix_variable(var, 0)?;
                } else {
                    solver.add_propagator_internal(
                        PositiveBooleanScalarProductEqualPropagator::new(
                            literals.into(),
                            coefficients.into(),
                            var,
                        ),
                    )?;
                }
            }

            let halves = vec![positive_var.scaled(1), negative_var.scaled(-1)];
            return solver.add_propagator_internal(TreeSumPropagator::new(
                halves.into(),
                target,
                DEFAULT_FAN_OUT,
            ));
        }

        let views: Vec<AffineView<DomainId>> = normalized
            .terms
            .iter()
            .map(|&(term, coefficient)| term.scaled(coefficient))
            .collect();
        solver.add_propagator_internal(TreeSumPropagator::new(
            views.into(),
            target,
            DEFAULT_FAN_OUT,
        ))
    }
}

struct AtMostOne {
    literals: Vec<Literal>,
}

impl Constraint for AtMostOne {
    fn post(self, solver: &mut Solver) -> Result<(), ConstraintOperationError> {
        solver.push_record(ModelRecord::Constraint {
            tag: tags::SCAL_PROD_LESS_OR_EQUAL,
            arguments: vec![
                Argument::VariableArray(
                    arguments::VARIABLES,
                    self.literals.iter().map(|l| l.domain_id()).collect(),
                ),
                Argument::IntegerArray(arguments::COEFFICIENTS, vec![1; self.literals.len()]),
                Argument::Integer(arguments::VALUE, 1),
            ],
        });
        solver.add_propagator_internal(BooleanAtMostOnePropagator::new(self.literals.into()))
    }
}

struct AtLeastOne {
    literals: Vec<Literal>,
}

impl Constraint for AtLeastOne {
    fn post(self, solver: &mut Solver) -> Result<(), ConstraintOperationError> {
        solver.push_record(ModelRecord::Constraint {
            tag: tags::SUM_EQUAL,
            arguments: vec![
                Argument::VariableArray(
                    arguments::VARIABLES,
                    self.literals.iter().map(|l| l.domain_id()).collect(),
                ),
                Argument::Integer(arguments::VALUE, 1),
            ],
        });
        solver.add_propagator_internal(BooleanAtLeastOnePropagator::new(self.literals.into()))
    }
}

struct ExactlyOne {
    literals: Vec<Literal>,
}

impl Constraint for ExactlyOne {
    fn post(self, solver: &mut Solver) -> Result<(), ConstraintOperationError> {
        solver.push_record(ModelRecord::Constraint {
            tag: tags::SUM_EQUAL,
            arguments: vec![
                Argument::VariableArray(
                    arguments::VARIABLES,
                    self.literals.iter().map(|l| l.domain_id()).collect(),
                ),
                Argument::Integer(arguments::VALUE, 1),
            ],
        });
        solver
            .add_propagator_internal(BooleanAtMostOnePropagator::new(self.literals.clone().into()))?;
        solver.add_propagator_internal(BooleanAtLeastOnePropagator::new(self.literals.into()))
    }
}

struct Element {
    index: DomainId,
    values: Vec<i64>,
    target: DomainId,
}

impl Constraint for Element {
    fn post(self, solver: &mut Solver) -> Result<(), ConstraintOperationError> {
        solver.push_record(ModelRecord::Constraint {
            tag: tags::ELEMENT,
            arguments: vec![
                Argument::VariableArray(arguments::INDEX, vec![self.index]),
                Argument::IntegerArray(arguments::VALUES, self.values.clone()),
                Argument::VariableArray(arguments::TARGET, vec![self.target]),
            ],
        });
        solver.add_propagator_internal(ElementPropagator::new(
            self.index,
            self.values.into(),
            self.target,
        ))
    }
}

struct NonOverlap {
    rectangles: Vec<Rectangle<DomainId>>,
}

impl Constraint for NonOverlap {
    fn post(self, solver: &mut Solver) -> Result<(), ConstraintOperationError> {
        solver.push_record(ModelRecord::Constraint {
            tag: tags::NON_OVERLAP,
            arguments: vec![
                Argument::VariableArray(
                    "x",
                    self.rectangles.iter().map(|r| r.x).collect(),
                ),
                Argument::VariableArray(
                    "y",
                    self.rectangles.iter().map(|r| r.y).collect(),
                ),
                Argument::VariableArray(
                    "width",
                    self.rectangles.iter().map(|r| r.width).collect(),
                ),
                Argument::VariableArray(
                    "height",
                    self.rectangles.iter().map(|r| r.height).collect(),
                ),
            ],
        });

        if self.rectangles.len() < 2 {
            return Ok(());
        }

        // Redundant cumulative per axis: posted when every size is fixed and
        // the positions cannot go negative, with the sum of the perpendicular
        // sizes as the capacity.
        let sizes_fixed = self.rectangles.iter().all(|r| {
            solver.lower_bound(r.width) == solver.upper_bound(r.width)
                && solver.lower_bound(r.height) == solver.upper_bound(r.height)
        });
        let positions_non_negative = self
            .rectangles
            .iter()
            .all(|r| solver.lower_bound(r.x) >= 0 && solver.lower_bound(r.y) >= 0);

        if sizes_fixed && positions_non_negative {
            let horizontal_tasks: Vec<CumulativeTask<DomainId>> = self
                .rectangles
                .iter()
                .map(|r| CumulativeTask {
                    start: r.x,
                    duration: solver.lower_bound(r.width),
                    demand: solver.lower_bound(r.height),
                })
                .collect();
            let vertical_tasks: Vec<CumulativeTask<DomainId>> = self
                .rectangles
                .iter()
                .map(|r| CumulativeTask {
                    start: r.y,
                    duration: solver.lower_bound(r.height),
                    demand: solver.lower_bound(r.width),
                })
                .collect();

            let width_sum = self
                .rectangles
                .iter()
                .fold(0, |sum, r| cap_add(sum, solver.lower_bound(r.width)));
            let height_sum = self
                .rectangles
                .iter()
                .fold(0, |sum, r| cap_add(sum, solver.lower_bound(r.height)));

            solver.add_propagator_internal(CumulativePropagator::new(
                horizontal_tasks.into(),
                height_sum,
            ))?;
            solver
                .add_propagator_internal(CumulativePropagator::new(vertical_tasks.into(), width_sum))?;
        }

        solver.add_propagator_internal(NonOverlapPropagator::new(self.rectangles.into()))
    }
}

struct Disjunctive {
    intervals: Vec<Interval>,
}

impl Constraint for Disjunctive {
    fn post(self, solver: &mut Solver) -> Result<(), ConstraintOperationError> {
        solver.push_record(ModelRecord::Constraint {
            tag: tags::DISJUNCTIVE,
            arguments: vec![Argument::VariableArray(
                arguments::VARIABLES,
                self.intervals.iter().map(|i| i.start).collect(),
            )],
        });

        // The intervals run on a unary resource; their minimum durations give
        // a sound relaxation when the durations are not fixed yet.
        let tasks: Vec<CumulativeTask<DomainId>> = self
            .intervals
            .iter()
            .filter(|interval| solver.must_be_performed(interval))
            .map(|interval| CumulativeTask {
                start: interval.start,
                duration: solver.lower_bound(interval.duration),
                demand: 1,
            })
            .collect();

        solver.add_propagator_internal(CumulativePropagator::new(tasks.into(), 1))
    }
}
