use crate::engine::variables::DomainId;

/// The well-known type tags emitted by the model visitor.
pub mod tags {
    pub const SUM_EQUAL: &str = "sum_equal";
    pub const MIN_EQUAL: &str = "min_equal";
    pub const MAX_EQUAL: &str = "max_equal";
    pub const SCAL_PROD_EQUAL: &str = "scal_prod_equal";
    pub const SCAL_PROD_LESS_OR_EQUAL: &str = "scal_prod_less_or_equal";
    pub const DISJUNCTIVE: &str = "disjunctive";
    pub const NON_OVERLAP: &str = "non_overlap";
    pub const ELEMENT: &str = "element";
    pub const MIRROR_OPERATION: &str = "mirror_operation";
    pub const RELAXED_MAX_OPERATION: &str = "relaxed_max_operation";
    pub const RELAXED_MIN_OPERATION: &str = "relaxed_min_operation";
    pub const START_SYNC_ON_START_OPERATION: &str = "start_sync_on_start_operation";
    pub const START_SYNC_ON_END_OPERATION: &str = "start_sync_on_end_operation";
}

/// The argument names used when replaying the model.
pub mod arguments {
    pub const VARIABLES: &str = "variables";
    pub const COEFFICIENTS: &str = "coefficients";
    pub const VALUES: &str = "values";
    pub const TARGET: &str = "target";
    pub const INDEX: &str = "index";
    pub const VALUE: &str = "value";
    pub const OFFSET: &str = "offset";
    pub const DURATION: &str = "duration";
}

/// A visitor over the posted model. The solver records each constraint and
/// derived expression as it is created and replays the events on demand, e.g.
/// for exporting or inspecting a model.
pub trait ModelVisitor {
    fn begin_visit_constraint(&mut self, _type_name: &str) {}
    fn end_visit_constraint(&mut self, _type_name: &str) {}
    fn begin_visit_expression(&mut self, _type_name: &str) {}
    fn end_visit_expression(&mut self, _type_name: &str) {}
    fn visit_integer_argument(&mut self, _name: &str, _value: i64) {}
    fn visit_integer_array_argument(&mut self, _name: &str, _values: &[i64]) {}
    fn visit_integer_variable_array_argument(&mut self, _name: &str, _variables: &[DomainId]) {}
}

/// One recorded argument of a model record.
#[derive(Clone, Debug)]
pub(crate) enum Argument {
    Integer(&'static str, i64),
    IntegerArray(&'static str, Vec<i64>),
    VariableArray(&'static str, Vec<DomainId>),
}

/// A recorded constraint or expression, replayed through [`ModelVisitor`].
#[derive(Clone, Debug)]
pub(crate) enum ModelRecord {
    Constraint {
        tag: &'static str,
        arguments: Vec<Argument>,
    },
    Expression {
        tag: &'static str,
        arguments: Vec<Argument>,
    },
}

impl ModelRecord {
    pub(crate) fn replay(&self, visitor: &mut dyn ModelVisitor) {
        let (tag, arguments, is_constraint) = match self {
            ModelRecord::Constraint { tag, arguments } => (tag, arguments, true),
            ModelRecord::Expression { tag, arguments } => (tag, arguments, false),
        };

        if is_constraint {
            visitor.begin_visit_constraint(tag);
        } else {
            visitor.begin_visit_expression(tag);
        }

        for argument in arguments {
            match argument {
                Argument::Integer(name, value) => visitor.visit_integer_argument(name, *value),
                Argument::IntegerArray(name, values) => {
                    visitor.visit_integer_array_argument(name, values)
                }
                Argument::VariableArray(name, variables) => {
                    visitor.visit_integer_variable_array_argument(name, variables)
                }
            }
        }

        if is_constraint {
            visitor.end_visit_constraint(tag);
        } else {
            visitor.end_visit_expression(tag);
        }
    }
}
