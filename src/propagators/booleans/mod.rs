//! Specialized propagators for sums and scalar products over Boolean
//! variables; these replace the generic trees when a normalization pass
//! recognises the Boolean shape.

mod at_most_one;
mod boolean_sum;
mod scalar_product;

pub(crate) use at_most_one::BooleanAtMostOnePropagator;
pub(crate) use boolean_sum::BooleanAtLeastOnePropagator;
pub(crate) use boolean_sum::BooleanSumEqualPropagator;
pub(crate) use scalar_product::PositiveBooleanScalarProductEqualPropagator;
pub(crate) use scalar_product::PositiveBooleanScalarProductLeqPropagator;
