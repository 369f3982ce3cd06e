//! The balanced-tree aggregate propagators for `sum`, `min`, and `max` over
//! arrays of variables.

mod min;
mod sum;
pub(crate) mod tree;

pub(crate) use min::TreeMinPropagator;
pub(crate) use sum::TreeSumPropagator;
pub(crate) use tree::DEFAULT_FAN_OUT;
