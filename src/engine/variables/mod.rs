mod affine_view;
mod domain_id;
mod integer_variable;
mod literal;

pub use affine_view::AffineView;
pub use domain_id::DomainId;
pub use integer_variable::IntegerVariable;
pub use integer_variable::TransformableVariable;
pub use literal::Literal;
