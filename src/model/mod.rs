mod visitor;

pub use visitor::tags;
pub use visitor::arguments;
pub use visitor::ModelVisitor;
pub(crate) use visitor::Argument;
pub(crate) use visitor::ModelRecord;
