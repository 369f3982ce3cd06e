use crate::basic_types::EmptyDomain;
use crate::engine::stateful::StatefulInt;
use crate::engine::stateful::StatefulValues;
use crate::engine::variables::IntegerVariable;
use crate::engine::Assignments;

/// [`PropagationContext`] is passed to demons when only reads are needed. It
/// may be queried to retrieve information about the current variable domains
/// such as the lower bound of a particular variable.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PropagationContext<'a> {
    pub assignments: &'a Assignments,
}

impl<'a> PropagationContext<'a> {
    pub(crate) fn new(assignments: &'a Assignments) -> Self {
        PropagationContext { assignments }
    }
}

/// The context through which demons read and write variable domains and their
/// own reversible state. This is the only point of communication between the
/// propagators and the solver during propagation; writes to a variable that is
/// currently in process are postponed by the assignments layer.
#[derive(Debug)]
pub(crate) struct PropagationContextMut<'a> {
    pub(crate) assignments: &'a mut Assignments,
    pub(crate) stateful: &'a mut StatefulValues,
}

impl<'a> PropagationContextMut<'a> {
    pub(crate) fn new(
        assignments: &'a mut Assignments,
        stateful: &'a mut StatefulValues,
    ) -> Self {
        PropagationContextMut {
            assignments,
            stateful,
        }
    }

    pub(crate) fn as_readonly(&self) -> PropagationContext<'_> {
        PropagationContext {
            assignments: self.assignments,
        }
    }
}

/// A trait which defines a common method for retrieving the [`Assignments`]
/// from the structure which implements this trait.
pub(crate) trait HasAssignments {
    /// Returns the stored [`Assignments`].
    fn assignments(&self) -> &Assignments;
}

impl HasAssignments for PropagationContext<'_> {
    fn assignments(&self) -> &Assignments {
        self.assignments
    }
}

impl HasAssignments for PropagationContextMut<'_> {
    fn assignments(&self) -> &Assignments {
        self.assignments
    }
}

/// Read access to variable domains, generic over the variable form.
pub(crate) trait ReadDomains: HasAssignments {
    /// Returns `true` if the domain of the given variable is singleton.
    fn is_fixed<Var: IntegerVariable>(&self, var: &Var) -> bool {
        self.lower_bound(var) == self.upper_bound(var)
    }

    fn lower_bound<Var: IntegerVariable>(&self, var: &Var) -> i64 {
        var.lower_bound(self.assignments())
    }

    fn upper_bound<Var: IntegerVariable>(&self, var: &Var) -> i64 {
        var.upper_bound(self.assignments())
    }

    fn old_lower_bound<Var: IntegerVariable>(&self, var: &Var) -> i64 {
        var.old_lower_bound(self.assignments())
    }

    fn old_upper_bound<Var: IntegerVariable>(&self, var: &Var) -> i64 {
        var.old_upper_bound(self.assignments())
    }

    fn contains<Var: IntegerVariable>(&self, var: &Var, value: i64) -> bool {
        var.contains(self.assignments(), value)
    }
}

impl<T: HasAssignments> ReadDomains for T {}

impl PropagationContextMut<'_> {
    pub(crate) fn set_lower_bound<Var: IntegerVariable>(
        &mut self,
        var: &Var,
        bound: i64,
    ) -> Result<(), EmptyDomain> {
        if bound > var.lower_bound(self.assignments) {
            return var.set_lower_bound(self.assignments, bound);
        }
        Ok(())
    }

    pub(crate) fn set_upper_bound<Var: IntegerVariable>(
        &mut self,
        var: &Var,
        bound: i64,
    ) -> Result<(), EmptyDomain> {
        if bound < var.upper_bound(self.assignments) {
            return var.set_upper_bound(self.assignments, bound);
        }
        Ok(())
    }

    /// Intersect the domain of the variable with `[lower_bound, upper_bound]`.
    pub(crate) fn set_bounds<Var: IntegerVariable>(
        &mut self,
        var: &Var,
        lower_bound: i64,
        upper_bound: i64,
    ) -> Result<(), EmptyDomain> {
        self.set_lower_bound(var, lower_bound)?;
        self.set_upper_bound(var, upper_bound)
    }

    /// Collapse the domain of the variable to the given value; fails when the
    /// value is not in the domain.
    pub(crate) fn set_value<Var: IntegerVariable>(
        &mut self,
        var: &Var,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        var.set_lower_bound(self.assignments, value)?;
        var.set_upper_bound(self.assignments, value)
    }

    pub(crate) fn remove<Var: IntegerVariable>(
        &mut self,
        var: &Var,
        value: i64,
    ) -> Result<(), EmptyDomain> {
        if var.contains(self.assignments, value) {
            return var.remove(self.assignments, value);
        }
        Ok(())
    }

    pub(crate) fn value(&self, cell: StatefulInt) -> i64 {
        self.stateful.read(cell)
    }

    pub(crate) fn assign(&mut self, cell: StatefulInt, value: i64) {
        self.stateful.assign(cell, value);
    }

    pub(crate) fn add_assign(&mut self, cell: StatefulInt, addition: i64) {
        self.stateful.add_assign(cell, addition);
    }
}
