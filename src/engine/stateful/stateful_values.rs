use crate::basic_types::Trail;
use crate::containers::KeyedVec;
use crate::containers::StorageKey;

/// A handle to a reversible `i64` cell owned by [`StatefulValues`].
/// Propagators keep handles for their incremental state so that backtracking
/// restores it together with the variable domains.
#[derive(Debug, Clone, Copy)]
pub struct StatefulInt {
    id: u32,
}

impl Default for StatefulInt {
    fn default() -> Self {
        Self { id: u32::MAX }
    }
}

impl StorageKey for StatefulInt {
    fn index(&self) -> usize {
        self.id as usize
    }

    fn create_from_index(index: usize) -> Self {
        Self { id: index as u32 }
    }
}

#[derive(Debug, Clone, Copy)]
struct StatefulChange {
    old_value: i64,
    reference: StatefulInt,
}

/// The store of reversible cells. A write records the prior value once per
/// write; a write of the current value is a no-op and consumes no trail space.
#[derive(Default, Debug, Clone)]
pub struct StatefulValues {
    trail: Trail<StatefulChange>,
    values: KeyedVec<StatefulInt, i64>,
}

impl StatefulValues {
    pub(crate) fn grow(&mut self, initial_value: i64) -> StatefulInt {
        self.values.push(initial_value)
    }

    pub(crate) fn increase_decision_level(&mut self) {
        self.trail.push_checkpoint()
    }

    pub(crate) fn read(&self, cell: StatefulInt) -> i64 {
        self.values[cell]
    }

    pub(crate) fn synchronise(&mut self, new_decision_level: usize) {
        let values = &mut self.values;
        self.trail
            .pop_to(new_decision_level)
            .for_each(|change| values[change.reference] = change.old_value)
    }

    fn write(&mut self, cell: StatefulInt, value: i64) {
        let old_value = self.values[cell];
        if old_value == value {
            return;
        }
        self.trail.record(StatefulChange {
            old_value,
            reference: cell,
        });
        self.values[cell] = value;
    }

    pub(crate) fn add_assign(&mut self, cell: StatefulInt, addition: i64) {
        self.write(cell, self.values[cell] + addition);
    }

    pub(crate) fn assign(&mut self, cell: StatefulInt, value: i64) {
        self.write(cell, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_are_reverted_on_synchronise() {
        let mut values = StatefulValues::default();
        let cell = values.grow(0);

        assert_eq!(values.read(cell), 0);

        values.increase_decision_level();
        values.add_assign(cell, 5);
        assert_eq!(values.read(cell), 5);

        values.add_assign(cell, 5);
        assert_eq!(values.read(cell), 10);

        values.increase_decision_level();
        values.add_assign(cell, 1);
        assert_eq!(values.read(cell), 11);

        values.synchronise(1);
        assert_eq!(values.read(cell), 10);

        values.synchronise(0);
        assert_eq!(values.read(cell), 0);
    }

    #[test]
    fn assigning_the_current_value_consumes_no_trail_space() {
        let mut values = StatefulValues::default();
        let cell = values.grow(3);

        values.increase_decision_level();
        values.assign(cell, 3);
        values.increase_decision_level();

        // Backtracking over the no-op write keeps the value intact.
        values.synchronise(0);
        assert_eq!(values.read(cell), 3);
    }
}
