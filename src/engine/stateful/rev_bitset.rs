use super::StatefulInt;
use super::StatefulValues;
use crate::gourd_assert_moderate;

const WORD_BITS: usize = 64;

/// A reversible bitset over a fixed universe `0..universe`. The words are
/// reversible cells, so `set`/`clear` cost one trail entry per touched word
/// and all operations are O(word count). The cardinality is maintained as its
/// own reversible cell so that threshold checks are O(1).
#[derive(Debug, Clone)]
pub struct RevBitSet {
    words: Box<[StatefulInt]>,
    cardinality: StatefulInt,
    universe: usize,
}

impl RevBitSet {
    /// Create a bitset with all bits of `0..universe` set.
    pub fn new_full(stateful: &mut StatefulValues, universe: usize) -> Self {
        let num_words = universe.div_ceil(WORD_BITS);
        let words = (0..num_words)
            .map(|word_index| {
                let bits_in_word = if (word_index + 1) * WORD_BITS <= universe {
                    WORD_BITS
                } else {
                    universe - word_index * WORD_BITS
                };
                let pattern = if bits_in_word == WORD_BITS {
                    u64::MAX
                } else {
                    (1u64 << bits_in_word) - 1
                };
                stateful.grow(pattern as i64)
            })
            .collect();

        RevBitSet {
            words,
            cardinality: stateful.grow(universe as i64),
            universe,
        }
    }

    pub fn universe(&self) -> usize {
        self.universe
    }

    pub fn contains(&self, stateful: &StatefulValues, index: usize) -> bool {
        gourd_assert_moderate!(index < self.universe);
        let word = stateful.read(self.words[index / WORD_BITS]) as u64;
        word & (1u64 << (index % WORD_BITS)) != 0
    }

    pub fn clear(&self, stateful: &mut StatefulValues, index: usize) {
        gourd_assert_moderate!(index < self.universe);
        let cell = self.words[index / WORD_BITS];
        let word = stateful.read(cell) as u64;
        let mask = 1u64 << (index % WORD_BITS);
        if word & mask != 0 {
            stateful.assign(cell, (word & !mask) as i64);
            stateful.add_assign(self.cardinality, -1);
        }
    }

    pub fn set(&self, stateful: &mut StatefulValues, index: usize) {
        gourd_assert_moderate!(index < self.universe);
        let cell = self.words[index / WORD_BITS];
        let word = stateful.read(cell) as u64;
        let mask = 1u64 << (index % WORD_BITS);
        if word & mask == 0 {
            stateful.assign(cell, (word | mask) as i64);
            stateful.add_assign(self.cardinality, 1);
        }
    }

    pub fn cardinality(&self, stateful: &StatefulValues) -> usize {
        stateful.read(self.cardinality) as usize
    }

    pub fn cardinality_at_most(&self, stateful: &StatefulValues, bound: usize) -> bool {
        self.cardinality(stateful) <= bound
    }

    /// The smallest set bit, if any.
    pub fn first(&self, stateful: &StatefulValues) -> Option<usize> {
        for (word_index, cell) in self.words.iter().enumerate() {
            let word = stateful.read(*cell) as u64;
            if word != 0 {
                return Some(word_index * WORD_BITS + word.trailing_zeros() as usize);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_full_bitset_reports_the_whole_universe() {
        let mut stateful = StatefulValues::default();
        let bitset = RevBitSet::new_full(&mut stateful, 70);

        assert_eq!(70, bitset.cardinality(&stateful));
        assert!(bitset.contains(&stateful, 0));
        assert!(bitset.contains(&stateful, 69));
        assert_eq!(Some(0), bitset.first(&stateful));
    }

    #[test]
    fn cleared_bits_come_back_on_backtrack() {
        let mut stateful = StatefulValues::default();
        let bitset = RevBitSet::new_full(&mut stateful, 100);

        stateful.increase_decision_level();
        bitset.clear(&mut stateful, 3);
        bitset.clear(&mut stateful, 64);
        bitset.clear(&mut stateful, 64);

        assert_eq!(98, bitset.cardinality(&stateful));
        assert!(!bitset.contains(&stateful, 3));
        assert!(!bitset.contains(&stateful, 64));

        stateful.synchronise(0);
        assert_eq!(100, bitset.cardinality(&stateful));
        assert!(bitset.contains(&stateful, 3));
        assert!(bitset.contains(&stateful, 64));
    }

    #[test]
    fn first_skips_cleared_prefixes() {
        let mut stateful = StatefulValues::default();
        let bitset = RevBitSet::new_full(&mut stateful, 130);

        for index in 0..128 {
            bitset.clear(&mut stateful, index);
        }

        assert_eq!(Some(128), bitset.first(&stateful));
        assert!(bitset.cardinality_at_most(&stateful, 2));
    }
}
