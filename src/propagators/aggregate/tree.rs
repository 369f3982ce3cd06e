use std::ops::Range;

use crate::gourd_assert_simple;

/// The default fan-out of the aggregate trees. The algorithms are correct for
/// any fan-out of at least 2; 64 keeps the trees shallow while the per-node
/// child scans stay cache-friendly.
pub(crate) const DEFAULT_FAN_OUT: usize = 64;

/// Index arithmetic for a balanced k-ary tree over `n` leaves. Nodes are
/// addressed by `(level, index)` with level 0 being the leaves, and mapped to
/// a flat array for storage.
#[derive(Clone, Debug)]
pub(crate) struct TreeLayout {
    fan_out: usize,
    /// The number of nodes on each level, leaves first.
    level_sizes: Vec<usize>,
    /// The offset of each level in the flat node array.
    level_offsets: Vec<usize>,
}

impl TreeLayout {
    pub(crate) fn new(num_leaves: usize, fan_out: usize) -> Self {
        gourd_assert_simple!(fan_out >= 2);
        gourd_assert_simple!(num_leaves >= 1);

        let mut level_sizes = vec![num_leaves];
        while *level_sizes.last().unwrap() > 1 {
            let above = level_sizes.last().unwrap().div_ceil(fan_out);
            level_sizes.push(above);
        }

        let mut level_offsets = Vec::with_capacity(level_sizes.len());
        let mut offset = 0;
        for &size in &level_sizes {
            level_offsets.push(offset);
            offset += size;
        }

        TreeLayout {
            fan_out,
            level_sizes,
            level_offsets,
        }
    }

    pub(crate) fn num_nodes(&self) -> usize {
        self.level_offsets.last().unwrap() + self.level_sizes.last().unwrap()
    }

    pub(crate) fn num_levels(&self) -> usize {
        self.level_sizes.len()
    }

    pub(crate) fn level_size(&self, level: usize) -> usize {
        self.level_sizes[level]
    }

    /// The flat array slot of the node at `(level, index)`.
    pub(crate) fn node(&self, level: usize, index: usize) -> usize {
        self.level_offsets[level] + index
    }

    pub(crate) fn root_level(&self) -> usize {
        self.num_levels() - 1
    }

    pub(crate) fn root(&self) -> usize {
        self.node(self.root_level(), 0)
    }

    pub(crate) fn parent(&self, level: usize, index: usize) -> (usize, usize) {
        (level + 1, index / self.fan_out)
    }

    /// The child indices (on `level - 1`) of the node at `(level, index)`.
    pub(crate) fn children(&self, level: usize, index: usize) -> Range<usize> {
        gourd_assert_simple!(level > 0);
        let child_level_size = self.level_sizes[level - 1];
        let first = index * self.fan_out;
        first..((index + 1) * self.fan_out).min(child_level_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_single_leaf_is_its_own_root() {
        let layout = TreeLayout::new(1, 2);
        assert_eq!(1, layout.num_nodes());
        assert_eq!(0, layout.root());
    }

    #[test]
    fn levels_shrink_by_the_fan_out() {
        let layout = TreeLayout::new(9, 2);
        // 9 -> 5 -> 3 -> 2 -> 1
        assert_eq!(5, layout.num_levels());
        assert_eq!(20, layout.num_nodes());
        assert_eq!(19, layout.root());
    }

    #[test]
    fn children_of_the_last_node_are_clamped() {
        let layout = TreeLayout::new(9, 2);
        // Level 1 has 5 nodes; node 4 has only child 8 on the leaf level.
        assert_eq!(8..9, layout.children(1, 4));
        assert_eq!((1, 4), layout.parent(0, 8));
    }

    #[test]
    fn walking_parents_reaches_the_root() {
        let layout = TreeLayout::new(100, 64);
        let (level, index) = layout.parent(0, 99);
        assert_eq!((1, 1), (level, index));
        let (level, index) = layout.parent(level, index);
        assert_eq!((2, 0), (level, index));
        assert_eq!(layout.root(), layout.node(level, index));
    }
}
