use crate::bit_block::BitBlock;

/// Geometry of a pool: everything derivable from the capacity exponent and
/// the block width.
///
/// Storage order is summaries-first: index 0 is the root summary block,
/// level `k` spans `B^k` blocks, leaf blocks follow the last summary level.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) struct Layout<Block> {
    max_elements: usize,
    num_element_blocks: usize,
    num_metadata_blocks: usize,
    num_metadata_levels: usize,
    root_mask: Block,
}

impl<Block: BitBlock> Layout<Block> {
    pub fn new(exp_max: usize) -> Self {
        assert!(
            exp_max < Block::SIZE,
            "capacity exponent {} does not fit the root block ({} bits)",
            exp_max, Block::SIZE
        );

        let max_elements = 1usize << exp_max;
        let num_element_blocks = std::cmp::max(1, max_elements >> Block::SIZE_POT_EXPONENT);

        // ceil(log_B(max_elements)), minus one level that the leaves cover
        // themselves.
        let levels_with_leaves =
            (exp_max + Block::SIZE_POT_EXPONENT - 1) / Block::SIZE_POT_EXPONENT;
        let num_metadata_levels = levels_with_leaves.saturating_sub(1);

        let mut num_metadata_blocks = 0;
        for level in 0..num_metadata_levels {
            num_metadata_blocks += 1usize << (Block::SIZE_POT_EXPONENT * level);
        }

        // Valid bits of the root block. Zero means the root is fully
        // populated and no masking applies.
        let root_bits = max_elements >> (num_metadata_levels * Block::SIZE_POT_EXPONENT);
        let root_mask = if root_bits >= Block::SIZE {
            Block::ZERO
        } else {
            (Block::ONE << root_bits) - Block::ONE
        };

        Self {
            max_elements,
            num_element_blocks,
            num_metadata_blocks,
            num_metadata_levels,
            root_mask,
        }
    }

    #[inline]
    pub fn max_elements(&self) -> usize {
        self.max_elements
    }

    #[inline]
    pub fn num_element_blocks(&self) -> usize {
        self.num_element_blocks
    }

    #[inline]
    pub fn num_metadata_blocks(&self) -> usize {
        self.num_metadata_blocks
    }

    #[inline]
    pub fn num_metadata_levels(&self) -> usize {
        self.num_metadata_levels
    }

    /// Zero when the root is fully populated.
    #[inline]
    pub fn root_mask(&self) -> Block {
        self.root_mask
    }

    #[inline]
    pub fn num_metadata_blocks_on_level(&self, level: usize) -> usize {
        1usize << (Block::SIZE_POT_EXPONENT * level)
    }

    #[inline]
    pub fn total_blocks(&self) -> usize {
        self.num_metadata_blocks + self.num_element_blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u64_geometry() {
        let l = Layout::<u64>::new(0);
        assert_eq!(l.num_metadata_levels(), 0);
        assert_eq!(l.num_element_blocks(), 1);
        assert_eq!(l.num_metadata_blocks(), 0);
        assert_eq!(l.max_elements(), 1);

        let l = Layout::<u64>::new(6);
        assert_eq!(l.num_metadata_levels(), 0);
        assert_eq!(l.num_element_blocks(), 1);
        assert_eq!(l.num_metadata_blocks(), 0);
        assert_eq!(l.max_elements(), 64);

        let l = Layout::<u64>::new(12);
        assert_eq!(l.num_metadata_levels(), 1);
        assert_eq!(l.num_element_blocks(), 64);
        assert_eq!(l.num_metadata_blocks(), 1);
        assert_eq!(l.max_elements(), 64 * 64);

        let l = Layout::<u64>::new(13);
        assert_eq!(l.num_metadata_levels(), 2);
        assert_eq!(l.num_element_blocks(), 128);
        assert_eq!(l.num_metadata_blocks(), 1 + 64);
        assert_eq!(l.max_elements(), 64 * 64 * 2);
    }

    #[test]
    fn u16_geometry() {
        let l = Layout::<u16>::new(7);
        assert_eq!(l.num_metadata_levels(), 1);
        assert_eq!(l.num_element_blocks(), 8);
        assert_eq!(l.num_metadata_blocks(), 1);
        assert_eq!(l.max_elements(), 128);

        let l = Layout::<u16>::new(12);
        assert_eq!(l.num_metadata_levels(), 2);
        assert_eq!(l.num_element_blocks(), 256);
        assert_eq!(l.num_metadata_blocks(), 1 + 16);
        assert_eq!(l.max_elements(), 4096);
    }

    #[test]
    fn root_mask() {
        // 2^0 elements in a 64-bit root: one valid bit.
        assert_eq!(Layout::<u64>::new(0).root_mask(), 0b1);
        // 2^5 elements in a 64-bit root: 32 valid bits.
        assert_eq!(Layout::<u64>::new(5).root_mask(), u64::from(u32::MAX));
        // Fully populated root.
        assert_eq!(Layout::<u64>::new(6).root_mask(), 0);
        assert_eq!(Layout::<u64>::new(12).root_mask(), 0);
        // Two of 64 root bits address existing leaf subtrees.
        assert_eq!(Layout::<u64>::new(13).root_mask(), 0b11);
    }

    #[test]
    #[should_panic]
    fn exponent_must_fit_root() {
        Layout::<u64>::new(64);
    }
}
