mod serialization;

use std::fmt;
use std::ops::Range;

use crate::bit_block::BitBlock;
use crate::config::{self, Config, FreeBitPolicy, MaxIdPolicy};
use crate::iter::UsedIds;
use crate::layout::Layout;
use crate::rle::{self, Abbreviation};

/// Hierarchical bitset ID pool.
///
/// Tracks which ids in `[0, 2^exp_max)` are free, and allocates the lowest
/// free id with one word read per summary level. A 64-bit [Config] covers
/// 262_144 ids with two levels and ~16M with four.
///
/// Storage is a single flat block array: summary levels root-first, leaf
/// blocks after them. A summary bit is set while its child block has at
/// least one free bit, so [obtain] can descend straight to the lowest free
/// leaf bit.
///
/// [Config]: crate::config::Config
/// [obtain]: Self::obtain
pub struct IdPool<Conf: Config = config::_64bit> {
    storage: Vec<Conf::Block>,
    layout: Layout<Conf::Block>,
    /// Meaningful under [MaxIdPolicy::KeepCurrent] only.
    max_used_id: Option<usize>,
}

impl<Conf: Config> IdPool<Conf> {
    /// Pool with capacity for `2^exp_max` ids, all free.
    ///
    /// Panics if `exp_max` does not fit the root block
    /// (`exp_max >= Conf::Block::SIZE`).
    pub fn new(exp_max: usize) -> Self {
        let layout = Layout::new(exp_max);
        let mut this = Self {
            storage: vec![Self::all_free_word(); layout.total_blocks()],
            layout,
            max_used_id: None,
        };
        this.apply_root_mask();
        this
    }

    /// Frees every id without reallocating.
    pub fn clean(&mut self) {
        self.storage.fill(Self::all_free_word());
        self.apply_root_mask();
        self.max_used_id = None;
    }

    #[inline]
    pub fn max_elements(&self) -> usize {
        self.layout.max_elements()
    }

    #[inline]
    pub fn num_metadata_levels(&self) -> usize {
        self.layout.num_metadata_levels()
    }

    #[inline]
    pub fn num_element_blocks(&self) -> usize {
        self.layout.num_element_blocks()
    }

    #[inline]
    pub fn num_metadata_blocks(&self) -> usize {
        self.layout.num_metadata_blocks()
    }

    /// Highest id currently in use.
    ///
    /// O(1) under [MaxIdPolicy::KeepCurrent]; a downward leaf scan under
    /// [MaxIdPolicy::OnDemand].
    pub fn max_used_id(&self) -> Option<usize> {
        match Conf::MAX_ID_POLICY {
            MaxIdPolicy::KeepCurrent => self.max_used_id,
            MaxIdPolicy::OnDemand => {
                self.find_max_used_from(self.layout.num_element_blocks() - 1)
            }
        }
    }

    /// Panics if `id >= max_elements()`.
    #[inline]
    pub fn is_free(&self, id: usize) -> bool {
        assert!(id < self.layout.max_elements(), "id out of range!");
        let idx = self.layout.num_metadata_blocks() + (id >> Conf::Block::SIZE_POT_EXPONENT);
        self.load(idx).get_bit(id & (Conf::Block::SIZE - 1))
    }

    /// Marks `id` free (`true`) or used (`false`), refreshing summaries and
    /// the max-used cache as needed.
    ///
    /// Panics if `id >= max_elements()`.
    pub fn set_free(&mut self, id: usize, value: bool) {
        assert!(id < self.layout.max_elements(), "id out of range!");
        let idx = self.layout.num_metadata_blocks() + (id >> Conf::Block::SIZE_POT_EXPONENT);
        let bit_mask = Conf::Block::ONE << (id & (Conf::Block::SIZE - 1));

        let word = self.load(idx);
        if value {
            let was_empty = word.is_zero();
            self.store(idx, word | bit_mask);
            if Self::keeps_max_current() && self.max_used_id == Some(id) {
                self.max_used_id = self.find_max_used_from(id >> Conf::Block::SIZE_POT_EXPONENT);
            }
            if was_empty {
                self.update_metadata(id, true);
            }
        } else {
            if Self::keeps_max_current() {
                self.max_used_id = Some(self.max_used_id.map_or(id, |max| max.max(id)));
            }
            let word = word & !bit_mask;
            self.store(idx, word);
            if word.is_zero() {
                self.update_metadata(id, false);
            }
        }
    }

    /// [set_free] for every id in `ids`, with one write per touched leaf
    /// block and one summary refresh per leaf whose emptiness flipped.
    ///
    /// Panics if `ids.end > max_elements()`.
    ///
    /// [set_free]: Self::set_free
    pub fn set_free_range(&mut self, ids: Range<usize>, value: bool) {
        assert!(ids.end <= self.layout.max_elements(), "range out of bounds!");
        if ids.is_empty() {
            return;
        }

        let first_block = ids.start >> Conf::Block::SIZE_POT_EXPONENT;
        let last_block = (ids.end - 1) >> Conf::Block::SIZE_POT_EXPONENT;
        for block_idx in first_block..=last_block {
            let from = if block_idx == first_block {
                ids.start & (Conf::Block::SIZE - 1)
            } else {
                0
            };
            let to = if block_idx == last_block {
                ((ids.end - 1) & (Conf::Block::SIZE - 1)) + 1
            } else {
                Conf::Block::SIZE
            };
            let bits_mask = Self::range_mask(from, to);

            let idx = self.layout.num_metadata_blocks() + block_idx;
            let word = self.load(idx);
            let updated = if value { word | bits_mask } else { word & !bits_mask };
            self.store(idx, updated);

            if word.is_zero() != updated.is_zero() {
                // Any id of the block addresses the same summary bits.
                self.update_metadata(block_idx << Conf::Block::SIZE_POT_EXPONENT, value);
            }
        }

        if Self::keeps_max_current() {
            if value {
                if let Some(max) = self.max_used_id {
                    if ids.contains(&max) {
                        self.max_used_id =
                            self.find_max_used_from(max >> Conf::Block::SIZE_POT_EXPONENT);
                    }
                }
            } else {
                let last = ids.end - 1;
                self.max_used_id = Some(self.max_used_id.map_or(last, |max| max.max(last)));
            }
        }
    }

    /// Allocates the lowest free id, or `None` when the pool is exhausted.
    ///
    /// One word read per summary level, one leaf write, plus a summary
    /// refresh when the leaf block runs out of free bits.
    pub fn obtain(&mut self) -> Option<usize> {
        // Empty root: no free ids anywhere.
        if self.load(0).is_zero() {
            return None;
        }

        let mut block_idx = 0;
        let mut level_offset = 0;
        for level in 0..self.layout.num_metadata_levels() {
            let word = Self::free_view(unsafe {
                // The summary invariant guarantees a set bit on the path,
                // and set bits only point at existing children.
                *self.storage.get_unchecked(level_offset + block_idx)
            });
            block_idx = block_idx * Conf::Block::SIZE + word.trailing_zeros();
            level_offset += self.layout.num_metadata_blocks_on_level(level);
        }

        let idx = self.layout.num_metadata_blocks() + block_idx;
        let word = self.load(idx);
        let bit = word.trailing_zeros();
        let id = block_idx * Conf::Block::SIZE + bit;

        let word = word & !(Conf::Block::ONE << bit);
        self.store(idx, word);

        if Self::keeps_max_current() {
            self.max_used_id = Some(self.max_used_id.map_or(id, |max| max.max(id)));
        }
        if word.is_zero() {
            self.update_metadata(id, false);
        }
        Some(id)
    }

    /// Ids currently in use, ascending.
    pub fn used_ids(&self) -> UsedIds<'_, Conf> {
        let leaf_blocks = match self.max_used_id() {
            Some(max) => {
                let meta = self.layout.num_metadata_blocks();
                let end = (max >> Conf::Block::SIZE_POT_EXPONENT) + 1;
                &self.storage[meta..meta + end]
            }
            None => &[],
        };

        // With no summary levels the single leaf block carries reserved
        // high bits which must not surface as used ids.
        let valid_mask = if self.layout.num_metadata_levels() == 0
            && !self.layout.root_mask().is_zero()
        {
            self.layout.root_mask()
        } else {
            Conf::Block::MAX
        };
        UsedIds::new(leaf_blocks, valid_mask)
    }

    /// Streams storage through the run-length codec: literal words to
    /// `literal_cb`, [Abbreviation]s for long all-zero/all-one runs to
    /// `abbreviation_cb`, both in storage order.
    pub fn pack(
        &self,
        abbreviation_cb: impl FnMut(Abbreviation),
        literal_cb: impl FnMut(Conf::Block),
    ) {
        rle::pack(&self.storage, abbreviation_cb, literal_cb);
    }

    /// Rebuilds a pool of exponent `exp_max` from [pack]'s two streams.
    ///
    /// The streams must describe exactly the storage of such a pool;
    /// ill-formed input panics. For untrusted bytes use [deserialize].
    ///
    /// [pack]: Self::pack
    /// [deserialize]: Self::deserialize
    pub fn unpack(
        exp_max: usize,
        literals: &[Conf::Block],
        abbreviations: &[Abbreviation],
    ) -> Self {
        let mut this = Self::new(exp_max);
        rle::unpack(&mut this.storage, literals, abbreviations);
        if Self::keeps_max_current() {
            this.max_used_id = this.find_max_used_from(this.layout.num_element_blocks() - 1);
        }
        this
    }

    /// Finds the highest used id, scanning leaf blocks downward from
    /// `start_block`. Blocks above `start_block` must be all free.
    fn find_max_used_from(&self, start_block: usize) -> Option<usize> {
        let leaves = &self.storage[self.layout.num_metadata_blocks()..];
        let mut block_idx = start_block;
        while block_idx != 0 && Self::free_view(leaves[block_idx]) == Conf::Block::MAX {
            block_idx -= 1;
        }

        let mut word = Self::free_view(leaves[block_idx]);
        // With no summary levels the single leaf block has reserved high
        // bits; count them as free so they never become the maximum.
        let root_mask = self.layout.root_mask();
        if self.layout.num_metadata_levels() == 0 && !root_mask.is_zero() {
            word |= !root_mask;
        }

        let max_bit = Conf::Block::SIZE - word.leading_ones();
        if max_bit == 0 {
            None
        } else {
            Some(block_idx * Conf::Block::SIZE + max_bit - 1)
        }
    }

    /// Walks summary levels from the leaf containing `id` towards the
    /// root after that leaf became non-empty (`now_free`) or empty.
    /// Stops as soon as an ancestor word proves the rest of the chain
    /// already correct.
    fn update_metadata(&mut self, id: usize, now_free: bool) {
        let levels = self.layout.num_metadata_levels();
        if levels == 0 {
            return;
        }

        let mut bit_offset = id;
        let mut level_start = self.layout.num_metadata_blocks();
        for level in 0..levels {
            bit_offset >>= Conf::Block::SIZE_POT_EXPONENT;
            let bit_mask = Conf::Block::ONE << (bit_offset & (Conf::Block::SIZE - 1));
            level_start -= self.layout.num_metadata_blocks_on_level(levels - level - 1);
            let idx = level_start + (bit_offset >> Conf::Block::SIZE_POT_EXPONENT);

            let word = self.load(idx);
            if now_free {
                self.store(idx, word | bit_mask);
                if !word.is_zero() {
                    // Ancestors already advertise free bits down this path.
                    break;
                }
            } else {
                let word = word & !bit_mask;
                self.store(idx, word);
                if !word.is_zero() {
                    // A sibling subtree still has free bits.
                    break;
                }
            }
        }
    }

    /// Involution between storage form and the 1-is-free view the
    /// algorithms operate on. Identity under [FreeBitPolicy::One].
    #[inline]
    fn free_view(word: Conf::Block) -> Conf::Block {
        match Conf::FREE_BIT_POLICY {
            FreeBitPolicy::One => word,
            FreeBitPolicy::Zero => !word,
        }
    }

    #[inline]
    fn load(&self, idx: usize) -> Conf::Block {
        Self::free_view(self.storage[idx])
    }

    #[inline]
    fn store(&mut self, idx: usize, free_bits: Conf::Block) {
        self.storage[idx] = Self::free_view(free_bits);
    }

    /// Storage word with every id free.
    #[inline]
    fn all_free_word() -> Conf::Block {
        Self::free_view(Conf::Block::MAX)
    }

    /// Marks root bits past the capacity as used, so they never allocate.
    fn apply_root_mask(&mut self) {
        let root_mask = self.layout.root_mask();
        if !root_mask.is_zero() {
            let word = self.load(0);
            self.store(0, word & root_mask);
        }
    }

    #[inline]
    fn keeps_max_current() -> bool {
        matches!(Conf::MAX_ID_POLICY, MaxIdPolicy::KeepCurrent)
    }

    /// Mask of bit positions `[from, to)`.
    #[inline]
    fn range_mask(from: usize, to: usize) -> Conf::Block {
        let high = if to == Conf::Block::SIZE {
            Conf::Block::MAX
        } else {
            (Conf::Block::ONE << to) - Conf::Block::ONE
        };
        high & !((Conf::Block::ONE << from) - Conf::Block::ONE)
    }

    #[cfg(test)]
    pub(crate) fn raw_storage(&self) -> &[Conf::Block] {
        &self.storage
    }
}

/// Pools compare equal iff they have the same capacity and byte-identical
/// storage. Under [MaxIdPolicy::KeepCurrent] the max-used cache takes part
/// as well.
impl<Conf: Config> PartialEq for IdPool<Conf> {
    fn eq(&self, other: &Self) -> bool {
        if self.layout.max_elements() != other.layout.max_elements() {
            return false;
        }
        if Self::keeps_max_current() && self.max_used_id != other.max_used_id {
            return false;
        }
        self.storage == other.storage
    }
}
impl<Conf: Config> Eq for IdPool<Conf> {}

/// Duplicates the backing storage.
impl<Conf: Config> Clone for IdPool<Conf> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            layout: self.layout,
            max_used_id: self.max_used_id,
        }
    }
}

impl<Conf: Config> fmt::Debug for IdPool<Conf> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdPool")
            .field("max_elements", &self.max_elements())
            .field("max_used_id", &self.max_used_id())
            .field("storage", &self.storage)
            .finish()
    }
}
