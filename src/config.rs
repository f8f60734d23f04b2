//! Configurations for [IdPool].
//!
//! Increasing block size widens the tree, which lowers the number of summary
//! levels for a given capacity. Decreasing block size shrinks every word the
//! pool touches.
//!
//! For your task, you can make a specialized config. For example, a pool
//! that lives in a save file and is mutated rarely may prefer
//! [MaxIdPolicy::OnDemand], and a short-lived pool that is mostly empty may
//! prefer [FreeBitPolicy::Zero].
//!
//! [IdPool]: crate::IdPool

use crate::bit_block::BitBlock;

/// How [IdPool::max_used_id] is produced.
///
/// [IdPool::max_used_id]: crate::IdPool::max_used_id
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum MaxIdPolicy {
    /// Every mutation keeps the cached maximum current; queries are O(1).
    /// This mainly impacts `set_free(id, true)` on the current maximum.
    KeepCurrent,
    /// Mutations never touch the cache; every query rescans leaf blocks
    /// downward from the end.
    OnDemand,
}

/// Which bit value marks a free id in storage.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum FreeBitPolicy {
    /// Free = 0. A fresh storage needs no all-ones fill, at the price of a
    /// bitwise NOT on every word the algorithms look at.
    Zero,
    /// Default. Free = 1. Requires filling all blocks with ones on
    /// construction and [clean].
    ///
    /// [clean]: crate::IdPool::clean
    One,
}

/// [IdPool] configuration.
///
/// [IdPool]: crate::IdPool
pub trait Config: 'static {
    /// Storage word for leaf and summary blocks alike.
    ///
    /// Also bounds the capacity exponent: `exp_max < Block::SIZE`.
    type Block: BitBlock;

    const MAX_ID_POLICY: MaxIdPolicy = MaxIdPolicy::KeepCurrent;
    const FREE_BIT_POLICY: FreeBitPolicy = FreeBitPolicy::One;
}

/// MAX capacity = 2^15
#[derive(Default)]
pub struct _16bit;
impl Config for _16bit {
    type Block = u16;
}

/// MAX capacity = 2^31
#[derive(Default)]
pub struct _32bit;
impl Config for _32bit {
    type Block = u32;
}

/// MAX capacity = 2^63
#[derive(Default)]
pub struct _64bit;
impl Config for _64bit {
    type Block = u64;
}

/// MAX capacity = 2^127
#[derive(Default)]
pub struct _128bit;
impl Config for _128bit {
    type Block = u128;
}
