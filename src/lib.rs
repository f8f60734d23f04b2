//! Hierarchical bitset ID pool.
//!
//! [IdPool] tracks which ids in `[0, 2^exp_max)` are free and hands out the
//! lowest free one in a few word reads: above the leaf bitset sits a tree of
//! summary blocks, each bit advertising "this subtree still has free ids".
//! The highest id in use is tracked as well, and the whole pool round-trips
//! through a run-length wire format that collapses the long all-free /
//! all-used runs real workloads produce.
//!
//! ```
//! use hi_id_pool::IdPool;
//!
//! let mut pool: IdPool = IdPool::new(12);
//! assert_eq!(pool.obtain(), Some(0));
//! assert_eq!(pool.obtain(), Some(1));
//!
//! pool.set_free(0, true);
//! assert_eq!(pool.obtain(), Some(0));
//! assert_eq!(pool.max_used_id(), Some(1));
//! ```
//!
//! Block width and policies are a compile-time [Config]; see [config] for
//! the presets.
//!
//! [Config]: config::Config

mod bit_block;
pub mod config;
mod id_pool;
pub mod iter;
mod layout;
pub mod rle;


pub use bit_block::BitBlock;
pub use id_pool::IdPool;
pub use rle::Abbreviation;
