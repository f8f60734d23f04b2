use std::fmt::Debug;
use std::ops::{
    BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Not, Shl, Shr, Sub,
};

/// Storage word of the pool.
///
/// Used in [Config], to define the block [IdPool] stores leaf and summary
/// bits in. Implemented for `u16`, `u32`, `u64` and `u128`.
///
/// `u8` is deliberately left out: with one-byte blocks the 16-byte
/// [Abbreviation] record could never pay for itself.
///
/// [Config]: crate::config::Config
/// [IdPool]: crate::IdPool
/// [Abbreviation]: crate::rle::Abbreviation
pub trait BitBlock
    : BitAnd<Output = Self>
    + BitAndAssign
    + BitOr<Output = Self>
    + BitOrAssign
    + BitXor<Output = Self>
    + BitXorAssign
    + Not<Output = Self>
    + Shl<usize, Output = Self>
    + Shr<usize, Output = Self>
    + Sub<Output = Self>
    + Eq + PartialEq
    + Debug
    + Sized + Copy + Clone
    + 'static
{
    /// 2^N bits
    const SIZE_POT_EXPONENT: usize;

    /// Size in bits
    const SIZE: usize = 1 << Self::SIZE_POT_EXPONENT;

    const ZERO: Self;
    const ONE : Self;
    /// All bits 1.
    const MAX : Self;

    #[inline]
    fn is_zero(self) -> bool {
        self == Self::ZERO
    }

    /// `bit_index` must be < SIZE.
    #[inline]
    fn get_bit(self, bit_index: usize) -> bool {
        !((self >> bit_index) & Self::ONE).is_zero()
    }

    fn trailing_zeros(self) -> usize;
    fn leading_ones(self) -> usize;
    fn count_ones(self) -> usize;
    fn wrapping_neg(self) -> Self;

    type Bytes: AsRef<[u8]> + AsMut<[u8]> + Default;
    fn to_le_bytes(self) -> Self::Bytes;
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_bit_block {
    ($t:ty, $size_pot_exponent:literal, $bytes:literal) => {
        impl BitBlock for $t{
            const SIZE_POT_EXPONENT: usize = $size_pot_exponent;

            const ZERO: Self = 0;
            const ONE : Self = 1;
            const MAX : Self = <$t>::MAX;

            #[inline]
            fn trailing_zeros(self) -> usize {
                <$t>::trailing_zeros(self) as usize
            }

            #[inline]
            fn leading_ones(self) -> usize {
                <$t>::leading_ones(self) as usize
            }

            #[inline]
            fn count_ones(self) -> usize {
                <$t>::count_ones(self) as usize
            }

            #[inline]
            fn wrapping_neg(self) -> Self {
                <$t>::wrapping_neg(self)
            }

            type Bytes = [u8; $bytes];
            #[inline]
            fn to_le_bytes(self) -> Self::Bytes {
                <$t>::to_le_bytes(self)
            }
            #[inline]
            fn from_le_bytes(bytes: Self::Bytes) -> Self {
                <$t>::from_le_bytes(bytes)
            }
        }
    };
}

impl_bit_block!(u16,  4, 2);
impl_bit_block!(u32,  5, 4);
impl_bit_block!(u64,  6, 8);
impl_bit_block!(u128, 7, 16);
