use std::io::{self, Read, Write};

use crate::bit_block::BitBlock;
use crate::config::Config;
use crate::id_pool::IdPool;
use crate::layout::Layout;
use crate::rle::Abbreviation;

#[inline]
fn read_u64(r: &mut impl Read) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

#[inline]
fn read_block<Block: BitBlock>(r: &mut impl Read) -> io::Result<Block> {
    let mut buf = Block::Bytes::default();
    r.read_exact(buf.as_mut())?;
    Ok(Block::from_le_bytes(buf))
}

fn invalid_data(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.to_owned())
}

impl<Conf: Config> IdPool<Conf> {
    /// Serialize pool to a binary format.
    ///
    /// # Format
    ///
    /// In little endian.
    /// ```text
    /// exp_max:u8|nabbrevs:u64|[position_and_val:u64 nblocks:u64;..]|nliterals:u64|[block;..]
    /// ```
    pub fn serialize(&self, w: &mut impl Write) -> io::Result<()> {
        let mut abbreviations = Vec::new();
        let mut literals = Vec::new();
        self.pack(
            |abbreviation| abbreviations.push(abbreviation),
            |literal| literals.push(literal),
        );

        w.write_all(&[self.max_elements().trailing_zeros() as u8])?;

        w.write_all(&(abbreviations.len() as u64).to_le_bytes())?;
        for abbreviation in &abbreviations {
            w.write_all(&abbreviation.position_and_val.to_le_bytes())?;
            w.write_all(&abbreviation.nblocks.to_le_bytes())?;
        }

        w.write_all(&(literals.len() as u64).to_le_bytes())?;
        for &literal in &literals {
            w.write_all(literal.to_le_bytes().as_ref())?;
        }
        Ok(())
    }

    /// Inverse of [serialize], for untrusted input: a frame that does not
    /// describe exactly one pool of the stored exponent is rejected with
    /// [io::ErrorKind::InvalidData] instead of panicking.
    ///
    /// [serialize]: Self::serialize
    pub fn deserialize(r: &mut impl Read) -> io::Result<Self> {
        let mut exp_max = [0u8; 1];
        r.read_exact(&mut exp_max)?;
        let exp_max = exp_max[0] as usize;
        if exp_max >= Conf::Block::SIZE {
            return Err(invalid_data("capacity exponent does not fit the block"));
        }
        let total_blocks = Layout::<Conf::Block>::new(exp_max).total_blocks();

        let nabbrevs = read_u64(r)? as usize;
        // Each abbreviation stands for at least one block.
        if nabbrevs > total_blocks {
            return Err(invalid_data("abbreviation count exceeds storage"));
        }
        let mut abbreviations = Vec::with_capacity(nabbrevs);
        for _ in 0..nabbrevs {
            let position_and_val = read_u64(r)?;
            let nblocks = read_u64(r)?;
            abbreviations.push(Abbreviation { position_and_val, nblocks });
        }

        let nliterals = read_u64(r)? as usize;
        if nliterals > total_blocks {
            return Err(invalid_data("literal count exceeds storage"));
        }
        let mut literals = Vec::with_capacity(nliterals);
        for _ in 0..nliterals {
            literals.push(read_block::<Conf::Block>(r)?);
        }

        // Replay the unpack walk: both streams together must cover the
        // storage exactly.
        let mut unpacked_idx = 0usize;
        let mut literals_consumed = 0usize;
        for abbreviation in &abbreviations {
            let position = abbreviation.position();
            if position < unpacked_idx {
                return Err(invalid_data("abbreviations out of order"));
            }
            if abbreviation.nblocks() == 0 {
                return Err(invalid_data("empty abbreviated run"));
            }
            literals_consumed += position - unpacked_idx;
            unpacked_idx = position
                .checked_add(abbreviation.nblocks())
                .filter(|&end| end <= total_blocks)
                .ok_or_else(|| invalid_data("abbreviated run exceeds storage"))?;
        }
        literals_consumed += total_blocks - unpacked_idx;
        if literals_consumed != nliterals {
            return Err(invalid_data("literal stream length mismatch"));
        }

        Ok(Self::unpack(exp_max, &literals, &abbreviations))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use itertools::assert_equal;

    use crate::config;
    use super::*;

    #[test]
    fn simple_serialize_test() {
        let mut pool: IdPool<config::_64bit> = IdPool::new(13);
        pool.set_free(100, false);
        pool.set_free(5000, false);
        pool.set_free_range(700..900, false);

        let mut bytes: Vec<u8> = Vec::new();
        pool.serialize(&mut bytes).unwrap();

        let deserialized: IdPool<config::_64bit> =
            IdPool::deserialize(&mut Cursor::new(bytes)).unwrap();

        assert_eq!(pool, deserialized);
        assert_equal(pool.used_ids(), deserialized.used_ids()); // check by iter too.
    }

    #[test]
    fn empty_and_full_pools() {
        for exp_max in [0, 6, 12, 13] {
            let mut pool: IdPool<config::_64bit> = IdPool::new(exp_max);

            let mut bytes = Vec::new();
            pool.serialize(&mut bytes).unwrap();
            assert_eq!(pool, IdPool::deserialize(&mut Cursor::new(bytes)).unwrap());

            while pool.obtain().is_some() {}
            let mut bytes = Vec::new();
            pool.serialize(&mut bytes).unwrap();
            assert_eq!(pool, IdPool::deserialize(&mut Cursor::new(bytes)).unwrap());
        }
    }

    #[test]
    fn truncated_input_is_an_error() {
        let mut pool: IdPool<config::_64bit> = IdPool::new(12);
        pool.set_free(1000, false);

        let mut bytes = Vec::new();
        pool.serialize(&mut bytes).unwrap();

        for len in 0..bytes.len() {
            assert!(IdPool::<config::_64bit>::deserialize(&mut Cursor::new(&bytes[..len]))
                .is_err());
        }
    }

    #[test]
    fn malformed_frames_are_invalid_data() {
        // Exponent too large for the block.
        let bytes = [64u8];
        let err = IdPool::<config::_64bit>::deserialize(&mut Cursor::new(bytes)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        // An abbreviation covering more blocks than the pool has.
        let mut bytes = Vec::new();
        bytes.push(12u8);
        bytes.extend(1u64.to_le_bytes());
        bytes.extend(Abbreviation::new(0, true, 1000).position_and_val.to_le_bytes());
        bytes.extend(1000u64.to_le_bytes());
        bytes.extend(0u64.to_le_bytes());
        let err = IdPool::<config::_64bit>::deserialize(&mut Cursor::new(bytes)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        // Literal stream not matching the walk.
        let mut bytes = Vec::new();
        bytes.push(12u8);
        bytes.extend(0u64.to_le_bytes()); // no abbreviations
        bytes.extend(3u64.to_le_bytes()); // 3 literals for a 65-block pool
        for _ in 0..3 {
            bytes.extend(u64::MAX.to_le_bytes());
        }
        let err = IdPool::<config::_64bit>::deserialize(&mut Cursor::new(bytes)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
