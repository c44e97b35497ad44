use std::f64::consts::LN_2;
use std::io::{Read, Write};
use std::mem::size_of;

use crate::error::FilterError;
use crate::hashing::{digest, splitmix64};
use crate::internal_utils::{read_word, write_word, WORD_BYTES};


/// Width of one block of the packed bit array.
///
/// The persisted form reuses this granularity, so streams are only portable
/// between builds agreeing on the block width.
const BITS_PER_BLOCK: usize = 64;


/// A Bloom filter: a bit array probed at `hash_count` positions per key.
///
/// `insert` sets the key's probe bits; `contains` reports whether all of them
/// are set. Bits only ever transition from zero to one, so a key can never be
/// removed, and `contains` can never return `false` for a key that was
/// inserted. A `true` return may be a false positive, at a rate governed by
/// the bit count per key and the probe count.
///
/// Probe positions are derived by double hashing: with `h1` the key's digest
/// and `h2 = splitmix64(h1)`, probe `i` lands on `(h1 + i * h2) mod m`, all
/// arithmetic wrapping.
#[derive(Debug, Clone)]
pub struct BloomFilter {
    bit_count:  usize,
    hash_count: usize,
    blocks:     Vec<u64>,
}

impl BloomFilter {
    /// Create an empty filter with `bit_count` addressable bits and
    /// `hash_count` probes per key.
    ///
    /// Both parameters must be at least 1; a zero `bit_count` would leave the
    /// probe reduction with no bits to address.
    #[must_use]
    pub fn new(bit_count: usize, hash_count: usize) -> Self {
        debug_assert!(bit_count >= 1, "bit_count must be positive");
        debug_assert!(hash_count >= 1, "hash_count must be positive");

        Self {
            bit_count,
            hash_count,
            blocks: vec![0; bit_count.div_ceil(BITS_PER_BLOCK)],
        }
    }

    /// Create an empty filter sized for `expected_items` keys at roughly the
    /// given false-positive rate.
    ///
    /// Uses the standard sizing formulas `m = -n ln p / (ln 2)^2` and
    /// `k = m/n * ln 2`, rounded up and clamped to at least one bit and one
    /// probe. `expected_items` must be positive and `false_positive_rate`
    /// strictly between 0 and 1.
    #[must_use]
    pub fn with_rate(expected_items: usize, false_positive_rate: f64) -> Self {
        debug_assert!(expected_items >= 1, "expected_items must be positive");
        debug_assert!(
            false_positive_rate > 0.0 && false_positive_rate < 1.0,
            "false_positive_rate must be strictly between 0 and 1",
        );

        let items = expected_items as f64;
        let bit_count = (-items * false_positive_rate.ln() / (LN_2 * LN_2)).ceil();
        let bit_count = (bit_count as usize).max(1);
        let hash_count = (LN_2 * bit_count as f64 / items).ceil();
        let hash_count = (hash_count as usize).max(1);

        Self::new(bit_count, hash_count)
    }

    /// The number of addressable bits (`m`).
    #[inline]
    #[must_use]
    pub fn bit_count(&self) -> usize {
        self.bit_count
    }

    /// The number of probes per key (`k`).
    #[inline]
    #[must_use]
    pub fn hash_count(&self) -> usize {
        self.hash_count
    }

    /// The number of bits currently set.
    ///
    /// Non-decreasing over any sequence of inserts.
    #[must_use]
    pub fn bits_set(&self) -> usize {
        self.blocks.iter().map(|block| block.count_ones() as usize).sum()
    }

    /// Set every probe bit for `key`. Idempotent; never fails.
    pub fn insert(&mut self, key: &[u8]) {
        let hash = digest(key);
        let delta = splitmix64(hash);

        let mut probe = hash;
        for _ in 0..self.hash_count {
            self.set_bit((probe % self.bit_count as u64) as usize);
            probe = probe.wrapping_add(delta);
        }
    }

    /// Whether every probe bit for `key` is set.
    ///
    /// `false` is definitive; `true` may be a false positive.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        let hash = digest(key);
        let delta = splitmix64(hash);

        let mut probe = hash;
        for _ in 0..self.hash_count {
            if !self.bit((probe % self.bit_count as u64) as usize) {
                return false;
            }
            probe = probe.wrapping_add(delta);
        }
        true
    }

    /// Write the filter to `writer` and return the number of bytes written.
    ///
    /// The layout is three native words (bit count, probe count, block count)
    /// followed by the blocks, each as 64 bits little-endian.
    ///
    /// # Errors
    /// [`FilterError::HeaderIo`] or [`FilterError::PayloadIo`] on a short
    /// write. The filter itself is left unchanged either way.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<usize, FilterError> {
        write_word(writer, self.bit_count).map_err(FilterError::HeaderIo)?;
        write_word(writer, self.hash_count).map_err(FilterError::HeaderIo)?;
        write_word(writer, self.blocks.len()).map_err(FilterError::HeaderIo)?;

        for &block in &self.blocks {
            writer
                .write_all(&block.to_le_bytes())
                .map_err(FilterError::PayloadIo)?;
        }

        Ok(3 * WORD_BYTES + self.blocks.len() * size_of::<u64>())
    }

    /// Read a filter previously written by [`Self::save`].
    ///
    /// Bits are reconstructed individually: bit `b` of stored block `i` sets
    /// position `i * BITS_PER_BLOCK + b` if and only if that position is
    /// below the stored bit count. Trailing bits of the final block are
    /// ignored.
    ///
    /// # Errors
    /// [`FilterError::HeaderIo`] if the three header words cannot be read,
    /// [`FilterError::PayloadIo`] if the blocks are truncated.
    pub fn load<R: Read>(reader: &mut R) -> Result<Self, FilterError> {
        let bit_count = read_word(reader).map_err(FilterError::HeaderIo)?;
        let hash_count = read_word(reader).map_err(FilterError::HeaderIo)?;
        let block_count = read_word(reader).map_err(FilterError::HeaderIo)?;

        let mut filter = Self {
            bit_count,
            hash_count,
            blocks: vec![0; bit_count.div_ceil(BITS_PER_BLOCK)],
        };

        for block_index in 0..block_count {
            let mut raw = [0_u8; size_of::<u64>()];
            reader.read_exact(&mut raw).map_err(FilterError::PayloadIo)?;
            let block = u64::from_le_bytes(raw);

            for bit in 0..BITS_PER_BLOCK {
                if block & (1 << bit) != 0 {
                    let position = block_index * BITS_PER_BLOCK + bit;
                    if position < bit_count {
                        filter.set_bit(position);
                    }
                }
            }
        }

        Ok(filter)
    }

    fn set_bit(&mut self, position: usize) {
        self.blocks[position / BITS_PER_BLOCK] |= 1 << (position % BITS_PER_BLOCK);
    }

    fn bit(&self, position: usize) -> bool {
        self.blocks[position / BITS_PER_BLOCK] & (1 << (position % BITS_PER_BLOCK)) != 0
    }
}
