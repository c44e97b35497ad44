use std::io::{Read, Write};
use std::mem;

use log::debug;
use oorandom::Rand32;

use crate::error::FilterError;
use crate::hashing::digest;
use crate::internal_utils::{entropy_seed, read_byte, read_word, write_word, WORD_BYTES};
use super::{check_fingerprint_width, fingerprint_of, index1, index2};


/// A cuckoo filter: two candidate buckets per key, each bucket holding
/// `bucket_size` one-byte fingerprint slots.
///
/// Unlike a Bloom filter, a cuckoo filter supports [`erase`]. The price is
/// that [`insert`] can fail: when both candidate buckets are full, the filter
/// evicts a random resident fingerprint and chases it to its own alternate
/// bucket, up to `max_kicks` times, and reports failure if no empty slot is
/// found. Callers should treat a rejected insert as the filter being
/// saturated.
///
/// The eviction walk draws from a PRNG owned by the filter, so `insert` takes
/// `&mut self` even on paths that end up only probing. Construct with
/// [`new_seeded`] when reproducible eviction behavior is wanted.
///
/// [`insert`]: Self::insert
/// [`erase`]: Self::erase
/// [`new_seeded`]: Self::new_seeded
#[derive(Debug)]
pub struct CuckooFilter {
    bucket_count:     usize,
    bucket_size:      usize,
    fingerprint_bits: usize,
    max_kicks:        usize,
    /// Flat `bucket_count * bucket_size` slot array. A zero byte is an empty
    /// slot; every non-zero byte is a fingerprint.
    table:            Vec<u8>,
    prng:             Rand32,
}

impl CuckooFilter {
    /// Create an empty filter with an entropy-derived eviction seed.
    ///
    /// `bucket_count` and `bucket_size` must be positive; `fingerprint_bits`
    /// must be in `1..=8`.
    ///
    /// # Errors
    /// [`FilterError::InvalidFingerprintWidth`] if `fingerprint_bits` is
    /// outside `1..=8`.
    pub fn new(
        bucket_count:     usize,
        bucket_size:      usize,
        fingerprint_bits: usize,
        max_kicks:        usize,
    ) -> Result<Self, FilterError> {
        Self::new_seeded(bucket_count, bucket_size, fingerprint_bits, max_kicks, entropy_seed())
    }

    /// Like [`Self::new`], but with a caller-chosen PRNG seed, making the
    /// eviction walk deterministic.
    ///
    /// # Errors
    /// [`FilterError::InvalidFingerprintWidth`] if `fingerprint_bits` is
    /// outside `1..=8`.
    pub fn new_seeded(
        bucket_count:     usize,
        bucket_size:      usize,
        fingerprint_bits: usize,
        max_kicks:        usize,
        seed:             u64,
    ) -> Result<Self, FilterError> {
        check_fingerprint_width(fingerprint_bits)?;
        debug_assert!(bucket_count >= 1, "bucket_count must be positive");
        debug_assert!(bucket_size >= 1, "bucket_size must be positive");

        Ok(Self {
            bucket_count,
            bucket_size,
            fingerprint_bits,
            max_kicks,
            table: vec![0; bucket_count * bucket_size],
            prng: Rand32::new(seed),
        })
    }

    #[inline]
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    #[inline]
    #[must_use]
    pub fn bucket_size(&self) -> usize {
        self.bucket_size
    }

    #[inline]
    #[must_use]
    pub fn fingerprint_bits(&self) -> usize {
        self.fingerprint_bits
    }

    #[inline]
    #[must_use]
    pub fn max_kicks(&self) -> usize {
        self.max_kicks
    }

    /// The size of the raw fingerprint table, in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.table.len()
    }

    /// Insert `key`'s fingerprint, returning whether a slot was found.
    ///
    /// A `false` return means eviction exhausted `max_kicks` without freeing
    /// a slot; the key is not stored, and one previously resident fingerprint
    /// has been relocated along the walk. The filter remains usable, but the
    /// caller should consider it saturated and rebuild at a larger size.
    pub fn insert(&mut self, key: &[u8]) -> bool {
        let (fingerprint, first, second) = self.candidates(key);

        if self.place_in_bucket(first, fingerprint) || self.place_in_bucket(second, fingerprint) {
            return true;
        }

        // Both candidates are full; evict a random resident and chase it.
        let mut index = if self.prng.rand_u32() & 1 == 0 { first } else { second };
        let mut pending = fingerprint;

        for _ in 0..self.max_kicks {
            let victim = self.prng.rand_range(0..self.bucket_size as u32) as usize;
            mem::swap(&mut pending, &mut self.table[index * self.bucket_size + victim]);

            index = index2(index, pending, self.bucket_count);
            if self.place_in_bucket(index, pending) {
                return true;
            }
        }

        debug!(
            "cuckoo filter rejected an insert after {} kicks ({} slots)",
            self.max_kicks,
            self.table.len(),
        );
        false
    }

    /// Whether either candidate bucket holds `key`'s fingerprint.
    ///
    /// `false` is definitive; `true` may be a false positive caused by
    /// another key sharing the fingerprint and a bucket.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        let (fingerprint, first, second) = self.candidates(key);

        self.bucket_slots(first).contains(&fingerprint)
            || self.bucket_slots(second).contains(&fingerprint)
    }

    /// Clear the first slot holding `key`'s fingerprint, searching the
    /// primary bucket before the alternate. Returns whether a slot was
    /// cleared.
    ///
    /// Matching the first occurrence is deliberate: any slot with this
    /// fingerprint is evidence for the key, and removing one of them is all
    /// the filter semantics require. A colliding key inserted earlier may
    /// lose its slot instead.
    pub fn erase(&mut self, key: &[u8]) -> bool {
        let (fingerprint, first, second) = self.candidates(key);

        self.clear_in_bucket(first, fingerprint) || self.clear_in_bucket(second, fingerprint)
    }

    /// Write the filter to `writer` and return the number of bytes written.
    ///
    /// The layout is four native words (bucket count, bucket size,
    /// fingerprint width, kick budget), then per bucket a native word holding
    /// the occupied-slot count followed by that bucket's non-zero
    /// fingerprints in slot order.
    ///
    /// # Errors
    /// [`FilterError::HeaderIo`] or [`FilterError::PayloadIo`] on a short
    /// write. The filter itself is left unchanged either way.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<usize, FilterError> {
        for word in [self.bucket_count, self.bucket_size, self.fingerprint_bits, self.max_kicks] {
            write_word(writer, word).map_err(FilterError::HeaderIo)?;
        }
        let mut written = 4 * WORD_BYTES;

        let mut occupied = Vec::with_capacity(self.bucket_size);
        for bucket in 0..self.bucket_count {
            occupied.clear();
            occupied.extend(
                self.bucket_slots(bucket).iter().copied().filter(|&slot| slot != 0),
            );

            write_word(writer, occupied.len()).map_err(FilterError::PayloadIo)?;
            writer.write_all(&occupied).map_err(FilterError::PayloadIo)?;
            written += WORD_BYTES + occupied.len();
        }

        Ok(written)
    }

    /// Read a filter previously written by [`Self::save`].
    ///
    /// Each bucket's stored fingerprints are packed into its first slots, so
    /// slot positions are not preserved across a round-trip; the multiset of
    /// fingerprints per bucket is. The reloaded filter gets a fresh
    /// entropy-derived eviction seed.
    ///
    /// # Errors
    /// [`FilterError::HeaderIo`] if the four header words cannot be read,
    /// [`FilterError::PayloadIo`] if bucket contents are truncated, and
    /// [`FilterError::InvalidFingerprintWidth`] if the stored width is
    /// outside `1..=8`.
    ///
    /// # Panics
    /// May panic if the stream was not produced by `save` and a bucket claims
    /// more fingerprints than `bucket_size`.
    pub fn load<R: Read>(reader: &mut R) -> Result<Self, FilterError> {
        let bucket_count = read_word(reader).map_err(FilterError::HeaderIo)?;
        let bucket_size = read_word(reader).map_err(FilterError::HeaderIo)?;
        let fingerprint_bits = read_word(reader).map_err(FilterError::HeaderIo)?;
        let max_kicks = read_word(reader).map_err(FilterError::HeaderIo)?;
        check_fingerprint_width(fingerprint_bits)?;

        let mut table = vec![0; bucket_count * bucket_size];
        for bucket in 0..bucket_count {
            let occupied = read_word(reader).map_err(FilterError::PayloadIo)?;
            for slot in 0..occupied {
                table[bucket * bucket_size + slot] =
                    read_byte(reader).map_err(FilterError::PayloadIo)?;
            }
        }

        Ok(Self {
            bucket_count,
            bucket_size,
            fingerprint_bits,
            max_kicks,
            table,
            prng: Rand32::new(entropy_seed()),
        })
    }

    /// A key's fingerprint and its two candidate bucket indices.
    fn candidates(&self, key: &[u8]) -> (u8, usize, usize) {
        let key_digest = digest(key);
        let fingerprint = fingerprint_of(key_digest, self.fingerprint_bits);
        let first = index1(key_digest, self.bucket_count);
        let second = index2(first, fingerprint, self.bucket_count);
        (fingerprint, first, second)
    }

    fn bucket_slots(&self, index: usize) -> &[u8] {
        let base = index * self.bucket_size;
        &self.table[base..base + self.bucket_size]
    }

    /// Place `fingerprint` in the first empty slot of bucket `index`, if any.
    fn place_in_bucket(&mut self, index: usize, fingerprint: u8) -> bool {
        let base = index * self.bucket_size;
        for slot in base..base + self.bucket_size {
            if self.table[slot] == 0 {
                self.table[slot] = fingerprint;
                return true;
            }
        }
        false
    }

    /// Zero the first slot of bucket `index` holding `fingerprint`, if any.
    fn clear_in_bucket(&mut self, index: usize, fingerprint: u8) -> bool {
        let base = index * self.bucket_size;
        for slot in base..base + self.bucket_size {
            if self.table[slot] == fingerprint {
                self.table[slot] = 0;
                return true;
            }
        }
        false
    }
}
