use std::io::{Read, Write};
use std::mem::{self, size_of};

use log::debug;
use oorandom::Rand32;

use crate::error::FilterError;
use crate::hashing::digest;
use crate::internal_utils::{entropy_seed, read_word, write_word, WORD_BYTES};
use super::{check_fingerprint_width, fingerprint_of, index1, index2};


type ChainLink = Option<Box<OverflowNode>>;

/// One spilled fingerprint, owned by its bucket's overflow chain.
#[derive(Debug)]
struct OverflowNode {
    fingerprint: u8,
    next:        ChainLink,
}


/// A cuckoo table whose insertion never fails.
///
/// Layout and eviction are identical to [`CuckooFilter`], with one
/// divergence: when the eviction walk exhausts its kick budget while still
/// holding a displaced fingerprint, that fingerprint is spilled onto a
/// per-bucket overflow chain instead of being dropped. The primary slot array
/// is always searched first; chains absorb overload and shrink again as
/// entries are erased.
///
/// The spill target is chosen by walking the two candidate buckets' chains in
/// lock step and picking whichever ends first, so overload spreads across
/// both chains; ties go to the alternate bucket.
///
/// Each map exclusively owns its slot array and every chain node, and is not
/// cloneable; moving the map moves both.
///
/// [`CuckooFilter`]: crate::CuckooFilter
#[derive(Debug)]
pub struct CuckooMap {
    bucket_count:     usize,
    bucket_size:      usize,
    fingerprint_bits: usize,
    max_kicks:        usize,
    /// Flat `bucket_count * bucket_size` slot array; zero is an empty slot.
    table:            Vec<u8>,
    /// One overflow chain head per bucket.
    chains:           Vec<ChainLink>,
    prng:             Rand32,
}

impl CuckooMap {
    /// Create an empty map with an entropy-derived eviction seed.
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
            chains: (0..bucket_count).map(|_| None).collect(),
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

    /// The map's footprint in **bits**: the bucket array at one head link
    /// plus `bucket_size` slots per bucket, and every live overflow node.
    ///
    /// The unit is bits, not bytes, for compatibility with callers comparing
    /// filter footprints; [`CuckooFilter::size`] reports bytes.
    ///
    /// [`CuckooFilter::size`]: crate::CuckooFilter::size
    #[must_use]
    pub fn size(&self) -> usize {
        let stride = size_of::<ChainLink>() + self.bucket_size;
        let mut bits = self.bucket_count * stride * 8;

        for head in &self.chains {
            let mut node = head.as_deref();
            while let Some(current) = node {
                bits += size_of::<OverflowNode>() * 8;
                node = current.next.as_deref();
            }
        }

        bits
    }

    /// Insert `key`'s fingerprint. Always succeeds and returns `true`.
    ///
    /// Follows the cuckoo eviction walk up to `max_kicks`; if no slot frees
    /// up, the fingerprint still in hand is pushed onto the overflow chain of
    /// whichever candidate bucket has the shorter chain (ties to the
    /// alternate bucket), in constant time.
    pub fn insert(&mut self, key: &[u8]) -> bool {
        let (fingerprint, first, second) = self.candidates(key);

        if self.place_in_bucket(first, fingerprint) || self.place_in_bucket(second, fingerprint) {
            return true;
        }

        let mut index = if self.prng.rand_u32() & 1 == 0 { first } else { second };
        let mut pending = fingerprint;

        for _ in 0..self.max_kicks {
            let victim = self.prng.rand_u32() as usize % self.bucket_size;
            mem::swap(&mut pending, &mut self.table[index * self.bucket_size + victim]);

            index = index2(index, pending, self.bucket_count);
            if self.place_in_bucket(index, pending) {
                return true;
            }
        }

        // Kick budget exhausted with `pending` still in hand: spill it onto
        // the shorter of the two candidate chains, walking both in lock step.
        let mut walk_first = self.chains[first].as_deref();
        let mut walk_second = self.chains[second].as_deref();
        while let (Some(node_first), Some(node_second)) = (walk_first, walk_second) {
            walk_first = node_first.next.as_deref();
            walk_second = node_second.next.as_deref();
        }
        let target = if walk_first.is_none() && walk_second.is_some() {
            first
        } else {
            second
        };

        debug!(
            "cuckoo map spilled a fingerprint into bucket {}'s overflow chain after {} kicks",
            target, self.max_kicks,
        );

        let previous_head = self.chains[target].take();
        self.chains[target] = Some(Box::new(OverflowNode {
            fingerprint: pending,
            next:        previous_head,
        }));
        true
    }

    /// Whether either candidate bucket holds `key`'s fingerprint, in its
    /// primary slots or its overflow chain.
    ///
    /// `false` is definitive; `true` may be a false positive.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        let (fingerprint, first, second) = self.candidates(key);

        for index in [first, second] {
            if self.bucket_slots(index).contains(&fingerprint) {
                return true;
            }

            let mut node = self.chains[index].as_deref();
            while let Some(current) = node {
                if current.fingerprint == fingerprint {
                    return true;
                }
                node = current.next.as_deref();
            }
        }
        false
    }

    /// Remove one occurrence of `key`'s fingerprint, searching each candidate
    /// bucket's primary slots before its overflow chain. Returns whether
    /// anything was removed.
    ///
    /// Unlinked chain nodes are freed immediately. As with
    /// [`CuckooFilter::erase`], the first match wins, so a colliding key's
    /// entry may be the one removed.
    ///
    /// [`CuckooFilter::erase`]: crate::CuckooFilter::erase
    pub fn erase(&mut self, key: &[u8]) -> bool {
        let (fingerprint, first, second) = self.candidates(key);

        for index in [first, second] {
            if self.clear_in_bucket(index, fingerprint) {
                return true;
            }
            if Self::unlink_fingerprint(&mut self.chains[index], fingerprint) {
                return true;
            }
        }
        false
    }

    /// Write the map to `writer` and return the number of bytes written.
    ///
    /// The layout is four native words (bucket count, bucket size,
    /// fingerprint width, kick budget), then per bucket: the `bucket_size`
    /// primary slots verbatim (zeros included), a native word holding the
    /// chain length, and the chain's fingerprints in head order.
    ///
    /// # Errors
    /// [`FilterError::HeaderIo`] or [`FilterError::PayloadIo`] on a short
    /// write. The map itself is left unchanged either way.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<usize, FilterError> {
        for word in [self.bucket_count, self.bucket_size, self.fingerprint_bits, self.max_kicks] {
            write_word(writer, word).map_err(FilterError::HeaderIo)?;
        }
        let mut written = 4 * WORD_BYTES;

        for bucket in 0..self.bucket_count {
            writer
                .write_all(self.bucket_slots(bucket))
                .map_err(FilterError::PayloadIo)?;

            let mut chain_len = 0;
            let mut node = self.chains[bucket].as_deref();
            while let Some(current) = node {
                chain_len += 1;
                node = current.next.as_deref();
            }
            write_word(writer, chain_len).map_err(FilterError::PayloadIo)?;

            let mut node = self.chains[bucket].as_deref();
            while let Some(current) = node {
                writer
                    .write_all(&[current.fingerprint])
                    .map_err(FilterError::PayloadIo)?;
                node = current.next.as_deref();
            }

            written += self.bucket_size + WORD_BYTES + chain_len;
        }

        Ok(written)
    }

    /// Read a map previously written by [`Self::save`].
    ///
    /// Primary slot positions are restored exactly. Chain nodes are
    /// reallocated and relinked in the order read, so the first stored byte
    /// becomes the new head. The reloaded map gets a fresh entropy-derived
    /// eviction seed.
    ///
    /// # Errors
    /// [`FilterError::HeaderIo`] if the four header words cannot be read,
    /// [`FilterError::PayloadIo`] if bucket slots or chains are truncated,
    /// and [`FilterError::InvalidFingerprintWidth`] if the stored width is
    /// outside `1..=8`.
    pub fn load<R: Read>(reader: &mut R) -> Result<Self, FilterError> {
        let bucket_count = read_word(reader).map_err(FilterError::HeaderIo)?;
        let bucket_size = read_word(reader).map_err(FilterError::HeaderIo)?;
        let fingerprint_bits = read_word(reader).map_err(FilterError::HeaderIo)?;
        let max_kicks = read_word(reader).map_err(FilterError::HeaderIo)?;
        check_fingerprint_width(fingerprint_bits)?;

        let mut table = vec![0; bucket_count * bucket_size];
        let mut chains: Vec<ChainLink> = (0..bucket_count).map(|_| None).collect();

        let mut chain_buf = Vec::new();
        for bucket in 0..bucket_count {
            let base = bucket * bucket_size;
            reader
                .read_exact(&mut table[base..base + bucket_size])
                .map_err(FilterError::PayloadIo)?;

            let chain_len = read_word(reader).map_err(FilterError::PayloadIo)?;
            chain_buf.clear();
            chain_buf.resize(chain_len, 0);
            reader
                .read_exact(&mut chain_buf)
                .map_err(FilterError::PayloadIo)?;

            // Rebuild back-to-front so the first stored byte ends up at the
            // head of the chain.
            let mut head = None;
            for &fingerprint in chain_buf.iter().rev() {
                head = Some(Box::new(OverflowNode { fingerprint, next: head }));
            }
            chains[bucket] = head;
        }

        Ok(Self {
            bucket_count,
            bucket_size,
            fingerprint_bits,
            max_kicks,
            table,
            chains,
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

    /// Unlink and free the first chain node holding `fingerprint`, returning
    /// whether one was found.
    fn unlink_fingerprint(chain: &mut ChainLink, fingerprint: u8) -> bool {
        let mut cursor = chain;
        while matches!(cursor.as_deref(), Some(node) if node.fingerprint != fingerprint) {
            #[expect(clippy::unwrap_used, reason = "the loop guard checked the link is occupied")]
            {
                cursor = &mut cursor.as_mut().unwrap().next;
            }
        }

        match cursor.take() {
            Some(node) => {
                *cursor = node.next;
                true
            }
            None => false,
        }
    }
}

impl Drop for CuckooMap {
    /// Release every overflow chain iteratively.
    ///
    /// The default recursive drop of a box chain would recurse once per node,
    /// which can overflow the stack on a heavily spilled bucket.
    fn drop(&mut self) {
        for head in &mut self.chains {
            let mut node = head.take();
            while let Some(mut current) = node {
                node = current.next.take();
            }
        }
    }
}
