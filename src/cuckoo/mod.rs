//! Cuckoo-hashed fingerprint tables.
//!
//! Both structures here store one-byte fingerprints in a flat
//! `bucket_count * bucket_size` table and resolve collisions by bounded
//! random-walk eviction. They differ only in what happens when eviction is
//! exhausted: [`CuckooFilter`] rejects the insertion, while [`CuckooMap`]
//! spills the displaced fingerprint into a per-bucket overflow chain and
//! never fails.

mod filter;
mod map;


pub use self::{filter::CuckooFilter, map::CuckooMap};

use crate::error::FilterError;
use crate::hashing::digest;


const MIN_FINGERPRINT_BITS: usize = 1;
const MAX_FINGERPRINT_BITS: usize = 8;


pub(crate) fn check_fingerprint_width(fingerprint_bits: usize) -> Result<(), FilterError> {
    if (MIN_FINGERPRINT_BITS..=MAX_FINGERPRINT_BITS).contains(&fingerprint_bits) {
        Ok(())
    } else {
        Err(FilterError::InvalidFingerprintWidth(fingerprint_bits))
    }
}

/// The low `fingerprint_bits` bits of a key's digest, remapped so that the
/// result is never the empty-slot sentinel 0.
///
/// Requires `fingerprint_bits` in `1..=8`.
pub(crate) fn fingerprint_of(key_digest: u64, fingerprint_bits: usize) -> u8 {
    let mask = (1_u64 << fingerprint_bits) - 1;
    let fingerprint = (key_digest & mask) as u8;
    if fingerprint == 0 { 1 } else { fingerprint }
}

/// A key's primary bucket.
pub(crate) fn index1(key_digest: u64, bucket_count: usize) -> usize {
    (key_digest % bucket_count as u64) as usize
}

/// The alternate bucket for a fingerprint currently homed at `index`.
///
/// The XOR happens before the final modulo, so for bucket counts that are not
/// powers of two this is *not* an involution: `index2(index2(i, fp), fp)` may
/// differ from `i`. Nothing here relies on invertibility — lookups and erases
/// always recompute both candidate buckets from the key at hand.
pub(crate) fn index2(index: usize, fingerprint: u8, bucket_count: usize) -> usize {
    let offset = (digest(&[fingerprint]) % bucket_count as u64) as usize;
    (index ^ offset) % bucket_count
}
