//! Approximate set-membership filters intended to back negative lookups in a
//! storage engine (one filter per table file, consulted before touching disk).
//!
//! Three structures are provided:
//!
//! * [`BloomFilter`] — a bit-array filter with a tunable probe count. Compact,
//!   no deletion.
//! * [`CuckooFilter`] — a two-bucket table of one-byte fingerprints with
//!   bounded random-walk eviction. Supports deletion; rejects insertion once
//!   eviction is exhausted.
//! * [`CuckooMap`] — a cuckoo table that never rejects an insertion: when
//!   eviction is exhausted, the displaced fingerprint is spilled into a
//!   per-bucket overflow chain.
//!
//! All three accept keys as borrowed byte slices, never retain key bytes, and
//! round-trip through caller-supplied [`Read`]/[`Write`] handles. A `contains`
//! returning `false` is definitive; `true` may be a false positive.
//!
//! None of the structures are internally synchronized; wrap a filter in a lock
//! if it must be shared across threads.
//!
//! [`Read`]: std::io::Read
//! [`Write`]: std::io::Write

mod internal_utils;

mod hashing;
mod error;

mod bloom;
mod cuckoo;


pub use self::{
    bloom::BloomFilter,
    cuckoo::{CuckooFilter, CuckooMap},
    error::FilterError,
};
