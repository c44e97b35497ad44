use std::io::Error as IoError;

use thiserror::Error;


/// The errors surfaced by filter constructors and persistence.
///
/// A failed `save` leaves the filter unchanged and reusable; a failed `load`
/// produces no filter at all, and any partially-read state is discarded.
/// Insertion pressure is never an error: a saturated [`CuckooFilter`] reports
/// rejection through `insert`'s `bool` return, and [`CuckooMap::insert`]
/// always succeeds.
///
/// [`CuckooFilter`]: crate::CuckooFilter
/// [`CuckooMap::insert`]: crate::CuckooMap::insert
#[derive(Error, Debug)]
pub enum FilterError {
    /// A cuckoo structure was configured or loaded with a fingerprint width
    /// outside `1..=8` bits.
    ///
    /// Fingerprints are stored one per byte, and zero is reserved as the
    /// empty-slot sentinel, so at least one bit and at most eight are usable.
    #[error("fingerprint width must be in 1..=8 bits, got {0}")]
    InvalidFingerprintWidth(usize),

    /// A size/count word of the header could not be fully read or written.
    ///
    /// On load, this usually means the stream is truncated or was produced by
    /// a build with a different native word size.
    #[error("failed to read or write a filter header: {0}")]
    HeaderIo(#[source] IoError),

    /// The bit blocks, bucket contents, or overflow chains following the
    /// header could not be fully read or written.
    #[error("failed to read or write a filter payload: {0}")]
    PayloadIo(#[source] IoError),
}
