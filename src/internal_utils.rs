use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher as _, Hasher as _};
use std::io::{Error as IoError, Read, Write};
use std::mem::size_of;


/// Width of one persisted size/count field. Every such field is written as one
/// native word, little-endian; the on-disk format is only portable between
/// builds with the same word size.
pub(crate) const WORD_BYTES: usize = size_of::<usize>();


/// Write one native-width word, little-endian.
pub(crate) fn write_word<W: Write>(writer: &mut W, word: usize) -> Result<(), IoError> {
    writer.write_all(&word.to_le_bytes())
}

/// Read one native-width word, little-endian.
///
/// A short read surfaces as [`std::io::ErrorKind::UnexpectedEof`].
pub(crate) fn read_word<R: Read>(reader: &mut R) -> Result<usize, IoError> {
    let mut raw = [0_u8; WORD_BYTES];
    reader.read_exact(&mut raw)?;
    Ok(usize::from_le_bytes(raw))
}

pub(crate) fn read_byte<R: Read>(reader: &mut R) -> Result<u8, IoError> {
    let mut raw = [0_u8; 1];
    reader.read_exact(&mut raw)?;
    Ok(raw[0])
}

/// Produce a seed for a filter's internal PRNG from ambient process entropy.
///
/// Each call yields a fresh value; two filters constructed back-to-back get
/// distinct eviction behavior. Determinism is available through the
/// `new_seeded` constructors instead.
pub(crate) fn entropy_seed() -> u64 {
    RandomState::new().build_hasher().finish()
}
