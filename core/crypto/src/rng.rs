//! Operating system randomness.

use rand::rngs::OsRng;
use rand::RngCore;

use cairn_common::{Error, Result};

/// Fill `buf` with bytes from the OS random source.
///
/// A failing source is reported as [`Error::RandomSource`]; callers abort the
/// operation instead of falling back to weaker randomness.
pub(crate) fn fill(buf: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| Error::RandomSource(e.to_string()))
}
