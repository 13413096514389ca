//! Canonical SBOR encoding helpers.
//!
//! Identical logical values always serialize identically, so hashes and
//! signatures are computed over these bytes.

use granite_types::{ConsensusError, Result};
use sbor::{BasicDecode, BasicEncode};

/// Canonically encode a value.
pub(crate) fn to_canonical<T: BasicEncode>(value: &T) -> Result<Vec<u8>> {
    sbor::basic_encode(value)
        .map_err(|e| ConsensusError::invalid(format!("canonical encode failed: {e:?}")))
}

/// Decode a value from its canonical encoding. Structural validation is the
/// caller's responsibility.
pub(crate) fn from_canonical<T: BasicDecode>(data: &[u8]) -> Result<T> {
    sbor::basic_decode(data)
        .map_err(|e| ConsensusError::invalid(format!("canonical decode failed: {e:?}")))
}
