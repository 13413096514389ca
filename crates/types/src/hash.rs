//! 32-byte hash primitive used for block hashes, tx roots and trie keys.

use sbor::prelude::BasicSbor;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

/// Error parsing a hash from its hex representation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HexError {
    /// The input was not valid hex.
    #[error("invalid hex string")]
    InvalidHex,
    /// The decoded bytes were not exactly 32 bytes long.
    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Expected byte length.
        expected: usize,
        /// Actual byte length.
        actual: usize,
    },
}

/// A 32-byte Keccak-256 hash.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BasicSbor, Serialize, Deserialize,
)]
pub struct Hash([u8; 32]);

impl Hash {
    /// Length of a hash in bytes.
    pub const LEN: usize = 32;

    /// The all-zero hash (empty subtree marker, placeholder values).
    pub const ZERO: Hash = Hash([0u8; 32]);

    /// Wrap raw bytes as a hash.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Hash(bytes)
    }

    /// Keccak-256 digest of arbitrary input.
    pub fn digest(data: &[u8]) -> Self {
        let mut hasher = Keccak256::new();
        hasher.update(data);
        let out = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&out);
        Hash(bytes)
    }

    /// Parse a hash from a byte slice; fails unless it is exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HexError> {
        if bytes.len() != Self::LEN {
            return Err(HexError::InvalidLength {
                expected: Self::LEN,
                actual: bytes.len(),
            });
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(bytes);
        Ok(Hash(out))
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Consume into raw bytes.
    pub fn into_bytes(self) -> [u8; 32] {
        self.0
    }

    /// True for the all-zero hash.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Extract bit `index` (0 = most significant bit of byte 0).
    /// Used by the sparse Merkle trie to walk key paths.
    pub(crate) fn bit(&self, index: usize) -> bool {
        debug_assert!(index < 256);
        let byte = self.0[index / 8];
        byte & (0x80 >> (index % 8)) != 0
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Hash(bytes)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({}..)", hex::encode(&self.0[..4]))
    }
}

impl FromStr for Hash {
    type Err = HexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(|_| HexError::InvalidHex)?;
        Hash::from_slice(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        let a = Hash::digest(b"hello");
        let b = Hash::digest(b"hello");
        assert_eq!(a, b);
        assert_ne!(a, Hash::digest(b"world"));
    }

    #[test]
    fn hex_round_trip() {
        let h = Hash::digest(b"round trip");
        let s = h.to_string();
        assert_eq!(s.parse::<Hash>().unwrap(), h);
        assert_eq!(format!("0x{s}").parse::<Hash>().unwrap(), h);
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        assert!(matches!(
            Hash::from_slice(&[0u8; 31]),
            Err(HexError::InvalidLength {
                expected: 32,
                actual: 31
            })
        ));
    }

    #[test]
    fn bit_walks_msb_first() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0b1000_0001;
        let h = Hash::new(bytes);
        assert!(h.bit(0));
        assert!(!h.bit(1));
        assert!(h.bit(7));
        assert!(!h.bit(8));
    }
}
