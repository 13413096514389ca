//! The three-kind error model for the consensus core.
//!
//! `Invalid` is fatal to the message and never retried. `Stale` is the
//! expected outcome of gossip duplication and reordering; callers treat it
//! as a no-op. `Corrupt` means persisted state failed structural reparse and
//! the enclosing storage transaction should abort. Equivocation is *not* an
//! error: the state machine reports it as `Ok(false)` plus recorded
//! evidence.

use thiserror::Error;

/// Result alias for consensus-core operations.
pub type Result<T> = std::result::Result<T, ConsensusError>;

/// Error raised by object validation, signing and state tracking.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusError {
    /// Malformed input: missing or zero required field, round out of
    /// bounds, mismatched chained claims, bad signature.
    #[error("invalid: {0}")]
    Invalid(String),

    /// Message is behind tracked progress or duplicates an already-set
    /// field. Expected under gossip; treated as a no-op by callers.
    #[error("stale: {0}")]
    Stale(String),

    /// Persisted bytes cannot be parsed back into their structured form.
    #[error("corrupt: {0}")]
    Corrupt(String),
}

impl ConsensusError {
    /// Build an `Invalid` error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        ConsensusError::Invalid(msg.into())
    }

    /// Build a `Stale` error.
    pub fn stale(msg: impl Into<String>) -> Self {
        ConsensusError::Stale(msg.into())
    }

    /// Build a `Corrupt` error.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        ConsensusError::Corrupt(msg.into())
    }

    /// True if this is the `Invalid` kind.
    pub fn is_invalid(&self) -> bool {
        matches!(self, ConsensusError::Invalid(_))
    }

    /// True if this is the `Stale` kind.
    pub fn is_stale(&self) -> bool {
        matches!(self, ConsensusError::Stale(_))
    }

    /// True if this is the `Corrupt` kind.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, ConsensusError::Corrupt(_))
    }
}

impl From<crate::crypto::CryptoError> for ConsensusError {
    fn from(e: crate::crypto::CryptoError) -> Self {
        ConsensusError::Invalid(e.to_string())
    }
}
