//! Round claims: the identity of one consensus round at one height.

use granite_types::constants::DEAD_BLOCK_ROUND;
use granite_types::{ConsensusError, Hash};
use sbor::prelude::BasicSbor;
use serde::{Deserialize, Serialize};

use crate::codec;

/// Identifies "the certified tip as of this round": which chain, which
/// height, which round, and the hash of the block everything at this height
/// builds on.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor, Serialize, Deserialize)]
pub struct RClaims {
    /// Chain identifier; never zero.
    pub chain_id: u32,
    /// Block height; never zero.
    pub height: u32,
    /// Round within the height, in `1..=DEAD_BLOCK_ROUND`.
    pub round: u32,
    /// Hash of the previous block.
    pub prev_block: Hash,
}

impl RClaims {
    /// Reject degenerate claims before any business rule runs.
    pub fn validate(&self) -> granite_types::Result<()> {
        if self.chain_id == 0 {
            return Err(ConsensusError::invalid("rclaims: chain id is zero"));
        }
        if self.height == 0 {
            return Err(ConsensusError::invalid("rclaims: height is zero"));
        }
        if self.round == 0 {
            return Err(ConsensusError::invalid("rclaims: round is zero"));
        }
        if self.round > DEAD_BLOCK_ROUND {
            return Err(ConsensusError::invalid(
                "rclaims: round exceeds dead block round",
            ));
        }
        Ok(())
    }

    /// Canonical encoding; fails on degenerate claims.
    pub fn marshal_binary(&self) -> granite_types::Result<Vec<u8>> {
        self.validate()?;
        codec::to_canonical(self)
    }

    /// Decode and validate a canonical encoding.
    pub fn unmarshal_binary(data: &[u8]) -> granite_types::Result<Self> {
        let claims: RClaims = codec::from_canonical(data)?;
        claims.validate()?;
        Ok(claims)
    }
}
