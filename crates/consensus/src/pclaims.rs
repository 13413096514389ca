//! Proposal claims: a block's content chained to the round it is proposed in.

use granite_types::{ConsensusError};
use sbor::prelude::BasicSbor;
use serde::{Deserialize, Serialize};

use crate::bclaims::BClaims;
use crate::codec;
use crate::rcert::RCert;

/// A block's claims joined to the round certificate it extends. The two
/// halves must agree on chain, height and previous block; a proposal whose
/// content contradicts its own round certificate is meaningless.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor, Serialize, Deserialize)]
pub struct PClaims {
    /// The proposed block's content claims.
    pub bclaims: BClaims,
    /// The certificate for the round the block is proposed in.
    pub rcert: RCert,
}

impl PClaims {
    /// Validate both halves and the chaining between them.
    pub fn validate(&self) -> granite_types::Result<()> {
        self.bclaims.validate()?;
        self.rcert.validate()?;
        let rclaims = &self.rcert.rclaims;
        if self.bclaims.chain_id != rclaims.chain_id {
            return Err(ConsensusError::invalid("pclaims: chain id mismatch"));
        }
        if self.bclaims.height != rclaims.height {
            return Err(ConsensusError::invalid("pclaims: height mismatch"));
        }
        if self.bclaims.prev_block != rclaims.prev_block {
            return Err(ConsensusError::invalid("pclaims: prev block mismatch"));
        }
        Ok(())
    }

    /// Canonical encoding; this is the per-validator signing payload for
    /// proposals.
    pub fn marshal_binary(&self) -> granite_types::Result<Vec<u8>> {
        self.validate()?;
        codec::to_canonical(self)
    }

    /// Decode and validate a canonical encoding.
    pub fn unmarshal_binary(data: &[u8]) -> granite_types::Result<Self> {
        let claims: PClaims = codec::from_canonical(data)?;
        claims.validate()?;
        Ok(claims)
    }
}
