//! Block claims: the content identity of one block.

use granite_types::{ConsensusError, Hash};
use sbor::prelude::BasicSbor;
use serde::{Deserialize, Serialize};

use crate::codec;

/// The claims a block makes about its own content. `block_hash` of these
/// claims is the block's content identifier; every vote and certificate at
/// this height ultimately commits to it.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor, Serialize, Deserialize)]
pub struct BClaims {
    /// Chain identifier; never zero.
    pub chain_id: u32,
    /// Block height; never zero.
    pub height: u32,
    /// Number of transactions in the block.
    pub tx_count: u32,
    /// Hash of the previous block.
    pub prev_block: Hash,
    /// Sparse Merkle root over the block's transaction hash set.
    pub tx_root: Hash,
    /// State trie root after applying this block.
    pub state_root: Hash,
    /// Root over the canonical header chain.
    pub header_root: Hash,
}

impl BClaims {
    /// Reject degenerate claims. Zero chain id / height are used as
    /// sentinels elsewhere, so they must never hash or serialize.
    pub fn validate(&self) -> granite_types::Result<()> {
        if self.chain_id == 0 {
            return Err(ConsensusError::invalid("bclaims: chain id is zero"));
        }
        if self.height == 0 {
            return Err(ConsensusError::invalid("bclaims: height is zero"));
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
        let claims: BClaims = codec::from_canonical(data)?;
        claims.validate()?;
        Ok(claims)
    }

    /// The block's content identifier: the digest of the canonical
    /// encoding. Pure and deterministic.
    pub fn block_hash(&self) -> granite_types::Result<Hash> {
        Ok(Hash::digest(&self.marshal_binary()?))
    }
}
