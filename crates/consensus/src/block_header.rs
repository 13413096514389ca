//! The finalized block header: the externally-verifiable unit.

use granite_types::constants::GROUP_SIGNATURE_LEN;
use granite_types::{make_tx_root, BnGroupValidator, ConsensusError, Hash};
use sbor::prelude::BasicSbor;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::rcert::RCert;
use crate::rclaims::RClaims;
use crate::bclaims::BClaims;

/// A finalized block header: block claims plus the aggregated group
/// signature over the block hash. Anyone holding the group public key can
/// verify finality without replaying the round.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor, Serialize, Deserialize)]
pub struct BlockHeader {
    /// The finalized block's content claims.
    pub bclaims: BClaims,
    /// Aggregated group signature over the block hash.
    pub sig_group: Vec<u8>,
    /// Hashes of every transaction in the block.
    pub tx_hsh_lst: Vec<Hash>,
}

impl BlockHeader {
    /// Structural validation: claims, tx-root reproduction, and signature
    /// presence past the genesis block.
    pub fn validate(&self) -> granite_types::Result<()> {
        self.bclaims.validate()?;
        if self.bclaims.height > 1 && self.sig_group.len() != GROUP_SIGNATURE_LEN {
            return Err(ConsensusError::invalid(
                "block header: missing group signature",
            ));
        }
        if make_tx_root(&self.tx_hsh_lst) != self.bclaims.tx_root {
            return Err(ConsensusError::invalid(
                "block header: tx hash list does not reproduce tx root",
            ));
        }
        Ok(())
    }

    /// Canonical encoding.
    pub fn marshal_binary(&self) -> granite_types::Result<Vec<u8>> {
        self.validate()?;
        codec::to_canonical(self)
    }

    /// Decode and validate a canonical encoding.
    pub fn unmarshal_binary(data: &[u8]) -> granite_types::Result<Self> {
        let header: BlockHeader = codec::from_canonical(data)?;
        header.validate()?;
        Ok(header)
    }

    /// The header's block hash.
    pub fn block_hash(&self) -> granite_types::Result<Hash> {
        self.bclaims.block_hash()
    }

    /// Validate the group signature over the block hash and return the
    /// group public key. The genesis block predates the group and reports
    /// an empty key.
    pub fn validate_signatures(&self, bn: &BnGroupValidator) -> granite_types::Result<Vec<u8>> {
        self.validate()?;
        if self.bclaims.height == 1 {
            return Ok(Vec::new());
        }
        let block_hash = self.block_hash()?;
        Ok(bn.validate(block_hash.as_bytes(), &self.sig_group)?)
    }

    /// Derive the round certificate this header seeds for the next height:
    /// round 1 building on this block, certified by the same group
    /// signature.
    pub fn get_rcert(&self) -> granite_types::Result<RCert> {
        let block_hash = self.block_hash()?;
        Ok(RCert {
            rclaims: RClaims {
                chain_id: self.bclaims.chain_id,
                height: self.bclaims.height + 1,
                round: 1,
                prev_block: block_hash,
            },
            sig_group: self.sig_group.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::next_height::NextHeightList;
    use crate::precommit::PreCommitList;
    use crate::prevote::PreVoteList;
    use crate::test_support::{pre_vote_quorum, signed_proposal, validators};

    fn finalized_header(ctx: &crate::test_support::Ctx, height: u32) -> BlockHeader {
        let proposal = signed_proposal(ctx, height, 1);
        let pre_commits: Vec<_> = (0..3)
            .map(|i| {
                PreVoteList(pre_vote_quorum(ctx, &proposal))
                    .make_pre_commit(&ctx.secp[i])
                    .unwrap()
            })
            .collect();
        let next_heights: Vec<_> = (0..3)
            .map(|i| {
                PreCommitList(pre_commits.clone())
                    .make_next_height(&ctx.secp[i], &ctx.group[i])
                    .unwrap()
            })
            .collect();
        NextHeightList(next_heights)
            .make_block_header(&ctx.group[0], &ctx.shares)
            .unwrap()
    }

    #[test]
    fn round_trip() {
        let ctx = validators(4, 60);
        let header = finalized_header(&ctx, 2);
        let bytes = header.marshal_binary().unwrap();
        assert_eq!(BlockHeader::unmarshal_binary(&bytes).unwrap(), header);
    }

    #[test]
    fn validates_against_group_key() {
        let ctx = validators(4, 61);
        let header = finalized_header(&ctx, 2);
        assert_eq!(
            header.validate_signatures(&BnGroupValidator).unwrap(),
            ctx.group_pubk
        );
    }

    #[test]
    fn seeded_rcert_builds_on_this_block() {
        let ctx = validators(4, 62);
        let header = finalized_header(&ctx, 2);
        let rcert = header.get_rcert().unwrap();
        assert_eq!(rcert.rclaims.height, 3);
        assert_eq!(rcert.rclaims.round, 1);
        assert_eq!(rcert.rclaims.prev_block, header.block_hash().unwrap());
        // The header's group signature carries over and certifies round 1
        // of the next height via the prev-block path.
        assert_eq!(
            rcert.validate_signature(&BnGroupValidator).unwrap(),
            ctx.group_pubk
        );
    }

    #[test]
    fn tampered_header_fails() {
        let ctx = validators(4, 63);
        let mut header = finalized_header(&ctx, 2);
        header.bclaims.state_root = Hash::digest(b"forged state");
        assert!(header.validate_signatures(&BnGroupValidator).is_err());
    }
}
