//! NextHeight: evidence that a validator is ready to finalize this height.

use granite_types::constants::{GROUP_SIGNATURE_LEN, SECP_SIGNATURE_LEN};
use granite_types::signing::{next_height_message, pre_commit_message};
use granite_types::{
    get_account, BnGroupSigner, BnGroupValidator, ConsensusError, Secp256k1Validator,
};
use sbor::prelude::BasicSbor;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::block_header::BlockHeader;
use crate::codec;
use crate::proposal::Proposal;

/// The claims behind a height advance: the committed proposal plus this
/// validator's group-signature share over its block hash. Enough shares
/// aggregate into the finalized block header's group signature.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor, Serialize, Deserialize)]
pub struct NHClaims {
    /// The proposal whose block is being finalized.
    pub proposal: Proposal,
    /// This validator's group-signature share over the block hash.
    pub sig_share: Vec<u8>,
}

impl NHClaims {
    /// Structural validation.
    pub fn validate(&self) -> granite_types::Result<()> {
        self.proposal.validate()?;
        if self.sig_share.len() != GROUP_SIGNATURE_LEN {
            return Err(ConsensusError::invalid("nhclaims: missing sig share"));
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
        let claims: NHClaims = codec::from_canonical(data)?;
        claims.validate()?;
        Ok(claims)
    }

    /// Validate the share over the block hash; returns the share public key
    /// that produced it.
    pub fn validate_signatures(&self, bn: &BnGroupValidator) -> granite_types::Result<Vec<u8>> {
        self.validate()?;
        let block_hash = self.proposal.pclaims.bclaims.block_hash()?;
        Ok(bn.validate(block_hash.as_bytes(), &self.sig_share)?)
    }
}

/// A signed height-advance message carrying precommit quorum evidence.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor, Serialize, Deserialize)]
pub struct NextHeight {
    /// The advance claims.
    pub nhclaims: NHClaims,
    /// Validator's recoverable signature over the tagged claims.
    pub signature: Vec<u8>,
    /// PreCommit signatures justifying the advance.
    pub pre_commits: Vec<Vec<u8>>,
}

impl NextHeight {
    /// Structural validation.
    pub fn validate(&self) -> granite_types::Result<()> {
        self.nhclaims.validate()?;
        if self.signature.len() != SECP_SIGNATURE_LEN {
            return Err(ConsensusError::invalid("next height: missing signature"));
        }
        if self.pre_commits.is_empty() {
            return Err(ConsensusError::invalid(
                "next height: no precommit evidence",
            ));
        }
        if self
            .pre_commits
            .iter()
            .any(|sig| sig.len() != SECP_SIGNATURE_LEN)
        {
            return Err(ConsensusError::invalid(
                "next height: malformed precommit evidence",
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
        let nh: NextHeight = codec::from_canonical(data)?;
        nh.validate()?;
        Ok(nh)
    }

    /// Validate the wrapped proposal, the share over its block hash, the
    /// validator signature and every piece of precommit evidence; returns
    /// the validator's account address.
    pub fn validate_signatures(
        &self,
        secp: &Secp256k1Validator,
        bn: &BnGroupValidator,
    ) -> granite_types::Result<Vec<u8>> {
        self.validate()?;
        self.nhclaims.proposal.validate_signatures(secp, bn)?;
        self.nhclaims.validate_signatures(bn)?;
        let proposal_canonical = self.nhclaims.proposal.marshal_binary()?;
        let commit_payload = pre_commit_message(&proposal_canonical);
        for sig in &self.pre_commits {
            secp.validate(&commit_payload, sig)?;
        }
        let canonical = self.nhclaims.marshal_binary()?;
        let pubkey = secp.validate(&next_height_message(&canonical), &self.signature)?;
        Ok(get_account(&pubkey)?)
    }

    /// Recover the account addresses behind the precommit evidence.
    pub fn pre_commit_accounts(&self, secp: &Secp256k1Validator) -> granite_types::Result<Vec<Vec<u8>>> {
        let proposal_canonical = self.nhclaims.proposal.marshal_binary()?;
        let commit_payload = pre_commit_message(&proposal_canonical);
        let mut accounts = Vec::with_capacity(self.pre_commits.len());
        for sig in &self.pre_commits {
            let pubkey = secp.validate(&commit_payload, sig)?;
            accounts.push(get_account(&pubkey)?);
        }
        Ok(accounts)
    }
}

/// A quorum of height-advance messages for the same block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NextHeightList(pub Vec<NextHeight>);

impl NextHeightList {
    /// Aggregate the quorum's shares into the finalized block header.
    pub fn make_block_header(
        &self,
        group_signer: &BnGroupSigner,
        group_shares: &[Vec<u8>],
    ) -> granite_types::Result<BlockHeader> {
        let first = self
            .0
            .first()
            .ok_or_else(|| ConsensusError::invalid("next height list: empty"))?;
        let proposal = Proposal::unmarshal_binary(&first.nhclaims.proposal.marshal_binary()?)?;
        let shares: Vec<Vec<u8>> = self
            .0
            .iter()
            .map(|nh| nh.nhclaims.sig_share.clone())
            .collect();
        let sig_group = group_signer.aggregate(&shares, group_shares)?;
        debug!(
            height = proposal.pclaims.bclaims.height,
            shares = shares.len(),
            "aggregated height advance quorum into block header"
        );
        Ok(BlockHeader {
            bclaims: proposal.pclaims.bclaims,
            sig_group,
            tx_hsh_lst: proposal.tx_hsh_lst,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precommit::PreCommitList;
    use crate::prevote::PreVoteList;
    use crate::test_support::{pre_vote_quorum, signed_proposal, validators};

    fn quorum_next_heights(
        ctx: &crate::test_support::Ctx,
        proposal: &Proposal,
        quorum: usize,
    ) -> Vec<NextHeight> {
        let pre_commits: Vec<_> = (0..quorum)
            .map(|i| {
                PreVoteList(pre_vote_quorum(ctx, proposal))
                    .make_pre_commit(&ctx.secp[i])
                    .unwrap()
            })
            .collect();
        (0..quorum)
            .map(|i| {
                PreCommitList(pre_commits.clone())
                    .make_next_height(&ctx.secp[i], &ctx.group[i])
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn round_trip_and_attribution() {
        let ctx = validators(4, 50);
        let proposal = signed_proposal(&ctx, 2, 1);
        let nh = quorum_next_heights(&ctx, &proposal, 3).remove(1);

        let bytes = nh.marshal_binary().unwrap();
        assert_eq!(NextHeight::unmarshal_binary(&bytes).unwrap(), nh);

        let account = nh
            .validate_signatures(&Secp256k1Validator, &BnGroupValidator)
            .unwrap();
        assert_eq!(account, ctx.accounts[1]);
        assert_eq!(
            nh.pre_commit_accounts(&Secp256k1Validator).unwrap(),
            ctx.accounts[..3].to_vec()
        );
    }

    #[test]
    fn share_covers_the_block_hash() {
        let ctx = validators(4, 51);
        let proposal = signed_proposal(&ctx, 2, 1);
        let nh = quorum_next_heights(&ctx, &proposal, 3).remove(0);
        let share_key = nh.nhclaims.validate_signatures(&BnGroupValidator).unwrap();
        assert_eq!(share_key, ctx.shares[0]);

        // A share produced for different block content must not validate.
        let other = signed_proposal(&ctx, 3, 1);
        let forged = NHClaims {
            proposal: other,
            sig_share: nh.nhclaims.sig_share.clone(),
        };
        assert!(forged.validate_signatures(&BnGroupValidator).is_err());
    }

    #[test]
    fn quorum_aggregates_into_block_header() {
        let ctx = validators(4, 52);
        let proposal = signed_proposal(&ctx, 2, 1);
        let nhs = quorum_next_heights(&ctx, &proposal, 3);

        let header = NextHeightList(nhs)
            .make_block_header(&ctx.group[0], &ctx.shares)
            .unwrap();
        assert_eq!(header.bclaims, proposal.pclaims.bclaims);
        let key = header.validate_signatures(&BnGroupValidator).unwrap();
        assert_eq!(key, ctx.group_pubk);
    }
}
