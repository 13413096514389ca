//! PreCommits: the second voting phase, justified by a prevote quorum.

use granite_types::constants::SECP_SIGNATURE_LEN;
use granite_types::signing::{
    next_height_message, pre_commit_message, pre_commit_nil_message, pre_vote_message,
};
use granite_types::{
    get_account, BnGroupSigner, BnGroupValidator, ConsensusError, Secp256k1Signer,
    Secp256k1Validator,
};
use sbor::prelude::BasicSbor;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec;
use crate::next_height::{NHClaims, NextHeight};
use crate::proposal::Proposal;
use crate::rcert::RCert;

/// A commitment to a proposal, carrying the prevote signatures that justify
/// it. The evidence list lets any observer re-check that a quorum stood
/// behind the commitment.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor, Serialize, Deserialize)]
pub struct PreCommit {
    /// The proposal being committed to.
    pub proposal: Proposal,
    /// Committer's recoverable signature over the tagged proposal encoding.
    pub signature: Vec<u8>,
    /// PreVote signatures justifying this commitment.
    pub pre_votes: Vec<Vec<u8>>,
}

impl PreCommit {
    /// Structural validation.
    pub fn validate(&self) -> granite_types::Result<()> {
        self.proposal.validate()?;
        if self.signature.len() != SECP_SIGNATURE_LEN {
            return Err(ConsensusError::invalid("precommit: missing signature"));
        }
        if self.pre_votes.is_empty() {
            return Err(ConsensusError::invalid("precommit: no prevote evidence"));
        }
        if self
            .pre_votes
            .iter()
            .any(|sig| sig.len() != SECP_SIGNATURE_LEN)
        {
            return Err(ConsensusError::invalid(
                "precommit: malformed prevote evidence",
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
        let pc: PreCommit = codec::from_canonical(data)?;
        pc.validate()?;
        Ok(pc)
    }

    /// Validate the wrapped proposal, the committer signature and every
    /// piece of prevote evidence; returns the committer's account address.
    pub fn validate_signatures(
        &self,
        secp: &Secp256k1Validator,
        bn: &BnGroupValidator,
    ) -> granite_types::Result<Vec<u8>> {
        self.validate()?;
        self.proposal.validate_signatures(secp, bn)?;
        let canonical = self.proposal.marshal_binary()?;
        let vote_payload = pre_vote_message(&canonical);
        for sig in &self.pre_votes {
            secp.validate(&vote_payload, sig)?;
        }
        let pubkey = secp.validate(&pre_commit_message(&canonical), &self.signature)?;
        Ok(get_account(&pubkey)?)
    }

    /// Recover the account addresses behind the prevote evidence, for
    /// distinctness and quorum checks by the caller.
    pub fn pre_vote_accounts(&self, secp: &Secp256k1Validator) -> granite_types::Result<Vec<Vec<u8>>> {
        let canonical = self.proposal.marshal_binary()?;
        let vote_payload = pre_vote_message(&canonical);
        let mut accounts = Vec::with_capacity(self.pre_votes.len());
        for sig in &self.pre_votes {
            let pubkey = secp.validate(&vote_payload, sig)?;
            accounts.push(get_account(&pubkey)?);
        }
        Ok(accounts)
    }
}

/// A commitment that no proposal could be committed this round.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor, Serialize, Deserialize)]
pub struct PreCommitNil {
    /// The round being nil-committed.
    pub rcert: RCert,
    /// Committer's recoverable signature over the tagged certificate
    /// encoding.
    pub signature: Vec<u8>,
}

impl PreCommitNil {
    /// Structural validation.
    pub fn validate(&self) -> granite_types::Result<()> {
        self.rcert.validate()?;
        if self.signature.len() != SECP_SIGNATURE_LEN {
            return Err(ConsensusError::invalid("precommit nil: missing signature"));
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
        let pcn: PreCommitNil = codec::from_canonical(data)?;
        pcn.validate()?;
        Ok(pcn)
    }

    /// Validate the certificate's group signature and the vote signature;
    /// returns the voter's account address.
    pub fn validate_signatures(
        &self,
        secp: &Secp256k1Validator,
        bn: &BnGroupValidator,
    ) -> granite_types::Result<Vec<u8>> {
        self.validate()?;
        self.rcert.validate_signature(bn)?;
        let canonical = self.rcert.marshal_binary()?;
        let pubkey = secp.validate(&pre_commit_nil_message(&canonical), &self.signature)?;
        Ok(get_account(&pubkey)?)
    }
}

/// A quorum of precommits for the same proposal, ready to fold into
/// height-advance evidence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreCommitList(pub Vec<PreCommit>);

impl PreCommitList {
    /// Fold the precommit quorum into this validator's NextHeight.
    ///
    /// Produces the group-signature share over the committed block's hash
    /// and carries the precommit signatures as quorum evidence. The shared
    /// proposal is re-derived through a canonical round-trip.
    pub fn make_next_height(
        &self,
        signer: &Secp256k1Signer,
        group_signer: &BnGroupSigner,
    ) -> granite_types::Result<NextHeight> {
        let first = self
            .0
            .first()
            .ok_or_else(|| ConsensusError::invalid("precommit list: empty"))?;
        let proposal = Proposal::unmarshal_binary(&first.proposal.marshal_binary()?)?;
        let block_hash = proposal.pclaims.bclaims.block_hash()?;
        let sig_share = group_signer.sign(block_hash.as_bytes())?;
        let pre_commits: Vec<Vec<u8>> = self.0.iter().map(|pc| pc.signature.clone()).collect();

        let nhclaims = NHClaims {
            proposal,
            sig_share,
        };
        let canonical = nhclaims.marshal_binary()?;
        let signature = signer.sign(&next_height_message(&canonical))?;
        debug!(
            height = nhclaims.proposal.pclaims.rcert.rclaims.height,
            commits = pre_commits.len(),
            "folded precommit quorum into next height evidence"
        );
        Ok(NextHeight {
            nhclaims,
            signature,
            pre_commits,
        })
    }
}
