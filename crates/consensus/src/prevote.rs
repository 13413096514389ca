//! PreVotes: the first voting phase of a round.

use granite_types::constants::SECP_SIGNATURE_LEN;
use granite_types::signing::{pre_commit_message, pre_vote_message, pre_vote_nil_message};
use granite_types::{
    get_account, BnGroupValidator, ConsensusError, Secp256k1Signer, Secp256k1Validator,
};
use sbor::prelude::BasicSbor;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec;
use crate::precommit::PreCommit;
use crate::proposal::Proposal;
use crate::rcert::RCert;

/// A vote for a specific proposal. Carries the full proposal so the vote is
/// self-contained evidence of what was voted for.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor, Serialize, Deserialize)]
pub struct PreVote {
    /// The proposal being voted for.
    pub proposal: Proposal,
    /// Voter's recoverable signature over the tagged proposal encoding.
    pub signature: Vec<u8>,
}

impl PreVote {
    /// Structural validation.
    pub fn validate(&self) -> granite_types::Result<()> {
        self.proposal.validate()?;
        if self.signature.len() != SECP_SIGNATURE_LEN {
            return Err(ConsensusError::invalid("prevote: missing signature"));
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
        let pv: PreVote = codec::from_canonical(data)?;
        pv.validate()?;
        Ok(pv)
    }

    /// Validate the wrapped proposal's signatures and the vote signature;
    /// returns the voter's account address.
    pub fn validate_signatures(
        &self,
        secp: &Secp256k1Validator,
        bn: &BnGroupValidator,
    ) -> granite_types::Result<Vec<u8>> {
        self.validate()?;
        self.proposal.validate_signatures(secp, bn)?;
        let canonical = self.proposal.marshal_binary()?;
        let pubkey = secp.validate(&pre_vote_message(&canonical), &self.signature)?;
        Ok(get_account(&pubkey)?)
    }
}

/// A vote that no valid proposal was seen this round. Carries only the
/// round certificate; there is no block content to commit to.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor, Serialize, Deserialize)]
pub struct PreVoteNil {
    /// The round being nil-voted.
    pub rcert: RCert,
    /// Voter's recoverable signature over the tagged certificate encoding.
    pub signature: Vec<u8>,
}

impl PreVoteNil {
    /// Structural validation.
    pub fn validate(&self) -> granite_types::Result<()> {
        self.rcert.validate()?;
        if self.signature.len() != SECP_SIGNATURE_LEN {
            return Err(ConsensusError::invalid("prevote nil: missing signature"));
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
        let pvn: PreVoteNil = codec::from_canonical(data)?;
        pvn.validate()?;
        Ok(pvn)
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
        let pubkey = secp.validate(&pre_vote_nil_message(&canonical), &self.signature)?;
        Ok(get_account(&pubkey)?)
    }
}

/// A quorum of prevotes for the same proposal, ready to fold into a
/// precommit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreVoteList(pub Vec<PreVote>);

impl PreVoteList {
    /// Fold the prevote quorum into this validator's PreCommit.
    ///
    /// The shared proposal is re-derived through a canonical round-trip so
    /// no single list member's copy is trusted, and the prevote signatures
    /// ride along as quorum evidence. Callers have already validated every
    /// member's signatures; content equality across members is the round
    /// state's concern.
    pub fn make_pre_commit(&self, signer: &Secp256k1Signer) -> granite_types::Result<PreCommit> {
        let first = self
            .0
            .first()
            .ok_or_else(|| ConsensusError::invalid("prevote list: empty"))?;
        let proposal = Proposal::unmarshal_binary(&first.proposal.marshal_binary()?)?;
        let pre_votes: Vec<Vec<u8>> = self.0.iter().map(|pv| pv.signature.clone()).collect();
        let canonical = proposal.marshal_binary()?;
        let signature = signer.sign(&pre_commit_message(&canonical))?;
        debug!(
            height = proposal.pclaims.rcert.rclaims.height,
            round = proposal.pclaims.rcert.rclaims.round,
            votes = pre_votes.len(),
            "folded prevote quorum into precommit"
        );
        Ok(PreCommit {
            proposal,
            signature,
            pre_votes,
        })
    }
}
