//! Block proposals: a proposer's signed claim chain plus its transaction
//! hash list.

use granite_types::constants::{DEAD_BLOCK_ROUND, SECP_SIGNATURE_LEN};
use granite_types::signing::{pre_vote_message, proposal_message};
use granite_types::{
    get_account, make_tx_root, BnGroupValidator, ConsensusError, Hash, Secp256k1Signer,
    Secp256k1Validator,
};
use sbor::prelude::BasicSbor;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::pclaims::PClaims;
use crate::prevote::PreVote;

/// A proposed block for one round. The signature covers the domain-tagged
/// canonical PClaims; the tx hash list must reproduce the claimed tx root.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor, Serialize, Deserialize)]
pub struct Proposal {
    /// The proposed claim chain.
    pub pclaims: PClaims,
    /// Proposer's recoverable signature over the tagged claims.
    pub signature: Vec<u8>,
    /// Hashes of every transaction in the proposed block.
    pub tx_hsh_lst: Vec<Hash>,
}

impl Proposal {
    /// Structural validation: claim chaining, tx-root reproduction, and the
    /// dead-block-round empty-block rule.
    pub fn validate(&self) -> granite_types::Result<()> {
        self.pclaims.validate()?;
        if self.signature.len() != SECP_SIGNATURE_LEN {
            return Err(ConsensusError::invalid("proposal: missing signature"));
        }
        if self.pclaims.rcert.rclaims.round == DEAD_BLOCK_ROUND && !self.tx_hsh_lst.is_empty() {
            return Err(ConsensusError::invalid(
                "proposal: dead block round proposals must be empty",
            ));
        }
        if make_tx_root(&self.tx_hsh_lst) != self.pclaims.bclaims.tx_root {
            return Err(ConsensusError::invalid(
                "proposal: tx hash list does not reproduce tx root",
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
        let proposal: Proposal = codec::from_canonical(data)?;
        proposal.validate()?;
        Ok(proposal)
    }

    /// Sign the proposal. Signing past the dead block round fails because
    /// the claims themselves refuse to encode.
    pub fn sign(&mut self, signer: &Secp256k1Signer) -> granite_types::Result<()> {
        let canonical = self.pclaims.marshal_binary()?;
        self.signature = signer.sign(&proposal_message(&canonical))?;
        Ok(())
    }

    /// Validate the claim chain, the round certificate's group signature
    /// and the proposer signature; returns the proposer's account address.
    pub fn validate_signatures(
        &self,
        secp: &Secp256k1Validator,
        bn: &BnGroupValidator,
    ) -> granite_types::Result<Vec<u8>> {
        self.validate()?;
        self.pclaims.rcert.validate_signature(bn)?;
        let canonical = self.pclaims.marshal_binary()?;
        let pubkey = secp.validate(&proposal_message(&canonical), &self.signature)?;
        Ok(get_account(&pubkey)?)
    }

    /// Vote for this proposal.
    pub fn pre_vote(&self, signer: &Secp256k1Signer) -> granite_types::Result<PreVote> {
        let proposal = Proposal::unmarshal_binary(&self.marshal_binary()?)?;
        let canonical = proposal.marshal_binary()?;
        let signature = signer.sign(&pre_vote_message(&canonical))?;
        Ok(PreVote {
            proposal,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{proposal_at, signed_proposal, validators};

    #[test]
    fn sign_validate_recovers_proposer_account() {
        let ctx = validators(4, 14);
        let proposal = signed_proposal(&ctx, 2, 1);
        let account = proposal
            .validate_signatures(&Secp256k1Validator, &BnGroupValidator)
            .unwrap();
        assert_eq!(account, ctx.accounts[0]);
    }

    #[test]
    fn round_trip() {
        let ctx = validators(4, 15);
        let proposal = signed_proposal(&ctx, 2, 1);
        let bytes = proposal.marshal_binary().unwrap();
        assert_eq!(Proposal::unmarshal_binary(&bytes).unwrap(), proposal);
    }

    #[test]
    fn tampered_tx_list_fails_validation() {
        let ctx = validators(4, 16);
        let mut proposal = signed_proposal(&ctx, 2, 1);
        proposal.tx_hsh_lst.push(Hash::digest(b"injected"));
        assert!(proposal.validate().unwrap_err().is_invalid());
    }

    #[test]
    fn dead_block_round_must_be_empty() {
        let ctx = validators(4, 17);
        let mut proposal = proposal_at(&ctx, 2, DEAD_BLOCK_ROUND, &[Hash::digest(b"tx")]);
        proposal.sign(&ctx.secp[0]).unwrap();
        assert!(proposal.validate().unwrap_err().is_invalid());

        let mut empty = proposal_at(&ctx, 2, DEAD_BLOCK_ROUND, &[]);
        empty.sign(&ctx.secp[0]).unwrap();
        assert!(empty.validate().is_ok());
    }

    #[test]
    fn wrong_signer_attribution_differs() {
        let ctx = validators(4, 18);
        let mut proposal = signed_proposal(&ctx, 2, 1);
        proposal.sign(&ctx.secp[1]).unwrap();
        let account = proposal
            .validate_signatures(&Secp256k1Validator, &BnGroupValidator)
            .unwrap();
        assert_eq!(account, ctx.accounts[1]);
        assert_ne!(account, ctx.accounts[0]);
    }
}
