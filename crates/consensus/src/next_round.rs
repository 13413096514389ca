//! NextRound: evidence that a validator wants to advance the round.

use granite_types::constants::{GROUP_SIGNATURE_LEN, SECP_SIGNATURE_LEN};
use granite_types::signing::next_round_message;
use granite_types::{
    get_account, BnGroupSigner, BnGroupValidator, ConsensusError, Secp256k1Signer,
    Secp256k1Validator,
};
use sbor::prelude::BasicSbor;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec;
use crate::rcert::RCert;
use crate::rclaims::RClaims;

/// The claims behind a round advance: the certificate of the stalled round
/// plus the claims of the round being entered, with this validator's group
/// signature share over the new claims. Enough shares aggregate into the
/// next round's certificate.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor, Serialize, Deserialize)]
pub struct NRClaims {
    /// Certificate of the round being abandoned.
    pub rcert: RCert,
    /// Claims of the next round (`round + 1`, same height and prev block).
    pub rclaims: RClaims,
    /// This validator's group-signature share over the canonical new
    /// claims.
    pub sig_share: Vec<u8>,
}

impl NRClaims {
    /// Validate both claim sets and the advance chaining between them.
    pub fn validate(&self) -> granite_types::Result<()> {
        self.rcert.validate()?;
        self.rclaims.validate()?;
        if self.sig_share.len() != GROUP_SIGNATURE_LEN {
            return Err(ConsensusError::invalid("nrclaims: missing sig share"));
        }
        let prev = &self.rcert.rclaims;
        if prev.chain_id != self.rclaims.chain_id {
            return Err(ConsensusError::invalid("nrclaims: chain id mismatch"));
        }
        if prev.height != self.rclaims.height {
            return Err(ConsensusError::invalid("nrclaims: height mismatch"));
        }
        if prev.round + 1 != self.rclaims.round {
            return Err(ConsensusError::invalid(
                "nrclaims: round does not advance by one",
            ));
        }
        if prev.prev_block != self.rclaims.prev_block {
            return Err(ConsensusError::invalid("nrclaims: prev block mismatch"));
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
        let claims: NRClaims = codec::from_canonical(data)?;
        claims.validate()?;
        Ok(claims)
    }

    /// Validate the share signature over the new claims; returns the share
    /// public key that produced it.
    pub fn validate_signatures(&self, bn: &BnGroupValidator) -> granite_types::Result<Vec<u8>> {
        self.validate()?;
        let canonical = self.rclaims.marshal_binary()?;
        Ok(bn.validate(&canonical, &self.sig_share)?)
    }
}

/// A signed round-advance message.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor, Serialize, Deserialize)]
pub struct NextRound {
    /// The advance claims.
    pub nrclaims: NRClaims,
    /// Validator's recoverable signature over the tagged claims.
    pub signature: Vec<u8>,
}

impl NextRound {
    /// Structural validation.
    pub fn validate(&self) -> granite_types::Result<()> {
        self.nrclaims.validate()?;
        if self.signature.len() != SECP_SIGNATURE_LEN {
            return Err(ConsensusError::invalid("next round: missing signature"));
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
        let nr: NextRound = codec::from_canonical(data)?;
        nr.validate()?;
        Ok(nr)
    }

    /// Produce the share over the new claims, then sign the whole message.
    pub fn sign(
        &mut self,
        signer: &Secp256k1Signer,
        group_signer: &BnGroupSigner,
    ) -> granite_types::Result<()> {
        let new_claims = self.nrclaims.rclaims.marshal_binary()?;
        self.nrclaims.sig_share = group_signer.sign(&new_claims)?;
        let canonical = self.nrclaims.marshal_binary()?;
        self.signature = signer.sign(&next_round_message(&canonical))?;
        Ok(())
    }

    /// Validate the abandoned round's certificate, the share over the new
    /// claims, and the validator signature; returns the validator's
    /// account address.
    pub fn validate_signatures(
        &self,
        secp: &Secp256k1Validator,
        bn: &BnGroupValidator,
    ) -> granite_types::Result<Vec<u8>> {
        self.validate()?;
        self.nrclaims.rcert.validate_signature(bn)?;
        self.nrclaims.validate_signatures(bn)?;
        let canonical = self.nrclaims.marshal_binary()?;
        let pubkey = secp.validate(&next_round_message(&canonical), &self.signature)?;
        Ok(get_account(&pubkey)?)
    }
}

/// A quorum of round-advance messages for the same next round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NextRoundList(pub Vec<NextRound>);

impl NextRoundList {
    /// Aggregate the quorum's signature shares into the next round's
    /// certificate.
    ///
    /// The new round claims are re-derived through a canonical round-trip;
    /// the shares are combined against the published share set.
    pub fn make_round_cert(
        &self,
        group_signer: &BnGroupSigner,
        group_shares: &[Vec<u8>],
    ) -> granite_types::Result<RCert> {
        let first = self
            .0
            .first()
            .ok_or_else(|| ConsensusError::invalid("next round list: empty"))?;
        let rclaims = RClaims::unmarshal_binary(&first.nrclaims.rclaims.marshal_binary()?)?;
        let shares: Vec<Vec<u8>> = self
            .0
            .iter()
            .map(|nr| nr.nrclaims.sig_share.clone())
            .collect();
        let sig_group = group_signer.aggregate(&shares, group_shares)?;
        debug!(
            height = rclaims.height,
            round = rclaims.round,
            shares = shares.len(),
            "aggregated round advance quorum into round certificate"
        );
        Ok(RCert { rclaims, sig_group })
    }
}
