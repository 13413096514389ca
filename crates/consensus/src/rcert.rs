//! Round certificate: proof that a quorum certified a (height, round).

use granite_types::constants::{DEAD_BLOCK_ROUND, GROUP_PUBKEY_LEN, GROUP_SIGNATURE_LEN};
use granite_types::signing::{pre_commit_nil_message, pre_vote_nil_message};
use granite_types::{BnGroupSigner, BnGroupValidator, ConsensusError, Secp256k1Signer};
use sbor::prelude::BasicSbor;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::next_round::{NRClaims, NextRound};
use crate::precommit::PreCommitNil;
use crate::prevote::PreVoteNil;
use crate::rclaims::RClaims;

/// A quorum's threshold signature certifying one round at one height.
///
/// For round 1 the group signed the previous block's hash (assembled from
/// NextHeight evidence); for later rounds it signed the canonical RClaims
/// (assembled from NextRound evidence).
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor, Serialize, Deserialize)]
pub struct RCert {
    /// The certified round claims.
    pub rclaims: RClaims,
    /// Aggregated group signature, `group_pubkey ‖ point`.
    pub sig_group: Vec<u8>,
}

impl RCert {
    /// Structural validation of the certificate.
    pub fn validate(&self) -> granite_types::Result<()> {
        self.rclaims.validate()?;
        // Height 1, and round 1 of height 2, predate any group signature;
        // everything later must carry one.
        let genesis_era =
            self.rclaims.height == 1 || (self.rclaims.height == 2 && self.rclaims.round == 1);
        if !genesis_era && self.sig_group.len() != GROUP_SIGNATURE_LEN {
            return Err(ConsensusError::invalid("rcert: missing group signature"));
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
        let cert: RCert = codec::from_canonical(data)?;
        cert.validate()?;
        Ok(cert)
    }

    /// Validate the group signature and return the group public key that
    /// produced it.
    ///
    /// Genesis rules: height 1 round 1 has no predecessor and reports the
    /// zero placeholder key; height 1 beyond round 1 can never exist;
    /// height 2 round 1 has no prior group signature to check and reports
    /// an empty key, leaving the caller's configured key in force.
    pub fn validate_signature(&self, validator: &BnGroupValidator) -> granite_types::Result<Vec<u8>> {
        self.validate()?;
        let (height, round) = (self.rclaims.height, self.rclaims.round);
        if height == 1 {
            if round > 1 {
                return Err(ConsensusError::invalid(
                    "rcert: no round past 1 can exist at height 1",
                ));
            }
            return Ok(vec![0u8; GROUP_PUBKEY_LEN]);
        }
        if height == 2 && round == 1 {
            return Ok(Vec::new());
        }
        if round > 1 {
            let canonical = self.rclaims.marshal_binary()?;
            return Ok(validator.validate(&canonical, &self.sig_group)?);
        }
        Ok(validator.validate(self.rclaims.prev_block.as_bytes(), &self.sig_group)?)
    }

    /// Cast a nil prevote against this certificate: "I saw no valid
    /// proposal this round".
    pub fn pre_vote_nil(&self, signer: &Secp256k1Signer) -> granite_types::Result<PreVoteNil> {
        let rcert = RCert::unmarshal_binary(&self.marshal_binary()?)?;
        let canonical = rcert.marshal_binary()?;
        let signature = signer.sign(&pre_vote_nil_message(&canonical))?;
        Ok(PreVoteNil { rcert, signature })
    }

    /// Cast a nil precommit against this certificate.
    pub fn pre_commit_nil(&self, signer: &Secp256k1Signer) -> granite_types::Result<PreCommitNil> {
        let rcert = RCert::unmarshal_binary(&self.marshal_binary()?)?;
        let canonical = rcert.marshal_binary()?;
        let signature = signer.sign(&pre_commit_nil_message(&canonical))?;
        Ok(PreCommitNil { rcert, signature })
    }

    /// Vote to advance past this round: build and sign the NextRound
    /// message claiming `round + 1`.
    pub fn next_round(
        &self,
        signer: &Secp256k1Signer,
        group_signer: &BnGroupSigner,
    ) -> granite_types::Result<NextRound> {
        if self.rclaims.round >= DEAD_BLOCK_ROUND {
            return Err(ConsensusError::invalid(
                "rcert: cannot advance past the dead block round",
            ));
        }
        let rcert = RCert::unmarshal_binary(&self.marshal_binary()?)?;
        let mut rclaims = RClaims::unmarshal_binary(&self.rclaims.marshal_binary()?)?;
        rclaims.round += 1;
        let mut next_round = NextRound {
            nrclaims: NRClaims {
                rcert,
                rclaims,
                sig_share: Vec::new(),
            },
            signature: Vec::new(),
        };
        next_round.sign(signer, group_signer)?;
        Ok(next_round)
    }
}
