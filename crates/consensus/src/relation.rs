//! Height/round relations shared by the round state machine and callers.
//!
//! Every consensus message embeds a round certificate, so a closed sum type
//! over borrowed messages gives the shared capabilities (certificate,
//! height/round, optional block claims) without runtime type assertions.

use std::cmp::Ordering;

use granite_types::constants::DEAD_BLOCK_ROUND;
use granite_types::{ConsensusError, Result};

use crate::bclaims::BClaims;
use crate::block_header::BlockHeader;
use crate::next_height::{NHClaims, NextHeight};
use crate::next_round::{NRClaims, NextRound};
use crate::pclaims::PClaims;
use crate::precommit::{PreCommit, PreCommitNil};
use crate::prevote::{PreVote, PreVoteNil};
use crate::proposal::Proposal;
use crate::rcert::RCert;
use crate::rclaims::RClaims;

/// The kind of a consensus message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgKind {
    /// Round certificate.
    RCert,
    /// Block proposal.
    Proposal,
    /// Vote for a proposal.
    PreVote,
    /// Vote that no proposal was seen.
    PreVoteNil,
    /// Commitment to a proposal.
    PreCommit,
    /// Commitment that nothing can be committed.
    PreCommitNil,
    /// Round-advance evidence.
    NextRound,
    /// Height-advance evidence.
    NextHeight,
}

/// A borrowed view over any consensus message.
#[derive(Debug, Clone, Copy)]
pub enum MsgRef<'a> {
    /// Round certificate.
    RCert(&'a RCert),
    /// Block proposal.
    Proposal(&'a Proposal),
    /// Vote for a proposal.
    PreVote(&'a PreVote),
    /// Vote that no proposal was seen.
    PreVoteNil(&'a PreVoteNil),
    /// Commitment to a proposal.
    PreCommit(&'a PreCommit),
    /// Commitment that nothing can be committed.
    PreCommitNil(&'a PreCommitNil),
    /// Round-advance evidence.
    NextRound(&'a NextRound),
    /// Height-advance evidence.
    NextHeight(&'a NextHeight),
}

impl<'a> MsgRef<'a> {
    /// The message kind.
    pub fn kind(&self) -> MsgKind {
        match self {
            MsgRef::RCert(_) => MsgKind::RCert,
            MsgRef::Proposal(_) => MsgKind::Proposal,
            MsgRef::PreVote(_) => MsgKind::PreVote,
            MsgRef::PreVoteNil(_) => MsgKind::PreVoteNil,
            MsgRef::PreCommit(_) => MsgKind::PreCommit,
            MsgRef::PreCommitNil(_) => MsgKind::PreCommitNil,
            MsgRef::NextRound(_) => MsgKind::NextRound,
            MsgRef::NextHeight(_) => MsgKind::NextHeight,
        }
    }

    /// The round certificate embedded in the message.
    pub fn rcert(&self) -> &'a RCert {
        match self {
            MsgRef::RCert(rc) => rc,
            MsgRef::Proposal(p) => &p.pclaims.rcert,
            MsgRef::PreVote(pv) => &pv.proposal.pclaims.rcert,
            MsgRef::PreVoteNil(pvn) => &pvn.rcert,
            MsgRef::PreCommit(pc) => &pc.proposal.pclaims.rcert,
            MsgRef::PreCommitNil(pcn) => &pcn.rcert,
            MsgRef::NextRound(nr) => &nr.nrclaims.rcert,
            MsgRef::NextHeight(nh) => &nh.nhclaims.proposal.pclaims.rcert,
        }
    }

    /// The block claims, for the kinds that carry block content.
    pub fn bclaims(&self) -> Option<&'a BClaims> {
        match self {
            MsgRef::Proposal(p) => Some(&p.pclaims.bclaims),
            MsgRef::PreVote(pv) => Some(&pv.proposal.pclaims.bclaims),
            MsgRef::PreCommit(pc) => Some(&pc.proposal.pclaims.bclaims),
            MsgRef::NextHeight(nh) => Some(&nh.nhclaims.proposal.pclaims.bclaims),
            MsgRef::RCert(_)
            | MsgRef::PreVoteNil(_)
            | MsgRef::PreCommitNil(_)
            | MsgRef::NextRound(_) => None,
        }
    }
}

/// Anything with a (height, round) position in the consensus timeline.
pub trait HasHeightRound {
    /// The (height, round) this value speaks for.
    fn height_round(&self) -> (u32, u32);
}

impl HasHeightRound for RClaims {
    fn height_round(&self) -> (u32, u32) {
        (self.height, self.round)
    }
}

impl HasHeightRound for RCert {
    fn height_round(&self) -> (u32, u32) {
        self.rclaims.height_round()
    }
}

impl HasHeightRound for PClaims {
    fn height_round(&self) -> (u32, u32) {
        self.rcert.height_round()
    }
}

impl HasHeightRound for Proposal {
    fn height_round(&self) -> (u32, u32) {
        self.pclaims.height_round()
    }
}

impl HasHeightRound for PreVote {
    fn height_round(&self) -> (u32, u32) {
        self.proposal.height_round()
    }
}

impl HasHeightRound for PreVoteNil {
    fn height_round(&self) -> (u32, u32) {
        self.rcert.height_round()
    }
}

impl HasHeightRound for PreCommit {
    fn height_round(&self) -> (u32, u32) {
        self.proposal.height_round()
    }
}

impl HasHeightRound for PreCommitNil {
    fn height_round(&self) -> (u32, u32) {
        self.rcert.height_round()
    }
}

impl HasHeightRound for NRClaims {
    fn height_round(&self) -> (u32, u32) {
        self.rcert.height_round()
    }
}

impl HasHeightRound for NextRound {
    fn height_round(&self) -> (u32, u32) {
        self.nrclaims.height_round()
    }
}

impl HasHeightRound for NHClaims {
    fn height_round(&self) -> (u32, u32) {
        self.proposal.height_round()
    }
}

impl HasHeightRound for NextHeight {
    fn height_round(&self) -> (u32, u32) {
        self.nhclaims.height_round()
    }
}

// Block-level values sit at round 1 of their height.
impl HasHeightRound for BClaims {
    fn height_round(&self) -> (u32, u32) {
        (self.height, 1)
    }
}

impl HasHeightRound for BlockHeader {
    fn height_round(&self) -> (u32, u32) {
        (self.bclaims.height, 1)
    }
}

impl HasHeightRound for MsgRef<'_> {
    fn height_round(&self) -> (u32, u32) {
        self.rcert().height_round()
    }
}

/// Total order over (height, round): `Less` means `a` is before `b`.
pub fn relate_hr(a: &impl HasHeightRound, b: &impl HasHeightRound) -> Ordering {
    a.height_round().cmp(&b.height_round())
}

/// Total order over height alone.
pub fn relate_h(a: &impl HasHeightRound, b: &impl HasHeightRound) -> Ordering {
    a.height_round().0.cmp(&b.height_round().0)
}

/// True if the value speaks for the dead block round.
pub fn is_dead_block_round(v: &impl HasHeightRound) -> bool {
    v.height_round().1 == DEAD_BLOCK_ROUND
}

/// Do two messages agree on the previous block?
pub fn prev_block_equal(a: &MsgRef<'_>, b: &MsgRef<'_>) -> bool {
    a.rcert().rclaims.prev_block == b.rcert().rclaims.prev_block
}

/// Do two messages carry the same block content? Fails if either side has
/// no block claims or a side cannot hash.
pub fn bclaims_equal(a: &MsgRef<'_>, b: &MsgRef<'_>) -> Result<bool> {
    let ab = a
        .bclaims()
        .ok_or_else(|| ConsensusError::invalid("bclaims compare: left side carries no block"))?;
    let bb = b
        .bclaims()
        .ok_or_else(|| ConsensusError::invalid("bclaims compare: right side carries no block"))?;
    Ok(ab.block_hash()? == bb.block_hash()?)
}

/// Index of the proposer for `(height, round)` among `num_validators`
/// round-robin participants. `num_validators` must be nonzero.
pub fn proposer_index(num_validators: usize, height: u32, round: u32) -> usize {
    assert!(num_validators > 0, "validator set cannot be empty");
    ((height as u64 + round as u64 - 1) % num_validators as u64) as usize
}
