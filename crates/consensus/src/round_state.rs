//! Per-(validator, height) tracking of one validator's round messages.
//!
//! A `RoundState` follows a single validator through the rounds of one
//! height: which certificate it stands on, what it proposed, how it voted,
//! and whether it ever contradicted itself. Each message kind has one slot;
//! a second, contradictory message of a kind is never stored over the first
//! but recorded beside it as equivocation evidence, and from that point the
//! validator is treated as having implicitly nil-voted for the rest of the
//! round.

use granite_types::constants::{DEAD_BLOCK_ROUND, DEAD_BLOCK_ROUND_NR};
use granite_types::{ConsensusError};
use sbor::prelude::BasicSbor;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, warn};

use crate::codec;
use crate::next_height::NextHeight;
use crate::next_round::NextRound;
use crate::precommit::{PreCommit, PreCommitNil};
use crate::prevote::{PreVote, PreVoteNil};
use crate::proposal::Proposal;
use crate::rcert::RCert;
use crate::relation::{
    bclaims_equal, is_dead_block_round, prev_block_equal, relate_h, relate_hr, HasHeightRound,
    MsgKind, MsgRef,
};

/// One message kind's slot: at most one accepted message, plus room for the
/// contradictory twin that proves equivocation.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor, Serialize, Deserialize)]
pub struct Slot<T> {
    seen: Option<T>,
    conflicting: Option<T>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot {
            seen: None,
            conflicting: None,
        }
    }
}

impl<T> Slot<T> {
    /// The accepted message, if any.
    pub fn get(&self) -> Option<&T> {
        self.seen.as_ref()
    }

    /// The recorded conflicting message, if any.
    pub fn conflicting(&self) -> Option<&T> {
        self.conflicting.as_ref()
    }

    /// True once a message is accepted.
    pub fn is_set(&self) -> bool {
        self.seen.is_some()
    }

    /// True once a conflict is recorded.
    pub fn has_conflict(&self) -> bool {
        self.conflicting.is_some()
    }

    fn set(&mut self, value: T) {
        self.seen = Some(value);
    }

    fn record_conflict(&mut self, value: T) {
        self.conflicting = Some(value);
    }

    fn clear(&mut self) {
        self.seen = None;
        self.conflicting = None;
    }

    fn clear_seen(&mut self) {
        self.seen = None;
    }

    fn clear_conflict(&mut self) {
        self.conflicting = None;
    }
}

/// An owned inbound message entering the state machine.
enum Msg {
    RCert(RCert),
    Proposal(Proposal),
    PreVote(PreVote),
    PreVoteNil(PreVoteNil),
    PreCommit(PreCommit),
    PreCommitNil(PreCommitNil),
    NextRound(NextRound),
    NextHeight(NextHeight),
}

impl Msg {
    fn as_msg_ref(&self) -> MsgRef<'_> {
        match self {
            Msg::RCert(v) => MsgRef::RCert(v),
            Msg::Proposal(v) => MsgRef::Proposal(v),
            Msg::PreVote(v) => MsgRef::PreVote(v),
            Msg::PreVoteNil(v) => MsgRef::PreVoteNil(v),
            Msg::PreCommit(v) => MsgRef::PreCommit(v),
            Msg::PreCommitNil(v) => MsgRef::PreCommitNil(v),
            Msg::NextRound(v) => MsgRef::NextRound(v),
            Msg::NextHeight(v) => MsgRef::NextHeight(v),
        }
    }
}

impl HasHeightRound for Msg {
    fn height_round(&self) -> (u32, u32) {
        self.as_msg_ref().height_round()
    }
}

/// Tracks one validator's message sequence through the rounds of one
/// height, detecting conflicts, staleness and implicit-nil transitions.
///
/// The caller owns serialization of `set_*` calls; there is no interior
/// locking.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor, Serialize, Deserialize)]
pub struct RoundState {
    vaddr: Vec<u8>,
    group_key: Vec<u8>,
    group_share: Vec<u8>,
    group_idx: u8,
    rcert: RCert,
    conflicting_rcert: Option<RCert>,
    proposal: Slot<Proposal>,
    pre_vote: Slot<PreVote>,
    pre_vote_nil: Option<PreVoteNil>,
    implicit_pvn: bool,
    pre_commit: Slot<PreCommit>,
    pre_commit_nil: Option<PreCommitNil>,
    implicit_pcn: bool,
    next_round: Option<NextRound>,
    next_height: Slot<NextHeight>,
}

impl HasHeightRound for RoundState {
    fn height_round(&self) -> (u32, u32) {
        self.rcert.height_round()
    }
}

impl RoundState {
    /// Create an empty round state for a validator standing on `rcert`.
    pub fn new(
        vaddr: Vec<u8>,
        group_key: Vec<u8>,
        group_share: Vec<u8>,
        group_idx: u8,
        rcert: RCert,
    ) -> granite_types::Result<Self> {
        if vaddr.is_empty() {
            return Err(ConsensusError::invalid("round state: empty validator address"));
        }
        rcert.validate()?;
        Ok(RoundState {
            vaddr,
            group_key,
            group_share,
            group_idx,
            rcert,
            conflicting_rcert: None,
            proposal: Slot::default(),
            pre_vote: Slot::default(),
            pre_vote_nil: None,
            implicit_pvn: false,
            pre_commit: Slot::default(),
            pre_commit_nil: None,
            implicit_pcn: false,
            next_round: None,
            next_height: Slot::default(),
        })
    }

    /// Canonical encoding, so a storage layer can persist the state
    /// verbatim.
    pub fn marshal_binary(&self) -> granite_types::Result<Vec<u8>> {
        self.rcert.validate()?;
        codec::to_canonical(self)
    }

    /// Decode and validate a canonical encoding.
    pub fn unmarshal_binary(data: &[u8]) -> granite_types::Result<Self> {
        let state: RoundState = codec::from_canonical(data)?;
        if state.vaddr.is_empty() {
            return Err(ConsensusError::invalid("round state: empty validator address"));
        }
        state.rcert.validate()?;
        Ok(state)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════

    /// The tracked validator's account address.
    pub fn vaddr(&self) -> &[u8] {
        &self.vaddr
    }

    /// The tracked validator's group public key.
    pub fn group_key(&self) -> &[u8] {
        &self.group_key
    }

    /// The tracked validator's group share public key.
    pub fn group_share(&self) -> &[u8] {
        &self.group_share
    }

    /// The tracked validator's index in the group.
    pub fn group_idx(&self) -> u8 {
        self.group_idx
    }

    /// The certificate for the round the validator currently stands on.
    pub fn rcert(&self) -> &RCert {
        &self.rcert
    }

    /// A contradictory certificate observed from a nil vote or round
    /// advance, recorded as equivocation evidence.
    pub fn conflicting_rcert(&self) -> Option<&RCert> {
        self.conflicting_rcert.as_ref()
    }

    /// The accepted proposal for this round.
    pub fn proposal(&self) -> Option<&Proposal> {
        self.proposal.get()
    }

    /// A contradictory proposal recorded as equivocation evidence.
    pub fn conflicting_proposal(&self) -> Option<&Proposal> {
        self.proposal.conflicting()
    }

    /// The accepted prevote for this round.
    pub fn pre_vote(&self) -> Option<&PreVote> {
        self.pre_vote.get()
    }

    /// A contradictory prevote recorded as equivocation evidence.
    pub fn conflicting_pre_vote(&self) -> Option<&PreVote> {
        self.pre_vote.conflicting()
    }

    /// The accepted nil prevote for this round.
    pub fn pre_vote_nil(&self) -> Option<&PreVoteNil> {
        self.pre_vote_nil.as_ref()
    }

    /// True once equivocation evidence forces this validator to count as
    /// having nil-prevoted.
    pub fn implicit_pvn(&self) -> bool {
        self.implicit_pvn
    }

    /// The accepted precommit for this round.
    pub fn pre_commit(&self) -> Option<&PreCommit> {
        self.pre_commit.get()
    }

    /// A contradictory precommit recorded as equivocation evidence.
    pub fn conflicting_pre_commit(&self) -> Option<&PreCommit> {
        self.pre_commit.conflicting()
    }

    /// The accepted nil precommit for this round.
    pub fn pre_commit_nil(&self) -> Option<&PreCommitNil> {
        self.pre_commit_nil.as_ref()
    }

    /// True once equivocation evidence forces this validator to count as
    /// having nil-precommitted.
    pub fn implicit_pcn(&self) -> bool {
        self.implicit_pcn
    }

    /// The accepted round-advance message for this round.
    pub fn next_round(&self) -> Option<&NextRound> {
        self.next_round.as_ref()
    }

    /// The accepted height-advance message for this height.
    pub fn next_height(&self) -> Option<&NextHeight> {
        self.next_height.get()
    }

    /// A contradictory height-advance message recorded as evidence.
    pub fn conflicting_next_height(&self) -> Option<&NextHeight> {
        self.next_height.conflicting()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Currency predicates
    // ═══════════════════════════════════════════════════════════════════════

    /// True if this state stands exactly at `rc`'s (height, round).
    pub fn current_hr(&self, rc: &RCert) -> bool {
        relate_hr(rc, self) == Ordering::Equal
    }

    /// True if this state has advanced beyond `rc`'s (height, round).
    pub fn future_hr(&self, rc: &RCert) -> bool {
        relate_hr(rc, &self.rcert) == Ordering::Less
    }

    /// True if this state stands at `rc`'s height.
    pub fn current_h(&self, rc: &RCert) -> bool {
        relate_h(rc, &self.rcert) == Ordering::Equal
    }

    /// True if this state has advanced beyond `rc`'s height.
    pub fn future_h(&self, rc: &RCert) -> bool {
        relate_h(rc, &self.rcert) == Ordering::Less
    }

    /// True if the stored proposal speaks for `rc`'s round.
    pub fn proposal_current(&self, rc: &RCert) -> bool {
        self.proposal
            .get()
            .is_some_and(|p| relate_hr(rc, p) == Ordering::Equal)
    }

    /// True if the stored prevote speaks for `rc`'s round.
    pub fn pre_vote_current(&self, rc: &RCert) -> bool {
        self.pre_vote
            .get()
            .is_some_and(|pv| relate_hr(rc, pv) == Ordering::Equal)
    }

    /// True if the stored nil prevote speaks for `rc`'s round.
    pub fn pre_vote_nil_current(&self, rc: &RCert) -> bool {
        self.pre_vote_nil
            .as_ref()
            .is_some_and(|pvn| relate_hr(rc, pvn) == Ordering::Equal)
    }

    /// True if the stored precommit speaks for `rc`'s round.
    pub fn pre_commit_current(&self, rc: &RCert) -> bool {
        self.pre_commit
            .get()
            .is_some_and(|pc| relate_hr(rc, pc) == Ordering::Equal)
    }

    /// True if the stored nil precommit speaks for `rc`'s round.
    pub fn pre_commit_nil_current(&self, rc: &RCert) -> bool {
        self.pre_commit_nil
            .as_ref()
            .is_some_and(|pcn| relate_hr(rc, pcn) == Ordering::Equal)
    }

    /// True if the stored round advance speaks for `rc`'s round.
    pub fn next_round_current(&self, rc: &RCert) -> bool {
        self.next_round
            .as_ref()
            .is_some_and(|nr| relate_hr(rc, nr) == Ordering::Equal)
    }

    /// True if the stored height advance still counts for `rc`.
    ///
    /// Inside the dead block round only dead-block-round evidence counts;
    /// otherwise evidence from any round of the height counts.
    pub fn next_height_current(&self, rc: &RCert) -> bool {
        let Some(nh) = self.next_height.get() else {
            return false;
        };
        if is_dead_block_round(rc) || is_dead_block_round(self) {
            relate_hr(rc, nh) == Ordering::Equal
        } else {
            relate_h(rc, nh) == Ordering::Equal
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Transitions
    // ═══════════════════════════════════════════════════════════════════════

    /// Re-seed the state on a new round certificate. Always resets.
    pub fn set_rcert(&mut self, rc: RCert) -> granite_types::Result<()> {
        rc.validate()?;
        self.set_reset(Msg::RCert(rc));
        Ok(())
    }

    /// Track a proposal. `Ok(false)` means equivocation was recorded.
    pub fn set_proposal(&mut self, v: Proposal) -> granite_types::Result<bool> {
        let dbr = is_dead_block_round(&v);
        if dbr && !v.tx_hsh_lst.is_empty() {
            return Err(ConsensusError::invalid(
                "set proposal: tx hashes in dead block round",
            ));
        }
        let ok = self.generic_set(Msg::Proposal(v))?;
        if !ok && dbr {
            return Err(ConsensusError::invalid(
                "set proposal: conflicting proposal in dead block round",
            ));
        }
        Ok(ok)
    }

    /// Track a prevote. `Ok(false)` means equivocation was recorded.
    pub fn set_pre_vote(&mut self, v: PreVote) -> granite_types::Result<bool> {
        let dbr = is_dead_block_round(&v);
        if dbr && !v.proposal.tx_hsh_lst.is_empty() {
            return Err(ConsensusError::invalid(
                "set prevote: tx hashes in dead block round",
            ));
        }
        let ok = self.generic_set(Msg::PreVote(v))?;
        if !ok && dbr {
            return Err(ConsensusError::invalid(
                "set prevote: conflicting prevote in dead block round",
            ));
        }
        Ok(ok)
    }

    /// Track a nil prevote; nil votes never occur in the dead block round.
    pub fn set_pre_vote_nil(&mut self, v: PreVoteNil) -> granite_types::Result<bool> {
        if is_dead_block_round(&v) {
            return Err(ConsensusError::invalid(
                "set prevote nil: nil vote in dead block round",
            ));
        }
        self.generic_set(Msg::PreVoteNil(v))
    }

    /// Track a precommit. `Ok(false)` means equivocation was recorded.
    pub fn set_pre_commit(&mut self, v: PreCommit) -> granite_types::Result<bool> {
        let dbr = is_dead_block_round(&v);
        if dbr && !v.proposal.tx_hsh_lst.is_empty() {
            return Err(ConsensusError::invalid(
                "set precommit: tx hashes in dead block round",
            ));
        }
        let ok = self.generic_set(Msg::PreCommit(v))?;
        if !ok && dbr {
            return Err(ConsensusError::invalid(
                "set precommit: conflicting precommit in dead block round",
            ));
        }
        Ok(ok)
    }

    /// Track a nil precommit; nil votes never occur in the dead block round.
    pub fn set_pre_commit_nil(&mut self, v: PreCommitNil) -> granite_types::Result<bool> {
        if is_dead_block_round(&v) {
            return Err(ConsensusError::invalid(
                "set precommit nil: nil vote in dead block round",
            ));
        }
        self.generic_set(Msg::PreCommitNil(v))
    }

    /// Track a round advance; no round advances out of the dead block
    /// round.
    pub fn set_next_round(&mut self, v: NextRound) -> granite_types::Result<bool> {
        if is_dead_block_round(&v) {
            return Err(ConsensusError::invalid(
                "set next round: round advance in dead block round",
            ));
        }
        self.generic_set(Msg::NextRound(v))
    }

    /// Track a height advance.
    ///
    /// Height-advance evidence relates by height only: evidence from any
    /// round of the current height stays relevant, and evidence for a later
    /// round supersedes a staler message.
    pub fn set_next_height(&mut self, v: NextHeight) -> granite_types::Result<bool> {
        if is_dead_block_round(&v) && !v.nhclaims.proposal.tx_hsh_lst.is_empty() {
            return Err(ConsensusError::invalid(
                "set next height: tx hashes in dead block round",
            ));
        }
        match relate_h(self, &v) {
            Ordering::Greater => Err(ConsensusError::stale(
                "set next height: message from a previous height",
            )),
            Ordering::Less => {
                self.set_reset(Msg::NextHeight(v));
                Ok(true)
            }
            Ordering::Equal => self.apply_current(Msg::NextHeight(v)),
        }
    }

    /// Record equivocation evidence carried by another validator's copy of
    /// a proposal without taking a transition. Only messages for the
    /// current round are considered; no shadow copy is stored for evidence
    /// that was not directly observed.
    pub fn track_external_conflicts(&mut self, v: &Proposal) {
        if relate_hr(self, v) != Ordering::Equal {
            return;
        }
        if let Ok(false) = self.check_conflict(&MsgRef::Proposal(v)) {
            warn!(
                vaddr = %hex::encode(&self.vaddr),
                height = self.rcert.rclaims.height,
                round = self.rcert.rclaims.round,
                "externally derived equivocation; forcing implicit nil votes"
            );
            self.implicit_pvn = true;
            self.implicit_pcn = true;
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Internals
    // ═══════════════════════════════════════════════════════════════════════

    fn generic_set(&mut self, m: Msg) -> granite_types::Result<bool> {
        match relate_h(self, &m) {
            Ordering::Greater => Err(ConsensusError::stale("message from a previous height")),
            Ordering::Less => {
                self.set_reset(m);
                Ok(true)
            }
            Ordering::Equal => match relate_hr(self, &m) {
                Ordering::Greater => {
                    Err(ConsensusError::stale("message from a previous round"))
                }
                Ordering::Less => {
                    self.set_reset(m);
                    Ok(true)
                }
                Ordering::Equal => self.apply_current(m),
            },
        }
    }

    /// Handle a message for the current round: conflict detection, the
    /// exactly-once-per-kind rule, then storage.
    fn apply_current(&mut self, m: Msg) -> granite_types::Result<bool> {
        self.reset_nh_for_dbr(&m);
        self.check_same_type_conflict(m.as_msg_ref())?;
        if !self.check_conflict(&m.as_msg_ref())? {
            let (height, round) = m.height_round();
            warn!(
                vaddr = %hex::encode(&self.vaddr),
                kind = ?m.as_msg_ref().kind(),
                height,
                round,
                "equivocation detected; recording conflicting message"
            );
            self.store_conflict(m);
            self.implicit_pvn = true;
            self.implicit_pcn = true;
            return Ok(false);
        }
        self.check_type_stale(m.as_msg_ref())?;
        self.store(m);
        Ok(true)
    }

    /// Move to the (height, round) a message proves, clearing round-local
    /// state. Height-advance evidence survives unless the move crosses a
    /// height boundary or enters the dead block round, which both
    /// invalidate it.
    fn set_reset(&mut self, m: Msg) {
        let future_height = relate_h(self, &m) == Ordering::Less;
        let (height, round) = m.height_round();
        let entering_dbr = match m.as_msg_ref().kind() {
            // A round advance holds the claims of the round it leaves; it
            // enters the dead block round one earlier.
            MsgKind::NextRound => round == DEAD_BLOCK_ROUND_NR,
            _ => round == DEAD_BLOCK_ROUND,
        };
        if future_height || entering_dbr {
            self.next_height.clear();
        }
        debug!(
            vaddr = %hex::encode(&self.vaddr),
            height,
            round,
            future_height,
            entering_dbr,
            "resetting round state"
        );
        self.reset_round_local();
        self.rcert = m.as_msg_ref().rcert().clone();
        self.store(m);
    }

    /// Clear everything scoped to a single round. Height-advance evidence
    /// and validator identity survive.
    fn reset_round_local(&mut self) {
        self.conflicting_rcert = None;
        self.proposal.clear();
        self.pre_vote.clear();
        self.pre_vote_nil = None;
        self.implicit_pvn = false;
        self.pre_commit.clear();
        self.pre_commit_nil = None;
        self.implicit_pcn = false;
        self.next_round = None;
    }

    /// A dead-block-round message invalidates height-advance evidence from
    /// earlier rounds.
    fn reset_nh_for_dbr(&mut self, m: &Msg) {
        if !is_dead_block_round(m) {
            return;
        }
        if self.next_height.get().is_some_and(|nh| !is_dead_block_round(nh)) {
            self.next_height.clear_seen();
        }
        if self
            .next_height
            .conflicting()
            .is_some_and(|nh| !is_dead_block_round(nh))
        {
            self.next_height.clear_conflict();
        }
    }

    /// Once a round is resolved as equivocating, or a contradictory pair of
    /// the same kind is already recorded, further same-kind messages are
    /// hard errors rather than new evidence.
    fn check_same_type_conflict(&self, a: MsgRef<'_>) -> granite_types::Result<()> {
        if self.implicit_pvn || self.implicit_pcn {
            return Err(ConsensusError::invalid(
                "round already resolved as equivocating",
            ));
        }
        if self.conflicting_rcert.is_some() {
            return Err(ConsensusError::invalid(
                "conflicting round certificate already recorded",
            ));
        }
        match a.kind() {
            MsgKind::Proposal => {
                if self.proposal.has_conflict() {
                    return Err(ConsensusError::invalid(
                        "conflicting proposal already recorded",
                    ));
                }
            }
            MsgKind::PreVote => {
                if self.pre_vote_nil.is_some() {
                    return Err(ConsensusError::invalid("prevote after nil prevote"));
                }
                if self.pre_vote.has_conflict() {
                    return Err(ConsensusError::invalid(
                        "conflicting prevote already recorded",
                    ));
                }
            }
            MsgKind::PreVoteNil => {
                if self.pre_vote.is_set() {
                    return Err(ConsensusError::invalid("nil prevote after prevote"));
                }
            }
            MsgKind::PreCommit => {
                if self.pre_vote_nil.is_some() {
                    return Err(ConsensusError::invalid("precommit after nil prevote"));
                }
                if self.pre_commit_nil.is_some() {
                    return Err(ConsensusError::invalid("precommit after nil precommit"));
                }
                if self.pre_commit.has_conflict() {
                    return Err(ConsensusError::invalid(
                        "conflicting precommit already recorded",
                    ));
                }
            }
            MsgKind::PreCommitNil => {
                if self.pre_commit.is_set() {
                    return Err(ConsensusError::invalid("nil precommit after precommit"));
                }
            }
            MsgKind::NextHeight => {
                if self.next_height.has_conflict() {
                    return Err(ConsensusError::invalid(
                        "conflicting height advance already recorded",
                    ));
                }
            }
            MsgKind::RCert | MsgKind::NextRound => {}
        }
        Ok(())
    }

    /// Compare a current-round message against everything stored. `false`
    /// means the message contradicts the tracked history: a different
    /// previous block, or different block content where both sides carry
    /// blocks.
    fn check_conflict(&self, a: &MsgRef<'_>) -> granite_types::Result<bool> {
        let own = MsgRef::RCert(&self.rcert);
        if !prev_block_equal(a, &own) {
            return Ok(false);
        }
        let carries_block = a.bclaims().is_some();
        if let Some(p) = self.proposal.get() {
            if carries_block && !bclaims_equal(a, &MsgRef::Proposal(p))? {
                return Ok(false);
            }
        }
        if let Some(pv) = self.pre_vote.get() {
            if carries_block && !bclaims_equal(a, &MsgRef::PreVote(pv))? {
                return Ok(false);
            }
        }
        if let Some(pvn) = &self.pre_vote_nil {
            if !prev_block_equal(a, &MsgRef::PreVoteNil(pvn)) {
                return Ok(false);
            }
        }
        if let Some(pc) = self.pre_commit.get() {
            if carries_block && !bclaims_equal(a, &MsgRef::PreCommit(pc))? {
                return Ok(false);
            }
        }
        if let Some(pcn) = &self.pre_commit_nil {
            if !prev_block_equal(a, &MsgRef::PreCommitNil(pcn)) {
                return Ok(false);
            }
        }
        if let Some(nr) = &self.next_round {
            if !prev_block_equal(a, &MsgRef::NextRound(nr)) {
                return Ok(false);
            }
        }
        if let Some(nh) = self.next_height.get() {
            if carries_block && !bclaims_equal(a, &MsgRef::NextHeight(nh))? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Exactly-once per kind: a duplicate non-conflicting message is inert.
    /// Height advances are the exception; a later-round advance supersedes
    /// a staler one.
    fn check_type_stale(&self, a: MsgRef<'_>) -> granite_types::Result<()> {
        let already = match a.kind() {
            MsgKind::Proposal => self.proposal.is_set(),
            MsgKind::PreVote => self.pre_vote.is_set(),
            MsgKind::PreVoteNil => self.pre_vote_nil.is_some(),
            MsgKind::PreCommit => self.pre_commit.is_set(),
            MsgKind::PreCommitNil => self.pre_commit_nil.is_some(),
            MsgKind::NextRound => self.next_round.is_some(),
            MsgKind::NextHeight => self
                .next_height
                .get()
                .is_some_and(|existing| relate_hr(existing, &a) != Ordering::Less),
            MsgKind::RCert => false,
        };
        if already {
            return Err(ConsensusError::stale("message kind already set this round"));
        }
        Ok(())
    }

    fn store(&mut self, m: Msg) {
        match m {
            Msg::RCert(v) => self.rcert = v,
            Msg::Proposal(v) => self.proposal.set(v),
            Msg::PreVote(v) => self.pre_vote.set(v),
            Msg::PreVoteNil(v) => self.pre_vote_nil = Some(v),
            Msg::PreCommit(v) => self.pre_commit.set(v),
            Msg::PreCommitNil(v) => self.pre_commit_nil = Some(v),
            Msg::NextRound(v) => self.next_round = Some(v),
            Msg::NextHeight(v) => self.next_height.set(v),
        }
    }

    /// Record the contradictory message beside the accepted one. Kinds
    /// without block content contradict through their certificate.
    fn store_conflict(&mut self, m: Msg) {
        match m {
            Msg::RCert(v) => self.conflicting_rcert = Some(v),
            Msg::Proposal(v) => self.proposal.record_conflict(v),
            Msg::PreVote(v) => self.pre_vote.record_conflict(v),
            Msg::PreVoteNil(v) => self.conflicting_rcert = Some(v.rcert),
            Msg::PreCommit(v) => self.pre_commit.record_conflict(v),
            Msg::PreCommitNil(v) => self.conflicting_rcert = Some(v.rcert),
            Msg::NextRound(v) => self.conflicting_rcert = Some(v.nrclaims.rcert),
            Msg::NextHeight(v) => self.next_height.record_conflict(v),
        }
    }
}
