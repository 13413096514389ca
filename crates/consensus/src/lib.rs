//! Consensus message objects and the per-validator round state machine.
//!
//! This crate implements the message layer that drives block finalization:
//!
//! - **Claim chain**: [`RClaims`], [`BClaims`], [`RCert`], [`PClaims`] —
//!   immutable value objects with canonical encodings
//! - **Votes and certificates**: [`Proposal`], [`PreVote`]/[`PreVoteNil`],
//!   [`PreCommit`]/[`PreCommitNil`], [`NextRound`], [`NextHeight`],
//!   [`BlockHeader`] — signed wrappers over the claim chain
//! - **Quorum aggregation**: the list types that fold a quorum of messages
//!   into the next certificate via threshold-signature aggregation
//! - **Round state**: [`RoundState`], tracking one validator's message
//!   sequence per height and detecting equivocation and staleness
//! - **Relations**: the total orders over (height, round) shared with the
//!   download and sync layers
//!
//! Everything here is synchronous, in-memory data: no interior threading,
//! no I/O. Callers serialize access per `RoundState` instance and own all
//! persistence.

mod bclaims;
mod block_header;
mod codec;
mod keys;
mod next_height;
mod next_round;
mod pclaims;
mod precommit;
mod prevote;
mod proposal;
mod rcert;
mod rclaims;
pub mod relation;
mod round_state;

#[cfg(test)]
pub(crate) mod test_support;

pub use bclaims::BClaims;
pub use block_header::BlockHeader;
pub use keys::{RoundStateCurrentKey, RoundStateHistoricKey};
pub use next_height::{NHClaims, NextHeight, NextHeightList};
pub use next_round::{NRClaims, NextRound, NextRoundList};
pub use pclaims::PClaims;
pub use precommit::{PreCommit, PreCommitList, PreCommitNil};
pub use prevote::{PreVote, PreVoteList, PreVoteNil};
pub use proposal::Proposal;
pub use rcert::RCert;
pub use rclaims::RClaims;
pub use relation::{
    bclaims_equal, is_dead_block_round, prev_block_equal, proposer_index, relate_h, relate_hr,
    HasHeightRound, MsgKind, MsgRef,
};
pub use round_state::{RoundState, Slot};
