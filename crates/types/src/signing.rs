//! Domain-separated signing payloads.
//!
//! Every signable consensus object signs `domain_tag ‖ canonical_encoding`.
//! The tags are distinct per message kind so a signature produced for one
//! kind can never be replayed as another kind that happens to share byte
//! content. The tag bytes are network constants: changing one breaks
//! interoperability with all previously signed history.

/// Domain tag for Proposal signatures.
pub const DOMAIN_PROPOSAL: &[u8] = b"GRANITE_SIG_PROPOSAL_V1";
/// Domain tag for PreVote signatures.
pub const DOMAIN_PRE_VOTE: &[u8] = b"GRANITE_SIG_PREVOTE_V1";
/// Domain tag for PreVoteNil signatures.
pub const DOMAIN_PRE_VOTE_NIL: &[u8] = b"GRANITE_SIG_PREVOTE_NIL_V1";
/// Domain tag for PreCommit signatures.
pub const DOMAIN_PRE_COMMIT: &[u8] = b"GRANITE_SIG_PRECOMMIT_V1";
/// Domain tag for PreCommitNil signatures.
pub const DOMAIN_PRE_COMMIT_NIL: &[u8] = b"GRANITE_SIG_PRECOMMIT_NIL_V1";
/// Domain tag for NextRound signatures.
pub const DOMAIN_NEXT_ROUND: &[u8] = b"GRANITE_SIG_NEXTROUND_V1";
/// Domain tag for NextHeight signatures.
pub const DOMAIN_NEXT_HEIGHT: &[u8] = b"GRANITE_SIG_NEXTHEIGHT_V1";

fn tagged(domain: &[u8], canonical: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(domain.len() + canonical.len());
    out.extend_from_slice(domain);
    out.extend_from_slice(canonical);
    out
}

/// Signing payload for a Proposal over its canonical PClaims encoding.
pub fn proposal_message(canonical: &[u8]) -> Vec<u8> {
    tagged(DOMAIN_PROPOSAL, canonical)
}

/// Signing payload for a PreVote over its canonical Proposal encoding.
pub fn pre_vote_message(canonical: &[u8]) -> Vec<u8> {
    tagged(DOMAIN_PRE_VOTE, canonical)
}

/// Signing payload for a PreVoteNil over its canonical RCert encoding.
pub fn pre_vote_nil_message(canonical: &[u8]) -> Vec<u8> {
    tagged(DOMAIN_PRE_VOTE_NIL, canonical)
}

/// Signing payload for a PreCommit over its canonical Proposal encoding.
pub fn pre_commit_message(canonical: &[u8]) -> Vec<u8> {
    tagged(DOMAIN_PRE_COMMIT, canonical)
}

/// Signing payload for a PreCommitNil over its canonical RCert encoding.
pub fn pre_commit_nil_message(canonical: &[u8]) -> Vec<u8> {
    tagged(DOMAIN_PRE_COMMIT_NIL, canonical)
}

/// Signing payload for a NextRound over its canonical NRClaims encoding.
pub fn next_round_message(canonical: &[u8]) -> Vec<u8> {
    tagged(DOMAIN_NEXT_ROUND, canonical)
}

/// Signing payload for a NextHeight over its canonical NHClaims encoding.
pub fn next_height_message(canonical: &[u8]) -> Vec<u8> {
    tagged(DOMAIN_NEXT_HEIGHT, canonical)
}
