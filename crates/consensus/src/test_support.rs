//! Shared fixtures for the in-crate test suites: a dealt validator set and
//! builders for well-formed claim chains at arbitrary (height, round)
//! positions.

use granite_types::test_utils::{deal_group, secp_signer};
use granite_types::{get_account, make_tx_root, BnGroupSigner, Hash, Secp256k1Signer};
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::bclaims::BClaims;
use crate::next_height::NextHeight;
use crate::pclaims::PClaims;
use crate::precommit::PreCommitList;
use crate::prevote::{PreVote, PreVoteList};
use crate::proposal::Proposal;
use crate::rcert::RCert;
use crate::rclaims::RClaims;

pub(crate) struct Ctx {
    pub secp: Vec<Secp256k1Signer>,
    pub accounts: Vec<Vec<u8>>,
    pub group_pubk: Vec<u8>,
    pub group: Vec<BnGroupSigner>,
    pub shares: Vec<Vec<u8>>,
}

/// Deal an `n`-validator set with a 3-of-n group threshold.
pub(crate) fn validators(n: usize, seed: u64) -> Ctx {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let secp: Vec<Secp256k1Signer> = (0..n).map(|_| secp_signer(&mut rng)).collect();
    let accounts = secp
        .iter()
        .map(|s| get_account(&s.pubkey()).unwrap())
        .collect();
    let (group_pubk, group, shares) = deal_group(n, 3.min(n), &mut rng);
    Ctx {
        secp,
        accounts,
        group_pubk,
        group,
        shares,
    }
}

/// Deterministic previous-block hash for a height, shared by every fixture
/// at that height.
pub(crate) fn default_prev(height: u32) -> Hash {
    Hash::digest(format!("prev-{height}").as_bytes())
}

fn aggregate_over(ctx: &Ctx, msg: &[u8]) -> Vec<u8> {
    let sigs: Vec<Vec<u8>> = ctx.group[..3].iter().map(|g| g.sign(msg).unwrap()).collect();
    ctx.group[0].aggregate(&sigs, &ctx.shares).unwrap()
}

/// A round certificate at (height, round) with a real aggregated group
/// signature wherever the protocol requires one.
pub(crate) fn rcert_at(ctx: &Ctx, height: u32, round: u32, prev_block: Hash) -> RCert {
    let rclaims = RClaims {
        chain_id: 1,
        height,
        round,
        prev_block,
    };
    let sig_group = if height == 1 || (height == 2 && round == 1) {
        Vec::new()
    } else if round > 1 {
        aggregate_over(ctx, &rclaims.marshal_binary().unwrap())
    } else {
        aggregate_over(ctx, prev_block.as_bytes())
    };
    RCert { rclaims, sig_group }
}

/// An unsigned proposal with an explicit previous block.
pub(crate) fn proposal_with_prev(
    ctx: &Ctx,
    height: u32,
    round: u32,
    prev_block: Hash,
    txs: &[Hash],
) -> Proposal {
    Proposal {
        pclaims: PClaims {
            bclaims: BClaims {
                chain_id: 1,
                height,
                tx_count: txs.len() as u32,
                prev_block,
                tx_root: make_tx_root(txs),
                state_root: Hash::digest(b"state"),
                header_root: Hash::digest(b"headers"),
            },
            rcert: rcert_at(ctx, height, round, prev_block),
        },
        signature: Vec::new(),
        tx_hsh_lst: txs.to_vec(),
    }
}

/// An unsigned proposal at (height, round) on the default chain.
pub(crate) fn proposal_at(ctx: &Ctx, height: u32, round: u32, txs: &[Hash]) -> Proposal {
    proposal_with_prev(ctx, height, round, default_prev(height), txs)
}

/// A proposal signed by validator 0.
pub(crate) fn signed_proposal(ctx: &Ctx, height: u32, round: u32) -> Proposal {
    signed_proposal_txs(ctx, height, round, &[])
}

/// A signed proposal with chosen transaction content; different content at
/// the same position yields a conflicting block hash over the same
/// previous block.
pub(crate) fn signed_proposal_txs(
    ctx: &Ctx,
    height: u32,
    round: u32,
    txs: &[Hash],
) -> Proposal {
    let mut proposal = proposal_at(ctx, height, round, txs);
    proposal.sign(&ctx.secp[0]).unwrap();
    proposal
}

/// PreVotes from the full validator set.
pub(crate) fn pre_vote_quorum(ctx: &Ctx, proposal: &Proposal) -> Vec<PreVote> {
    ctx.secp
        .iter()
        .map(|s| proposal.pre_vote(s).unwrap())
        .collect()
}

/// Height-advance evidence from validator `i` for a proposal, justified by
/// a 3-commit quorum.
pub(crate) fn next_height_for(ctx: &Ctx, proposal: &Proposal, i: usize) -> NextHeight {
    let pre_commits: Vec<_> = (0..3)
        .map(|j| {
            PreVoteList(pre_vote_quorum(ctx, proposal))
                .make_pre_commit(&ctx.secp[j])
                .unwrap()
        })
        .collect();
    PreCommitList(pre_commits)
        .make_next_height(&ctx.secp[i], &ctx.group[i])
        .unwrap()
}
