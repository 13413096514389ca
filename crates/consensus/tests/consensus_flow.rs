//! End-to-end consensus flows: a validator set driving proposals through
//! votes, certificates and finalized headers, across multiple heights.

use granite_consensus::{
    BClaims, BlockHeader, NextHeightList, NextRoundList, PClaims, PreCommit, PreCommitList,
    PreVoteList, Proposal, RCert, RClaims, RoundState,
};
use granite_types::test_utils::{deal_group, secp_signer};
use granite_types::{
    get_account, make_tx_root, BnGroupSigner, BnGroupValidator, Hash, Secp256k1Signer,
    Secp256k1Validator,
};
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;

struct ValidatorSet {
    secp: Vec<Secp256k1Signer>,
    accounts: Vec<Vec<u8>>,
    group_pubk: Vec<u8>,
    group: Vec<BnGroupSigner>,
    shares: Vec<Vec<u8>>,
}

fn validator_set(seed: u64) -> ValidatorSet {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let secp: Vec<Secp256k1Signer> = (0..4).map(|_| secp_signer(&mut rng)).collect();
    let accounts = secp
        .iter()
        .map(|s| get_account(&s.pubkey()).unwrap())
        .collect();
    let (group_pubk, group, shares) = deal_group(4, 3, &mut rng);
    ValidatorSet {
        secp,
        accounts,
        group_pubk,
        group,
        shares,
    }
}

fn bclaims(height: u32, prev_block: Hash, txs: &[Hash]) -> BClaims {
    BClaims {
        chain_id: 1,
        height,
        tx_count: txs.len() as u32,
        prev_block,
        tx_root: make_tx_root(txs),
        state_root: Hash::digest(&height.to_be_bytes()),
        header_root: Hash::digest(b"headers"),
    }
}

/// Drive one height from proposal to finalized header: every validator
/// prevotes, three build precommits and height advances, and the shares
/// aggregate into the header.
fn finalize_height(vs: &ValidatorSet, rcert: RCert, txs: &[Hash]) -> BlockHeader {
    let height = rcert.rclaims.height;
    let mut proposal = Proposal {
        pclaims: PClaims {
            bclaims: bclaims(height, rcert.rclaims.prev_block, txs),
            rcert,
        },
        signature: Vec::new(),
        tx_hsh_lst: txs.to_vec(),
    };
    proposal.sign(&vs.secp[0]).unwrap();
    assert_eq!(
        proposal
            .validate_signatures(&Secp256k1Validator, &BnGroupValidator)
            .unwrap(),
        vs.accounts[0]
    );

    let pre_votes: Vec<_> = vs
        .secp
        .iter()
        .map(|s| proposal.pre_vote(s).unwrap())
        .collect();
    for (pv, account) in pre_votes.iter().zip(&vs.accounts) {
        assert_eq!(
            pv.validate_signatures(&Secp256k1Validator, &BnGroupValidator)
                .unwrap(),
            *account
        );
    }

    let pre_commits: Vec<PreCommit> = (0..3)
        .map(|i| {
            PreVoteList(pre_votes.clone())
                .make_pre_commit(&vs.secp[i])
                .unwrap()
        })
        .collect();
    let next_heights: Vec<_> = (0..3)
        .map(|i| {
            PreCommitList(pre_commits.clone())
                .make_next_height(&vs.secp[i], &vs.group[i])
                .unwrap()
        })
        .collect();

    NextHeightList(next_heights)
        .make_block_header(&vs.group[0], &vs.shares)
        .unwrap()
}

#[test]
fn four_validators_finalize_a_block() {
    let vs = validator_set(1);
    let genesis = RCert {
        rclaims: RClaims {
            chain_id: 1,
            height: 2,
            round: 1,
            prev_block: Hash::digest(b"block-1"),
        },
        sig_group: Vec::new(),
    };

    let txs = [Hash::digest(b"tx-a"), Hash::digest(b"tx-b")];
    let header = finalize_height(&vs, genesis, &txs);
    assert_eq!(header.bclaims.height, 2);
    assert_eq!(header.tx_hsh_lst, txs.to_vec());
    assert_eq!(
        header.validate_signatures(&BnGroupValidator).unwrap(),
        vs.group_pubk
    );
}

#[test]
fn three_height_chain_links_through_block_hashes() {
    let vs = validator_set(2);

    // The genesis header predates the group and carries no signature; its
    // derived certificate seeds height 2.
    let genesis = BlockHeader {
        bclaims: bclaims(1, Hash::digest(b"genesis"), &[]),
        sig_group: Vec::new(),
        tx_hsh_lst: Vec::new(),
    };
    assert_eq!(
        genesis.validate_signatures(&BnGroupValidator).unwrap(),
        Vec::<u8>::new()
    );
    let mut rcert = genesis.get_rcert().unwrap();
    assert_eq!(rcert.rclaims.height, 2);
    assert_eq!(rcert.rclaims.prev_block, genesis.block_hash().unwrap());
    rcert.validate_signature(&BnGroupValidator).unwrap();

    let mut headers = Vec::new();
    for height in 2..=4u32 {
        let txs = [Hash::digest(&[height as u8])];
        let header = finalize_height(&vs, rcert.clone(), &txs);
        rcert = header.get_rcert().unwrap();
        assert_eq!(rcert.rclaims.height, height + 1);
        assert_eq!(rcert.rclaims.prev_block, header.block_hash().unwrap());
        assert_eq!(
            rcert.validate_signature(&BnGroupValidator).unwrap(),
            vs.group_pubk
        );
        headers.push(header);
    }

    // Each header's claims chain to the one before it.
    for pair in headers.windows(2) {
        assert_eq!(
            pair[1].bclaims.prev_block,
            pair[0].block_hash().unwrap()
        );
    }

    // A proposal whose content contradicts the certified chain tip fails
    // before any signature is checked.
    let forked = Proposal {
        pclaims: PClaims {
            bclaims: bclaims(rcert.rclaims.height, Hash::digest(b"forked tip"), &[]),
            rcert: rcert.clone(),
        },
        signature: vec![0u8; 65],
        tx_hsh_lst: Vec::new(),
    };
    assert!(forked
        .validate_signatures(&Secp256k1Validator, &BnGroupValidator)
        .unwrap_err()
        .is_invalid());
}

#[test]
fn round_state_tracks_a_validator_through_a_full_height() {
    let vs = validator_set(3);
    let rcert = RCert {
        rclaims: RClaims {
            chain_id: 1,
            height: 2,
            round: 1,
            prev_block: Hash::digest(b"block-1"),
        },
        sig_group: Vec::new(),
    };

    let mut rs = RoundState::new(
        vs.accounts[1].clone(),
        vs.group_pubk.clone(),
        vs.shares[1].clone(),
        1,
        rcert.clone(),
    )
    .unwrap();

    let mut proposal = Proposal {
        pclaims: PClaims {
            bclaims: bclaims(2, rcert.rclaims.prev_block, &[]),
            rcert,
        },
        signature: Vec::new(),
        tx_hsh_lst: Vec::new(),
    };
    proposal.sign(&vs.secp[0]).unwrap();

    // The engine validates, then feeds the state machine.
    proposal
        .validate_signatures(&Secp256k1Validator, &BnGroupValidator)
        .unwrap();
    assert!(rs.set_proposal(proposal.clone()).unwrap());

    let pv = proposal.pre_vote(&vs.secp[1]).unwrap();
    pv.validate_signatures(&Secp256k1Validator, &BnGroupValidator)
        .unwrap();
    assert!(rs.set_pre_vote(pv.clone()).unwrap());

    let pre_votes: Vec<_> = vs
        .secp
        .iter()
        .map(|s| proposal.pre_vote(s).unwrap())
        .collect();
    let pc = PreVoteList(pre_votes)
        .make_pre_commit(&vs.secp[1])
        .unwrap();
    pc.validate_signatures(&Secp256k1Validator, &BnGroupValidator)
        .unwrap();
    assert!(rs.set_pre_commit(pc.clone()).unwrap());

    let nh = PreCommitList(vec![pc.clone(), pc.clone(), pc])
        .make_next_height(&vs.secp[1], &vs.group[1])
        .unwrap();
    nh.validate_signatures(&Secp256k1Validator, &BnGroupValidator)
        .unwrap();
    assert!(rs.set_next_height(nh).unwrap());

    let rc = rs.rcert().clone();
    assert!(rs.proposal_current(&rc));
    assert!(rs.pre_vote_current(&rc));
    assert!(rs.pre_commit_current(&rc));
    assert!(rs.next_height_current(&rc));
}

#[test]
fn stalled_round_advances_through_next_round_aggregation() {
    let vs = validator_set(4);

    // Height 3 with a certified round 1; nothing commits, so three
    // validators vote to advance.
    let prev_block = Hash::digest(b"block-2");
    let rclaims = RClaims {
        chain_id: 1,
        height: 3,
        round: 1,
        prev_block,
    };
    let sigs: Vec<Vec<u8>> = vs.group[..3]
        .iter()
        .map(|g| g.sign(prev_block.as_bytes()).unwrap())
        .collect();
    let sig_group = vs.group[0].aggregate(&sigs, &vs.shares).unwrap();
    let stalled = RCert { rclaims, sig_group };
    stalled.validate_signature(&BnGroupValidator).unwrap();

    let advances: Vec<_> = (0..3)
        .map(|i| stalled.next_round(&vs.secp[i], &vs.group[i]).unwrap())
        .collect();
    for (nr, account) in advances.iter().zip(&vs.accounts) {
        assert_eq!(
            nr.validate_signatures(&Secp256k1Validator, &BnGroupValidator)
                .unwrap(),
            *account
        );
    }

    let next_cert = NextRoundList(advances)
        .make_round_cert(&vs.group[0], &vs.shares)
        .unwrap();
    assert_eq!(next_cert.rclaims.round, 2);
    assert_eq!(
        next_cert.validate_signature(&BnGroupValidator).unwrap(),
        vs.group_pubk
    );

    // The advanced certificate reseeds a round state at the new round.
    let mut rs = RoundState::new(
        vs.accounts[0].clone(),
        vs.group_pubk.clone(),
        vs.shares[0].clone(),
        0,
        stalled,
    )
    .unwrap();
    rs.set_rcert(next_cert).unwrap();
    assert_eq!(rs.rcert().rclaims.round, 2);
}

#[test]
fn signatures_do_not_replay_across_message_kinds() {
    let vs = validator_set(5);
    let rcert = RCert {
        rclaims: RClaims {
            chain_id: 1,
            height: 2,
            round: 1,
            prev_block: Hash::digest(b"block-1"),
        },
        sig_group: Vec::new(),
    };

    // Same signer, same certificate bytes, different kinds.
    let pvn = rcert.pre_vote_nil(&vs.secp[0]).unwrap();
    let pcn = rcert.pre_commit_nil(&vs.secp[0]).unwrap();
    assert_ne!(pvn.signature, pcn.signature);

    let account = pvn
        .validate_signatures(&Secp256k1Validator, &BnGroupValidator)
        .unwrap();
    assert_eq!(account, vs.accounts[0]);

    // Replaying the nil-prevote signature as a nil-precommit misattributes
    // or fails; it can never come back as the real signer.
    let replayed = granite_consensus::PreCommitNil {
        rcert: rcert.clone(),
        signature: pvn.signature.clone(),
    };
    match replayed.validate_signatures(&Secp256k1Validator, &BnGroupValidator) {
        Ok(account) => assert_ne!(account, vs.accounts[0]),
        Err(e) => assert!(e.is_invalid()),
    }
}
