//! Foundational types for Granite consensus.
//!
//! This crate provides the foundation layer used throughout the consensus
//! implementation:
//!
//! - **Primitives**: the 32-byte [`Hash`] and Keccak-256 digesting
//! - **Signer capabilities**: per-validator recoverable ECDSA and the
//!   BN threshold group scheme with Lagrange share aggregation
//! - **Domain separation**: one signing tag per consensus message kind
//! - **Tx root**: the sparse Merkle trie over a block's transaction set
//! - **Errors**: the Invalid / Stale / Corrupt consensus error model
//!
//! # Design Philosophy
//!
//! This crate is self-contained with minimal dependencies. It does not
//! depend on any other workspace crates, making it the foundation layer.
//! Key material is only ever *consumed* here; generation helpers exist
//! solely behind the `test-utils` feature.

pub mod constants;
mod crypto;
mod error;
mod hash;
mod merkle;
pub mod signing;

pub use crypto::{
    get_account, BnGroupSigner, BnGroupValidator, CryptoError, Secp256k1Signer, Secp256k1Validator,
};
pub use error::{ConsensusError, Result};
pub use hash::{Hash, HexError};
pub use merkle::make_tx_root;

/// Test utilities: deterministic key material for exercising the signer
/// capabilities. Never compiled into production consumers.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    use crate::constants::GROUP_PUBKEY_LEN;
    use crate::crypto::{BnGroupSigner, Secp256k1Signer};
    use bls12_381_plus::{G2Projective, Scalar};
    use ff::Field;
    use group::{Curve, Group};
    use rand::RngCore;

    fn random_scalar(rng: &mut impl RngCore) -> Scalar {
        let mut wide = [0u8; 64];
        rng.fill_bytes(&mut wide);
        Scalar::from_bytes_wide(&wide)
    }

    /// A per-validator signer with a random secret key.
    pub fn secp_signer(rng: &mut impl RngCore) -> Secp256k1Signer {
        loop {
            let mut secret = [0u8; 32];
            rng.fill_bytes(&mut secret);
            if let Ok(signer) = Secp256k1Signer::new(&secret) {
                return signer;
            }
        }
    }

    /// Deal an `n`-member group with reconstruction threshold `t`.
    ///
    /// Returns the compressed group public key, one configured signer per
    /// member, and the published list of share public keys (index order
    /// matches the dealt polynomial evaluation points).
    pub fn deal_group(
        n: usize,
        t: usize,
        rng: &mut impl RngCore,
    ) -> (Vec<u8>, Vec<BnGroupSigner>, Vec<Vec<u8>>) {
        assert!(t >= 1 && t <= n, "threshold must be in 1..=n");
        let coeffs: Vec<Scalar> = (0..t).map(|_| random_scalar(rng)).collect();
        let group_pubkey: [u8; GROUP_PUBKEY_LEN] =
            (G2Projective::generator() * coeffs[0]).to_affine().to_compressed();

        let mut signers = Vec::with_capacity(n);
        let mut share_pubkeys = Vec::with_capacity(n);
        for i in 0..n {
            let x = Scalar::from(i as u64 + 1);
            // Horner evaluation of the dealing polynomial at x.
            let mut secret = Scalar::ZERO;
            for coeff in coeffs.iter().rev() {
                secret = secret * x + *coeff;
            }
            let mut signer = BnGroupSigner::new(&secret.to_le_bytes())
                .expect("dealt share is a valid nonzero scalar");
            signer
                .set_group_pubk(&group_pubkey)
                .expect("dealt group key is a valid point");
            share_pubkeys.push(signer.pubkey_share());
            signers.push(signer);
        }
        (group_pubkey.to_vec(), signers, share_pubkeys)
    }
}
