//! Signer and validator capabilities consumed by the consensus objects.
//!
//! Two signature roles exist:
//!
//! - **Per-validator** ([`Secp256k1Signer`] / [`Secp256k1Validator`]):
//!   recoverable ECDSA over secp256k1. Validation recovers the signer's
//!   public key from the signature, so every message attributes itself to a
//!   validator account without carrying the key.
//! - **Threshold group** ([`BnGroupSigner`] / [`BnGroupValidator`]): BLS
//!   signatures on BLS12-381 where each validator holds a share of the
//!   group secret. A quorum of shares aggregates (Lagrange interpolation at
//!   zero) into one signature verifiable against the single group public
//!   key.
//!
//! Signature blobs embed the public key of their producer
//! (`pubkey ‖ point`), so validation both checks and *returns* the key.
//! The core never generates keys; dealing helpers live behind the
//! `test-utils` feature.

use bls12_381_plus::{
    multi_miller_loop, G1Affine, G1Projective, G2Affine, G2Prepared, G2Projective, Gt, Scalar,
};
use ff::Field;
use group::{Curve, Group};
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha3::{Digest, Keccak256};
use std::fmt;
use std::ops::Neg;
use zeroize::Zeroize;

use crate::constants::{
    ADDRESS_LEN, GROUP_PUBKEY_LEN, GROUP_SIGNATURE_LEN, GROUP_SIG_POINT_LEN, SECP_SIGNATURE_LEN,
};

/// Hash-to-curve domain tag for group signatures.
const DST_GROUP_SIG: &[u8] = b"GRANITE_BN_GROUP_SIG_V1";

/// Errors from the signer/validator capabilities.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// Secret key bytes were out of range or all zero.
    #[error("invalid secret key")]
    InvalidSecretKey,
    /// Public key bytes did not decode to a curve point.
    #[error("invalid public key")]
    InvalidPublicKey,
    /// Signature bytes had the wrong length or did not decode.
    #[error("malformed signature")]
    MalformedSignature,
    /// The signature did not verify against the recovered key.
    #[error("signature verification failed")]
    VerificationFailed,
    /// A share signature's embedded key is not in the published share set.
    #[error("unknown signer share")]
    UnknownShare,
    /// The same share appeared twice in an aggregation input.
    #[error("duplicate signer share")]
    DuplicateShare,
    /// Aggregation was attempted before the group public key was set.
    #[error("group public key not set")]
    MissingGroupKey,
    /// Aggregation over an empty signature list.
    #[error("empty signer set")]
    EmptySignerSet,
}

fn keccak(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let out = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&out);
    bytes
}

// ═══════════════════════════════════════════════════════════════════════════
// Per-validator secp256k1
// ═══════════════════════════════════════════════════════════════════════════

/// Per-validator signer producing recoverable ECDSA signatures.
pub struct Secp256k1Signer {
    key: SigningKey,
}

impl Secp256k1Signer {
    /// Build a signer from 32 secret-key bytes.
    pub fn new(secret: &[u8]) -> Result<Self, CryptoError> {
        let key = SigningKey::from_slice(secret).map_err(|_| CryptoError::InvalidSecretKey)?;
        Ok(Secp256k1Signer { key })
    }

    /// The compressed SEC1 public key of this signer.
    pub fn pubkey(&self) -> Vec<u8> {
        self.key
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }

    /// Sign the Keccak-256 digest of `msg`, returning `r ‖ s ‖ recovery id`.
    pub fn sign(&self, msg: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let digest = keccak(msg);
        let (sig, recid) = self
            .key
            .sign_prehash_recoverable(&digest)
            .map_err(|_| CryptoError::MalformedSignature)?;
        let mut out = Vec::with_capacity(SECP_SIGNATURE_LEN);
        out.extend_from_slice(&sig.to_bytes());
        out.push(recid.to_byte());
        Ok(out)
    }
}

impl fmt::Debug for Secp256k1Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secp256k1Signer({})", hex::encode(&self.pubkey()[..6]))
    }
}

/// Stateless validator for recoverable ECDSA signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Validator;

impl Secp256k1Validator {
    /// Recover and return the compressed public key that produced `sig`
    /// over `msg`. Fails if the signature does not decode or recover.
    pub fn validate(&self, msg: &[u8], sig: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if sig.len() != SECP_SIGNATURE_LEN {
            return Err(CryptoError::MalformedSignature);
        }
        let signature = EcdsaSignature::from_slice(&sig[..64])
            .map_err(|_| CryptoError::MalformedSignature)?;
        let recid = RecoveryId::from_byte(sig[64]).ok_or(CryptoError::MalformedSignature)?;
        let digest = keccak(msg);
        let vk = VerifyingKey::recover_from_prehash(&digest, &signature, recid)
            .map_err(|_| CryptoError::VerificationFailed)?;
        Ok(vk.to_encoded_point(true).as_bytes().to_vec())
    }
}

/// Derive the 20-byte account address for a secp256k1 public key:
/// the low 20 bytes of the Keccak-256 of the uncompressed point.
pub fn get_account(pubkey: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let vk = VerifyingKey::from_sec1_bytes(pubkey).map_err(|_| CryptoError::InvalidPublicKey)?;
    let uncompressed = vk.to_encoded_point(false);
    let digest = keccak(&uncompressed.as_bytes()[1..]);
    Ok(digest[32 - ADDRESS_LEN..].to_vec())
}

// ═══════════════════════════════════════════════════════════════════════════
// Threshold group BLS
// ═══════════════════════════════════════════════════════════════════════════

/// Hash a message onto G1 with a domain tag.
fn hash_to_g1(msg: &[u8], dst: &[u8]) -> G1Projective {
    let mut first = Keccak256::new();
    first.update(dst);
    first.update((msg.len() as u64).to_le_bytes());
    first.update(msg);
    let h1 = first.finalize();

    let mut second = Keccak256::new();
    second.update(&h1);
    second.update(b"_wide");
    let h2 = second.finalize();

    let mut wide = [0u8; 64];
    wide[..32].copy_from_slice(&h1);
    wide[32..].copy_from_slice(&h2);
    G1Projective::generator() * Scalar::from_bytes_wide(&wide)
}

fn g2_from_bytes(bytes: &[u8]) -> Result<G2Affine, CryptoError> {
    if bytes.len() != GROUP_PUBKEY_LEN {
        return Err(CryptoError::InvalidPublicKey);
    }
    let mut buf = [0u8; GROUP_PUBKEY_LEN];
    buf.copy_from_slice(bytes);
    Option::<G2Affine>::from(G2Affine::from_compressed(&buf))
        .ok_or(CryptoError::InvalidPublicKey)
}

fn g1_from_bytes(bytes: &[u8]) -> Result<G1Affine, CryptoError> {
    if bytes.len() != GROUP_SIG_POINT_LEN {
        return Err(CryptoError::MalformedSignature);
    }
    let mut buf = [0u8; GROUP_SIG_POINT_LEN];
    buf.copy_from_slice(bytes);
    Option::<G1Affine>::from(G1Affine::from_compressed(&buf))
        .ok_or(CryptoError::MalformedSignature)
}

/// Pairing check `e(sig, g2) == e(H(m), pk)`.
fn pairing_verify(msg: &[u8], sig: &G1Affine, pubkey: &G2Affine) -> bool {
    let h = hash_to_g1(msg, DST_GROUP_SIG).to_affine();
    let g2_neg = G2Prepared::from(G2Affine::generator().neg());
    let pk = G2Prepared::from(*pubkey);
    let result = multi_miller_loop(&[(sig, &g2_neg), (&h, &pk)]).final_exponentiation();
    result == Gt::identity()
}

/// Holder of one share of the group secret.
///
/// Produces signature shares and, given a quorum of shares from distinct
/// group members, aggregates them into the single group signature.
pub struct BnGroupSigner {
    share_secret: Scalar,
    share_pubkey: G2Affine,
    group_pubkey: Option<G2Affine>,
}

impl BnGroupSigner {
    /// Build a group signer from 32 little-endian secret share bytes.
    pub fn new(secret: &[u8]) -> Result<Self, CryptoError> {
        if secret.len() != 32 {
            return Err(CryptoError::InvalidSecretKey);
        }
        let mut buf = [0u8; 32];
        buf.copy_from_slice(secret);
        let share_secret =
            Option::<Scalar>::from(Scalar::from_le_bytes(&buf)).ok_or(CryptoError::InvalidSecretKey)?;
        buf.zeroize();
        if bool::from(share_secret.is_zero()) {
            return Err(CryptoError::InvalidSecretKey);
        }
        let share_pubkey = (G2Projective::generator() * share_secret).to_affine();
        Ok(BnGroupSigner {
            share_secret,
            share_pubkey,
            group_pubkey: None,
        })
    }

    /// Register the group public key this signer aggregates under.
    pub fn set_group_pubk(&mut self, group_pubk: &[u8]) -> Result<(), CryptoError> {
        self.group_pubkey = Some(g2_from_bytes(group_pubk)?);
        Ok(())
    }

    /// The compressed public key of this signer's share.
    pub fn pubkey_share(&self) -> Vec<u8> {
        self.share_pubkey.to_compressed().to_vec()
    }

    /// Produce a signature share over `msg`: `share_pubkey ‖ point`.
    pub fn sign(&self, msg: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let point = (hash_to_g1(msg, DST_GROUP_SIG) * self.share_secret).to_affine();
        let mut out = Vec::with_capacity(GROUP_SIGNATURE_LEN);
        out.extend_from_slice(&self.share_pubkey.to_compressed());
        out.extend_from_slice(&point.to_compressed());
        Ok(out)
    }

    /// Aggregate a quorum of signature shares into the group signature.
    ///
    /// `group_shares` is the published, ordered list of every member's share
    /// public key; each input share is located there to recover its
    /// interpolation index. Returns `group_pubkey ‖ point`.
    pub fn aggregate(
        &self,
        sigs: &[Vec<u8>],
        group_shares: &[Vec<u8>],
    ) -> Result<Vec<u8>, CryptoError> {
        let group_pubkey = self.group_pubkey.ok_or(CryptoError::MissingGroupKey)?;
        if sigs.is_empty() {
            return Err(CryptoError::EmptySignerSet);
        }

        let mut indices: Vec<u64> = Vec::with_capacity(sigs.len());
        let mut points: Vec<G1Affine> = Vec::with_capacity(sigs.len());
        for sig in sigs {
            if sig.len() != GROUP_SIGNATURE_LEN {
                return Err(CryptoError::MalformedSignature);
            }
            let share_key = &sig[..GROUP_PUBKEY_LEN];
            let idx = group_shares
                .iter()
                .position(|s| s.as_slice() == share_key)
                .ok_or(CryptoError::UnknownShare)?;
            let x = idx as u64 + 1;
            if indices.contains(&x) {
                return Err(CryptoError::DuplicateShare);
            }
            indices.push(x);
            points.push(g1_from_bytes(&sig[GROUP_PUBKEY_LEN..])?);
        }

        // Lagrange interpolation at zero over the participating indices.
        let mut agg = G1Projective::identity();
        for (i, point) in points.iter().enumerate() {
            let xi = Scalar::from(indices[i]);
            let mut coeff = Scalar::ONE;
            for (j, &xj) in indices.iter().enumerate() {
                if i == j {
                    continue;
                }
                let xj = Scalar::from(xj);
                let denom = Option::<Scalar>::from((xj - xi).invert())
                    .ok_or(CryptoError::DuplicateShare)?;
                coeff *= xj * denom;
            }
            agg += G1Projective::from(*point) * coeff;
        }

        let mut out = Vec::with_capacity(GROUP_SIGNATURE_LEN);
        out.extend_from_slice(&group_pubkey.to_compressed());
        out.extend_from_slice(&agg.to_affine().to_compressed());
        Ok(out)
    }
}

impl Drop for BnGroupSigner {
    fn drop(&mut self) {
        // Scalar does not expose mutable bytes; overwrite with a constant so
        // the secret does not outlive the signer in reusable stack frames.
        self.share_secret = Scalar::ZERO;
    }
}

impl fmt::Debug for BnGroupSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BnGroupSigner({})",
            hex::encode(&self.pubkey_share()[..6])
        )
    }
}

/// Stateless validator for group signatures and signature shares.
#[derive(Debug, Clone, Copy, Default)]
pub struct BnGroupValidator;

impl BnGroupValidator {
    /// Verify `sig` over `msg` and return the embedded public key
    /// (the group key for aggregated signatures, the share key for shares).
    pub fn validate(&self, msg: &[u8], sig: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if sig.len() != GROUP_SIGNATURE_LEN {
            return Err(CryptoError::MalformedSignature);
        }
        let pubkey = g2_from_bytes(&sig[..GROUP_PUBKEY_LEN])?;
        let point = g1_from_bytes(&sig[GROUP_PUBKEY_LEN..])?;
        if !pairing_verify(msg, &point, &pubkey) {
            return Err(CryptoError::VerificationFailed);
        }
        Ok(sig[..GROUP_PUBKEY_LEN].to_vec())
    }

    /// Extract the embedded public key without verifying. Used for
    /// attribution before full validation.
    pub fn pubkey_from_sig(&self, sig: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if sig.len() != GROUP_SIGNATURE_LEN {
            return Err(CryptoError::MalformedSignature);
        }
        g2_from_bytes(&sig[..GROUP_PUBKEY_LEN])?;
        Ok(sig[..GROUP_PUBKEY_LEN].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{deal_group, secp_signer};
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn secp_sign_recover_round_trip() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let signer = secp_signer(&mut rng);
        let msg = b"attributable message";
        let sig = signer.sign(msg).unwrap();
        assert_eq!(sig.len(), SECP_SIGNATURE_LEN);

        let recovered = Secp256k1Validator.validate(msg, &sig).unwrap();
        assert_eq!(recovered, signer.pubkey());
        assert_eq!(get_account(&recovered).unwrap().len(), ADDRESS_LEN);
    }

    #[test]
    fn secp_rejects_tampered_message() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let signer = secp_signer(&mut rng);
        let sig = signer.sign(b"original").unwrap();
        // Recovery over a different message yields a different key, never
        // the signer's.
        match Secp256k1Validator.validate(b"tampered", &sig) {
            Ok(pk) => assert_ne!(pk, signer.pubkey()),
            Err(e) => assert_eq!(e, CryptoError::VerificationFailed),
        }
    }

    #[test]
    fn group_share_sign_and_validate() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let (group_pubk, signers, _shares) = deal_group(4, 3, &mut rng);
        assert_eq!(group_pubk.len(), GROUP_PUBKEY_LEN);

        let share_sig = signers[0].sign(b"share payload").unwrap();
        let key = BnGroupValidator.validate(b"share payload", &share_sig).unwrap();
        assert_eq!(key, signers[0].pubkey_share());
        assert!(BnGroupValidator.validate(b"other payload", &share_sig).is_err());
    }

    #[test]
    fn threshold_aggregation_validates_against_group_key() {
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let (group_pubk, signers, shares) = deal_group(4, 3, &mut rng);
        let msg = b"certified content";

        let sigs: Vec<Vec<u8>> = signers[..3].iter().map(|s| s.sign(msg).unwrap()).collect();
        let group_sig = signers[0].aggregate(&sigs, &shares).unwrap();
        let recovered = BnGroupValidator.validate(msg, &group_sig).unwrap();
        assert_eq!(recovered, group_pubk);

        // Any quorum-sized subset reconstructs the same signature.
        let other: Vec<Vec<u8>> = signers[1..4].iter().map(|s| s.sign(msg).unwrap()).collect();
        let other_sig = signers[1].aggregate(&other, &shares).unwrap();
        assert_eq!(other_sig, group_sig);
    }

    #[test]
    fn aggregation_rejects_foreign_and_duplicate_shares() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let (_, signers, shares) = deal_group(4, 3, &mut rng);
        let (_, outsiders, _) = deal_group(4, 3, &mut rng);
        let msg = b"payload";

        let mut sigs: Vec<Vec<u8>> = signers[..2].iter().map(|s| s.sign(msg).unwrap()).collect();
        sigs.push(outsiders[0].sign(msg).unwrap());
        assert_eq!(
            signers[0].aggregate(&sigs, &shares).unwrap_err(),
            CryptoError::UnknownShare
        );

        let dup = vec![
            signers[0].sign(msg).unwrap(),
            signers[0].sign(msg).unwrap(),
            signers[1].sign(msg).unwrap(),
        ];
        assert_eq!(
            signers[0].aggregate(&dup, &shares).unwrap_err(),
            CryptoError::DuplicateShare
        );
    }

    #[test]
    fn aggregation_requires_group_key() {
        let mut rng = ChaCha20Rng::seed_from_u64(6);
        let (_, signers, shares) = deal_group(4, 3, &mut rng);
        let mut bare = BnGroupSigner::new(&{
            let mut b = [7u8; 32];
            b[31] = 0;
            b
        })
        .unwrap();
        let sigs: Vec<Vec<u8>> = signers[..3].iter().map(|s| s.sign(b"m").unwrap()).collect();
        assert_eq!(
            bare.aggregate(&sigs, &shares).unwrap_err(),
            CryptoError::MissingGroupKey
        );
        bare.set_group_pubk(&signers[0].pubkey_share()).unwrap();
        assert!(bare.aggregate(&sigs, &shares).is_ok());
    }
}
