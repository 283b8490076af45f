//! Issuer proofs over claims-tree roots.
//!
//! A [`CredentialProof`] is an EdDSA-Poseidon signature on the root hash.
//! Its `proofValue` carries the packed signature followed by the packed
//! signer key, so a verifier can reject a proof made with some other key
//! before doing any curve arithmetic.

use chrono::Utc;
use tracing::{debug, warn};

use super::types::CredentialProof;
use super::CredentialError;
use crate::config::{BJJ_PROOF_TYPE, PROOF_PURPOSE_ASSERTION};
use crate::crypto::babyjub::Point;
use crate::crypto::eddsa::{verify_poseidon, EddsaKeyPair, Signature, SIGNATURE_BYTES};
use crate::crypto::multibase;
use crate::field::{self, FieldElement};

const PROOF_VALUE_BYTES: usize = SIGNATURE_BYTES + 32;

/// Sign `root_hash` as `verification_method`.
pub fn create_credential_proof(
    root_hash: &FieldElement,
    signer: &EddsaKeyPair,
    verification_method: &str,
) -> Result<CredentialProof, CredentialError> {
    let signature = signer.sign_poseidon(root_hash)?;

    let mut value = Vec::with_capacity(PROOF_VALUE_BYTES);
    value.extend_from_slice(&signature.pack());
    value.extend_from_slice(&signer.public_key().pack());

    debug!(
        verification_method,
        root = %field::to_decimal(root_hash),
        "credential proof created"
    );

    Ok(CredentialProof {
        proof_type: BJJ_PROOF_TYPE.to_string(),
        created: Utc::now(),
        verification_method: verification_method.to_string(),
        proof_purpose: PROOF_PURPOSE_ASSERTION.to_string(),
        root_hash: *root_hash,
        proof_value: multibase::encode(&value, None),
    })
}

/// Check that `proof` signs `root_hash` under `issuer_key`.
pub fn verify_credential_proof(
    proof: &CredentialProof,
    root_hash: &FieldElement,
    issuer_key: &Point,
) -> Result<(), CredentialError> {
    if proof.proof_type != BJJ_PROOF_TYPE {
        return Err(CredentialError::ProofVerificationFailed(format!(
            "unsupported proof type {}",
            proof.proof_type
        )));
    }
    if proof.root_hash != *root_hash {
        warn!(
            signed = %field::to_decimal(&proof.root_hash),
            computed = %field::to_decimal(root_hash),
            "claims root mismatch"
        );
        return Err(CredentialError::ProofVerificationFailed(
            "claims root does not match signed root".into(),
        ));
    }

    let value = multibase::decode_fixed::<PROOF_VALUE_BYTES>(&proof.proof_value, None)?;
    let signature = Signature::unpack(&value[..SIGNATURE_BYTES])?;
    let embedded_key = Point::unpack(&value[SIGNATURE_BYTES..])?;
    if embedded_key != *issuer_key {
        return Err(CredentialError::ProofVerificationFailed(
            "proof was not made with the issuer's key".into(),
        ));
    }

    if !verify_poseidon(root_hash, &signature, issuer_key)? {
        return Err(CredentialError::ProofVerificationFailed(
            "invalid issuer signature".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    fn issuer(seed: u64) -> EddsaKeyPair {
        EddsaKeyPair::generate(&mut StdRng::seed_from_u64(seed))
    }

    #[test]
    fn create_then_verify() {
        let kp = issuer(1);
        let root = field::e_u64(123);
        let proof = create_credential_proof(&root, &kp, "did:example:issuer#bjj-1").unwrap();
        assert_eq!(proof.proof_type, BJJ_PROOF_TYPE);
        assert!(proof.proof_value.starts_with('z'));
        verify_credential_proof(&proof, &root, &kp.public_key()).unwrap();
    }

    #[test]
    fn other_issuer_key_fails() {
        let root = field::e_u64(5);
        let proof = create_credential_proof(&root, &issuer(1), "vm").unwrap();
        assert!(matches!(
            verify_credential_proof(&proof, &root, &issuer(2).public_key()),
            Err(CredentialError::ProofVerificationFailed(_))
        ));
    }

    #[test]
    fn different_root_fails() {
        let kp = issuer(3);
        let proof = create_credential_proof(&field::e_u64(5), &kp, "vm").unwrap();
        assert!(matches!(
            verify_credential_proof(&proof, &field::e_u64(6), &kp.public_key()),
            Err(CredentialError::ProofVerificationFailed(_))
        ));
    }

    #[test]
    fn forged_root_hash_field_fails_signature() {
        let kp = issuer(4);
        let mut proof = create_credential_proof(&field::e_u64(5), &kp, "vm").unwrap();
        proof.root_hash = field::e_u64(6);
        assert!(matches!(
            verify_credential_proof(&proof, &field::e_u64(6), &kp.public_key()),
            Err(CredentialError::ProofVerificationFailed(_))
        ));
    }

    #[test]
    fn truncated_proof_value_is_a_format_error() {
        let kp = issuer(5);
        let mut proof = create_credential_proof(&field::e_u64(5), &kp, "vm").unwrap();
        proof.proof_value = multibase::encode(&[1, 2, 3], None);
        assert!(matches!(
            verify_credential_proof(&proof, &field::e_u64(5), &kp.public_key()),
            Err(CredentialError::Format(_))
        ));
    }
}
