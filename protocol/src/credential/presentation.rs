//! # Issuance, Selective Disclosure and Verification
//!
//! ```text
//! issuer:   claims ──► ClaimsTree ──► root ──► EdDSA-Poseidon ──► VC
//! holder:   VC + fields ──► (value, siblings) per field ──► VP (+ Ed25519)
//! verifier: VP ──► fold each field to a root ──► same signed root? ──► ok
//! ```
//!
//! The verifier never sees undisclosed claims. Each disclosed field carries
//! its index and padded sibling path under `@proof`, which is enough to
//! recompute the root the issuer signed.

use std::collections::BTreeSet;

use chrono::Utc;
use rand::{CryptoRng, RngCore};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::claims::{encode_value, ClaimValue, ClaimsTree, ClaimsTreeOptions};
use super::encryption::{decrypt_subject, encrypt_subject};
use super::proof::{create_credential_proof, verify_credential_proof};
use super::types::{
    CredentialProof, CredentialSubject, FieldProof, HolderProof, VerifiableCredential,
    VerifiablePresentation,
};
use super::CredentialError;
use crate::config::{ED25519_PROOF_TYPE, PROOF_PURPOSE_AUTHENTICATION};
use crate::crypto::babyjub::Point;
use crate::crypto::eddsa::EddsaKeyPair;
use crate::crypto::keys::{verify_ed25519, HolderKeyPair};
use crate::crypto::multibase;
use crate::field;
use crate::identity::did::{did_of, KeyResolver};
use crate::smt::compute_root;

// ---------------------------------------------------------------------------
// Issuance
// ---------------------------------------------------------------------------

/// Who signs a credential.
#[derive(Debug, Clone, Copy)]
pub struct Issuer<'a> {
    pub did: &'a str,
    pub verification_method: &'a str,
    pub key: &'a EddsaKeyPair,
}

/// Build and sign a credential over `claims` (a JSON object).
pub fn issue_credential(
    issuer: &Issuer<'_>,
    subject_id: Option<&str>,
    claims: &Value,
    options: ClaimsTreeOptions,
) -> Result<VerifiableCredential, CredentialError> {
    let subject = subject_from(subject_id, claims)?;
    let tree = ClaimsTree::from_claims(&subject.committed_claims(), options)?;

    let mut vc = VerifiableCredential::new(issuer.did, subject);
    vc.proof = Some(create_credential_proof(
        &tree.root(),
        issuer.key,
        issuer.verification_method,
    )?);

    info!(issuer = issuer.did, fields = tree.len(), "credential issued");
    Ok(vc)
}

/// Like [`issue_credential`], but the subject travels encrypted to
/// `recipient`. The signed root still commits to the plaintext claims.
pub fn issue_encrypted_credential<R: RngCore + CryptoRng>(
    issuer: &Issuer<'_>,
    subject_id: Option<&str>,
    claims: &Value,
    recipient: &Point,
    options: ClaimsTreeOptions,
    rng: &mut R,
) -> Result<VerifiableCredential, CredentialError> {
    let mut vc = issue_credential(issuer, subject_id, claims, options)?;
    let encrypted = encrypt_subject(claims, recipient, rng)?;
    vc.credential_subject.claims = Map::new();
    vc.credential_subject.encrypted = Some(encrypted);
    Ok(vc)
}

/// Replace an encrypted subject with its plaintext.
pub fn decrypt_credential(
    vc: &VerifiableCredential,
    recipient: &EddsaKeyPair,
) -> Result<VerifiableCredential, CredentialError> {
    let encrypted = vc
        .credential_subject
        .encrypted
        .as_ref()
        .ok_or_else(|| CredentialError::Decryption("credential subject is not encrypted".into()))?;
    let claims = decrypt_subject(encrypted, recipient)?;

    let mut out = vc.clone();
    out.credential_subject = subject_from(vc.credential_subject.id.as_deref(), &claims)?;
    Ok(out)
}

fn subject_from(id: Option<&str>, claims: &Value) -> Result<CredentialSubject, CredentialError> {
    let map = claims
        .as_object()
        .ok_or(super::claims::ClaimsError::NotAnObject)?;
    Ok(CredentialSubject {
        id: id.map(str::to_string),
        claims: map.clone(),
        ..Default::default()
    })
}

/// Verify a full (non-presented) credential: rebuild the tree from every
/// claim and check the issuer's signature on its root.
pub fn verify_credential(
    vc: &VerifiableCredential,
    resolver: &dyn KeyResolver,
    options: ClaimsTreeOptions,
) -> Result<(), CredentialError> {
    let proof = vc.proof.as_ref().ok_or(CredentialError::MissingProof)?;
    if vc.credential_subject.encrypted.is_some() {
        return Err(CredentialError::EncryptedSubject);
    }

    let tree = ClaimsTree::from_claims(&vc.credential_subject.committed_claims(), options)?;
    let issuer_key = resolve_issuer_key(vc, proof, resolver)?;
    verify_credential_proof(proof, &tree.root(), &issuer_key)?;

    debug!(issuer = %vc.issuer, "credential verified");
    Ok(())
}

/// The key `proof.verificationMethod` names, which must belong to the
/// credential's issuer.
fn resolve_issuer_key(
    vc: &VerifiableCredential,
    proof: &CredentialProof,
    resolver: &dyn KeyResolver,
) -> Result<Point, CredentialError> {
    if did_of(&proof.verification_method) != did_of(&vc.issuer) {
        warn!(
            issuer = %vc.issuer,
            verification_method = %proof.verification_method,
            "credential proof names a key outside the issuer's DID"
        );
        return Err(CredentialError::ProofVerificationFailed(
            "proof verification method does not belong to the issuer".into(),
        ));
    }
    Ok(resolver.resolve_bjj_key(&proof.verification_method)?)
}

// ---------------------------------------------------------------------------
// Presentation
// ---------------------------------------------------------------------------

/// The holder side of a presentation.
#[derive(Debug, Clone, Copy)]
pub struct Holder<'a> {
    pub did: &'a str,
    pub verification_method: &'a str,
    pub key: &'a HolderKeyPair,
}

/// Disclose `fields` of one credential.
///
/// Returns `None` when `fields` is empty: such a credential contributes
/// nothing to a presentation.
pub fn disclose(
    vc: &VerifiableCredential,
    fields: &[&str],
    options: ClaimsTreeOptions,
) -> Result<Option<VerifiableCredential>, CredentialError> {
    if fields.is_empty() {
        return Ok(None);
    }
    if vc.credential_subject.encrypted.is_some() {
        return Err(CredentialError::EncryptedSubject);
    }

    let tree = ClaimsTree::from_claims(&vc.credential_subject.committed_claims(), options)?;
    let mut subject = CredentialSubject::default();

    for name in fields {
        let proof = tree.get(name)?;
        let claim = tree
            .claim(name)
            .ok_or_else(|| super::claims::ClaimsError::UnknownField(name.to_string()))?;

        if *name == "id" {
            subject.id = vc.credential_subject.id.clone();
        } else {
            subject.claims.insert(name.to_string(), claim.to_json());
        }
        subject.field_proofs.insert(
            name.to_string(),
            FieldProof {
                key: proof.key,
                siblings: proof.siblings,
            },
        );
    }

    let mut disclosed = vc.clone();
    disclosed.credential_subject = subject;
    Ok(Some(disclosed))
}

/// Build a presentation from `(credential, fields to disclose)` pairs,
/// optionally signed by the holder.
///
/// Credentials with no disclosed fields are skipped. If nothing is left,
/// fails with [`CredentialError::EmptyPresentation`].
pub fn build_presentation(
    disclosures: &[(&VerifiableCredential, Vec<&str>)],
    holder: Option<&Holder<'_>>,
    options: ClaimsTreeOptions,
) -> Result<VerifiablePresentation, CredentialError> {
    let mut credentials = Vec::new();
    for (vc, fields) in disclosures {
        match disclose(vc, fields, options)? {
            Some(disclosed) => credentials.push(disclosed),
            None => debug!(issuer = %vc.issuer, "credential has no disclosed fields, skipped"),
        }
    }
    if credentials.is_empty() {
        return Err(CredentialError::EmptyPresentation);
    }

    let mut vp = VerifiablePresentation::new(credentials);
    if let Some(holder) = holder {
        vp.holder = Some(holder.did.to_string());
        let digest = presentation_digest(&vp)?;
        vp.proof = Some(HolderProof {
            proof_type: ED25519_PROOF_TYPE.to_string(),
            created: Utc::now(),
            verification_method: holder.verification_method.to_string(),
            proof_purpose: PROOF_PURPOSE_AUTHENTICATION.to_string(),
            proof_value: multibase::encode(&holder.key.sign(&digest), None),
        });
    }

    info!(
        credentials = vp.verifiable_credential.len(),
        signed = vp.proof.is_some(),
        "presentation built"
    );
    Ok(vp)
}

/// SHA-256 of the presentation JSON with `proof` removed.
pub fn presentation_digest(vp: &VerifiablePresentation) -> Result<[u8; 32], CredentialError> {
    let mut unsigned = vp.clone();
    unsigned.proof = None;
    let bytes =
        serde_json::to_vec(&unsigned).map_err(|e| CredentialError::Serialization(e.to_string()))?;
    Ok(Sha256::digest(&bytes).into())
}

/// Verify every disclosed field of every credential, every issuer
/// signature, and the holder signature if there is one.
pub fn verify_presentation(
    vp: &VerifiablePresentation,
    resolver: &dyn KeyResolver,
    options: ClaimsTreeOptions,
) -> Result<(), CredentialError> {
    if vp.verifiable_credential.is_empty() {
        return Err(CredentialError::EmptyPresentation);
    }

    for vc in &vp.verifiable_credential {
        verify_disclosed_credential(vc, resolver, options)?;
    }

    if let Some(proof) = &vp.proof {
        verify_holder_proof(vp, proof, resolver)?;
    }

    info!(credentials = vp.verifiable_credential.len(), "presentation verified");
    Ok(())
}

fn verify_disclosed_credential(
    vc: &VerifiableCredential,
    resolver: &dyn KeyResolver,
    options: ClaimsTreeOptions,
) -> Result<(), CredentialError> {
    let proof = vc.proof.as_ref().ok_or(CredentialError::MissingProof)?;
    let subject = &vc.credential_subject;
    if subject.field_proofs.is_empty() {
        return Err(CredentialError::ProofVerificationFailed(
            "credential discloses no fields".into(),
        ));
    }
    if subject.encrypted.is_some() {
        return Err(CredentialError::EncryptedSubject);
    }

    // Every disclosed value needs a path to the root, and every path a value.
    let mut disclosed: BTreeSet<&str> = subject.claims.keys().map(String::as_str).collect();
    if subject.id.is_some() {
        disclosed.insert("id");
    }
    let proven: BTreeSet<&str> = subject.field_proofs.keys().map(String::as_str).collect();
    if disclosed != proven {
        let unproven: Vec<_> = disclosed.difference(&proven).collect();
        warn!(issuer = %vc.issuer, ?unproven, "disclosed fields without proofs");
        return Err(CredentialError::ProofVerificationFailed(
            "disclosed fields and field proofs differ".into(),
        ));
    }

    for (name, field_proof) in &subject.field_proofs {
        let value = subject.disclosed(name).ok_or_else(|| {
            CredentialError::ProofVerificationFailed(format!("proof for undisclosed field {name}"))
        })?;
        let encoded = encode_value(&ClaimValue::from_json(&value), options.hash)?;
        let root = compute_root(&field::e_u64(field_proof.key), &encoded, &field_proof.siblings)?;
        if root != proof.root_hash {
            warn!(field = %name, issuer = %vc.issuer, "disclosed field does not fold to signed root");
            return Err(CredentialError::ProofVerificationFailed(format!(
                "field {name} does not match the signed root"
            )));
        }
    }

    let issuer_key = resolve_issuer_key(vc, proof, resolver)?;
    verify_credential_proof(proof, &proof.root_hash, &issuer_key)
}

fn verify_holder_proof(
    vp: &VerifiablePresentation,
    proof: &HolderProof,
    resolver: &dyn KeyResolver,
) -> Result<(), CredentialError> {
    if proof.proof_type != ED25519_PROOF_TYPE {
        return Err(CredentialError::ProofVerificationFailed(format!(
            "unsupported holder proof type {}",
            proof.proof_type
        )));
    }
    let holder = vp.holder.as_deref().unwrap_or(&proof.verification_method);
    if did_of(&proof.verification_method) != did_of(holder) {
        return Err(CredentialError::ProofVerificationFailed(
            "holder proof made by another DID".into(),
        ));
    }

    let public_key = resolver.resolve_ed25519_key(&proof.verification_method)?;
    let signature = multibase::decode(&proof.proof_value, None)?;
    if !verify_ed25519(&public_key, &presentation_digest(vp)?, &signature) {
        return Err(CredentialError::ProofVerificationFailed(
            "invalid holder signature".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
