//! # Verifiable Credentials
//!
//! Credentials commit to their claims through a [`ClaimsTree`] root signed
//! with EdDSA-Poseidon. Holders present any subset of the claims, each with
//! a Merkle path back to that root, optionally under their own Ed25519
//! signature.
//!
//! ```text
//! claims.rs        claim flattening, value encoding, the claims tree
//! types.rs         VC / VP envelopes and their proofs
//! proof.rs         issuer signature over a root
//! encryption.rs    subjects encrypted to the holder (Poseidon cipher)
//! presentation.rs  issue, disclose, present, verify
//! ```

pub mod claims;
pub mod encryption;
pub mod presentation;
pub mod proof;
pub mod types;

use thiserror::Error;

use crate::crypto::eddsa::EddsaError;
use crate::crypto::keys::KeyError;
use crate::crypto::multibase::FormatError;
use crate::crypto::poseidon::PoseidonError;
use crate::identity::did::DidError;

pub use claims::{ClaimProof, ClaimValue, ClaimsError, ClaimsTree, ClaimsTreeOptions};
pub use encryption::{decrypt_subject, encrypt_subject};
pub use presentation::{
    build_presentation, decrypt_credential, disclose, issue_credential,
    issue_encrypted_credential, presentation_digest, verify_credential, verify_presentation,
    Holder, Issuer,
};
pub use proof::{create_credential_proof, verify_credential_proof};
pub use types::{
    CredentialProof, CredentialSubject, EncryptedSubject, FieldProof, HolderProof,
    VerifiableCredential, VerifiablePresentation,
};

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("proof verification failed: {0}")]
    ProofVerificationFailed(String),

    #[error("credential has no proof")]
    MissingProof,

    #[error("presentation discloses no credentials")]
    EmptyPresentation,

    /// The operation needs plaintext claims.
    #[error("credential subject is encrypted")]
    EncryptedSubject,

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Claims(#[from] ClaimsError),

    #[error(transparent)]
    Did(#[from] DidError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Eddsa(#[from] EddsaError),

    #[error(transparent)]
    Poseidon(#[from] PoseidonError),
}
