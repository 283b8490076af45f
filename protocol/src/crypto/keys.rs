//! # Holder Keys
//!
//! Ed25519 keypairs for credential holders. Issuers sign claims roots with
//! BabyJubJub (see [`super::eddsa`]); holders only need to prove control of
//! their DID when presenting, and a plain Ed25519 signature does that.
//!
//! Keys travel as multibase strings with a multicodec header: `0xed01` for
//! the public key and `0x8026` for the 32-byte seed. Private key bytes are
//! never logged and never appear in `Debug` output.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey, SECRET_KEY_LENGTH};
use rand::rngs::OsRng;
use std::fmt;
use thiserror::Error;

use super::multibase::{self, FormatError, Multicodec};

/// Ed25519 signature length.
pub const ED25519_SIGNATURE_BYTES: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,
}

/// An Ed25519 holder keypair.
///
/// Deliberately not `Serialize`: exporting the seed goes through
/// [`HolderKeyPair::private_key_multibase`].
pub struct HolderKeyPair {
    signing_key: SigningKey,
}

impl HolderKeyPair {
    /// Fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Deterministic keypair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Parse a `z`-prefixed, `0x8026`-tagged private key.
    pub fn from_private_key_multibase(encoded: &str) -> Result<Self, KeyError> {
        let seed = multibase::decode_fixed::<SECRET_KEY_LENGTH>(encoded, Some(Multicodec::Ed25519Priv))?;
        Ok(Self::from_seed(&seed))
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// `z` + base58btc(`0xed01` ∥ public key).
    pub fn public_key_multibase(&self) -> String {
        multibase::encode(&self.public_key_bytes(), Some(Multicodec::Ed25519Pub))
    }

    /// `z` + base58btc(`0x8026` ∥ seed).
    pub fn private_key_multibase(&self) -> String {
        multibase::encode(&self.signing_key.to_bytes(), Some(Multicodec::Ed25519Priv))
    }

    pub fn sign(&self, message: &[u8]) -> [u8; ED25519_SIGNATURE_BYTES] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl Clone for HolderKeyPair {
    fn clone(&self) -> Self {
        Self::from_seed(&self.signing_key.to_bytes())
    }
}

impl fmt::Debug for HolderKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HolderKeyPair(pub={})", self.public_key_multibase())
    }
}

/// Parse a multibase Ed25519 public key (`0xed01` header required).
pub fn public_key_from_multibase(encoded: &str) -> Result<[u8; 32], KeyError> {
    Ok(multibase::decode_fixed::<32>(encoded, Some(Multicodec::Ed25519Pub))?)
}

/// Verify an Ed25519 signature against raw public key bytes.
///
/// A boolean rather than a `Result`: a key that is not a valid point, or a
/// signature of the wrong length, simply does not verify.
pub fn verify_ed25519(public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    let Ok(pk_bytes) = <[u8; 32]>::try_from(public_key) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&pk_bytes) else {
        return false;
    };
    let Ok(sig_bytes) = <[u8; ED25519_SIGNATURE_BYTES]>::try_from(signature) else {
        return false;
    };
    verifying_key
        .verify(message, &Signature::from_bytes(&sig_bytes))
        .is_ok()
}

/// Validate that `bytes` is a usable Ed25519 public key.
pub fn check_public_key(bytes: &[u8; 32]) -> Result<(), KeyError> {
    VerifyingKey::from_bytes(bytes)
        .map(|_| ())
        .map_err(|_| KeyError::InvalidPublicKey)
}
