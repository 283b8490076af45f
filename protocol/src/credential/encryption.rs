//! Encrypted credential subjects.
//!
//! The issuer serializes the subject to JSON, packs the bytes into 31-byte
//! big-endian field elements and encrypts them with the Poseidon cipher
//! under an ECDH key between a fresh ephemeral BabyJubJub key and the
//! holder's key. The claims root is still computed over the plaintext, so
//! the holder can decrypt and then verify the issuer's proof as usual.

use rand::{CryptoRng, RngCore};
use serde_json::Value;

use super::types::EncryptedSubject;
use super::CredentialError;
use crate::config::SPONGE_CHUNK_SIZE;
use crate::crypto::babyjub::Point;
use crate::crypto::eddsa::EddsaKeyPair;
use crate::crypto::{multibase, poseidon_cipher};
use crate::field::{self, FieldElement};

/// Pack bytes into 31-byte big-endian chunks.
pub fn bytes_to_elements(bytes: &[u8]) -> Vec<FieldElement> {
    bytes.chunks(SPONGE_CHUNK_SIZE).map(field::from_be_bytes).collect()
}

/// Inverse of [`bytes_to_elements`] for a known byte length.
pub fn elements_to_bytes(
    elements: &[FieldElement],
    byte_length: usize,
) -> Result<Vec<u8>, CredentialError> {
    if elements.len() != byte_length.div_ceil(SPONGE_CHUNK_SIZE) {
        return Err(CredentialError::Decryption(format!(
            "{} elements cannot hold {byte_length} bytes",
            elements.len()
        )));
    }

    let mut out = Vec::with_capacity(byte_length);
    for (i, fe) in elements.iter().enumerate() {
        let chunk_len = (byte_length - i * SPONGE_CHUNK_SIZE).min(SPONGE_CHUNK_SIZE);
        let be = field::to_be_bytes(fe);
        let (padding, chunk) = be.split_at(be.len() - chunk_len);
        if padding.iter().any(|b| *b != 0) {
            return Err(CredentialError::Decryption("chunk overflows its length".into()));
        }
        out.extend_from_slice(chunk);
    }
    Ok(out)
}

/// Encrypt `claims` to `recipient`.
pub fn encrypt_subject<R: RngCore + CryptoRng>(
    claims: &Value,
    recipient: &Point,
    rng: &mut R,
) -> Result<EncryptedSubject, CredentialError> {
    let bytes = serde_json::to_vec(claims).map_err(|e| CredentialError::Serialization(e.to_string()))?;
    let message = bytes_to_elements(&bytes);

    let ephemeral = EddsaKeyPair::generate(rng);
    let key = ephemeral.shared_key(recipient);
    let nonce = field::e_biguint(&u128::from_le_bytes(random_bytes(rng)).into());

    let ciphertext = poseidon_cipher::encrypt(&message, &key, &nonce)?;

    Ok(EncryptedSubject {
        ciphertext,
        nonce,
        length: message.len(),
        byte_length: bytes.len(),
        sender_public_key: multibase::encode(&ephemeral.public_key().pack(), None),
    })
}

fn random_bytes<R: RngCore>(rng: &mut R) -> [u8; 16] {
    let mut buf = [0u8; 16];
    rng.fill_bytes(&mut buf);
    buf
}

/// Decrypt an [`EncryptedSubject`] with the recipient's key.
pub fn decrypt_subject(
    encrypted: &EncryptedSubject,
    recipient: &EddsaKeyPair,
) -> Result<Value, CredentialError> {
    let sender = Point::unpack(&multibase::decode(&encrypted.sender_public_key, None)?)?;
    let key = recipient.shared_key(&sender);

    let message =
        poseidon_cipher::decrypt(&encrypted.ciphertext, &key, &encrypted.nonce, encrypted.length)?;
    let bytes = elements_to_bytes(&message, encrypted.byte_length)?;
    serde_json::from_slice(&bytes).map_err(|e| CredentialError::Serialization(e.to_string()))
}
