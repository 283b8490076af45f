//! # Multibase Encoding
//!
//! Every key and signature that leaves the core as a string is multibase
//! base58btc: a literal `z` followed by the base58 alphabet (`bs58`).
//! Ed25519 keys additionally carry a two-byte multicodec header so that a
//! resolver can tell a public key (`0xed01`) from a private key (`0x8026`)
//! without any out-of-band type information. BabyJubJub material is
//! encoded raw.

use thiserror::Error;

use crate::config::{MULTIBASE_BASE58BTC_PREFIX, MULTICODEC_ED25519_PRIV, MULTICODEC_ED25519_PUB};

/// Malformed serialized input: multibase strings, compressed points,
/// packed signatures, or fixed-width byte strings of the wrong size.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("missing multibase prefix 'z'")]
    MissingPrefix,

    #[error("invalid base58 payload: {0}")]
    Base58(String),

    #[error("multicodec header does not match the expected key type")]
    MulticodecMismatch,

    #[error("wrong length: expected {expected} bytes, got {got}")]
    Length { expected: usize, got: usize },

    #[error("bytes do not encode a curve point")]
    InvalidPoint,

    #[error("scalar is not below the subgroup order")]
    ScalarOutOfRange,
}

/// Multicodec key types we know how to tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multicodec {
    /// `ed25519-pub` (0xed).
    Ed25519Pub,
    /// `ed25519-priv` (0x1300).
    Ed25519Priv,
}

impl Multicodec {
    /// The unsigned-varint header bytes.
    pub fn header(self) -> [u8; 2] {
        match self {
            Multicodec::Ed25519Pub => MULTICODEC_ED25519_PUB,
            Multicodec::Ed25519Priv => MULTICODEC_ED25519_PRIV,
        }
    }
}

/// Encode `bytes` as multibase base58btc, optionally behind a multicodec header.
pub fn encode(bytes: &[u8], codec: Option<Multicodec>) -> String {
    let mut payload = Vec::with_capacity(bytes.len() + 2);
    if let Some(codec) = codec {
        payload.extend_from_slice(&codec.header());
    }
    payload.extend_from_slice(bytes);
    format!("{}{}", MULTIBASE_BASE58BTC_PREFIX, bs58::encode(payload).into_string())
}

/// Decode a multibase base58btc string.
///
/// When `codec` is given the header must be present and match; it is
/// stripped from the returned bytes.
pub fn decode(encoded: &str, codec: Option<Multicodec>) -> Result<Vec<u8>, FormatError> {
    let body = encoded
        .strip_prefix(MULTIBASE_BASE58BTC_PREFIX)
        .ok_or(FormatError::MissingPrefix)?;
    let mut bytes = bs58::decode(body)
        .into_vec()
        .map_err(|e| FormatError::Base58(e.to_string()))?;

    if let Some(codec) = codec {
        if !bytes.starts_with(&codec.header()) {
            return Err(FormatError::MulticodecMismatch);
        }
        bytes.drain(..2);
    }
    Ok(bytes)
}

/// Decode to exactly `N` bytes.
pub fn decode_fixed<const N: usize>(
    encoded: &str,
    codec: Option<Multicodec>,
) -> Result<[u8; N], FormatError> {
    let bytes = decode(encoded, codec)?;
    bytes.as_slice().try_into().map_err(|_| FormatError::Length {
        expected: N,
        got: bytes.len(),
    })
}
