//! # Scalar Field Arithmetic
//!
//! Every value the credential core commits to is an element of the BN254
//! scalar field. We use arkworks' `Fr` directly: it is always stored in
//! canonical (Montgomery-reduced) form, so "every stored value is reduced"
//! holds by construction and add/sub/mul/neg/eq come for free.
//!
//! This module adds the glue the rest of the crate needs on top of `Fr`:
//!
//! - constructors from integers, decimal strings and big-endian bytes, all of
//!   which reduce modulo `p`;
//! - canonical decimal and 32-byte big-endian serialization;
//! - a fallible [`inverse`] that reports division by zero as a [`MathError`];
//! - the LSB-first bit decomposition used to walk the sparse Merkle tree;
//! - a serde adapter so field elements show up as decimal strings in JSON.

use ark_ff::{BigInteger, Field, PrimeField, Zero};
use num_bigint::BigUint;
use thiserror::Error;

use crate::config::{FIELD_ELEMENT_BYTES, SMT_KEY_BITS};

/// An element of the BN254 scalar field.
pub type FieldElement = ark_bn254::Fr;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Arithmetic failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MathError {
    /// Attempted to invert zero.
    #[error("inverse of zero")]
    InverseOfZero,

    /// A scalar was outside the range an operation accepts.
    #[error("scalar out of range: {0}")]
    OutOfRange(String),

    /// A string could not be parsed as a non-negative decimal integer.
    #[error("invalid decimal integer: {0:?}")]
    InvalidDecimal(String),
}

// ---------------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------------

/// The additive identity.
pub fn zero() -> FieldElement {
    FieldElement::zero()
}

/// The multiplicative identity.
pub fn one() -> FieldElement {
    FieldElement::from(1u64)
}

/// Lift a `u64` into the field.
pub fn e_u64(value: u64) -> FieldElement {
    FieldElement::from(value)
}

/// Reduce an arbitrary non-negative integer modulo `p`.
pub fn e_biguint(value: &BigUint) -> FieldElement {
    FieldElement::from_le_bytes_mod_order(&value.to_bytes_le())
}

/// Parse a decimal string and reduce it modulo `p`.
///
/// Only ASCII digits are accepted: no sign, no whitespace, no `0x` prefix.
pub fn e_str(decimal: &str) -> Result<FieldElement, MathError> {
    parse_decimal(decimal).map(|n| e_biguint(&n))
}

/// Interpret `bytes` as a big-endian integer and reduce it modulo `p`.
pub fn from_be_bytes(bytes: &[u8]) -> FieldElement {
    FieldElement::from_be_bytes_mod_order(bytes)
}

/// Parse a non-negative decimal integer of any size.
pub fn parse_decimal(decimal: &str) -> Result<BigUint, MathError> {
    if decimal.is_empty() || !decimal.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MathError::InvalidDecimal(decimal.to_string()));
    }
    BigUint::parse_bytes(decimal.as_bytes(), 10)
        .ok_or_else(|| MathError::InvalidDecimal(decimal.to_string()))
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

/// The canonical integer representative of `fe`.
pub fn to_biguint(fe: &FieldElement) -> BigUint {
    BigUint::from_bytes_le(&fe.into_bigint().to_bytes_le())
}

/// Canonical decimal representation (`"0"` for zero, no leading zeros).
pub fn to_decimal(fe: &FieldElement) -> String {
    to_biguint(fe).to_str_radix(10)
}

/// Canonical 32-byte big-endian encoding.
pub fn to_be_bytes(fe: &FieldElement) -> [u8; FIELD_ELEMENT_BYTES] {
    let mut out = [0u8; FIELD_ELEMENT_BYTES];
    out.copy_from_slice(&fe.into_bigint().to_bytes_be());
    out
}

/// Canonical 32-byte little-endian encoding.
pub fn to_le_bytes(fe: &FieldElement) -> [u8; FIELD_ELEMENT_BYTES] {
    let mut out = [0u8; FIELD_ELEMENT_BYTES];
    out.copy_from_slice(&fe.into_bigint().to_bytes_le());
    out
}

/// Multiplicative inverse. Fails on zero instead of returning garbage.
pub fn inverse(fe: &FieldElement) -> Result<FieldElement, MathError> {
    fe.inverse().ok_or(MathError::InverseOfZero)
}

/// 256-bit LSB-first decomposition of `fe`, padded with `false`.
///
/// Bit `i` selects the branch taken at depth `i` of the sparse Merkle tree.
pub fn bits_le(fe: &FieldElement) -> Vec<bool> {
    let mut bits = fe.into_bigint().to_bits_le();
    bits.resize(SMT_KEY_BITS, false);
    bits
}

/// Whether `value` (an arbitrary integer) is a canonical field element.
pub fn is_canonical(value: &BigUint) -> bool {
    *value < BigUint::from_bytes_le(&FieldElement::MODULUS.to_bytes_le())
}

// ---------------------------------------------------------------------------
// Serde
// ---------------------------------------------------------------------------

/// Serialize field elements as decimal strings.
///
/// ```ignore
/// #[serde(with = "crate::field::serde_decimal")]
/// root_hash: FieldElement,
/// ```
pub mod serde_decimal {
    use super::{e_str, to_decimal, FieldElement};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(fe: &FieldElement, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&to_decimal(fe))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<FieldElement, D::Error> {
        let s = String::deserialize(d)?;
        e_str(&s).map_err(D::Error::custom)
    }
}

/// Serialize vectors of field elements as arrays of decimal strings.
pub mod serde_decimal_vec {
    use super::{e_str, to_decimal, FieldElement};
    use serde::{de::Error as _, ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &[FieldElement], s: S) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(v.len()))?;
        for fe in v {
            seq.serialize_element(&to_decimal(fe))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<FieldElement>, D::Error> {
        Vec::<String>::deserialize(d)?
            .iter()
            .map(|s| e_str(s).map_err(D::Error::custom))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
