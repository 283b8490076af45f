//! # Groth16 Wire Codec
//!
//! Converts Groth16 proofs, verifying keys and public signals between the
//! snarkjs JSON form (decimal strings, projective coordinates) and the
//! fixed-width big-endian layout an alt_bn128 pairing verifier reads.
//!
//! ```text
//! G1     x(32) ∥ y(32)                                  64 bytes
//! G2     x.c1(32) ∥ x.c0(32) ∥ y.c1(32) ∥ y.c0(32)      128 bytes
//! VK     alpha(G1) ∥ beta(G2) ∥ gamma(G2) ∥ delta(G2) ∥ IC[0..=n](G1)
//! proof  -A(G1) ∥ B(G2) ∥ C(G1)                         256 bytes
//! signal 32-byte big-endian integer
//! ```
//!
//! The homogeneous `z` coordinate is dropped on encode and comes back as
//! `1` (or `[1, 0]` for G2) on decode. The point at infinity (`z = 0`) is
//! all-zero bytes, as the precompile expects. G2 limbs are stored imaginary
//! part first, the reverse of snarkjs' nested arrays.

use std::fmt;

use ark_bn254::{Bn254, Fq, G1Affine, G2Affine};
use ark_ec::AffineRepr;
use ark_ff::{BigInteger, PrimeField};
use ark_groth16::{Proof, VerifyingKey};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{FIELD_ELEMENT_BYTES, G1_BYTES, G2_BYTES, PROOF_BYTES, VK_PREFIX_BYTES};
use crate::field;

const WORD: usize = FIELD_ELEMENT_BYTES;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("expected at least {expected} bytes, got {got}")]
    Length { expected: usize, got: usize },

    #[error("malformed input: {0}")]
    Format(String),
}

// ---------------------------------------------------------------------------
// Points in snarkjs form
// ---------------------------------------------------------------------------

/// A G1 point as snarkjs writes it: `["x", "y", "z"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct G1Point {
    pub x: BigUint,
    pub y: BigUint,
    pub z: BigUint,
}

impl G1Point {
    /// An affine point (`z = 1`).
    pub fn new(x: BigUint, y: BigUint) -> Self {
        Self {
            x,
            y,
            z: BigUint::one(),
        }
    }

    /// snarkjs' point at infinity, `[0, 1, 0]`.
    pub fn infinity() -> Self {
        Self {
            x: BigUint::zero(),
            y: BigUint::one(),
            z: BigUint::zero(),
        }
    }

    pub fn is_infinity(&self) -> bool {
        self.z.is_zero()
    }
}

impl TryFrom<Vec<String>> for G1Point {
    type Error = CodecError;

    fn try_from(coords: Vec<String>) -> Result<Self, Self::Error> {
        match coords.as_slice() {
            [x, y] => Ok(Self::new(parse_coord(x)?, parse_coord(y)?)),
            [x, y, z] => Ok(Self {
                x: parse_coord(x)?,
                y: parse_coord(y)?,
                z: parse_coord(z)?,
            }),
            other => Err(CodecError::Format(format!(
                "G1 point needs 2 or 3 coordinates, got {}",
                other.len()
            ))),
        }
    }
}

impl From<G1Point> for Vec<String> {
    fn from(p: G1Point) -> Self {
        vec![p.x.to_string(), p.y.to_string(), p.z.to_string()]
    }
}

/// A G2 point as snarkjs writes it: `[[x0, x1], [y0, y1], [z0, z1]]`,
/// each pair being `c0 + c1·u`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<String>>", into = "Vec<Vec<String>>")]
pub struct G2Point {
    pub x: [BigUint; 2],
    pub y: [BigUint; 2],
    pub z: [BigUint; 2],
}

impl G2Point {
    pub fn new(x: [BigUint; 2], y: [BigUint; 2]) -> Self {
        Self {
            x,
            y,
            z: [BigUint::one(), BigUint::zero()],
        }
    }

    /// `[[0, 0], [1, 0], [0, 0]]`.
    pub fn infinity() -> Self {
        Self {
            x: [BigUint::zero(), BigUint::zero()],
            y: [BigUint::one(), BigUint::zero()],
            z: [BigUint::zero(), BigUint::zero()],
        }
    }

    pub fn is_infinity(&self) -> bool {
        self.z.iter().all(Zero::is_zero)
    }
}

impl TryFrom<Vec<Vec<String>>> for G2Point {
    type Error = CodecError;

    fn try_from(coords: Vec<Vec<String>>) -> Result<Self, Self::Error> {
        let pairs = coords
            .iter()
            .map(|pair| match pair.as_slice() {
                [c0, c1] => Ok([parse_coord(c0)?, parse_coord(c1)?]),
                other => Err(CodecError::Format(format!(
                    "G2 coordinate needs 2 limbs, got {}",
                    other.len()
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut pairs = pairs.into_iter();
        match (pairs.next(), pairs.next(), pairs.next(), pairs.next()) {
            (Some(x), Some(y), None, None) => Ok(Self::new(x, y)),
            (Some(x), Some(y), Some(z), None) => Ok(Self { x, y, z }),
            _ => Err(CodecError::Format(format!(
                "G2 point needs 2 or 3 coordinates, got {}",
                coords.len()
            ))),
        }
    }
}

impl From<G2Point> for Vec<Vec<String>> {
    fn from(p: G2Point) -> Self {
        [p.x, p.y, p.z]
            .into_iter()
            .map(|[c0, c1]| vec![c0.to_string(), c1.to_string()])
            .collect()
    }
}

fn parse_coord(s: &str) -> Result<BigUint, CodecError> {
    field::parse_decimal(s).map_err(|e| CodecError::Format(e.to_string()))
}

// ---------------------------------------------------------------------------
// snarkjs documents
// ---------------------------------------------------------------------------

/// `proof.json` as written by snarkjs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnarkjsProof {
    pub pi_a: G1Point,
    pub pi_b: G2Point,
    pub pi_c: G1Point,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default = "default_curve")]
    pub curve: String,
}

/// `verification_key.json` as written by snarkjs.
///
/// `vk_alphabeta_12` is carried through untouched when present; the wire
/// form has no room for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnarkjsVerifyingKey {
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default = "default_curve")]
    pub curve: String,
    #[serde(rename = "nPublic")]
    pub n_public: usize,
    pub vk_alpha_1: G1Point,
    pub vk_beta_2: G2Point,
    pub vk_gamma_2: G2Point,
    pub vk_delta_2: G2Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vk_alphabeta_12: Option<serde_json::Value>,
    #[serde(rename = "IC")]
    pub ic: Vec<G1Point>,
}

fn default_protocol() -> String {
    "groth16".to_string()
}

fn default_curve() -> String {
    "bn128".to_string()
}

// ---------------------------------------------------------------------------
// Point codecs
// ---------------------------------------------------------------------------

fn write_word(out: &mut [u8], n: &BigUint) -> Result<(), CodecError> {
    let bytes = n.to_bytes_be();
    if bytes.len() > WORD {
        return Err(CodecError::Format(format!(
            "{n} does not fit in 32 bytes"
        )));
    }
    out[WORD - bytes.len()..WORD].copy_from_slice(&bytes);
    Ok(())
}

fn read_word(bytes: &[u8], index: usize) -> BigUint {
    BigUint::from_bytes_be(&bytes[index * WORD..(index + 1) * WORD])
}

fn is_zero_bytes(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| *b == 0)
}

fn check_len(bytes: &[u8], expected: usize) -> Result<(), CodecError> {
    if bytes.len() < expected {
        return Err(CodecError::Length {
            expected,
            got: bytes.len(),
        });
    }
    Ok(())
}

/// `x ∥ y`, 32 bytes each. `z` is not written; infinity is all zeros.
pub fn encode_g1(p: &G1Point) -> Result<[u8; G1_BYTES], CodecError> {
    let mut out = [0u8; G1_BYTES];
    if p.is_infinity() {
        return Ok(out);
    }
    write_word(&mut out[..WORD], &p.x)?;
    write_word(&mut out[WORD..], &p.y)?;
    Ok(out)
}

/// Read the first 64 bytes of `bytes` as a G1 point with `z = 1`, or as
/// infinity when they are all zero.
pub fn decode_g1(bytes: &[u8]) -> Result<G1Point, CodecError> {
    check_len(bytes, G1_BYTES)?;
    if is_zero_bytes(&bytes[..G1_BYTES]) {
        return Ok(G1Point::infinity());
    }
    Ok(G1Point::new(read_word(bytes, 0), read_word(bytes, 1)))
}

/// `x.c1 ∥ x.c0 ∥ y.c1 ∥ y.c0`, or all zeros for infinity.
pub fn encode_g2(p: &G2Point) -> Result<[u8; G2_BYTES], CodecError> {
    let mut out = [0u8; G2_BYTES];
    if p.is_infinity() {
        return Ok(out);
    }
    for (i, limb) in [&p.x[1], &p.x[0], &p.y[1], &p.y[0]].into_iter().enumerate() {
        write_word(&mut out[i * WORD..(i + 1) * WORD], limb)?;
    }
    Ok(out)
}

/// Read the first 128 bytes of `bytes` as a G2 point with `z = [1, 0]`,
/// or as infinity when they are all zero.
pub fn decode_g2(bytes: &[u8]) -> Result<G2Point, CodecError> {
    check_len(bytes, G2_BYTES)?;
    if is_zero_bytes(&bytes[..G2_BYTES]) {
        return Ok(G2Point::infinity());
    }
    Ok(G2Point::new(
        [read_word(bytes, 1), read_word(bytes, 0)],
        [read_word(bytes, 3), read_word(bytes, 2)],
    ))
}

fn base_field_modulus() -> BigUint {
    BigUint::from_bytes_le(&Fq::MODULUS.to_bytes_le())
}

/// Negate an encoded G1 point: `y ↦ q - y` over the base field.
///
/// The pairing check takes `-A`, so the proof's A point goes on the wire
/// already negated. `y = 0` stays `0`.
pub fn alt_bn128_g1_neg(bytes: &[u8]) -> Result<[u8; G1_BYTES], CodecError> {
    check_len(bytes, G1_BYTES)?;
    let q = base_field_modulus();
    let y = read_word(bytes, 1) % &q;
    let neg_y = if y.is_zero() { y } else { q - y };

    let mut out = [0u8; G1_BYTES];
    out[..WORD].copy_from_slice(&bytes[..WORD]);
    write_word(&mut out[WORD..], &neg_y)?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Verifying keys and public signals
// ---------------------------------------------------------------------------

/// `alpha ∥ beta ∥ gamma ∥ delta ∥ IC...`
pub fn encode_verifying_key(vk: &SnarkjsVerifyingKey) -> Result<Vec<u8>, CodecError> {
    if vk.ic.len() != vk.n_public + 1 {
        return Err(CodecError::Format(format!(
            "nPublic is {} but IC has {} points",
            vk.n_public,
            vk.ic.len()
        )));
    }

    let mut out = Vec::with_capacity(VK_PREFIX_BYTES + vk.ic.len() * G1_BYTES);
    out.extend_from_slice(&encode_g1(&vk.vk_alpha_1)?);
    out.extend_from_slice(&encode_g2(&vk.vk_beta_2)?);
    out.extend_from_slice(&encode_g2(&vk.vk_gamma_2)?);
    out.extend_from_slice(&encode_g2(&vk.vk_delta_2)?);
    for p in &vk.ic {
        out.extend_from_slice(&encode_g1(p)?);
    }
    Ok(out)
}

/// Inverse of [`encode_verifying_key`]. `nPublic` is `IC.len() - 1`.
pub fn decode_verifying_key(bytes: &[u8]) -> Result<SnarkjsVerifyingKey, CodecError> {
    check_len(bytes, VK_PREFIX_BYTES + G1_BYTES)?;
    let ic_bytes = &bytes[VK_PREFIX_BYTES..];
    if ic_bytes.len() % G1_BYTES != 0 {
        return Err(CodecError::Format(format!(
            "IC section of {} bytes is not a whole number of G1 points",
            ic_bytes.len()
        )));
    }

    let ic = ic_bytes
        .chunks(G1_BYTES)
        .map(decode_g1)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SnarkjsVerifyingKey {
        protocol: default_protocol(),
        curve: default_curve(),
        n_public: ic.len() - 1,
        vk_alpha_1: decode_g1(bytes)?,
        vk_beta_2: decode_g2(&bytes[G1_BYTES..])?,
        vk_gamma_2: decode_g2(&bytes[G1_BYTES + G2_BYTES..])?,
        vk_delta_2: decode_g2(&bytes[G1_BYTES + 2 * G2_BYTES..])?,
        vk_alphabeta_12: None,
        ic,
    })
}

/// Each decimal signal as a 32-byte big-endian word, order preserved.
pub fn encode_public_signals(signals: &[String]) -> Result<Vec<[u8; WORD]>, CodecError> {
    signals
        .iter()
        .map(|s| {
            let mut word = [0u8; WORD];
            write_word(&mut word, &parse_coord(s)?)?;
            Ok(word)
        })
        .collect()
}

pub fn decode_public_signals(words: &[[u8; WORD]]) -> Vec<String> {
    words
        .iter()
        .map(|w| BigUint::from_bytes_be(w).to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Wire proof
// ---------------------------------------------------------------------------

/// A proof laid out for the on-chain verifier, with `a` already negated.
#[derive(Clone, PartialEq, Eq)]
pub struct WireProof {
    pub a: [u8; G1_BYTES],
    pub b: [u8; G2_BYTES],
    pub c: [u8; G1_BYTES],
}

impl WireProof {
    pub fn from_snarkjs(proof: &SnarkjsProof) -> Result<Self, CodecError> {
        Ok(Self {
            a: alt_bn128_g1_neg(&encode_g1(&proof.pi_a)?)?,
            b: encode_g2(&proof.pi_b)?,
            c: encode_g1(&proof.pi_c)?,
        })
    }

    /// Back to snarkjs form, un-negating `a`.
    pub fn to_snarkjs(&self) -> Result<SnarkjsProof, CodecError> {
        Ok(SnarkjsProof {
            pi_a: decode_g1(&alt_bn128_g1_neg(&self.a)?)?,
            pi_b: decode_g2(&self.b)?,
            pi_c: decode_g1(&self.c)?,
            protocol: default_protocol(),
            curve: default_curve(),
        })
    }

    pub fn to_bytes(&self) -> [u8; PROOF_BYTES] {
        let mut out = [0u8; PROOF_BYTES];
        out[..G1_BYTES].copy_from_slice(&self.a);
        out[G1_BYTES..G1_BYTES + G2_BYTES].copy_from_slice(&self.b);
        out[G1_BYTES + G2_BYTES..].copy_from_slice(&self.c);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        check_len(bytes, PROOF_BYTES)?;
        let mut proof = Self {
            a: [0u8; G1_BYTES],
            b: [0u8; G2_BYTES],
            c: [0u8; G1_BYTES],
        };
        proof.a.copy_from_slice(&bytes[..G1_BYTES]);
        proof.b.copy_from_slice(&bytes[G1_BYTES..G1_BYTES + G2_BYTES]);
        proof.c.copy_from_slice(&bytes[G1_BYTES + G2_BYTES..PROOF_BYTES]);
        Ok(proof)
    }
}

impl fmt::Debug for WireProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WireProof")
            .field("a", &hex::encode(self.a))
            .field("b", &hex::encode(self.b))
            .field("c", &hex::encode(self.c))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// arkworks interop
// ---------------------------------------------------------------------------

fn fq_to_biguint(fq: &Fq) -> BigUint {
    BigUint::from_bytes_le(&fq.into_bigint().to_bytes_le())
}

impl From<&G1Affine> for G1Point {
    fn from(p: &G1Affine) -> Self {
        match p.xy() {
            Some((x, y)) => G1Point::new(fq_to_biguint(x), fq_to_biguint(y)),
            None => G1Point::infinity(),
        }
    }
}

impl From<&G2Affine> for G2Point {
    fn from(p: &G2Affine) -> Self {
        match p.xy() {
            Some((x, y)) => G2Point::new(
                [fq_to_biguint(&x.c0), fq_to_biguint(&x.c1)],
                [fq_to_biguint(&y.c0), fq_to_biguint(&y.c1)],
            ),
            None => G2Point::infinity(),
        }
    }
}

impl From<&Proof<Bn254>> for SnarkjsProof {
    fn from(proof: &Proof<Bn254>) -> Self {
        Self {
            pi_a: (&proof.a).into(),
            pi_b: (&proof.b).into(),
            pi_c: (&proof.c).into(),
            protocol: default_protocol(),
            curve: default_curve(),
        }
    }
}

impl From<&VerifyingKey<Bn254>> for SnarkjsVerifyingKey {
    fn from(vk: &VerifyingKey<Bn254>) -> Self {
        Self {
            protocol: default_protocol(),
            curve: default_curve(),
            n_public: vk.gamma_abc_g1.len().saturating_sub(1),
            vk_alpha_1: (&vk.alpha_g1).into(),
            vk_beta_2: (&vk.beta_g2).into(),
            vk_gamma_2: (&vk.gamma_g2).into(),
            vk_delta_2: (&vk.delta_g2).into(),
            vk_alphabeta_12: None,
            ic: vk.gamma_abc_g1.iter().map(G1Point::from).collect(),
        }
    }
}

/// Read a canonical base-field element from a 32-byte word.
pub(crate) fn fq_from_word(bytes: &[u8], index: usize) -> Result<Fq, CodecError> {
    let n = read_word(bytes, index);
    if n >= base_field_modulus() {
        return Err(CodecError::Format(format!("{n} is not a base field element")));
    }
    Ok(Fq::from_be_bytes_mod_order(&bytes[index * WORD..(index + 1) * WORD]))
}

/// An on-curve, in-subgroup G1 point from its wire form. All-zero bytes are
/// the identity.
pub(crate) fn g1_affine(bytes: &[u8]) -> Result<G1Affine, CodecError> {
    check_len(bytes, G1_BYTES)?;
    if is_zero_bytes(&bytes[..G1_BYTES]) {
        return Ok(G1Affine::identity());
    }
    let p = G1Affine::new_unchecked(fq_from_word(bytes, 0)?, fq_from_word(bytes, 1)?);
    if !p.is_on_curve() || !p.is_in_correct_subgroup_assuming_on_curve() {
        return Err(CodecError::Format("G1 point is not on the curve".into()));
    }
    Ok(p)
}

pub(crate) fn g2_affine(bytes: &[u8]) -> Result<G2Affine, CodecError> {
    check_len(bytes, G2_BYTES)?;
    if is_zero_bytes(&bytes[..G2_BYTES]) {
        return Ok(G2Affine::identity());
    }
    let x = ark_bn254::Fq2::new(fq_from_word(bytes, 1)?, fq_from_word(bytes, 0)?);
    let y = ark_bn254::Fq2::new(fq_from_word(bytes, 3)?, fq_from_word(bytes, 2)?);
    let p = G2Affine::new_unchecked(x, y);
    if !p.is_on_curve() || !p.is_in_correct_subgroup_assuming_on_curve() {
        return Err(CodecError::Format("G2 point is not on the curve or not in G2".into()));
    }
    Ok(p)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
