//! # EdDSA-Poseidon over BabyJubJub
//!
//! The signature scheme issuers use to sign claims-tree roots. It is plain
//! EdDSA on BabyJubJub with Poseidon as the challenge hash, so that a
//! circuit can verify the signature over a committed root for a few
//! thousand constraints.
//!
//! ## Key expansion
//!
//! ```text
//! h      = SHA-512(sk)
//! s      = clamp(h[0..32])              (little-endian scalar)
//! A      = Base8 · (s >> 3)
//! ```
//!
//! ## Signing
//!
//! ```text
//! r      = SHA-512(h[32..64] ∥ msg_le) mod subOrder
//! R8     = Base8 · r
//! hm     = Poseidon(R8.x, R8.y, A.x, A.y, msg)
//! S      = (r + hm · s) mod subOrder
//! ```
//!
//! Verification checks `Base8 · S == R8 + A · (8 · hm)`.
//!
//! Every signature is verified against the signer's own public key before
//! it is returned. A failure there is a [`EddsaError::SelfCheck`], never a
//! silently-returned bad signature.

use std::fmt;

use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha512};
use thiserror::Error;
use tracing::error;

use super::babyjub::{sub_order, Point, BASE8};
use super::multibase::FormatError;
use super::poseidon::{self, PoseidonError};
use crate::field::{self, FieldElement};

/// Accepted secret-key lengths, in bytes.
const SECRET_KEY_MIN_BYTES: usize = 32;
const SECRET_KEY_MAX_BYTES: usize = 64;

/// Packed signature size: `R8 (32) ∥ S (32)`.
pub const SIGNATURE_BYTES: usize = 64;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EddsaError {
    #[error("malformed input: {0}")]
    Format(#[from] FormatError),

    #[error("secret key must be 32 to 64 bytes, got {0}")]
    InvalidSecretKey(usize),

    #[error("freshly produced signature failed verification")]
    SelfCheck,

    #[error(transparent)]
    Poseidon(#[from] PoseidonError),
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// An EdDSA-Poseidon signature `(R8, S)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub r8: Point,
    pub s: BigUint,
}

impl Signature {
    /// `R8.pack() ∥ S` (32 bytes little-endian).
    pub fn pack(&self) -> [u8; SIGNATURE_BYTES] {
        let mut out = [0u8; SIGNATURE_BYTES];
        out[..32].copy_from_slice(&self.r8.pack());
        let s = self.s.to_bytes_le();
        out[32..32 + s.len().min(32)].copy_from_slice(&s[..s.len().min(32)]);
        out
    }

    /// Inverse of [`Signature::pack`]. Rejects `S ≥ subOrder`.
    pub fn unpack(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() != SIGNATURE_BYTES {
            return Err(FormatError::Length {
                expected: SIGNATURE_BYTES,
                got: bytes.len(),
            });
        }
        let r8 = Point::unpack(&bytes[..32])?;
        let s = BigUint::from_bytes_le(&bytes[32..]);
        if s >= *sub_order() {
            return Err(FormatError::ScalarOutOfRange);
        }
        Ok(Self { r8, s })
    }
}

// ---------------------------------------------------------------------------
// Key pair
// ---------------------------------------------------------------------------

/// A BabyJubJub signing key and its public point.
#[derive(Clone)]
pub struct EddsaKeyPair {
    secret: Vec<u8>,
    scalar: BigUint,
    prefix: [u8; 32],
    public: Point,
}

impl EddsaKeyPair {
    /// Expand a raw secret key (32 to 64 bytes).
    pub fn from_secret(secret: &[u8]) -> Result<Self, EddsaError> {
        if !(SECRET_KEY_MIN_BYTES..=SECRET_KEY_MAX_BYTES).contains(&secret.len()) {
            return Err(EddsaError::InvalidSecretKey(secret.len()));
        }

        let h = Sha512::digest(secret);
        let mut clamped = [0u8; 32];
        clamped.copy_from_slice(&h[..32]);
        clamped[0] &= 0xf8;
        clamped[31] &= 0x7f;
        clamped[31] |= 0x40;

        let mut prefix = [0u8; 32];
        prefix.copy_from_slice(&h[32..]);

        let scalar = BigUint::from_bytes_le(&clamped);
        let public = BASE8.mul_scalar(&(&scalar >> 3u32));

        Ok(Self {
            secret: secret.to_vec(),
            scalar,
            prefix,
            public,
        })
    }

    /// Fresh 32-byte key from `rng`.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut secret = [0u8; SECRET_KEY_MIN_BYTES];
        rng.fill_bytes(&mut secret);
        // 32 bytes is always an accepted length.
        match Self::from_secret(&secret) {
            Ok(kp) => kp,
            Err(_) => unreachable!("32-byte secret keys are always accepted"),
        }
    }

    pub fn public_key(&self) -> Point {
        self.public
    }

    /// Raw secret bytes. Never log these.
    pub fn secret_bytes(&self) -> &[u8] {
        &self.secret
    }

    /// Sign a field element, then verify the result before handing it out.
    pub fn sign_poseidon(&self, msg: &FieldElement) -> Result<Signature, EddsaError> {
        let order = sub_order();

        let mut nonce_input = Vec::with_capacity(64);
        nonce_input.extend_from_slice(&self.prefix);
        nonce_input.extend_from_slice(&field::to_le_bytes(msg));
        let r = BigUint::from_bytes_le(&Sha512::digest(&nonce_input)) % order;

        let r8 = BASE8.mul_scalar(&r);
        let hm = challenge(&r8, &self.public, msg)?;
        let s = (r + field::to_biguint(&hm) * &self.scalar) % order;

        let signature = Signature { r8, s };
        if !verify_poseidon(msg, &signature, &self.public)? {
            error!(
                public_key = %hex::encode(self.public.pack()),
                "EdDSA-Poseidon signature failed self-check"
            );
            return Err(EddsaError::SelfCheck);
        }
        Ok(signature)
    }

    /// BabyJubJub Diffie-Hellman: `other · (s >> 3)`.
    pub fn shared_point(&self, other: &Point) -> Point {
        other.mul_scalar(&(&self.scalar >> 3u32))
    }

    /// Two-element symmetric key for the Poseidon cipher.
    pub fn shared_key(&self, other: &Point) -> [FieldElement; 2] {
        let p = self.shared_point(other);
        [p.x, p.y]
    }
}

impl fmt::Debug for EddsaKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EddsaKeyPair(pub={})", hex::encode(self.public.pack()))
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Public key for a raw secret key.
pub fn prv2pub(secret: &[u8]) -> Result<Point, EddsaError> {
    EddsaKeyPair::from_secret(secret).map(|kp| kp.public_key())
}

/// Sign `msg` with a raw secret key.
pub fn sign_poseidon(secret: &[u8], msg: &FieldElement) -> Result<Signature, EddsaError> {
    EddsaKeyPair::from_secret(secret)?.sign_poseidon(msg)
}

/// Verify an EdDSA-Poseidon signature.
///
/// Returns `Ok(false)` for any signature that does not check out, including
/// off-curve points. Only an `S` outside `[0, subOrder)` is an error.
pub fn verify_poseidon(
    msg: &FieldElement,
    signature: &Signature,
    public_key: &Point,
) -> Result<bool, EddsaError> {
    if signature.s >= *sub_order() {
        return Err(FormatError::ScalarOutOfRange.into());
    }
    if !signature.r8.in_curve() || !public_key.in_curve() {
        return Ok(false);
    }

    let hm = challenge(&signature.r8, public_key, msg)?;
    let left = BASE8.mul_scalar(&signature.s);
    let right = signature
        .r8
        .add(&public_key.mul_scalar(&(field::to_biguint(&hm) * 8u32)));
    Ok(left == right)
}

fn challenge(r8: &Point, a: &Point, msg: &FieldElement) -> Result<FieldElement, PoseidonError> {
    poseidon::hash(&[r8.x, r8.y, a.x, a.y, *msg])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::UniformRand;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    fn keypair(seed: u64) -> EddsaKeyPair {
        let mut rng = StdRng::seed_from_u64(seed);
        EddsaKeyPair::generate(&mut rng)
    }

    #[test]
    fn sign_verify_random_pairs() {
        let mut rng = StdRng::seed_from_u64(42);
        for i in 0..1000 {
            let kp = EddsaKeyPair::generate(&mut rng);
            let msg = FieldElement::rand(&mut rng);
            let sig = kp.sign_poseidon(&msg).unwrap();
            assert!(verify_poseidon(&msg, &sig, &kp.public_key()).unwrap(), "pair {i}");
            if i % 10 == 0 {
                let other = msg + field::one();
                assert!(!verify_poseidon(&other, &sig, &kp.public_key()).unwrap(), "pair {i}");
            }
        }
    }

    #[test]
    fn public_key_is_in_subgroup() {
        let kp = keypair(1);
        assert!(kp.public_key().in_subgroup());
        assert_eq!(prv2pub(kp.secret_bytes()).unwrap(), kp.public_key());
    }

    #[test]
    fn signing_is_deterministic() {
        let kp = keypair(2);
        let msg = field::e_u64(1234);
        assert_eq!(kp.sign_poseidon(&msg).unwrap(), kp.sign_poseidon(&msg).unwrap());
    }

    #[test]
    fn tampering_breaks_verification() {
        let kp = keypair(3);
        let msg = field::e_u64(99);
        let sig = kp.sign_poseidon(&msg).unwrap();
        let pk = kp.public_key();

        assert!(!verify_poseidon(&(msg + field::one()), &sig, &pk).unwrap());

        let bumped_s = Signature {
            r8: sig.r8,
            s: (&sig.s + 1u32) % sub_order(),
        };
        assert!(!verify_poseidon(&msg, &bumped_s, &pk).unwrap());

        let moved_r8 = Signature {
            r8: sig.r8.add(&BASE8),
            s: sig.s.clone(),
        };
        assert!(!verify_poseidon(&msg, &moved_r8, &pk).unwrap());
    }

    #[test]
    fn wrong_key_fails() {
        let msg = field::e_u64(7);
        let sig = keypair(4).sign_poseidon(&msg).unwrap();
        assert!(!verify_poseidon(&msg, &sig, &keypair(5).public_key()).unwrap());
    }

    #[test]
    fn off_curve_points_return_false() {
        let kp = keypair(6);
        let msg = field::e_u64(8);
        let sig = kp.sign_poseidon(&msg).unwrap();
        let bogus = Point {
            x: field::e_u64(1),
            y: field::e_u64(2),
        };
        assert!(!verify_poseidon(&msg, &sig, &bogus).unwrap());
        let bad_r8 = Signature { r8: bogus, s: sig.s };
        assert!(!verify_poseidon(&msg, &bad_r8, &kp.public_key()).unwrap());
    }

    #[test]
    fn out_of_range_s_is_a_format_error() {
        let kp = keypair(7);
        let msg = field::e_u64(8);
        let sig = kp.sign_poseidon(&msg).unwrap();
        let bad = Signature {
            r8: sig.r8,
            s: sub_order().clone(),
        };
        assert_eq!(
            verify_poseidon(&msg, &bad, &kp.public_key()),
            Err(EddsaError::Format(FormatError::ScalarOutOfRange))
        );

        let mut packed = sig.pack();
        packed[32..].copy_from_slice(&[0xff; 32]);
        assert_eq!(Signature::unpack(&packed), Err(FormatError::ScalarOutOfRange));
    }

    #[test]
    fn pack_unpack_round_trip() {
        let kp = keypair(8);
        let sig = kp.sign_poseidon(&field::e_u64(5)).unwrap();
        let packed = sig.pack();
        assert_eq!(Signature::unpack(&packed).unwrap(), sig);
        assert!(matches!(
            Signature::unpack(&packed[..63]),
            Err(FormatError::Length { expected: 64, got: 63 })
        ));
    }

    #[test]
    fn secret_length_is_checked() {
        assert_eq!(
            EddsaKeyPair::from_secret(&[1u8; 31]).unwrap_err(),
            EddsaError::InvalidSecretKey(31)
        );
        assert!(EddsaKeyPair::from_secret(&[1u8; 64]).is_ok());
        assert!(EddsaKeyPair::from_secret(&[1u8; 65]).is_err());
    }

    #[test]
    fn ecdh_agrees() {
        let alice = keypair(9);
        let bob = keypair(10);
        assert_eq!(
            alice.shared_key(&bob.public_key()),
            bob.shared_key(&alice.public_key())
        );
    }

    #[test]
    fn debug_hides_secret() {
        let kp = keypair(11);
        let dbg = format!("{kp:?}");
        assert!(dbg.starts_with("EddsaKeyPair(pub="));
        assert!(!dbg.contains(&hex::encode(kp.secret_bytes())));
    }
}
