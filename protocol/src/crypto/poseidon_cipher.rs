//! # Poseidon Duplex Cipher
//!
//! Authenticated symmetric encryption of field-element vectors, built on the
//! width-4 Poseidon permutation. This is the construction circuits use to
//! encrypt data under an ECDH key, so the layout is fixed:
//!
//! ```text
//! state = [0, key0, key1, nonce + len * 2^128]
//! for each 3-element block m:
//!     permute(state)
//!     state[1..4] += m           -- released as ciphertext
//! permute(state)
//! tag = state[1]                 -- appended to the ciphertext
//! ```
//!
//! The plaintext is zero-padded to a multiple of 3, so a message of length
//! `n` produces `3 * ceil(n / 3) + 1` ciphertext elements. Decryption checks
//! that the padding lanes come back as zero and that the tag matches.

use ark_ff::Zero;
use num_bigint::BigUint;
use num_traits::One;

use super::poseidon::{permute, PoseidonError};
use crate::config::CIPHER_NONCE_BITS;
use crate::field::{self, FieldElement, MathError};

const RATE: usize = 3;
const WIDTH: usize = RATE + 1;

fn two_pow_128() -> FieldElement {
    field::e_biguint(&(BigUint::one() << CIPHER_NONCE_BITS))
}

fn validate_nonce(nonce: &FieldElement) -> Result<(), PoseidonError> {
    if field::to_biguint(nonce).bits() > u64::from(CIPHER_NONCE_BITS) {
        return Err(MathError::OutOfRange("cipher nonce must be below 2^128".into()).into());
    }
    Ok(())
}

fn initial_state(key: &[FieldElement; 2], nonce: &FieldElement, length: usize) -> [FieldElement; WIDTH] {
    let domain = *nonce + field::e_u64(length as u64) * two_pow_128();
    [FieldElement::zero(), key[0], key[1], domain]
}

/// Number of ciphertext elements produced for a plaintext of `length`.
pub fn ciphertext_len(length: usize) -> usize {
    length.div_ceil(RATE) * RATE + 1
}

/// Encrypt `msg` under `key` with `nonce` (< 2^128).
pub fn encrypt(
    msg: &[FieldElement],
    key: &[FieldElement; 2],
    nonce: &FieldElement,
) -> Result<Vec<FieldElement>, PoseidonError> {
    validate_nonce(nonce)?;

    let mut padded = msg.to_vec();
    padded.resize(msg.len().div_ceil(RATE) * RATE, FieldElement::zero());

    let mut state = initial_state(key, nonce, msg.len());
    let mut ciphertext = Vec::with_capacity(ciphertext_len(msg.len()));

    for block in padded.chunks(RATE) {
        permute(&mut state)?;
        for (lane, m) in state[1..].iter_mut().zip(block) {
            *lane += m;
        }
        ciphertext.extend_from_slice(&state[1..]);
    }

    permute(&mut state)?;
    ciphertext.push(state[1]);
    Ok(ciphertext)
}

/// Decrypt `ciphertext` produced by [`encrypt`] for a message of `length`.
pub fn decrypt(
    ciphertext: &[FieldElement],
    key: &[FieldElement; 2],
    nonce: &FieldElement,
    length: usize,
) -> Result<Vec<FieldElement>, PoseidonError> {
    validate_nonce(nonce)?;

    let expected = ciphertext_len(length);
    if ciphertext.len() != expected {
        return Err(PoseidonError::CiphertextLength {
            expected,
            got: ciphertext.len(),
        });
    }

    let (body, tag) = ciphertext.split_at(expected - 1);
    let mut state = initial_state(key, nonce, length);
    let mut msg = Vec::with_capacity(body.len());

    for block in body.chunks(RATE) {
        permute(&mut state)?;
        for (lane, c) in state[1..].iter_mut().zip(block) {
            msg.push(*c - *lane);
            *lane = *c;
        }
    }

    if msg[length..].iter().any(|m| !m.is_zero()) {
        return Err(PoseidonError::NonZeroPadding);
    }

    permute(&mut state)?;
    if state[1] != tag[0] {
        return Err(PoseidonError::AuthenticationFailed);
    }

    msg.truncate(length);
    Ok(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{e_u64, one};
    use ark_ff::UniformRand;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    fn key() -> [FieldElement; 2] {
        [e_u64(0x1234), e_u64(0x5678)]
    }

    #[test]
    fn encrypt_decrypt_all_padding_shapes() {
        let mut rng = StdRng::seed_from_u64(21);
        for len in [1usize, 2, 3, 4, 5, 6, 10] {
            let msg: Vec<FieldElement> = (0..len).map(|_| FieldElement::rand(&mut rng)).collect();
            let nonce = e_u64(len as u64);
            let ct = encrypt(&msg, &key(), &nonce).unwrap();
            assert_eq!(ct.len(), ciphertext_len(len));
            assert_eq!(decrypt(&ct, &key(), &nonce, len).unwrap(), msg, "len = {len}");
        }
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let msg = vec![e_u64(1), e_u64(2), e_u64(3)];
        let ct = encrypt(&msg, &key(), &e_u64(9)).unwrap();
        let wrong = [e_u64(0x1234), e_u64(0x5679)];
        assert_eq!(
            decrypt(&ct, &wrong, &e_u64(9), 3),
            Err(PoseidonError::AuthenticationFailed)
        );
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let msg = vec![e_u64(5), e_u64(6), e_u64(7), e_u64(8)];
        let mut ct = encrypt(&msg, &key(), &e_u64(1)).unwrap();
        ct[0] += one();
        assert!(decrypt(&ct, &key(), &e_u64(1), 4).is_err());
    }

    #[test]
    fn wrong_length_is_rejected() {
        let msg = vec![e_u64(5), e_u64(6)];
        let ct = encrypt(&msg, &key(), &e_u64(1)).unwrap();
        // Same ciphertext size for length 1, but the domain separator differs.
        assert!(decrypt(&ct, &key(), &e_u64(1), 1).is_err());
        assert_eq!(
            decrypt(&ct, &key(), &e_u64(1), 4),
            Err(PoseidonError::CiphertextLength { expected: 7, got: 4 })
        );
    }

    #[test]
    fn nonce_must_fit_in_128_bits() {
        let max = field::e_biguint(&((BigUint::one() << 128u32) - 1u32));
        assert!(encrypt(&[one()], &key(), &max).is_ok());
        let too_big = field::e_biguint(&(BigUint::one() << 128u32));
        assert!(matches!(
            encrypt(&[one()], &key(), &too_big),
            Err(PoseidonError::Math(MathError::OutOfRange(_)))
        ));
    }

    #[test]
    fn same_inputs_same_ciphertext() {
        let msg = vec![e_u64(11)];
        assert_eq!(
            encrypt(&msg, &key(), &e_u64(3)).unwrap(),
            encrypt(&msg, &key(), &e_u64(3)).unwrap()
        );
        assert_ne!(
            encrypt(&msg, &key(), &e_u64(3)).unwrap(),
            encrypt(&msg, &key(), &e_u64(4)).unwrap()
        );
    }
}
