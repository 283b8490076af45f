//! # Poseidon Permutation & Hash
//!
//! Poseidon is the hash every commitment in the credential core is built
//! on: SMT nodes, EdDSA challenges, long claim values, and the duplex cipher
//! in [`super::poseidon_cipher`]. It has to match the Circom circuits bit for
//! bit, so the parameters are the circomlib ones:
//!
//! - field: BN254 scalar field, S-box `x^5`;
//! - `R_f = 8` full rounds (4 before, 4 after the partial rounds);
//! - `R_p` partial rounds from [`POSEIDON_PARTIAL_ROUNDS`], indexed by `t - 2`;
//! - state width `t = inputs + 1`, lane 0 is the capacity and starts at zero.
//!
//! ## Parameter sources
//!
//! For `t <= 13` the round constants and MDS matrices come straight from
//! `light-poseidon`, which vendors the circomlib tables. The byte sponge
//! needs 16-input frames (`t = 17`), which `light-poseidon` does not ship,
//! so widths 14..=17 are derived with the same Grain LFSR procedure the
//! reference parameters were generated with (`ark-crypto-primitives`).
//!
//! Parameters are built lazily, once per width, on first use.
//!
//! ## Round structure
//!
//! ```text
//! for round in 0..R_f + R_p:
//!     state[i] += C[round * t + i]
//!     sbox(state)            -- every lane in full rounds, lane 0 in partial rounds
//!     state = M * state
//! ```

use std::sync::OnceLock;

use ark_crypto_primitives::sponge::poseidon::find_poseidon_ark_and_mds;
use ark_ff::{Field, PrimeField, Zero};
use light_poseidon::parameters::bn254_x5::get_poseidon_parameters;
use thiserror::Error;

use crate::config::{
    HASH_BYTES_FRAME_SIZE, POSEIDON_FULL_ROUNDS, POSEIDON_MAX_INPUTS, POSEIDON_PARTIAL_ROUNDS,
    POSEIDON_TABULATED_MAX_WIDTH, SPONGE_CHUNK_SIZE,
};
use crate::field::{self, FieldElement, MathError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from the Poseidon hash and cipher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoseidonError {
    /// The hash accepts between 1 and 16 inputs.
    #[error("poseidon accepts 1..={max} inputs, got {0}", max = POSEIDON_MAX_INPUTS)]
    InvalidInputCount(usize),

    /// No parameters exist for the requested state width.
    #[error("no poseidon parameters for width {0}")]
    UnsupportedWidth(usize),

    /// Loading or deriving the round constants failed.
    #[error("poseidon parameter setup failed: {0}")]
    Parameters(String),

    /// Cipher nonce must be below 2^128.
    #[error(transparent)]
    Math(#[from] MathError),

    /// Ciphertext has the wrong number of elements for the declared length.
    #[error("ciphertext length mismatch: expected {expected} elements, got {got}")]
    CiphertextLength {
        /// Elements implied by the plaintext length.
        expected: usize,
        /// Elements actually supplied.
        got: usize,
    },

    /// Decrypted padding lanes were not zero.
    #[error("non-zero padding in decrypted message")]
    NonZeroPadding,

    /// The authentication tag did not match.
    #[error("authentication tag mismatch")]
    AuthenticationFailed,
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Round constants and MDS matrix for one state width.
#[derive(Debug, Clone)]
pub struct PoseidonParams {
    /// State width `t`.
    pub width: usize,
    /// Number of full rounds.
    pub full_rounds: usize,
    /// Number of partial rounds.
    pub partial_rounds: usize,
    /// Flat round constants, `ark[round * width + lane]`.
    pub ark: Vec<FieldElement>,
    /// `width x width` MDS matrix.
    pub mds: Vec<Vec<FieldElement>>,
}

const MIN_WIDTH: usize = 2;
const MAX_WIDTH: usize = POSEIDON_MAX_INPUTS + 1;

#[allow(clippy::declare_interior_mutable_const)]
const EMPTY_SLOT: OnceLock<PoseidonParams> = OnceLock::new();
static PARAMS: [OnceLock<PoseidonParams>; POSEIDON_MAX_INPUTS] = [EMPTY_SLOT; POSEIDON_MAX_INPUTS];

/// Parameters for state width `width`, built on first use.
pub fn params(width: usize) -> Result<&'static PoseidonParams, PoseidonError> {
    if !(MIN_WIDTH..=MAX_WIDTH).contains(&width) {
        return Err(PoseidonError::UnsupportedWidth(width));
    }
    let slot = &PARAMS[width - MIN_WIDTH];
    if let Some(p) = slot.get() {
        return Ok(p);
    }
    let built = build_params(width)?;
    Ok(slot.get_or_init(|| built))
}

fn build_params(width: usize) -> Result<PoseidonParams, PoseidonError> {
    let partial_rounds = POSEIDON_PARTIAL_ROUNDS[width - MIN_WIDTH];

    if width <= POSEIDON_TABULATED_MAX_WIDTH {
        let t = u8::try_from(width).map_err(|_| PoseidonError::UnsupportedWidth(width))?;
        let p = get_poseidon_parameters::<FieldElement>(t)
            .map_err(|e| PoseidonError::Parameters(e.to_string()))?;
        debug_assert_eq!(p.partial_rounds, partial_rounds);
        return Ok(PoseidonParams {
            width,
            full_rounds: p.full_rounds,
            partial_rounds: p.partial_rounds,
            ark: p.ark,
            mds: p.mds,
        });
    }

    tracing::debug!(width, partial_rounds, "deriving poseidon parameters via grain lfsr");
    let (ark, mds) = find_poseidon_ark_and_mds::<FieldElement>(
        FieldElement::MODULUS_BIT_SIZE as u64,
        width - 1,
        POSEIDON_FULL_ROUNDS as u64,
        partial_rounds as u64,
        0,
    );
    Ok(PoseidonParams {
        width,
        full_rounds: POSEIDON_FULL_ROUNDS,
        partial_rounds,
        ark: ark.into_iter().flatten().collect(),
        mds,
    })
}

// ---------------------------------------------------------------------------
// Permutation
// ---------------------------------------------------------------------------

#[inline]
fn sbox(x: &mut FieldElement) {
    let x4 = x.square().square();
    *x *= x4;
}

/// Apply the full Poseidon permutation to `state` in place.
///
/// The width is taken from `state.len()`. Exposed for the duplex cipher,
/// which needs every output lane, not just lane 0.
pub fn permute(state: &mut [FieldElement]) -> Result<(), PoseidonError> {
    let width = state.len();
    let p = params(width)?;
    let half_full = p.full_rounds / 2;
    let mut mixed = vec![FieldElement::zero(); width];

    for round in 0..p.full_rounds + p.partial_rounds {
        let constants = &p.ark[round * width..(round + 1) * width];
        for (lane, c) in state.iter_mut().zip(constants) {
            *lane += c;
        }

        if round < half_full || round >= half_full + p.partial_rounds {
            state.iter_mut().for_each(sbox);
        } else {
            sbox(&mut state[0]);
        }

        for (out, row) in mixed.iter_mut().zip(&p.mds) {
            *out = row
                .iter()
                .zip(state.iter())
                .fold(FieldElement::zero(), |acc, (m, s)| acc + *m * s);
        }
        state.copy_from_slice(&mixed);
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// Poseidon hash of 1..=16 field elements (circomlib `poseidon(inputs)`).
pub fn hash(inputs: &[FieldElement]) -> Result<FieldElement, PoseidonError> {
    if inputs.is_empty() || inputs.len() > POSEIDON_MAX_INPUTS {
        return Err(PoseidonError::InvalidInputCount(inputs.len()));
    }
    let mut state = Vec::with_capacity(inputs.len() + 1);
    state.push(FieldElement::zero());
    state.extend_from_slice(inputs);
    permute(&mut state)?;
    Ok(state[0])
}

/// Sponge hash of arbitrary bytes.
///
/// The message is cut into 31-byte chunks (the last one zero-padded on the
/// right), each read as a big-endian integer. Chunks fill a 16-lane frame;
/// when the frame is full it is hashed and the digest carries over into
/// lane 0 of the next frame. The empty message hashes the all-zero frame.
pub fn hash_bytes(msg: &[u8]) -> Result<FieldElement, PoseidonError> {
    let mut frame = [FieldElement::zero(); HASH_BYTES_FRAME_SIZE];
    let mut lane = 0usize;
    let mut dirty = false;
    let mut digest = None;

    for chunk in msg.chunks(SPONGE_CHUNK_SIZE) {
        let mut padded = [0u8; SPONGE_CHUNK_SIZE];
        padded[..chunk.len()].copy_from_slice(chunk);
        frame[lane] = field::from_be_bytes(&padded);
        dirty = true;

        if lane == HASH_BYTES_FRAME_SIZE - 1 {
            let h = hash(&frame)?;
            frame = [FieldElement::zero(); HASH_BYTES_FRAME_SIZE];
            frame[0] = h;
            lane = 1;
            dirty = false;
            digest = Some(h);
        } else {
            lane += 1;
        }
    }

    match digest {
        Some(h) if !dirty => Ok(h),
        _ => hash(&frame),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{e_str, e_u64, one};
    use ark_ff::UniformRand;
    use ark_std::rand::{rngs::StdRng, Rng, SeedableRng};
    use light_poseidon::{Poseidon, PoseidonHasher};
    use std::collections::HashSet;

    #[test]
    fn circomlib_vectors() {
        let h1 = hash(&[one()]).unwrap();
        assert_eq!(
            h1,
            e_str("18586133768512220936620570745912940619677854269274689475585506675881198879027")
                .unwrap()
        );

        let h12 = hash(&[e_u64(1), e_u64(2)]).unwrap();
        assert_eq!(
            h12,
            e_str("7853200120776062878684798364095072458815029376092732009249414926327459813530")
                .unwrap()
        );
    }

    #[test]
    fn matches_light_poseidon_for_tabulated_widths() {
        let mut rng = StdRng::seed_from_u64(11);
        for n in 1..POSEIDON_TABULATED_MAX_WIDTH {
            let inputs: Vec<FieldElement> = (0..n).map(|_| FieldElement::rand(&mut rng)).collect();
            let mut reference = Poseidon::<FieldElement>::new_circom(n).unwrap();
            assert_eq!(hash(&inputs).unwrap(), reference.hash(&inputs).unwrap(), "n = {n}");
        }
    }

    #[test]
    fn wide_widths_are_supported_and_deterministic() {
        let mut rng = StdRng::seed_from_u64(12);
        for n in POSEIDON_TABULATED_MAX_WIDTH..=POSEIDON_MAX_INPUTS {
            let inputs: Vec<FieldElement> = (0..n).map(|_| FieldElement::rand(&mut rng)).collect();
            let a = hash(&inputs).unwrap();
            assert_eq!(a, hash(&inputs).unwrap());

            let mut tweaked = inputs.clone();
            tweaked[n - 1] += one();
            assert_ne!(a, hash(&tweaked).unwrap());
        }
    }

    #[test]
    fn iden3_vectors_for_derived_widths() {
        let inputs: Vec<FieldElement> = (1..=16).map(e_u64).collect();
        let h16 =
            e_str("9989051620750914585850546081941653841776809718687451684622678807385399211877")
                .unwrap();
        assert_eq!(hash(&inputs).unwrap(), h16);
        assert_eq!(
            hash(&inputs[..14]).unwrap(),
            e_str("8354478399926161176778659061636406690034081872658507739535256090879947077494")
                .unwrap()
        );

        // Sixteen 31-byte chunks reading 1..=16 fill exactly one frame.
        let mut msg = vec![0u8; SPONGE_CHUNK_SIZE * HASH_BYTES_FRAME_SIZE];
        for (i, chunk) in msg.chunks_mut(SPONGE_CHUNK_SIZE).enumerate() {
            chunk[SPONGE_CHUNK_SIZE - 1] = i as u8 + 1;
        }
        assert_eq!(hash_bytes(&msg).unwrap(), h16);
    }

    #[test]
    fn input_count_is_bounded() {
        assert_eq!(hash(&[]), Err(PoseidonError::InvalidInputCount(0)));
        let too_many = vec![one(); POSEIDON_MAX_INPUTS + 1];
        assert_eq!(hash(&too_many), Err(PoseidonError::InvalidInputCount(17)));
        assert_eq!(permute(&mut [one()]), Err(PoseidonError::UnsupportedWidth(1)));
    }

    #[test]
    fn every_input_position_matters() {
        let base: Vec<FieldElement> = (1..=5).map(e_u64).collect();
        let h = hash(&base).unwrap();
        for i in 0..base.len() {
            let mut changed = base.clone();
            changed[i] += one();
            assert_ne!(h, hash(&changed).unwrap(), "position {i}");
        }
    }

    #[test]
    fn hash_bytes_matches_chunked_hash() {
        // 40 bytes -> two chunks, second right-padded with zeros.
        let msg: Vec<u8> = (0u8..40).collect();
        let mut first = [0u8; 31];
        first.copy_from_slice(&msg[..31]);
        let mut second = [0u8; 31];
        second[..9].copy_from_slice(&msg[31..]);

        let mut frame = vec![FieldElement::zero(); HASH_BYTES_FRAME_SIZE];
        frame[0] = field::from_be_bytes(&first);
        frame[1] = field::from_be_bytes(&second);

        assert_eq!(hash_bytes(&msg).unwrap(), hash(&frame).unwrap());
    }

    #[test]
    fn hash_bytes_chains_full_frames() {
        // Exactly 16 chunks fills one frame; a 17th chunk lands in lane 1
        // of the next frame, after the carried digest.
        let msg = vec![0xabu8; SPONGE_CHUNK_SIZE * 17];
        let chunk = field::from_be_bytes(&[0xabu8; SPONGE_CHUNK_SIZE]);

        let first = hash(&[chunk; HASH_BYTES_FRAME_SIZE]).unwrap();
        assert_eq!(
            hash_bytes(&msg[..SPONGE_CHUNK_SIZE * 16]).unwrap(),
            first
        );

        let mut next = [FieldElement::zero(); HASH_BYTES_FRAME_SIZE];
        next[0] = first;
        next[1] = chunk;
        assert_eq!(hash_bytes(&msg).unwrap(), hash(&next).unwrap());
    }

    #[test]
    fn hash_bytes_of_empty_message_is_zero_frame() {
        let zeros = [FieldElement::zero(); HASH_BYTES_FRAME_SIZE];
        assert_eq!(hash_bytes(&[]).unwrap(), hash(&zeros).unwrap());
    }

    #[test]
    fn hash_bytes_single_bit_flips_do_not_collide() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let mut a = [0u8; 32];
            rng.fill(&mut a[..]);
            let mut b = a;
            let bit = rng.gen_range(0..256);
            b[bit / 8] ^= 1 << (bit % 8);

            let ha = hash_bytes(&a).unwrap();
            let hb = hash_bytes(&b).unwrap();
            assert_ne!(ha, hb);
            seen.insert(field::to_be_bytes(&ha));
        }
        assert!(seen.len() > 990);
    }
}
