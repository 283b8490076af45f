//! # Groth16 Verification over Wire Bytes
//!
//! Runs the same check as the on-chain alt_bn128 verifier, starting from
//! the encoded verifying key, the wire proof (with `-A`) and the 32-byte
//! public signals:
//!
//! ```text
//! vk_x = IC[0] + Σ signal_i · IC[i+1]
//! e(-A, B) · e(alpha, beta) · e(vk_x, gamma) · e(C, delta) == 1
//! ```
//!
//! Useful for checking a proof before paying to submit it.

use ark_bn254::{Bn254, Fr, G1Affine, G1Projective, G2Affine};
use ark_ec::pairing::Pairing;
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{One, PrimeField};
use tracing::debug;

use super::codec::{g1_affine, g2_affine, CodecError, WireProof};
use crate::config::{G1_BYTES, G2_BYTES, VK_PREFIX_BYTES};
use crate::field;

/// A verifying key parsed from wire bytes into curve points.
#[derive(Debug, Clone)]
pub struct WireVerifyingKey {
    alpha: G1Affine,
    beta: G2Affine,
    gamma: G2Affine,
    delta: G2Affine,
    ic: Vec<G1Affine>,
}

impl WireVerifyingKey {
    /// Parse and curve-check an encoded verifying key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() < VK_PREFIX_BYTES + G1_BYTES {
            return Err(CodecError::Length {
                expected: VK_PREFIX_BYTES + G1_BYTES,
                got: bytes.len(),
            });
        }
        let ic_bytes = &bytes[VK_PREFIX_BYTES..];
        if ic_bytes.len() % G1_BYTES != 0 {
            return Err(CodecError::Format("truncated IC point".into()));
        }

        Ok(Self {
            alpha: g1_affine(bytes)?,
            beta: g2_affine(&bytes[G1_BYTES..])?,
            gamma: g2_affine(&bytes[G1_BYTES + G2_BYTES..])?,
            delta: g2_affine(&bytes[G1_BYTES + 2 * G2_BYTES..])?,
            ic: ic_bytes
                .chunks(G1_BYTES)
                .map(g1_affine)
                .collect::<Result<_, _>>()?,
        })
    }

    pub fn n_public(&self) -> usize {
        self.ic.len() - 1
    }

    /// Check `proof` against `public_signals`.
    ///
    /// `Ok(false)` means the pairing check failed. Malformed points, a
    /// wrong signal count or a signal outside the scalar field are errors.
    pub fn verify(
        &self,
        proof: &WireProof,
        public_signals: &[[u8; 32]],
    ) -> Result<bool, CodecError> {
        if public_signals.len() != self.n_public() {
            return Err(CodecError::Format(format!(
                "expected {} public signals, got {}",
                self.n_public(),
                public_signals.len()
            )));
        }

        let mut vk_x: G1Projective = self.ic[0].into_group();
        for (signal, base) in public_signals.iter().zip(&self.ic[1..]) {
            let s = scalar(signal)?;
            vk_x += *base * s;
        }

        let neg_a = g1_affine(&proof.a)?;
        let b = g2_affine(&proof.b)?;
        let c = g1_affine(&proof.c)?;

        let result = Bn254::multi_pairing(
            [neg_a, self.alpha, vk_x.into_affine(), c],
            [b, self.beta, self.gamma, self.delta],
        );
        let valid = result.0.is_one();

        debug!(signals = public_signals.len(), valid, "groth16 wire proof checked");
        Ok(valid)
    }
}

fn scalar(word: &[u8; 32]) -> Result<Fr, CodecError> {
    let n = num_bigint::BigUint::from_bytes_be(word);
    if !field::is_canonical(&n) {
        return Err(CodecError::Format(format!(
            "public signal {n} is not a scalar field element"
        )));
    }
    Ok(Fr::from_be_bytes_mod_order(word))
}

/// One-shot form of [`WireVerifyingKey::verify`].
pub fn verify_wire(
    vk_bytes: &[u8],
    proof: &WireProof,
    public_signals: &[[u8; 32]],
) -> Result<bool, CodecError> {
    WireVerifyingKey::from_bytes(vk_bytes)?.verify(proof, public_signals)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zkp::codec::{
        alt_bn128_g1_neg, encode_public_signals, encode_verifying_key, G1Point, SnarkjsProof,
        SnarkjsVerifyingKey,
    };
    use ark_groth16::Groth16;
    use ark_relations::lc;
    use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
    use ark_snark::{CircuitSpecificSetupSNARK, SNARK};
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    /// Knows `x, y` with `x · y = z`, `z` public.
    #[derive(Clone)]
    struct Product {
        x: Option<Fr>,
        y: Option<Fr>,
    }

    impl ConstraintSynthesizer<Fr> for Product {
        fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
            let x = cs.new_witness_variable(|| self.x.ok_or(SynthesisError::AssignmentMissing))?;
            let y = cs.new_witness_variable(|| self.y.ok_or(SynthesisError::AssignmentMissing))?;
            let z = cs.new_input_variable(|| {
                let x = self.x.ok_or(SynthesisError::AssignmentMissing)?;
                let y = self.y.ok_or(SynthesisError::AssignmentMissing)?;
                Ok(x * y)
            })?;
            cs.enforce_constraint(lc!() + x, lc!() + y, lc!() + z)?;
            Ok(())
        }
    }

    struct Fixture {
        vk: SnarkjsVerifyingKey,
        vk_bytes: Vec<u8>,
        proof: WireProof,
    }

    fn fixture() -> Fixture {
        let mut rng = StdRng::seed_from_u64(42);
        let blank = Product { x: None, y: None };
        let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(blank, &mut rng).unwrap();

        let circuit = Product {
            x: Some(Fr::from(3u64)),
            y: Some(Fr::from(7u64)),
        };
        let proof = Groth16::<Bn254>::prove(&pk, circuit, &mut rng).unwrap();

        let vk = SnarkjsVerifyingKey::from(&vk);
        Fixture {
            vk_bytes: encode_verifying_key(&vk).unwrap(),
            vk,
            proof: WireProof::from_snarkjs(&SnarkjsProof::from(&proof)).unwrap(),
        }
    }

    fn signals(values: &[&str]) -> Vec<[u8; 32]> {
        let owned: Vec<String> = values.iter().map(|s| s.to_string()).collect();
        encode_public_signals(&owned).unwrap()
    }

    #[test]
    fn valid_proof_verifies_from_wire_bytes() {
        let f = fixture();
        assert!(verify_wire(&f.vk_bytes, &f.proof, &signals(&["21"])).unwrap());
    }

    #[test]
    fn identity_ic_point_survives_the_wire() {
        // An input whose IC point is the identity contributes nothing to
        // vk_x, so any value for it leaves the proof valid.
        let f = fixture();
        let mut vk = f.vk.clone();
        vk.ic.push(G1Point::from(&G1Affine::identity()));
        vk.n_public += 1;
        let vk_bytes = encode_verifying_key(&vk).unwrap();

        assert!(verify_wire(&vk_bytes, &f.proof, &signals(&["21", "5"])).unwrap());
        assert!(!verify_wire(&vk_bytes, &f.proof, &signals(&["22", "5"])).unwrap());
    }

    #[test]
    fn wrong_public_signal_fails() {
        let f = fixture();
        assert!(!verify_wire(&f.vk_bytes, &f.proof, &signals(&["22"])).unwrap());
    }

    #[test]
    fn un_negated_a_fails() {
        let f = fixture();
        let mut proof = f.proof.clone();
        proof.a = alt_bn128_g1_neg(&proof.a).unwrap();
        assert!(!verify_wire(&f.vk_bytes, &proof, &signals(&["21"])).unwrap());
    }

    #[test]
    fn signal_count_must_match_vk() {
        let f = fixture();
        let vk = WireVerifyingKey::from_bytes(&f.vk_bytes).unwrap();
        assert_eq!(vk.n_public(), 1);
        assert!(matches!(
            vk.verify(&f.proof, &signals(&["21", "1"])),
            Err(CodecError::Format(_))
        ));
    }

    #[test]
    fn non_canonical_signal_is_rejected() {
        let f = fixture();
        assert!(matches!(
            verify_wire(&f.vk_bytes, &f.proof, &[[0xff; 32]]),
            Err(CodecError::Format(_))
        ));
    }
}
