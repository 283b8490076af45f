//! # Groth16 Interop
//!
//! Circuit proofs are produced by an external Groth16 prover over BN254 and
//! checked by an alt_bn128 pairing verifier on chain. This module sits
//! between the two:
//!
//! ```text
//! prover.rs    circuit inputs and the external prover seam
//! codec.rs     snarkjs JSON <-> fixed-width wire bytes, G1 negation
//! verifier.rs  the on-chain pairing check, run locally over wire bytes
//! ```

pub mod codec;
pub mod prover;
pub mod verifier;

pub use codec::{
    alt_bn128_g1_neg, decode_g1, decode_g2, decode_public_signals, decode_verifying_key,
    encode_g1, encode_g2, encode_public_signals, encode_verifying_key, CodecError, G1Point,
    G2Point, SnarkjsProof, SnarkjsVerifyingKey, WireProof,
};
pub use prover::{prove_for_chain, ChainProof, CircuitInput, Groth16Prover, ProverOutput};
pub use verifier::{verify_wire, WireVerifyingKey};
