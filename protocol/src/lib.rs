// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # zkcred Protocol: Commitment & Proof Core
//!
//! Turns claim data into a single BN254 field element that can be signed,
//! selectively disclosed, and checked against Groth16 proofs on chain.
//!
//! Everything here is circomlib-compatible: the Poseidon parameters, the
//! BabyJubJub curve, EdDSA-Poseidon and the sparse Merkle tree all match
//! what the circuits compute, so a root signed by an issuer is the same
//! root a circuit proves membership against.
//!
//! ## Architecture
//!
//! - **field**: BN254 scalar field glue over arkworks `Fr`.
//! - **crypto**: Poseidon (hash, byte hash, duplex cipher), BabyJubJub,
//!   EdDSA-Poseidon, Ed25519 holder keys, multibase.
//! - **smt**: Sparse Merkle tree with pluggable node storage.
//! - **credential**: Claims trees, VCs, selective-disclosure presentations.
//! - **identity**: DID documents and Shamir secret sharing.
//! - **zkp**: Groth16 wire codec, local pairing check, external prover seam.
//! - **logging**: `tracing` subscriber setup.
//! - **config**: Protocol constants.
//!
//! ## Ground rules
//!
//! 1. Every operation is pure and synchronous. Nothing here does I/O.
//! 2. Key material never reaches a log line or a `Debug` impl.
//! 3. Errors are typed per module and propagated, never swallowed.

pub mod config;
pub mod credential;
pub mod crypto;
pub mod field;
pub mod identity;
pub mod logging;
pub mod smt;
pub mod zkp;

pub use field::FieldElement;
