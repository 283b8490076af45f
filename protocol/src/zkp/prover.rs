//! # External Prover Seam
//!
//! Proofs are generated outside this crate, by whatever runs the circuit's
//! witness generator and the Groth16 prover (snarkjs, rapidsnark, ...).
//! This module defines what goes in and what comes out:
//!
//! 1. Build a [`CircuitInput`] from claims-tree proofs, Shamir shares and
//!    plain signals.
//! 2. Hand it to a [`Groth16Prover`] with the circuit's `wasm` and `zkey`.
//! 3. Run the snarkjs-shaped result through [`prove_for_chain`] to get the
//!    wire proof and 32-byte public signals.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::codec::{encode_public_signals, SnarkjsProof, WireProof};
use crate::credential::claims::ClaimProof;
use crate::field::{self, FieldElement};
use crate::identity::recovery::ShamirShare;

// ---------------------------------------------------------------------------
// Circuit input
// ---------------------------------------------------------------------------

/// Named circuit signals, serialized the way circom witness generators
/// expect: decimal strings, arrays for vector signals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CircuitInput(BTreeMap<String, Value>);

impl CircuitInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_scalar(&mut self, name: &str, value: &FieldElement) -> &mut Self {
        self.0
            .insert(name.to_string(), Value::String(field::to_decimal(value)));
        self
    }

    pub fn insert_array(&mut self, name: &str, values: &[FieldElement]) -> &mut Self {
        let array = values
            .iter()
            .map(|v| Value::String(field::to_decimal(v)))
            .collect();
        self.0.insert(name.to_string(), Value::Array(array));
        self
    }

    /// `<prefix>Root`, `<prefix>Key`, `<prefix>Value`, `<prefix>Siblings`
    /// for a claims-tree membership proof.
    pub fn insert_claim_proof(
        &mut self,
        prefix: &str,
        root: &FieldElement,
        proof: &ClaimProof,
    ) -> &mut Self {
        self.insert_scalar(&format!("{prefix}Root"), root)
            .insert_scalar(&format!("{prefix}Key"), &field::e_u64(proof.key))
            .insert_scalar(&format!("{prefix}Value"), &proof.value)
            .insert_array(&format!("{prefix}Siblings"), &proof.siblings)
    }

    /// `<prefix>Indices` and `<prefix>Values` for a set of trustee shares.
    pub fn insert_shares(&mut self, prefix: &str, shares: &[ShamirShare]) -> &mut Self {
        let indices: Vec<FieldElement> = shares.iter().map(|s| field::e_u64(s.index)).collect();
        let values: Vec<FieldElement> = shares.iter().map(|s| s.value).collect();
        self.insert_array(&format!("{prefix}Indices"), &indices)
            .insert_array(&format!("{prefix}Values"), &values)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Prover
// ---------------------------------------------------------------------------

/// What a prover returns: `proof.json` and `public.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProverOutput {
    pub proof: SnarkjsProof,
    pub public_signals: Vec<String>,
}

/// A Groth16 prover for circom circuits.
///
/// No implementation ships here; callers plug in a binding to their prover.
pub trait Groth16Prover {
    fn prove(&self, input: &CircuitInput, wasm: &[u8], zkey: &[u8]) -> Result<ProverOutput>;
}

/// A proof ready for the on-chain verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainProof {
    pub proof: WireProof,
    pub public_signals: Vec<[u8; 32]>,
}

/// Prove with `prover` and encode the result for the chain.
pub fn prove_for_chain<P: Groth16Prover + ?Sized>(
    prover: &P,
    input: &CircuitInput,
    wasm: &[u8],
    zkey: &[u8],
) -> Result<ChainProof> {
    let output = prover
        .prove(input, wasm, zkey)
        .context("external Groth16 prover failed")?;

    let proof = WireProof::from_snarkjs(&output.proof).context("malformed prover proof")?;
    let public_signals =
        encode_public_signals(&output.public_signals).context("malformed public signals")?;

    tracing::debug!(signals = public_signals.len(), "proof encoded for chain");
    Ok(ChainProof {
        proof,
        public_signals,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
