//! # Cryptographic Primitives
//!
//! Everything the credential core signs, hashes or encrypts goes through
//! here:
//!
//! - **Poseidon** over BN254 `Fr` for hashing claims and tree nodes, plus a
//!   duplex cipher for encrypted credential subjects.
//! - **BabyJubJub / EdDSA-Poseidon** for issuer signatures on claims roots.
//! - **Ed25519** for holder signatures on presentations.
//! - **Multibase** for every key and signature that leaves the crate as a
//!   string.
//!
//! None of it is novel. The parameters are circomlib's, so anything signed
//! or hashed here can be checked inside a circuit.

pub mod babyjub;
pub mod eddsa;
pub mod keys;
pub mod multibase;
pub mod poseidon;
pub mod poseidon_cipher;

pub use babyjub::Point;
pub use eddsa::{prv2pub, sign_poseidon, verify_poseidon, EddsaError, EddsaKeyPair, Signature};
pub use keys::{verify_ed25519, HolderKeyPair, KeyError};
pub use multibase::{FormatError, Multicodec};
pub use poseidon::{hash as poseidon_hash, hash_bytes as poseidon_hash_bytes, PoseidonError};
