//! # Identity
//!
//! The parts of identity the credential core actually touches:
//!
//! 1. **DID documents**: which key an issuer or holder uses, looked up
//!    through a [`KeyResolver`]. Resolution itself is somebody else's job.
//! 2. **Recovery**: Shamir secret sharing over the BN254 scalar field, so
//!    a threshold of trustees can reconstruct a secret.

pub mod did;
pub mod recovery;

pub use did::{DidDocument, DidError, KeyResolver, StaticResolver, VerificationMethod};
pub use recovery::{
    reconstruct_shamir_secret, split_shamir_secret, ShamirConfig, ShamirError, ShamirShare,
};
