//! # Sparse Merkle Tree
//!
//! A binary Merkle tree over 256-bit keys where only occupied paths are
//! materialized. A key's path is its LSB-first bit decomposition; a leaf
//! sits at the shallowest depth where its path no longer collides with any
//! other key, and empty subtrees hash to zero.
//!
//! The tree is the commitment behind every credential: the claims tree is
//! an SMT keyed by claim index. Proofs are the sibling hashes along a key's
//! path, with trailing zeros trimmed, so they can be folded back to a root
//! by anyone holding `(key, value)` ([`compute_root`]).
//!
//! Storage sits behind [`SmtStore`]; [`MemStore`] is the default.

pub mod store;
pub mod tree;

use thiserror::Error;

use crate::crypto::poseidon::PoseidonError;

pub use store::{leaf_hash, MemStore, Node, SmtStore};
pub use tree::{
    compute_root, verify_inclusion, DeleteResult, FindResult, InsertResult, Smt, UpdateResult,
};

/// Errors from tree operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SmtError {
    #[error("key {0} already exists")]
    KeyExists(String),

    #[error("key {0} does not exist")]
    KeyNotFound(String),

    /// A referenced node hash has no record in the store.
    #[error("invalid node {0}: database corrupted")]
    CorruptedNode(String),

    #[error("store error: {0}")]
    Store(String),

    #[error(transparent)]
    Poseidon(#[from] PoseidonError),
}
