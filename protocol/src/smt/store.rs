//! Node storage for the sparse Merkle tree.
//!
//! Nodes are content-addressed: the key of every record is its Poseidon
//! hash, so a record is written once and never mutated. The tree only
//! needs batched inserts and deletes plus a root pointer, which is small
//! enough to put behind a trait and back with anything from a `HashMap` to
//! an on-disk key-value store.

use std::collections::HashMap;

use ark_ff::Zero;

use super::SmtError;
use crate::crypto::poseidon::{self, PoseidonError};
use crate::field::{self, FieldElement};

/// A stored tree node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    /// A key/value pair, hashed as `Poseidon(key, value, 1)`.
    Leaf { key: FieldElement, value: FieldElement },
    /// Two child hashes, hashed as `Poseidon(left, right)`. Zero is empty.
    Internal { left: FieldElement, right: FieldElement },
}

impl Node {
    pub fn hash(&self) -> Result<FieldElement, PoseidonError> {
        match self {
            Node::Leaf { key, value } => leaf_hash(key, value),
            Node::Internal { left, right } => poseidon::hash(&[*left, *right]),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}

/// `Poseidon(key, value, 1)`.
pub fn leaf_hash(key: &FieldElement, value: &FieldElement) -> Result<FieldElement, PoseidonError> {
    poseidon::hash(&[*key, *value, field::one()])
}

/// Backing store for [`super::Smt`].
pub trait SmtStore {
    fn get(&self, hash: &FieldElement) -> Result<Option<Node>, SmtError>;

    fn multi_get(&self, hashes: &[FieldElement]) -> Result<Vec<Option<Node>>, SmtError> {
        hashes.iter().map(|h| self.get(h)).collect()
    }

    fn multi_ins(&mut self, nodes: Vec<(FieldElement, Node)>) -> Result<(), SmtError>;

    /// Remove records. Hashes that are not present are ignored.
    fn multi_del(&mut self, hashes: &[FieldElement]) -> Result<(), SmtError>;

    fn set_root(&mut self, root: FieldElement) -> Result<(), SmtError>;

    fn root(&self) -> FieldElement;
}

/// In-memory store. The default for issuers and holders, which rebuild
/// trees from claims on demand.
#[derive(Clone, Debug, Default)]
pub struct MemStore {
    nodes: HashMap<FieldElement, Node>,
    root: FieldElement,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            root: FieldElement::zero(),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl SmtStore for MemStore {
    fn get(&self, hash: &FieldElement) -> Result<Option<Node>, SmtError> {
        Ok(self.nodes.get(hash).cloned())
    }

    fn multi_ins(&mut self, nodes: Vec<(FieldElement, Node)>) -> Result<(), SmtError> {
        self.nodes.extend(nodes);
        Ok(())
    }

    fn multi_del(&mut self, hashes: &[FieldElement]) -> Result<(), SmtError> {
        for h in hashes {
            self.nodes.remove(h);
        }
        Ok(())
    }

    fn set_root(&mut self, root: FieldElement) -> Result<(), SmtError> {
        self.root = root;
        Ok(())
    }

    fn root(&self) -> FieldElement {
        self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::e_u64;

    #[test]
    fn leaf_and_internal_hash_differently() {
        let leaf = Node::Leaf {
            key: e_u64(1),
            value: e_u64(2),
        };
        let internal = Node::Internal {
            left: e_u64(1),
            right: e_u64(2),
        };
        assert_ne!(leaf.hash().unwrap(), internal.hash().unwrap());
        assert!(leaf.is_leaf());
        assert!(!internal.is_leaf());
    }

    #[test]
    fn mem_store_batches() {
        let mut store = MemStore::new();
        let leaf = Node::Leaf {
            key: e_u64(3),
            value: e_u64(4),
        };
        let h = leaf.hash().unwrap();
        store.multi_ins(vec![(h, leaf.clone())]).unwrap();
        assert_eq!(store.get(&h).unwrap(), Some(leaf));
        assert_eq!(store.multi_get(&[h, e_u64(0)]).unwrap()[1], None);

        store.multi_del(&[h, e_u64(77)]).unwrap();
        assert!(store.is_empty());

        store.set_root(h).unwrap();
        assert_eq!(store.root(), h);
    }
}
