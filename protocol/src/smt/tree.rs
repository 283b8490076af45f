//! Tree operations: lookup, insertion with leaf push-down, update, and
//! deletion with sibling pull-up.

use ark_ff::Zero;
use serde::Serialize;
use tracing::{debug, warn};

use super::store::{leaf_hash, MemStore, Node, SmtStore};
use super::SmtError;
use crate::crypto::poseidon::{self, PoseidonError};
use crate::field::{self, FieldElement};

// ---------------------------------------------------------------------------
// Result records
// ---------------------------------------------------------------------------

/// Outcome of a lookup.
///
/// When the key is absent, `not_found_key`/`not_found_value` describe the
/// leaf the search ended on (if any) and `is_old0` says whether it ended on
/// an empty subtree instead. These are the non-membership witnesses a
/// circuit needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FindResult {
    pub found: bool,
    #[serde(with = "field::serde_decimal")]
    pub key: FieldElement,
    /// The stored value when `found`, zero otherwise.
    #[serde(with = "field::serde_decimal")]
    pub value: FieldElement,
    #[serde(with = "field::serde_decimal_vec")]
    pub siblings: Vec<FieldElement>,
    #[serde(with = "field::serde_decimal")]
    pub not_found_key: FieldElement,
    #[serde(with = "field::serde_decimal")]
    pub not_found_value: FieldElement,
    pub is_old0: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InsertResult {
    pub old_root: FieldElement,
    pub new_root: FieldElement,
    pub key: FieldElement,
    pub value: FieldElement,
    /// Inclusion proof for the new leaf, trailing zeros trimmed.
    pub siblings: Vec<FieldElement>,
    pub old_key: FieldElement,
    pub old_value: FieldElement,
    pub is_old0: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateResult {
    pub old_root: FieldElement,
    pub new_root: FieldElement,
    pub key: FieldElement,
    pub old_value: FieldElement,
    pub new_value: FieldElement,
    pub siblings: Vec<FieldElement>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteResult {
    pub old_root: FieldElement,
    pub new_root: FieldElement,
    pub key: FieldElement,
    pub value: FieldElement,
    /// Siblings that remain on the path after the deletion.
    pub siblings: Vec<FieldElement>,
    pub old_key: FieldElement,
    pub old_value: FieldElement,
    pub is_old0: bool,
}

/// A lookup plus the internal node hashes visited on the way down.
struct Descent {
    result: FindResult,
    path: Vec<FieldElement>,
}

// ---------------------------------------------------------------------------
// Smt
// ---------------------------------------------------------------------------

/// A sparse Merkle tree over a [`SmtStore`].
///
/// Not internally synchronized: an instance belongs to whoever builds it.
#[derive(Clone, Debug)]
pub struct Smt<S: SmtStore = MemStore> {
    store: S,
}

impl Smt<MemStore> {
    /// Empty in-memory tree.
    pub fn new() -> Self {
        Self {
            store: MemStore::new(),
        }
    }
}

impl Default for Smt<MemStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SmtStore> Smt<S> {
    /// Open a tree over an existing store, rooted at `store.root()`.
    pub fn with_store(store: S) -> Self {
        Self { store }
    }

    pub fn root(&self) -> FieldElement {
        self.store.root()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn node(&self, hash: &FieldElement) -> Result<Node, SmtError> {
        self.store
            .get(hash)?
            .ok_or_else(|| SmtError::CorruptedNode(field::to_decimal(hash)))
    }

    fn descend(&self, key: &FieldElement) -> Result<Descent, SmtError> {
        let bits = field::bits_le(key);
        let mut siblings = Vec::new();
        let mut path = Vec::new();
        let mut cursor = self.root();

        loop {
            if cursor.is_zero() {
                return Ok(Descent {
                    result: FindResult {
                        found: false,
                        key: *key,
                        value: FieldElement::zero(),
                        siblings,
                        not_found_key: *key,
                        not_found_value: FieldElement::zero(),
                        is_old0: true,
                    },
                    path,
                });
            }

            match self.node(&cursor)? {
                Node::Leaf {
                    key: leaf_key,
                    value,
                } => {
                    let found = leaf_key == *key;
                    return Ok(Descent {
                        result: FindResult {
                            found,
                            key: *key,
                            value: if found { value } else { FieldElement::zero() },
                            siblings,
                            not_found_key: leaf_key,
                            not_found_value: value,
                            is_old0: false,
                        },
                        path,
                    });
                }
                Node::Internal { left, right } => {
                    if siblings.len() >= bits.len() {
                        return Err(SmtError::CorruptedNode(field::to_decimal(&cursor)));
                    }
                    path.push(cursor);
                    if bits[siblings.len()] {
                        siblings.push(left);
                        cursor = right;
                    } else {
                        siblings.push(right);
                        cursor = left;
                    }
                }
            }
        }
    }

    /// Look up `key`. Absence is reported through `found`, not an error.
    pub fn find(&self, key: &FieldElement) -> Result<FindResult, SmtError> {
        self.descend(key).map(|d| d.result)
    }

    /// Alias for [`Smt::find`].
    pub fn get(&self, key: &FieldElement) -> Result<FindResult, SmtError> {
        self.find(key)
    }

    /// Insert a new key. Fails with [`SmtError::KeyExists`] if present.
    pub fn add(&mut self, key: FieldElement, value: FieldElement) -> Result<InsertResult, SmtError> {
        let old_root = self.root();
        let Descent { result: found, path } = self.descend(&key)?;
        if found.found {
            return Err(SmtError::KeyExists(field::to_decimal(&key)));
        }

        let bits = field::bits_le(&key);
        let mut siblings = found.siblings.clone();

        // The search ended on another leaf: push it down until the two
        // paths diverge, and make it the new leaf's sibling there.
        let pushed_down = !found.is_old0;
        if pushed_down {
            let old_bits = field::bits_le(&found.not_found_key);
            while siblings.len() < bits.len() && old_bits[siblings.len()] == bits[siblings.len()] {
                siblings.push(FieldElement::zero());
            }
            siblings.push(leaf_hash(&found.not_found_key, &found.not_found_value)?);
        }

        let leaf = Node::Leaf { key, value };
        let mut rt = leaf.hash()?;
        let mut inserts = vec![(rt, leaf)];
        for level in (0..siblings.len()).rev() {
            let node = branch(bits[level], rt, siblings[level]);
            rt = node.hash()?;
            inserts.push((rt, node));
        }

        if pushed_down {
            siblings.pop();
        }
        trim_trailing_zeros(&mut siblings);

        self.store.multi_del(&path)?;
        self.store.multi_ins(inserts)?;
        self.store.set_root(rt)?;

        debug!(
            key = %field::to_decimal(&key),
            depth = siblings.len(),
            root = %field::to_decimal(&rt),
            "smt insert"
        );

        Ok(InsertResult {
            old_root,
            new_root: rt,
            key,
            value,
            siblings,
            old_key: found.not_found_key,
            old_value: found.not_found_value,
            is_old0: found.is_old0,
        })
    }

    /// Replace the value stored under `key`.
    ///
    /// The new leaf is threaded up whatever path the lookup took. On a key
    /// that was never added this still succeeds and yields a tree that no
    /// longer authenticates the leaf the lookup ended on; call
    /// [`Smt::add`] first.
    pub fn update(
        &mut self,
        key: FieldElement,
        new_value: FieldElement,
    ) -> Result<UpdateResult, SmtError> {
        let old_root = self.root();
        let Descent { result: found, path } = self.descend(&key)?;
        if !found.found {
            warn!(key = %field::to_decimal(&key), "smt update on a key that was never added");
        }

        let bits = field::bits_le(&key);
        let old_leaf = leaf_hash(&key, &found.value)?;
        let leaf = Node::Leaf {
            key,
            value: new_value,
        };
        let mut rt = leaf.hash()?;
        let mut inserts = vec![(rt, leaf)];
        for level in (0..found.siblings.len()).rev() {
            let node = branch(bits[level], rt, found.siblings[level]);
            rt = node.hash()?;
            inserts.push((rt, node));
        }

        let mut dels = path;
        dels.push(old_leaf);
        self.store.multi_del(&dels)?;
        self.store.multi_ins(inserts)?;
        self.store.set_root(rt)?;

        debug!(key = %field::to_decimal(&key), root = %field::to_decimal(&rt), "smt update");

        Ok(UpdateResult {
            old_root,
            new_root: rt,
            key,
            old_value: found.value,
            new_value,
            siblings: found.siblings,
        })
    }

    /// Remove `key`. Fails with [`SmtError::KeyNotFound`] if absent.
    ///
    /// If the removed leaf's sibling is itself a leaf, that leaf moves up
    /// to the shallowest level where it still has a non-empty sibling.
    pub fn delete(&mut self, key: &FieldElement) -> Result<DeleteResult, SmtError> {
        let old_root = self.root();
        let Descent { result: found, path } = self.descend(key)?;
        if !found.found {
            return Err(SmtError::KeyNotFound(field::to_decimal(key)));
        }

        let bits = field::bits_le(key);
        let depth = found.siblings.len();

        let mut rt = FieldElement::zero();
        let mut old_key = *key;
        let mut old_value = FieldElement::zero();
        let mut is_old0 = true;
        let mut mixed = false;

        if let Some(last) = found.siblings.last().filter(|s| !s.is_zero()) {
            match self.node(last)? {
                Node::Leaf { key: k, value: v } => {
                    old_key = k;
                    old_value = v;
                    is_old0 = false;
                    rt = *last;
                }
                Node::Internal { .. } => mixed = true,
            }
        }

        let mut siblings = Vec::new();
        let mut inserts = Vec::new();
        for level in (0..depth).rev() {
            let sibling = if level == depth - 1 && !is_old0 {
                FieldElement::zero()
            } else {
                found.siblings[level]
            };
            if !sibling.is_zero() {
                mixed = true;
            }
            if mixed {
                siblings.insert(0, found.siblings[level]);
                let node = branch(bits[level], rt, sibling);
                rt = node.hash()?;
                inserts.push((rt, node));
            }
        }

        let mut dels = path;
        dels.push(leaf_hash(key, &found.value)?);
        self.store.multi_del(&dels)?;
        self.store.multi_ins(inserts)?;
        self.store.set_root(rt)?;

        debug!(key = %field::to_decimal(key), root = %field::to_decimal(&rt), "smt delete");

        Ok(DeleteResult {
            old_root,
            new_root: rt,
            key: *key,
            value: found.value,
            siblings,
            old_key,
            old_value,
            is_old0,
        })
    }
}

/// An internal node with `child` on the side selected by `bit`.
fn branch(bit: bool, child: FieldElement, sibling: FieldElement) -> Node {
    if bit {
        Node::Internal {
            left: sibling,
            right: child,
        }
    } else {
        Node::Internal {
            left: child,
            right: sibling,
        }
    }
}

fn trim_trailing_zeros(siblings: &mut Vec<FieldElement>) {
    while siblings.last().is_some_and(|s| s.is_zero()) {
        siblings.pop();
    }
}

// ---------------------------------------------------------------------------
// Proof folding
// ---------------------------------------------------------------------------

/// Fold `(key, value, siblings)` back to a root.
///
/// Trailing zero siblings are padding and are ignored, so fixed-width
/// proofs fold to the same root as trimmed ones.
pub fn compute_root(
    key: &FieldElement,
    value: &FieldElement,
    siblings: &[FieldElement],
) -> Result<FieldElement, PoseidonError> {
    let used = siblings
        .iter()
        .rposition(|s| !s.is_zero())
        .map_or(0, |i| i + 1);
    let bits = field::bits_le(key);

    let mut rt = leaf_hash(key, value)?;
    for level in (0..used).rev() {
        rt = if bits[level] {
            poseidon::hash(&[siblings[level], rt])?
        } else {
            poseidon::hash(&[rt, siblings[level]])?
        };
    }
    Ok(rt)
}

/// Whether `(key, value)` is committed under `root` by `siblings`.
pub fn verify_inclusion(
    root: &FieldElement,
    key: &FieldElement,
    value: &FieldElement,
    siblings: &[FieldElement],
) -> bool {
    siblings.len() <= field::bits_le(key).len()
        && compute_root(key, value, siblings).is_ok_and(|r| r == *root)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
