//! # Claims Tree
//!
//! Turns a JSON claims object into a sparse Merkle tree whose root is the
//! credential's commitment.
//!
//! 1. Nested objects and arrays are flattened into dot paths
//!    (`{"a": [{"b": 1}]}` becomes `"a.0.b"`).
//! 2. Each path gets the next integer index in encounter order.
//! 3. Each value is encoded as a field element and inserted at its index.
//!
//! ## Value encoding
//!
//! | Claim value                        | Field element                     |
//! |------------------------------------|-----------------------------------|
//! | non-negative integer / digit string| the integer, mod p                |
//! | `null`                             | 0                                 |
//! | text of ≤ 32 UTF-8 bytes           | the bytes read big-endian         |
//! | longer text, or `hash = true`      | `Poseidon.hashBytes(utf8)`        |
//!
//! Booleans, floats and negative numbers are encoded as their JSON text.
//! Only the big-endian branch can be decoded back ([`decode_value`]), and
//! even then leading NUL bytes are lost.

use ark_ff::Zero;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::config::{
    CLAIM_PATH_SEPARATOR, DEFAULT_CLAIMS_TREE_DEPTH, MAX_INLINE_CLAIM_BYTES,
};
use crate::crypto::poseidon::{self, PoseidonError};
use crate::field::{self, FieldElement};
use crate::smt::{Smt, SmtError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimsError {
    #[error("claims must be a JSON object")]
    NotAnObject,

    #[error("no claim named {0:?}")]
    UnknownField(String),

    #[error("{0:?} is a nested value, not a claim")]
    NotALeaf(String),

    #[error("proof for {field:?} needs {required} levels, tree depth is {depth}")]
    DepthExceeded {
        field: String,
        depth: usize,
        required: usize,
    },

    #[error("field element does not decode to UTF-8 text")]
    InvalidUtf8,

    #[error(transparent)]
    Smt(#[from] SmtError),

    #[error(transparent)]
    Poseidon(#[from] PoseidonError),
}

// ---------------------------------------------------------------------------
// Claim values
// ---------------------------------------------------------------------------

/// A claim as the tree sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimValue {
    /// An integer value, already in the field.
    Scalar(FieldElement),
    /// Anything else that is not a container.
    Text(String),
    /// An object or array, in encounter order.
    Nested(Vec<(String, ClaimValue)>),
}

impl ClaimValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => ClaimValue::Scalar(FieldElement::zero()),
            Value::Bool(b) => ClaimValue::Text(b.to_string()),
            Value::Number(n) => match n.as_u64() {
                Some(u) => ClaimValue::Scalar(field::e_u64(u)),
                None => ClaimValue::Text(n.to_string()),
            },
            Value::String(s) => match field::e_str(s) {
                Ok(fe) => ClaimValue::Scalar(fe),
                Err(_) => ClaimValue::Text(s.clone()),
            },
            Value::Array(items) => ClaimValue::Nested(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (i.to_string(), ClaimValue::from_json(v)))
                    .collect(),
            ),
            Value::Object(map) => ClaimValue::Nested(
                map.iter()
                    .map(|(k, v)| (k.clone(), ClaimValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// The canonical JSON form used when a claim is disclosed.
    ///
    /// Integers that fit in a `u64` become JSON numbers, larger ones decimal
    /// strings. Re-reading the result with [`ClaimValue::from_json`] gives
    /// back the same value.
    pub fn to_json(&self) -> Value {
        match self {
            ClaimValue::Scalar(fe) => {
                let n = field::to_biguint(fe);
                match u64::try_from(&n) {
                    Ok(u) => Value::from(u),
                    Err(_) => Value::String(n.to_string()),
                }
            }
            ClaimValue::Text(s) => Value::String(s.clone()),
            ClaimValue::Nested(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

/// Flatten nested claims into `(dot.path, leaf)` pairs, in encounter order.
pub fn flatten(claims: &ClaimValue) -> Vec<(String, ClaimValue)> {
    let mut out = Vec::new();
    flatten_into(claims, None, &mut out);
    out
}

fn flatten_into(value: &ClaimValue, prefix: Option<&str>, out: &mut Vec<(String, ClaimValue)>) {
    match value {
        ClaimValue::Nested(entries) => {
            for (k, v) in entries {
                let path = match prefix {
                    Some(p) => format!("{p}{}{k}", CLAIM_PATH_SEPARATOR),
                    None => k.clone(),
                };
                flatten_into(v, Some(&path), out);
            }
        }
        leaf => {
            if let Some(p) = prefix {
                out.push((p.to_string(), leaf.clone()));
            }
        }
    }
}

/// Encode a leaf claim.
pub fn encode_value(value: &ClaimValue, hash: bool) -> Result<FieldElement, ClaimsError> {
    match value {
        ClaimValue::Scalar(fe) => Ok(*fe),
        ClaimValue::Text(s) => {
            let bytes = s.as_bytes();
            if hash || bytes.len() > MAX_INLINE_CLAIM_BYTES {
                Ok(poseidon::hash_bytes(bytes)?)
            } else {
                Ok(field::from_be_bytes(bytes))
            }
        }
        ClaimValue::Nested(_) => Err(ClaimsError::NotALeaf(format!("{value:?}"))),
    }
}

/// Recover text encoded by the inline (non-hashed) branch of [`encode_value`].
pub fn decode_value(encoded: &FieldElement) -> Result<String, ClaimsError> {
    let bytes = field::to_be_bytes(encoded);
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    String::from_utf8(bytes[start..].to_vec()).map_err(|_| ClaimsError::InvalidUtf8)
}

// ---------------------------------------------------------------------------
// ClaimsTree
// ---------------------------------------------------------------------------

/// How a claims tree is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimsTreeOptions {
    /// Fixed proof width handed to circuits.
    pub depth: usize,
    /// Hash every text claim, regardless of length.
    pub hash: bool,
}

impl Default for ClaimsTreeOptions {
    fn default() -> Self {
        Self {
            depth: DEFAULT_CLAIMS_TREE_DEPTH,
            hash: false,
        }
    }
}

/// Membership proof for one claim, siblings padded to the tree depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimProof {
    pub found: bool,
    /// The claim's index, which is also its tree key.
    pub key: u64,
    pub value: FieldElement,
    pub siblings: Vec<FieldElement>,
}

/// A claims object committed into a sparse Merkle tree.
#[derive(Debug, Clone)]
pub struct ClaimsTree {
    smt: Smt,
    fields: Vec<(String, ClaimValue)>,
    options: ClaimsTreeOptions,
}

impl ClaimsTree {
    /// Build a tree from a JSON object.
    pub fn from_claims(claims: &Value, options: ClaimsTreeOptions) -> Result<Self, ClaimsError> {
        if !claims.is_object() {
            return Err(ClaimsError::NotAnObject);
        }
        Self::from_pairs(flatten(&ClaimValue::from_json(claims)), options)
    }

    /// Build a tree from already-flattened claims. Index = position.
    pub fn from_pairs(
        fields: Vec<(String, ClaimValue)>,
        options: ClaimsTreeOptions,
    ) -> Result<Self, ClaimsError> {
        let mut smt = Smt::new();
        for (index, (name, value)) in fields.iter().enumerate() {
            if matches!(value, ClaimValue::Nested(_)) {
                return Err(ClaimsError::NotALeaf(name.clone()));
            }
            smt.add(field::e_u64(index as u64), encode_value(value, options.hash)?)?;
        }

        debug!(
            fields = fields.len(),
            root = %field::to_decimal(&smt.root()),
            "claims tree built"
        );

        Ok(Self {
            smt,
            fields,
            options,
        })
    }

    pub fn root(&self) -> FieldElement {
        self.smt.root()
    }

    pub fn options(&self) -> ClaimsTreeOptions {
        self.options
    }

    /// Flattened claim names, in index order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<u64> {
        self.fields
            .iter()
            .position(|(n, _)| n == name)
            .map(|i| i as u64)
    }

    /// The raw claim stored under `name`.
    pub fn claim(&self, name: &str) -> Option<&ClaimValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Proof for `name`, siblings zero-padded to the configured depth.
    pub fn get(&self, name: &str) -> Result<ClaimProof, ClaimsError> {
        let key = self
            .index_of(name)
            .ok_or_else(|| ClaimsError::UnknownField(name.to_string()))?;
        let found = self.smt.find(&field::e_u64(key))?;

        let depth = self.options.depth;
        if found.siblings.len() > depth {
            return Err(ClaimsError::DepthExceeded {
                field: name.to_string(),
                depth,
                required: found.siblings.len(),
            });
        }
        let mut siblings = found.siblings;
        siblings.resize(depth, FieldElement::zero());

        Ok(ClaimProof {
            found: found.found,
            key,
            value: found.value,
            siblings,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smt::compute_root;
    use serde_json::json;

    #[test]
    fn flatten_joins_paths_in_order() {
        let claims = ClaimValue::from_json(&json!({
            "name": "Alice",
            "address": { "city": "Lisbon", "zip": "1000" },
            "tags": ["a", { "b": 2 }],
        }));
        let names: Vec<String> = flatten(&claims).into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            names,
            ["name", "address.city", "address.zip", "tags.0", "tags.1.b"]
        );
    }

    #[test]
    fn numbers_and_numeric_strings_are_scalars() {
        assert_eq!(ClaimValue::from_json(&json!(42)), ClaimValue::Scalar(field::e_u64(42)));
        assert_eq!(ClaimValue::from_json(&json!("42")), ClaimValue::Scalar(field::e_u64(42)));
        assert_eq!(ClaimValue::from_json(&json!(null)), ClaimValue::Scalar(field::zero()));
        assert_eq!(ClaimValue::from_json(&json!(true)), ClaimValue::Text("true".into()));
        assert_eq!(ClaimValue::from_json(&json!(-3)), ClaimValue::Text("-3".into()));
        assert_eq!(ClaimValue::from_json(&json!(1.5)), ClaimValue::Text("1.5".into()));
    }

    #[test]
    fn short_text_is_inline_and_decodable() {
        let v = ClaimValue::Text("Alice".into());
        let fe = encode_value(&v, false).unwrap();
        assert_eq!(fe, field::from_be_bytes(b"Alice"));
        assert_eq!(decode_value(&fe).unwrap(), "Alice");
    }

    #[test]
    fn long_or_forced_text_is_hashed() {
        let long = "x".repeat(33);
        assert_eq!(
            encode_value(&ClaimValue::Text(long.clone()), false).unwrap(),
            poseidon::hash_bytes(long.as_bytes()).unwrap()
        );
        let exactly_32 = "y".repeat(32);
        assert_eq!(
            encode_value(&ClaimValue::Text(exactly_32.clone()), false).unwrap(),
            field::from_be_bytes(exactly_32.as_bytes())
        );
        assert_eq!(
            encode_value(&ClaimValue::Text("Bob".into()), true).unwrap(),
            poseidon::hash_bytes(b"Bob").unwrap()
        );
    }

    #[test]
    fn scalars_ignore_hash_option() {
        let v = ClaimValue::Scalar(field::e_u64(7));
        assert_eq!(encode_value(&v, true).unwrap(), field::e_u64(7));
    }

    #[test]
    fn disclosed_json_reparses_to_same_value() {
        for v in [json!(5), json!("99999999999999999999999"), json!("hi"), json!(false)] {
            let claim = ClaimValue::from_json(&v);
            assert_eq!(ClaimValue::from_json(&claim.to_json()), claim);
        }
    }

    #[test]
    fn tree_indexes_in_encounter_order() {
        let tree =
            ClaimsTree::from_claims(&json!({ "a": 1, "b": { "c": 2 } }), Default::default()).unwrap();
        assert_eq!(tree.index_of("a"), Some(0));
        assert_eq!(tree.index_of("b.c"), Some(1));
        assert_eq!(tree.field_names().collect::<Vec<_>>(), ["a", "b.c"]);
    }

    #[test]
    fn proofs_are_padded_and_fold_to_root() {
        let tree =
            ClaimsTree::from_claims(&json!({ "a": 1, "b": { "c": 2 } }), Default::default()).unwrap();
        let proof = tree.get("b.c").unwrap();
        assert!(proof.found);
        assert_eq!(proof.key, 1);
        assert_eq!(proof.value, field::e_u64(2));
        assert_eq!(proof.siblings.len(), DEFAULT_CLAIMS_TREE_DEPTH);
        assert_eq!(
            compute_root(&field::e_u64(1), &field::e_u64(2), &proof.siblings).unwrap(),
            tree.root()
        );
    }

    #[test]
    fn depth_exceeded_is_reported() {
        // Indices 0 and 4 share two low bits, so their proofs need 3 levels.
        let claims = json!({ "a": 0, "b": 1, "c": 2, "d": 3, "e": 4 });
        let tree = ClaimsTree::from_claims(
            &claims,
            ClaimsTreeOptions {
                depth: 2,
                hash: false,
            },
        )
        .unwrap();
        assert!(matches!(
            tree.get("e"),
            Err(ClaimsError::DepthExceeded { depth: 2, required: 3, .. })
        ));
    }

    #[test]
    fn unknown_field_and_non_object() {
        let tree = ClaimsTree::from_claims(&json!({ "a": 1 }), Default::default()).unwrap();
        assert_eq!(tree.get("zzz"), Err(ClaimsError::UnknownField("zzz".into())));
        assert_eq!(
            ClaimsTree::from_claims(&json!([1, 2]), Default::default()).unwrap_err(),
            ClaimsError::NotAnObject
        );
    }

    #[test]
    fn same_claims_same_root() {
        let a = ClaimsTree::from_claims(&json!({ "x": "1", "y": "two" }), Default::default()).unwrap();
        let b = ClaimsTree::from_claims(&json!({ "x": 1, "y": "two" }), Default::default()).unwrap();
        assert_eq!(a.root(), b.root());
        let c = ClaimsTree::from_claims(&json!({ "y": "two", "x": 1 }), Default::default()).unwrap();
        assert_ne!(a.root(), c.root());
    }
}
