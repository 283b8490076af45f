//! # DID Documents and Key Resolution
//!
//! The credential core does not resolve DIDs itself. Given an issuer or
//! holder identifier, it asks a [`KeyResolver`] for a DID document and picks
//! the verification method whose `type` matches the proof it is checking:
//!
//! - `BJJVerificationKey2021` for issuer signatures on claims roots;
//! - `Ed25519VerificationKey2020` for holder signatures on presentations.
//!
//! Key material may arrive as `publicKeyBase58` (raw bytes) or
//! `publicKeyMultibase` (`z`-prefixed, with the `0xed01` header for
//! Ed25519 keys). [`StaticResolver`] is an in-memory map for tests and for
//! callers that already hold the documents.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{BJJ_VERIFICATION_KEY_TYPE, ED25519_VERIFICATION_KEY_TYPE};
use crate::crypto::babyjub::Point;
use crate::crypto::multibase::{self, FormatError, Multicodec};

/// Context URI for the W3C DID Core specification.
const DID_CONTEXT: &str = "https://www.w3.org/ns/did/v1";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DidError {
    /// The DID string does not match `did:<method>:<identifier>`.
    #[error("invalid DID format: {0}")]
    InvalidFormat(String),

    #[error("no DID document for {0}")]
    NotFound(String),

    #[error("no verification method of type {0}")]
    MethodNotFound(String),

    #[error("verification method {0} carries no public key")]
    MissingKeyMaterial(String),

    #[error("invalid key material: {0}")]
    Format(#[from] FormatError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Split `did:<method>:<id>[#fragment]` into `(method, id)`.
pub fn parse_did(did: &str) -> Result<(&str, &str), DidError> {
    let without_fragment = did.split('#').next().unwrap_or(did);
    let mut parts = without_fragment.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("did"), Some(method), Some(id)) if !method.is_empty() && !id.is_empty() => {
            Ok((method, id))
        }
        _ => Err(DidError::InvalidFormat(format!(
            "expected 'did:<method>:<identifier>', got '{did}'"
        ))),
    }
}

/// The DID a DID URL refers to (everything before `#`).
pub fn did_of(did_url: &str) -> &str {
    did_url.split('#').next().unwrap_or(did_url)
}

// ---------------------------------------------------------------------------
// DID Document Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidDocument {
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    pub id: String,

    #[serde(rename = "verificationMethod", default)]
    pub verification_method: Vec<VerificationMethod>,

    #[serde(default)]
    pub authentication: Vec<String>,

    #[serde(rename = "assertionMethod", default)]
    pub assertion_method: Vec<String>,
}

impl DidDocument {
    /// An empty document for `did`.
    pub fn new(did: &str) -> Result<Self, DidError> {
        parse_did(did)?;
        Ok(Self {
            context: vec![DID_CONTEXT.to_string()],
            id: did.to_string(),
            verification_method: Vec::new(),
            authentication: Vec::new(),
            assertion_method: Vec::new(),
        })
    }

    /// Add an issuer key, referenced from `assertionMethod`.
    pub fn with_bjj_key(mut self, fragment: &str, public_key: &Point) -> Self {
        let vm = VerificationMethod::bjj(&format!("{}#{fragment}", self.id), &self.id, public_key);
        self.assertion_method.push(vm.id.clone());
        self.verification_method.push(vm);
        self
    }

    /// Add a holder key, referenced from `authentication`.
    pub fn with_ed25519_key(mut self, fragment: &str, public_key: &[u8; 32]) -> Self {
        let vm =
            VerificationMethod::ed25519(&format!("{}#{fragment}", self.id), &self.id, public_key);
        self.authentication.push(vm.id.clone());
        self.verification_method.push(vm);
        self
    }

    /// First verification method of the given type.
    pub fn find_method(&self, type_: &str) -> Result<&VerificationMethod, DidError> {
        self.verification_method
            .iter()
            .find(|vm| vm.type_ == type_)
            .ok_or_else(|| DidError::MethodNotFound(type_.to_string()))
    }

    /// The method of type `type_` that `did_url` names by fragment. A bare
    /// DID picks the first method of that type.
    pub fn select_method(
        &self,
        did_url: &str,
        type_: &str,
    ) -> Result<&VerificationMethod, DidError> {
        let Some((_, fragment)) = did_url.split_once('#') else {
            return self.find_method(type_);
        };
        self.verification_method
            .iter()
            .filter(|vm| vm.type_ == type_)
            .find(|vm| vm.id == did_url || vm.id.strip_prefix('#') == Some(fragment))
            .ok_or_else(|| DidError::MethodNotFound(did_url.to_string()))
    }

    pub fn to_json(&self) -> Result<String, DidError> {
        serde_json::to_string_pretty(self).map_err(|e| DidError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, DidError> {
        serde_json::from_str(json).map_err(|e| DidError::Serialization(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    pub id: String,

    #[serde(rename = "type")]
    pub type_: String,

    pub controller: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_base58: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_multibase: Option<String>,
}

impl VerificationMethod {
    /// A BabyJubJub key, base58 of the packed point.
    pub fn bjj(id: &str, controller: &str, public_key: &Point) -> Self {
        Self {
            id: id.to_string(),
            type_: BJJ_VERIFICATION_KEY_TYPE.to_string(),
            controller: controller.to_string(),
            public_key_base58: Some(bs58::encode(public_key.pack()).into_string()),
            public_key_multibase: None,
        }
    }

    /// An Ed25519 key, multibase with the `0xed01` header.
    pub fn ed25519(id: &str, controller: &str, public_key: &[u8; 32]) -> Self {
        Self {
            id: id.to_string(),
            type_: ED25519_VERIFICATION_KEY_TYPE.to_string(),
            controller: controller.to_string(),
            public_key_base58: None,
            public_key_multibase: Some(multibase::encode(public_key, Some(Multicodec::Ed25519Pub))),
        }
    }

    /// Raw key bytes from whichever encoding is present.
    ///
    /// Multibase Ed25519 keys have their multicodec header stripped.
    pub fn public_key_bytes(&self) -> Result<Vec<u8>, DidError> {
        if let Some(b58) = &self.public_key_base58 {
            return bs58::decode(b58)
                .into_vec()
                .map_err(|e| FormatError::Base58(e.to_string()).into());
        }
        if let Some(mb) = &self.public_key_multibase {
            let codec = (self.type_ == ED25519_VERIFICATION_KEY_TYPE).then_some(Multicodec::Ed25519Pub);
            return Ok(multibase::decode(mb, codec)?);
        }
        Err(DidError::MissingKeyMaterial(self.id.clone()))
    }

    pub fn bjj_public_key(&self) -> Result<Point, DidError> {
        Ok(Point::unpack(&self.public_key_bytes()?)?)
    }

    pub fn ed25519_public_key(&self) -> Result<[u8; 32], DidError> {
        let bytes = self.public_key_bytes()?;
        bytes.as_slice().try_into().map_err(|_| {
            FormatError::Length {
                expected: 32,
                got: bytes.len(),
            }
            .into()
        })
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Looks up the DID document for an identifier.
pub trait KeyResolver {
    fn resolve(&self, did: &str) -> Result<DidDocument, DidError>;

    /// Issuer key named by `did_url`.
    fn resolve_bjj_key(&self, did_url: &str) -> Result<Point, DidError> {
        self.resolve(did_of(did_url))?
            .select_method(did_url, BJJ_VERIFICATION_KEY_TYPE)?
            .bjj_public_key()
    }

    /// Holder key named by `did_url`.
    fn resolve_ed25519_key(&self, did_url: &str) -> Result<[u8; 32], DidError> {
        self.resolve(did_of(did_url))?
            .select_method(did_url, ED25519_VERIFICATION_KEY_TYPE)?
            .ed25519_public_key()
    }
}

/// In-memory resolver over a fixed set of documents.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    documents: HashMap<String, DidDocument>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, document: DidDocument) {
        self.documents.insert(document.id.clone(), document);
    }

    pub fn with(mut self, document: DidDocument) -> Self {
        self.insert(document);
        self
    }
}

impl KeyResolver for StaticResolver {
    fn resolve(&self, did: &str) -> Result<DidDocument, DidError> {
        parse_did(did)?;
        self.documents
            .get(did_of(did))
            .cloned()
            .ok_or_else(|| DidError::NotFound(did.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::eddsa::EddsaKeyPair;
    use crate::crypto::keys::HolderKeyPair;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    fn issuer_key() -> Point {
        EddsaKeyPair::generate(&mut StdRng::seed_from_u64(42)).public_key()
    }

    #[test]
    fn parse_did_accepts_urls_with_fragments() {
        assert_eq!(parse_did("did:example:abc").unwrap(), ("example", "abc"));
        assert_eq!(parse_did("did:example:abc#key-1").unwrap(), ("example", "abc"));
        assert_eq!(did_of("did:example:abc#key-1"), "did:example:abc");
    }

    #[test]
    fn invalid_dids_rejected() {
        for bad in ["notadid:x:y", "did:x", "did::y", "did:x:", ""] {
            assert!(matches!(parse_did(bad), Err(DidError::InvalidFormat(_))), "{bad}");
        }
    }

    #[test]
    fn bjj_method_round_trips_through_base58() {
        let pk = issuer_key();
        let doc = DidDocument::new("did:example:issuer")
            .unwrap()
            .with_bjj_key("bjj-1", &pk);
        let vm = doc.find_method(BJJ_VERIFICATION_KEY_TYPE).unwrap();
        assert_eq!(vm.id, "did:example:issuer#bjj-1");
        assert_eq!(vm.bjj_public_key().unwrap(), pk);
        assert_eq!(doc.assertion_method, vec![vm.id.clone()]);
    }

    #[test]
    fn ed25519_method_round_trips_through_multibase() {
        let kp = HolderKeyPair::from_seed(&[3u8; 32]);
        let doc = DidDocument::new("did:example:holder")
            .unwrap()
            .with_ed25519_key("key-1", &kp.public_key_bytes());
        let vm = doc.find_method(ED25519_VERIFICATION_KEY_TYPE).unwrap();
        assert!(vm.public_key_multibase.as_deref().unwrap().starts_with('z'));
        assert_eq!(vm.ed25519_public_key().unwrap(), kp.public_key_bytes());
    }

    #[test]
    fn missing_method_and_key_material() {
        let doc = DidDocument::new("did:example:empty").unwrap();
        assert_eq!(
            doc.find_method(BJJ_VERIFICATION_KEY_TYPE),
            Err(DidError::MethodNotFound(BJJ_VERIFICATION_KEY_TYPE.into()))
        );

        let vm = VerificationMethod {
            id: "did:example:empty#k".into(),
            type_: BJJ_VERIFICATION_KEY_TYPE.into(),
            controller: "did:example:empty".into(),
            public_key_base58: None,
            public_key_multibase: None,
        };
        assert!(matches!(vm.public_key_bytes(), Err(DidError::MissingKeyMaterial(_))));
    }

    #[test]
    fn static_resolver_resolves_by_did_url() {
        let pk = issuer_key();
        let resolver = StaticResolver::new().with(
            DidDocument::new("did:example:issuer")
                .unwrap()
                .with_bjj_key("bjj-1", &pk),
        );
        assert_eq!(resolver.resolve_bjj_key("did:example:issuer#bjj-1").unwrap(), pk);
        assert!(matches!(
            resolver.resolve("did:example:nobody"),
            Err(DidError::NotFound(_))
        ));
        assert!(matches!(
            resolver.resolve_ed25519_key("did:example:issuer"),
            Err(DidError::MethodNotFound(_))
        ));
    }

    #[test]
    fn did_url_selects_the_named_method() {
        let first = issuer_key();
        let second = EddsaKeyPair::generate(&mut StdRng::seed_from_u64(43)).public_key();
        let resolver = StaticResolver::new().with(
            DidDocument::new("did:example:issuer")
                .unwrap()
                .with_bjj_key("bjj-1", &first)
                .with_bjj_key("bjj-2", &second),
        );
        assert_eq!(resolver.resolve_bjj_key("did:example:issuer").unwrap(), first);
        assert_eq!(resolver.resolve_bjj_key("did:example:issuer#bjj-2").unwrap(), second);
        assert_eq!(
            resolver.resolve_bjj_key("did:example:issuer#bjj-3"),
            Err(DidError::MethodNotFound("did:example:issuer#bjj-3".into()))
        );
    }

    #[test]
    fn relative_method_ids_match_by_fragment() {
        let pk = issuer_key();
        let mut doc = DidDocument::new("did:example:issuer").unwrap();
        doc.verification_method
            .push(VerificationMethod::bjj("#bjj-1", "did:example:issuer", &pk));
        let vm = doc
            .select_method("did:example:issuer#bjj-1", BJJ_VERIFICATION_KEY_TYPE)
            .unwrap();
        assert_eq!(vm.bjj_public_key().unwrap(), pk);
    }

    #[test]
    fn document_json_uses_did_core_names() {
        let doc = DidDocument::new("did:example:issuer")
            .unwrap()
            .with_bjj_key("bjj-1", &issuer_key());
        let json = doc.to_json().unwrap();
        assert!(json.contains("\"@context\""));
        assert!(json.contains("\"verificationMethod\""));
        assert!(json.contains("\"publicKeyBase58\""));
        assert!(!json.contains("publicKeyMultibase"));
        assert_eq!(DidDocument::from_json(&json).unwrap(), doc);
    }
}
