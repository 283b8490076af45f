//! Credential and presentation envelopes.
//!
//! JSON-LD shaped, but only as far as serde goes: no contexts are
//! expanded and no JSON-LD canonicalization happens. Field names follow
//! the W3C VC data model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{
    CREDENTIALS_CONTEXT, VERIFIABLE_CREDENTIAL_TYPE, VERIFIABLE_PRESENTATION_TYPE,
};
use crate::field::{self, FieldElement};

/// Issuer signature over a claims-tree root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialProof {
    /// `BJJSignature2021`.
    #[serde(rename = "type")]
    pub proof_type: String,
    pub created: DateTime<Utc>,
    pub verification_method: String,
    pub proof_purpose: String,
    #[serde(with = "field::serde_decimal")]
    pub root_hash: FieldElement,
    /// Multibase of `signature (64) ∥ packed public key (32)`.
    pub proof_value: String,
}

/// Holder signature over a presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolderProof {
    /// `Ed25519Signature2020`.
    #[serde(rename = "type")]
    pub proof_type: String,
    pub created: DateTime<Utc>,
    pub verification_method: String,
    pub proof_purpose: String,
    /// Multibase of the 64-byte Ed25519 signature.
    pub proof_value: String,
}

/// Merkle proof for one disclosed claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldProof {
    /// Claim index (the tree key).
    pub key: u64,
    #[serde(with = "field::serde_decimal_vec")]
    pub siblings: Vec<FieldElement>,
}

/// Claims encrypted to the holder under a BabyJubJub ECDH key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedSubject {
    #[serde(with = "field::serde_decimal_vec")]
    pub ciphertext: Vec<FieldElement>,
    #[serde(with = "field::serde_decimal")]
    pub nonce: FieldElement,
    /// Plaintext length in field elements.
    pub length: usize,
    /// Plaintext length in bytes.
    pub byte_length: usize,
    /// Multibase of the sender's packed ephemeral public key.
    pub sender_public_key: String,
}

/// `credentialSubject`.
///
/// In an issued credential, `claims` holds the full claim set (or is empty
/// when `encrypted` is set). In a presentation it holds only the disclosed
/// claims, keyed by dot path, with their proofs under `@proof`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialSubject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted: Option<EncryptedSubject>,

    #[serde(rename = "@proof", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub field_proofs: BTreeMap<String, FieldProof>,

    #[serde(flatten)]
    pub claims: Map<String, Value>,
}

impl CredentialSubject {
    /// The object the claims tree is built from: `id` first when present,
    /// then the claims.
    pub fn committed_claims(&self) -> Value {
        let mut out = Map::new();
        if let Some(id) = &self.id {
            out.insert("id".to_string(), Value::String(id.clone()));
        }
        for (k, v) in &self.claims {
            out.insert(k.clone(), v.clone());
        }
        Value::Object(out)
    }

    /// A disclosed value by flattened name.
    pub fn disclosed(&self, name: &str) -> Option<Value> {
        if name == "id" {
            return self.id.clone().map(Value::String);
        }
        self.claims.get(name).cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiableCredential {
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "type")]
    pub types: Vec<String>,

    pub issuer: String,

    pub issuance_date: DateTime<Utc>,

    pub credential_subject: CredentialSubject,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<CredentialProof>,
}

impl VerifiableCredential {
    /// An unsigned credential with the standard context and type.
    pub fn new(issuer: &str, subject: CredentialSubject) -> Self {
        Self {
            context: vec![CREDENTIALS_CONTEXT.to_string()],
            id: None,
            types: vec![VERIFIABLE_CREDENTIAL_TYPE.to_string()],
            issuer: issuer.to_string(),
            issuance_date: Utc::now(),
            credential_subject: subject,
            proof: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiablePresentation {
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    #[serde(rename = "type")]
    pub types: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder: Option<String>,

    pub verifiable_credential: Vec<VerifiableCredential>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<HolderProof>,
}

impl VerifiablePresentation {
    pub fn new(credentials: Vec<VerifiableCredential>) -> Self {
        Self {
            context: vec![CREDENTIALS_CONTEXT.to_string()],
            types: vec![VERIFIABLE_PRESENTATION_TYPE.to_string()],
            holder: None,
            verifiable_credential: credentials,
            proof: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subject_flattens_claims_next_to_reserved_keys() {
        let mut subject = CredentialSubject {
            id: Some("did:example:holder".into()),
            ..Default::default()
        };
        subject.claims.insert("name".into(), json!("Alice"));
        subject.field_proofs.insert(
            "name".into(),
            FieldProof {
                key: 1,
                siblings: vec![field::e_u64(5)],
            },
        );

        let json = serde_json::to_value(&subject).unwrap();
        assert_eq!(
            json,
            json!({
                "id": "did:example:holder",
                "@proof": { "name": { "key": 1, "siblings": ["5"] } },
                "name": "Alice",
            })
        );
        let back: CredentialSubject = serde_json::from_value(json).unwrap();
        assert_eq!(back, subject);
    }

    #[test]
    fn committed_claims_put_id_first() {
        let mut subject = CredentialSubject {
            id: Some("did:example:h".into()),
            ..Default::default()
        };
        subject.claims.insert("age".into(), json!(30));
        let committed = subject.committed_claims();
        let keys: Vec<&str> = committed
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["id", "age"]);
        assert_eq!(subject.disclosed("id"), Some(json!("did:example:h")));
        assert_eq!(subject.disclosed("age"), Some(json!(30)));
        assert_eq!(subject.disclosed("nope"), None);
    }

    #[test]
    fn credential_uses_vc_field_names() {
        let vc = VerifiableCredential::new("did:example:issuer", CredentialSubject::default());
        let json = serde_json::to_value(&vc).unwrap();
        assert_eq!(json["@context"][0], CREDENTIALS_CONTEXT);
        assert_eq!(json["type"][0], VERIFIABLE_CREDENTIAL_TYPE);
        assert!(json.get("issuanceDate").is_some());
        assert!(json.get("proof").is_none());
    }
}
