//! Tamper-evident digest over the executed contract
//!
//! The digest covers three things: the canonical contract document, the audit
//! trail, and a projection of the signature events. The projection keeps what
//! was agreed (role, payload, timestamp, who signed, who witnessed) and drops
//! what is merely informational (ip, device) — those stay in the stored audit
//! trail but never feed the hash.

use crate::canonical::{canonical_json, canonicalize};
use crate::contract::Contract;
use crate::error::SignatureError;
use crate::signature::{AuditEntry, SignatureEvent, SignerIdentity};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub is_verified: bool,
    pub current_digest: String,
    pub stored_digest: String,
}

fn signer_value(signer: Option<&SignerIdentity>) -> Value {
    match signer {
        Some(identity) => {
            let mut map = Map::new();
            map.insert("email".into(), Value::String(identity.email.clone()));
            map.insert("id".into(), Value::String(identity.id.clone()));
            map.insert("name".into(), Value::String(identity.name.clone()));
            Value::Object(map)
        }
        None => Value::Null,
    }
}

fn audit_trail_value(entries: &[AuditEntry]) -> Value {
    let items = entries
        .iter()
        .map(|entry| {
            let mut map = Map::new();
            map.insert("device".into(), Value::String(entry.device.clone()));
            map.insert("event".into(), Value::String(entry.kind.as_str().into()));
            map.insert("ip".into(), Value::String(entry.ip.clone()));
            map.insert("role".into(), Value::String(entry.role.as_str().into()));
            map.insert("signer".into(), signer_value(entry.signer.as_ref()));
            map.insert("timestamp".into(), Value::from(entry.timestamp.to_millis()));
            let witness = match &entry.witness {
                Some(w) => {
                    let mut wm = Map::new();
                    wm.insert("email".into(), Value::String(w.email.clone()));
                    wm.insert("name".into(), Value::String(w.name.clone()));
                    wm.insert("timestamp".into(), Value::from(w.timestamp.to_millis()));
                    Value::Object(wm)
                }
                None => Value::Null,
            };
            map.insert("witness".into(), witness);
            Value::Object(map)
        })
        .collect();
    Value::Array(items)
}

fn signatures_value(events: &[SignatureEvent]) -> Value {
    let items = events
        .iter()
        .map(|event| {
            let mut map = Map::new();
            map.insert("payload".into(), Value::String(event.payload.clone()));
            map.insert("role".into(), Value::String(event.role.as_str().into()));
            map.insert("signer".into(), signer_value(event.signer.as_ref()));
            map.insert("timestamp".into(), Value::from(event.timestamp.to_millis()));
            let witness = match &event.witness {
                Some(w) => {
                    let mut wm = Map::new();
                    wm.insert("email".into(), Value::String(w.email.clone()));
                    wm.insert("name".into(), Value::String(w.name.clone()));
                    wm.insert("payload".into(), Value::String(w.payload.clone()));
                    wm.insert("timestamp".into(), Value::from(w.timestamp.to_millis()));
                    Value::Object(wm)
                }
                None => Value::Null,
            };
            map.insert("witness".into(), witness);
            Value::Object(map)
        })
        .collect();
    Value::Array(items)
}

/// SHA-256 over the canonical composite, lowercase hex out.
pub fn hash_document(
    contract: &Contract,
    audit_trail: &[AuditEntry],
    events: &[SignatureEvent],
) -> Result<String, SignatureError> {
    let mut composite = Map::new();
    composite.insert("auditTrail".into(), audit_trail_value(audit_trail));
    composite.insert("document".into(), Value::Object(canonicalize(contract)));
    composite.insert("signatures".into(), signatures_value(events));

    let serialized = canonical_json(&Value::Object(composite))
        .map_err(|err| SignatureError::Hashing(err.to_string()))?;

    Ok(sha256::digest(serialized))
}

/// Recompute and compare. Read-only: usable at any later time to detect
/// tampering with the contract's persisted fields, trail, or payloads.
pub fn verify_document(
    contract: &Contract,
    audit_trail: &[AuditEntry],
    events: &[SignatureEvent],
    stored_digest: &str,
) -> Result<VerifyReport, SignatureError> {
    let current_digest = hash_document(contract, audit_trail, events)?;
    Ok(VerifyReport {
        is_verified: current_digest == stored_digest,
        current_digest,
        stored_digest: stored_digest.to_string(),
    })
}
