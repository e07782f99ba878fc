//! Canonical document representation for hashing
//!
//! Two canonicalisations of logically-identical data must produce identical
//! bytes, regardless of field insertion order or the platform that wrote the
//! record. Keys are ordered byte-wise over their UTF-8 encoding at every
//! nesting level: `serde_json::Map` is backed by `BTreeMap<String, Value>`,
//! whose `Ord` on `String` is exactly that comparison. No locale-aware
//! collation is involved anywhere, and no value in the canonical form is ever
//! a float (amounts are integers, timestamps are integer Unix milliseconds).

use crate::contract::Contract;
use serde_json::{Map, Value};

/// Reduce a contract to its hashable business fields.
///
/// Excluded on purpose: the record's own id, any previously computed
/// `document_hash`, any previously assembled `audit_trail`, and the
/// `created_at`/`updated_at` bookkeeping timestamps. None of these are part
/// of "what was agreed" and all of them change or exist independently of it.
pub fn canonicalize(contract: &Contract) -> Map<String, Value> {
    let mut doc = Map::new();
    doc.insert("clientId".into(), Value::String(contract.client_id.clone()));
    doc.insert("location".into(), Value::String(contract.location.clone()));
    doc.insert("ownerId".into(), Value::String(contract.owner_id.clone()));
    doc.insert("price".into(), Value::from(contract.price));
    doc.insert(
        "propertyId".into(),
        Value::String(contract.property_id.clone()),
    );
    doc.insert(
        "status".into(),
        Value::String(contract.status.as_str().to_string()),
    );
    doc
}

/// The single serialisation routine for hash input. Everything hashed by this
/// crate goes through here.
pub fn canonical_json(value: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ContractStatus;

    fn test_contract() -> Contract {
        let mut contract = Contract::new(
            "client_1".to_string(),
            "owner_1".to_string(),
            "property_1".to_string(),
            1_200_000,
            "4 Admiralty Way, Lekki".to_string(),
        )
        .unwrap();
        contract.status = ContractStatus::Active;
        contract
    }

    #[test]
    fn volatile_fields_are_excluded() {
        let mut contract = test_contract();
        contract.document_hash = Some("deadbeef".to_string());
        contract.audit_trail = Some(vec![]);

        let doc = canonicalize(&contract);

        assert!(doc.get("id").is_none());
        assert!(doc.get("documentHash").is_none());
        assert!(doc.get("auditTrail").is_none());
        assert!(doc.get("createdAt").is_none());
        assert!(doc.get("updatedAt").is_none());
        assert_eq!(doc.len(), 6);
    }

    #[test]
    fn canonicalization_ignores_record_bookkeeping() {
        let base = test_contract();

        // same business data, different bookkeeping
        let mut other = base.clone();
        other.id = "contract_other".to_string();
        other.document_hash = Some("cafe".to_string());
        other.updated_at = crate::contract::TimeStamp::new_with(2031, 1, 1, 0, 0, 0);

        assert_eq!(canonicalize(&base), canonicalize(&other));
    }

    #[test]
    fn serialized_keys_are_byte_ordered() {
        let doc = canonicalize(&test_contract());
        let keys: Vec<&String> = doc.keys().collect();

        let mut sorted = keys.clone();
        sorted.sort_by(|a, b| a.as_bytes().cmp(b.as_bytes()));

        assert_eq!(keys, sorted);
    }

    #[test]
    fn insertion_order_does_not_leak_into_output() {
        let mut forward = Map::new();
        forward.insert("alpha".into(), Value::from(1));
        forward.insert("beta".into(), Value::from(2));

        let mut reverse = Map::new();
        reverse.insert("beta".into(), Value::from(2));
        reverse.insert("alpha".into(), Value::from(1));

        assert_eq!(
            canonical_json(&Value::Object(forward)).unwrap(),
            canonical_json(&Value::Object(reverse)).unwrap()
        );
    }

    #[test]
    fn nested_maps_sort_the_same_way() {
        let mut inner = Map::new();
        inner.insert("zz".into(), Value::from(1));
        inner.insert("aa".into(), Value::from(2));

        let mut outer = Map::new();
        outer.insert("nested".into(), Value::Object(inner));

        let json = canonical_json(&Value::Object(outer)).unwrap();
        assert_eq!(json, r#"{"nested":{"aa":2,"zz":1}}"#);
    }

    #[test]
    fn logically_equal_contracts_canonicalize_identically() {
        let a = test_contract();
        let mut b = Contract::new(
            "client_1".to_string(),
            "owner_1".to_string(),
            "property_1".to_string(),
            1_200_000,
            "4 Admiralty Way, Lekki".to_string(),
        )
        .unwrap();
        b.status = ContractStatus::Active;

        let doc_a = canonical_json(&Value::Object(canonicalize(&a))).unwrap();
        let doc_b = canonical_json(&Value::Object(canonicalize(&b))).unwrap();

        assert_eq!(doc_a, doc_b);
    }
}
