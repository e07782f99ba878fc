//! Property-based tests for canonicalization and document hashing
//!
//! This module uses the proptest crate to verify the reproducibility contract
//! of the digest: logically-identical inputs always hash the same, every
//! agreed-upon byte is load-bearing, and the informational fields never leak
//! into the hash input.

use contract_esign::{
    canonical::{canonical_json, canonicalize},
    contract::{Contract, ContractStatus, TimeStamp},
    hasher::{hash_document, verify_document},
    signature::{
        assemble_audit_trail, Role, SignatureEvent, SignatureKind, SignerIdentity,
        WitnessSignature,
    },
};
use proptest::prelude::*;
use serde_json::Value;

fn timestamp_strategy() -> impl Strategy<Value = TimeStamp<chrono::Utc>> {
    (0i64..4_000_000_000_000i64).prop_map(|ms| {
        chrono::DateTime::from_timestamp_millis(ms)
            .expect("in range")
            .into()
    })
}

fn status_strategy() -> impl Strategy<Value = ContractStatus> {
    prop_oneof![
        Just(ContractStatus::Pending),
        Just(ContractStatus::Active),
        Just(ContractStatus::Completed),
        Just(ContractStatus::Cancelled),
    ]
}

fn contract_strategy() -> impl Strategy<Value = Contract> {
    (
        "[a-z0-9]{8,16}",
        "[a-z0-9]{8,16}",
        "[a-z0-9]{8,16}",
        any::<u64>(),
        "[ -~]{0,40}",
        status_strategy(),
    )
        .prop_map(|(client, owner, property, price, location, status)| {
            let mut contract = Contract::new(
                format!("client_{client}"),
                format!("owner_{owner}"),
                format!("property_{property}"),
                price,
                location,
            )
            .expect("identifier minting should succeed");
            contract.status = status;
            contract
        })
}

fn event_strategy() -> impl Strategy<Value = SignatureEvent> {
    (
        any::<u32>(),
        prop_oneof![Just(Role::PropertyOwner), Just(Role::Tenant)],
        timestamp_strategy(),
        "[A-Za-z0-9+/=]{8,32}",
        proptest::option::of(("[A-Za-z0-9+/=]{8,32}", timestamp_strategy())),
    )
        .prop_map(|(n, role, timestamp, payload, witness)| SignatureEvent {
            event_id: format!("sig_{n}"),
            contract_id: "contract_hash_prop".to_string(),
            kind: SignatureKind::Signed,
            role,
            timestamp,
            signer: Some(SignerIdentity {
                id: format!("signer_{n}"),
                email: format!("signer{n}@example.com"),
                name: format!("Signer {n}"),
            }),
            ip: "203.0.113.40".to_string(),
            device: "proptest".to_string(),
            payload,
            witness: witness.map(|(wp, wts)| WitnessSignature {
                name: format!("Witness {n}"),
                email: format!("witness{n}@example.com"),
                payload: wp,
                timestamp: wts,
                ip: "203.0.113.41".to_string(),
                device: "proptest".to_string(),
            }),
        })
}

fn events_strategy() -> impl Strategy<Value = Vec<SignatureEvent>> {
    prop::collection::vec(event_strategy(), 0..=6)
}

proptest! {
    /// Property: hashing is deterministic over identical inputs
    #[test]
    fn prop_hash_is_deterministic(
        contract in contract_strategy(),
        events in events_strategy(),
    ) {
        let trail = assemble_audit_trail(&events);

        let d1 = hash_document(&contract, &trail, &events).unwrap();
        let d2 = hash_document(&contract, &trail, &events).unwrap();

        prop_assert_eq!(&d1, &d2);
        prop_assert_eq!(d1.len(), 64);
    }

    /// Property: record bookkeeping never affects the digest
    ///
    /// The record id, a previously stored digest/trail, and the row
    /// timestamps are all excluded from the canonical document.
    #[test]
    fn prop_bookkeeping_fields_do_not_affect_hash(
        contract in contract_strategy(),
        events in events_strategy(),
        other_id in "[a-z0-9]{8,16}",
    ) {
        let trail = assemble_audit_trail(&events);
        let original = hash_document(&contract, &trail, &events).unwrap();

        let mut relabeled = contract.clone();
        relabeled.id = format!("contract_{other_id}");
        relabeled.document_hash = Some("0".repeat(64));
        relabeled.audit_trail = Some(trail.clone());
        relabeled.updated_at = TimeStamp::new_with(2030, 12, 31, 23, 59, 59);

        let same = hash_document(&relabeled, &trail, &events).unwrap();

        prop_assert_eq!(original, same);
    }

    /// Property: every business field of the document is load-bearing
    #[test]
    fn prop_price_change_changes_hash(
        contract in contract_strategy(),
        events in events_strategy(),
        delta in 1u64..1_000_000,
    ) {
        let trail = assemble_audit_trail(&events);
        let original = hash_document(&contract, &trail, &events).unwrap();

        let mut changed = contract.clone();
        changed.price = contract.price.wrapping_add(delta);
        prop_assume!(changed.price != contract.price);

        let altered = hash_document(&changed, &trail, &events).unwrap();

        prop_assert_ne!(original, altered);
    }

    /// Property: any signature payload byte is load-bearing
    #[test]
    fn prop_payload_change_changes_hash(
        contract in contract_strategy(),
        events in events_strategy(),
        index in any::<prop::sample::Index>(),
    ) {
        prop_assume!(!events.is_empty());
        let trail = assemble_audit_trail(&events);
        let original = hash_document(&contract, &trail, &events).unwrap();

        let mut tampered = events.clone();
        let i = index.index(tampered.len());
        tampered[i].payload.push('x');

        let altered = hash_document(&contract, &trail, &tampered).unwrap();

        prop_assert_ne!(original, altered);
    }

    /// Property: ip and device are informational, never part of the hash
    #[test]
    fn prop_ip_and_device_never_feed_the_hash(
        contract in contract_strategy(),
        events in events_strategy(),
        ip in "[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}",
        device in "[ -~]{1,20}",
    ) {
        let trail = assemble_audit_trail(&events);
        let original = hash_document(&contract, &trail, &events).unwrap();

        let relabeled: Vec<SignatureEvent> = events
            .iter()
            .cloned()
            .map(|mut event| {
                event.ip = ip.clone();
                event.device = device.clone();
                event
            })
            .collect();

        let same = hash_document(&contract, &trail, &relabeled).unwrap();

        prop_assert_eq!(original, same);
    }

    /// Property: verification agrees with digest equality
    #[test]
    fn prop_verify_agrees_with_recomputation(
        contract in contract_strategy(),
        events in events_strategy(),
        stored_suffix in "[0-9a-f]{64}",
    ) {
        let trail = assemble_audit_trail(&events);
        let digest = hash_document(&contract, &trail, &events).unwrap();

        let clean = verify_document(&contract, &trail, &events, &digest).unwrap();
        prop_assert!(clean.is_verified);

        let report = verify_document(&contract, &trail, &events, &stored_suffix).unwrap();
        prop_assert_eq!(report.is_verified, stored_suffix == digest);
    }

    /// Property: the canonical serialization of a contract never contains its
    /// excluded fields, whatever their values
    #[test]
    fn prop_canonical_document_has_exactly_the_business_keys(
        contract in contract_strategy(),
    ) {
        let doc = canonicalize(&contract);
        let keys: Vec<&str> = doc.keys().map(String::as_str).collect();

        prop_assert_eq!(
            keys,
            vec!["clientId", "location", "ownerId", "price", "propertyId", "status"]
        );

        let json = canonical_json(&Value::Object(doc)).unwrap();
        prop_assert!(!json.contains("documentHash"));
        prop_assert!(!json.contains("auditTrail"));
    }
}
