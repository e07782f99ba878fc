//! Persistence for signature events
use crate::contract::TimeStamp;
use crate::error::SignatureError;
use crate::signature::{
    derive_signed_roles, Role, SignatureEvent, SignatureKind, SignerIdentity, WitnessContact,
    WitnessSignature,
};
use crate::utils;
use chrono::Utc;
use sled::Db;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Input for one signing/viewing/declining action. `signer` present means the
/// authenticated main-signer path; absent means the witness flow, which must
/// carry `witness` contact details instead.
#[derive(Debug, Clone)]
pub struct NewSignature {
    pub contract_id: String,
    pub role: Role,
    pub kind: SignatureKind,
    pub signer: Option<SignerIdentity>,
    pub witness: Option<WitnessContact>,
    pub payload: String,
    pub ip: String,
    pub device: String,
    pub timestamp: TimeStamp<Utc>,
}

pub struct SignatureStore {
    instance: Arc<Db>,
}

fn event_key(contract_id: &str, event_id: &str) -> Vec<u8> {
    format!("sig/{contract_id}/{event_id}").into_bytes()
}

fn event_prefix(contract_id: &str) -> Vec<u8> {
    format!("sig/{contract_id}/").into_bytes()
}

// uniqueness guard for (contract, role, signer), claimed with insert-if-absent
fn index_key(contract_id: &str, role: Role, signer_id: &str) -> Vec<u8> {
    format!("sigidx/{contract_id}/{}/{signer_id}", role.as_str()).into_bytes()
}

impl SignatureStore {
    pub fn new(instance: Arc<Db>) -> Self {
        Self { instance }
    }

    /// Record a signing event, or attach a witness countersignature to the
    /// matching main signature when no authenticated signer is present.
    pub fn record_signature(&self, new: NewSignature) -> anyhow::Result<SignatureEvent> {
        if new.payload.is_empty() {
            return Err(SignatureError::Validation("signature payload is required".into()).into());
        }

        match new.signer {
            Some(_) => self.record_main_signature(new),
            None => self.attach_witness_signature(new),
        }
    }

    fn record_main_signature(&self, new: NewSignature) -> anyhow::Result<SignatureEvent> {
        let signer = new
            .signer
            .ok_or_else(|| SignatureError::Validation("signer identity is required".into()))?;

        if new.role.is_witness() {
            return Err(SignatureError::Validation(
                "witness roles are countersigned via the witness flow, not as top-level events"
                    .into(),
            )
            .into());
        }

        let event_id = utils::new_uuid_to_bech32("sig_")?;

        // At most one Signed event per (contract, signer, role). The claim is
        // an insert-if-absent, so two concurrent duplicates cannot both land.
        if new.kind == SignatureKind::Signed {
            let key = index_key(&new.contract_id, new.role, &signer.id);
            let claimed = self
                .instance
                .compare_and_swap(key, None::<&[u8]>, Some(event_id.as_bytes()))?
                .is_ok();
            if !claimed {
                return Err(SignatureError::DuplicateSignature(new.role).into());
            }
        }

        let event = SignatureEvent {
            event_id,
            contract_id: new.contract_id,
            kind: new.kind,
            role: new.role,
            timestamp: new.timestamp,
            signer: Some(signer),
            ip: new.ip,
            device: new.device,
            payload: new.payload,
            witness: None,
        };

        self.save_event(&event)?;

        Ok(event)
    }

    fn attach_witness_signature(&self, new: NewSignature) -> anyhow::Result<SignatureEvent> {
        if !new.role.is_witness() {
            return Err(SignatureError::IdentityRequired(new.role).into());
        }
        if new.kind != SignatureKind::Signed {
            return Err(
                SignatureError::Validation("witness flow only records signed events".into()).into(),
            );
        }
        let contact = new.witness.ok_or_else(|| {
            SignatureError::Validation("witness name and email are required".into())
        })?;
        if contact.name.is_empty() || contact.email.is_empty() {
            return Err(
                SignatureError::Validation("witness name and email are required".into()).into(),
            );
        }

        let main_role = new.role.main_role();
        let mut event = self
            .find_latest_signed_for_role(&new.contract_id, main_role)?
            .ok_or(SignatureError::MainSignatureNotFound(main_role))?;

        // one witness per main signer, same email or not
        if let Some(existing) = &event.witness {
            return Err(SignatureError::DuplicateWitness(existing.email.clone()).into());
        }

        event.witness = Some(WitnessSignature {
            name: contact.name,
            email: contact.email,
            payload: new.payload,
            timestamp: new.timestamp,
            ip: new.ip,
            device: new.device,
        });

        self.save_event(&event)?;

        Ok(event)
    }

    fn save_event(&self, event: &SignatureEvent) -> anyhow::Result<()> {
        self.instance.insert(
            event_key(&event.contract_id, &event.event_id),
            minicbor::to_vec(event)?,
        )?;
        Ok(())
    }

    /// All events for a contract, timestamp ascending. Fresh scan every call.
    pub fn list_by_contract(&self, contract_id: &str) -> anyhow::Result<Vec<SignatureEvent>> {
        let mut events = Vec::new();
        for entry in self.instance.scan_prefix(event_prefix(contract_id)) {
            let (_, value) = entry?;
            events.push(minicbor::decode::<SignatureEvent>(&value)?);
        }
        events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(events)
    }

    /// The most recent `Signed` event for (contract, role), the attach target
    /// for a witness countersignature.
    pub fn find_latest_signed_for_role(
        &self,
        contract_id: &str,
        role: Role,
    ) -> anyhow::Result<Option<SignatureEvent>> {
        let latest = self
            .list_by_contract(contract_id)?
            .into_iter()
            .filter(|event| event.kind == SignatureKind::Signed && event.role == role)
            .max_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(latest)
    }

    pub fn signed_roles(&self, contract_id: &str) -> anyhow::Result<BTreeSet<Role>> {
        let events = self.list_by_contract(contract_id)?;
        Ok(derive_signed_roles(&events))
    }
}
