//! Service layer API for contract signing workflow operations
use crate::contract::{Contract, TimeStamp};
use crate::error::SignatureError;
use crate::execution::{execution_state, ExecutionState};
use crate::hasher::{self, VerifyReport};
use crate::invite::{WitnessInviteRegistry, WitnessSignatureInvite};
use crate::notify::{signing_link, InviteNotification, NotificationSender, TracingNotifier};
use crate::signature::{
    assemble_audit_trail, derive_signed_roles, AuditEntry, Role, SignatureEvent, SignatureKind,
    SignerIdentity, WitnessContact,
};
use crate::store::{NewSignature, SignatureStore};
use chrono::Utc;
use sled::Db;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct EsignConfig {
    /// Base URL the witness signing link is built from.
    pub signing_link_base: String,
}

impl Default for EsignConfig {
    fn default() -> Self {
        Self {
            signing_link_base: "https://sign.example.com/witness".to_string(),
        }
    }
}

/// The digest and trail persisted when a contract becomes fully executed.
#[derive(Debug, Clone, PartialEq)]
pub struct Finalization {
    pub document_hash: String,
    pub audit_trail: Vec<AuditEntry>,
}

/// Response to one signature submission: the created/updated event, plus the
/// finalisation payload when this submission completed the set.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureOutcome {
    pub event: SignatureEvent,
    pub finalization: Option<Finalization>,
}

/// What a witness landing page needs: the invite plus a contract summary.
#[derive(Debug, Clone, PartialEq)]
pub struct InviteLanding {
    pub invite: WitnessSignatureInvite,
    pub contract: Contract,
}

pub struct EsignService {
    instance: Arc<Db>,
    store: SignatureStore,
    invites: WitnessInviteRegistry,
    notifier: Arc<dyn NotificationSender>,
    config: EsignConfig,
}

impl EsignService {
    pub fn new(instance: Arc<Db>) -> Self {
        Self::with_notifier(instance, Arc::new(TracingNotifier))
    }

    pub fn with_notifier(instance: Arc<Db>, notifier: Arc<dyn NotificationSender>) -> Self {
        Self {
            store: SignatureStore::new(Arc::clone(&instance)),
            invites: WitnessInviteRegistry::new(Arc::clone(&instance)),
            instance,
            notifier,
            config: EsignConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EsignConfig) -> Self {
        self.config = config;
        self
    }

    /// Stand-in for the external contract resource provider; enough for
    /// tests, demos, and anything embedding this crate directly.
    pub fn create_contract(
        &self,
        client_id: String,
        owner_id: String,
        property_id: String,
        price: u64,
        location: String,
    ) -> anyhow::Result<Contract> {
        let contract = Contract::new(client_id, owner_id, property_id, price, location)?;
        contract.save_to_db(&self.instance)?;
        Ok(contract)
    }

    pub fn contract(&self, contract_id: &str) -> anyhow::Result<Contract> {
        Contract::load_from_db(&self.instance, contract_id)
    }

    /// Record a signing event, then re-check coverage. The outcome carries the
    /// finalisation payload exactly when this event completed the set.
    pub fn record_signature(&self, new: NewSignature) -> anyhow::Result<SignatureOutcome> {
        // fail early instead of storing events against nothing
        let contract_id = new.contract_id.clone();
        Contract::load_from_db(&self.instance, &contract_id)?;

        let event = self.store.record_signature(new)?;
        let finalization = self.evaluate(&contract_id)?;

        Ok(SignatureOutcome {
            event,
            finalization,
        })
    }

    /// Token-authorised witness path: validate the invite, attach the
    /// countersignature, close the token.
    pub fn record_witness_signature(
        &self,
        token: &str,
        payload: String,
        ip: String,
        device: String,
        timestamp: TimeStamp<Utc>,
    ) -> anyhow::Result<SignatureOutcome> {
        let invite = self.invites.validate_token(token)?;

        let event = self.store.record_signature(NewSignature {
            contract_id: invite.contract_id.clone(),
            role: invite.role,
            kind: SignatureKind::Signed,
            signer: None,
            witness: Some(WitnessContact {
                name: invite.witness_name.clone(),
                email: invite.witness_email.clone(),
            }),
            payload,
            ip,
            device,
            timestamp,
        })?;

        self.invites.mark_signed(token)?;

        let finalization = self.evaluate(&invite.contract_id)?;

        Ok(SignatureOutcome {
            event,
            finalization,
        })
    }

    /// Recompute coverage and finalise when complete. Idempotent: once the
    /// digest is set, every further call returns `None` and changes nothing.
    /// Safe to call again after a hashing failure; nothing partial persists.
    pub fn evaluate(&self, contract_id: &str) -> anyhow::Result<Option<Finalization>> {
        loop {
            let contract = Contract::load_from_db(&self.instance, contract_id)?;
            if contract.document_hash.is_some() {
                return Ok(None);
            }

            let events = self.store.list_by_contract(contract_id)?;
            let signed_roles = derive_signed_roles(&events);
            if execution_state(&signed_roles) != ExecutionState::FullyExecuted {
                return Ok(None);
            }

            let audit_trail = assemble_audit_trail(&events);
            let document_hash = match hasher::hash_document(&contract, &audit_trail, &events) {
                Ok(digest) => digest,
                Err(err) => {
                    error!(contract_id, error = %err, "digest computation failed");
                    return Err(err.into());
                }
            };

            let mut updated = contract.clone();
            updated.document_hash = Some(document_hash.clone());
            updated.audit_trail = Some(audit_trail.clone());
            updated.updated_at = TimeStamp::new();

            // conditional write: hash and trail land together, exactly once
            if updated.save_if_unchanged(&self.instance, &contract)? {
                info!(contract_id, digest = %document_hash, "contract fully executed");
                return Ok(Some(Finalization {
                    document_hash,
                    audit_trail,
                }));
            }
            // lost the write race; reload and re-derive
        }
    }

    pub fn list_signatures(&self, contract_id: &str) -> anyhow::Result<Vec<SignatureEvent>> {
        self.store.list_by_contract(contract_id)
    }

    pub fn signed_roles(&self, contract_id: &str) -> anyhow::Result<BTreeSet<Role>> {
        self.store.signed_roles(contract_id)
    }

    /// Audit-trail view derived from current events, available before (and
    /// after) finalisation.
    pub fn view_history(&self, contract_id: &str) -> anyhow::Result<Vec<AuditEntry>> {
        let events = self.store.list_by_contract(contract_id)?;
        Ok(assemble_audit_trail(&events))
    }

    /// Issue a signing token for a witness and hand the link to the delivery
    /// collaborator. Delivery is best-effort: a failed send is logged and the
    /// invite still stands.
    pub fn create_witness_invite(
        &self,
        contract_id: &str,
        witness_name: &str,
        witness_email: &str,
        role: Role,
        inviter: &SignerIdentity,
    ) -> anyhow::Result<WitnessSignatureInvite> {
        Contract::load_from_db(&self.instance, contract_id)?;

        let invite = self
            .invites
            .create_invite(contract_id, witness_name, witness_email, role, inviter)?;

        let payload = InviteNotification {
            contract_id: invite.contract_id.clone(),
            witness_name: invite.witness_name.clone(),
            inviter_name: invite.inviter_name.clone(),
            role: invite.role,
            signing_link: signing_link(
                &self.config.signing_link_base,
                &invite.contract_id,
                &invite.token,
                invite.role,
            ),
        };
        if let Err(err) = self.notifier.notify(&invite.witness_email, &payload) {
            warn!(
                contract_id,
                witness_email = %invite.witness_email,
                error = %err,
                "witness invite delivery failed"
            );
        }

        Ok(invite)
    }

    /// Landing-page lookup for a presented token.
    pub fn validate_invite(&self, token: &str) -> anyhow::Result<InviteLanding> {
        let invite = self.invites.validate_token(token)?;
        let contract = Contract::load_from_db(&self.instance, &invite.contract_id)?;
        Ok(InviteLanding { invite, contract })
    }

    pub fn revoke_invite(&self, token: &str) -> anyhow::Result<WitnessSignatureInvite> {
        self.invites.revoke(token)
    }

    /// Read-only integrity check of a finalised contract against its stored
    /// digest.
    pub fn verify_contract(&self, contract_id: &str) -> anyhow::Result<VerifyReport> {
        let contract = Contract::load_from_db(&self.instance, contract_id)?;
        let stored = contract.document_hash.clone().ok_or_else(|| {
            SignatureError::Validation("contract has no document hash to verify".into())
        })?;
        let audit_trail = contract.audit_trail.clone().unwrap_or_default();
        let events = self.store.list_by_contract(contract_id)?;

        Ok(hasher::verify_document(
            &contract,
            &audit_trail,
            &events,
            &stored,
        )?)
    }

    /// Explicit, logged digest recomputation. This is the only path that may
    /// replace an existing digest; `evaluate` never overwrites.
    pub fn reissue_digest(&self, contract_id: &str) -> anyhow::Result<Finalization> {
        let contract = Contract::load_from_db(&self.instance, contract_id)?;
        let previous = contract.document_hash.clone().ok_or_else(|| {
            SignatureError::Validation("contract has not been finalised, nothing to reissue".into())
        })?;

        let events = self.store.list_by_contract(contract_id)?;
        let audit_trail = assemble_audit_trail(&events);
        let document_hash = hasher::hash_document(&contract, &audit_trail, &events)?;

        let mut updated = contract.clone();
        updated.document_hash = Some(document_hash.clone());
        updated.audit_trail = Some(audit_trail.clone());
        updated.updated_at = TimeStamp::new();
        updated.save_to_db(&self.instance)?;

        info!(
            contract_id,
            previous_digest = %previous,
            new_digest = %document_hash,
            "document digest explicitly reissued"
        );

        Ok(Finalization {
            document_hash,
            audit_trail,
        })
    }
}
