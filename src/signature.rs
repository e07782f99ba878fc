//! Signature events, roles, and the derivations built on top of them
use crate::contract::TimeStamp;
use chrono::Utc;
use std::collections::BTreeSet;

/// The four signing roles a contract collects before it is fully executed.
/// Witness roles never appear as top-level events; they are derived from the
/// witness sub-record attached to the corresponding main signature.
#[derive(
    minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord,
)]
pub enum Role {
    #[n(0)]
    PropertyOwner,
    #[n(1)]
    Tenant,
    #[n(2)]
    PropertyOwnerWitness,
    #[n(3)]
    TenantWitness,
}

impl Role {
    pub fn is_witness(self) -> bool {
        matches!(self, Role::PropertyOwnerWitness | Role::TenantWitness)
    }
    /// The main role a witness countersigns for. Identity on main roles.
    pub fn main_role(self) -> Role {
        match self {
            Role::PropertyOwnerWitness => Role::PropertyOwner,
            Role::TenantWitness => Role::Tenant,
            main => main,
        }
    }
    /// The witness role paired with a main role. Identity on witness roles.
    pub fn witness_role(self) -> Role {
        match self {
            Role::PropertyOwner => Role::PropertyOwnerWitness,
            Role::Tenant => Role::TenantWitness,
            witness => witness,
        }
    }
    pub fn as_str(self) -> &'static str {
        match self {
            Role::PropertyOwner => "propertyOwner",
            Role::Tenant => "tenant",
            Role::PropertyOwnerWitness => "propertyOwnerWitness",
            Role::TenantWitness => "tenantWitness",
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureKind {
    #[n(0)]
    Signed,
    #[n(1)]
    Viewed,
    #[n(2)]
    Declined,
}

impl SignatureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SignatureKind::Signed => "signed",
            SignatureKind::Viewed => "viewed",
            SignatureKind::Declined => "declined",
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct SignerIdentity {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub email: String,
    #[n(2)]
    pub name: String,
}

/// Countersignature embedded in the main signature event. Witnesses are not
/// system accounts; name and email are the whole identity.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct WitnessSignature {
    #[n(0)]
    pub name: String,
    #[n(1)]
    pub email: String,
    #[n(2)]
    pub payload: String,
    #[n(3)]
    pub timestamp: TimeStamp<Utc>,
    #[n(4)]
    pub ip: String,
    #[n(5)]
    pub device: String,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct SignatureEvent {
    #[n(0)]
    pub event_id: String, // uuid7, bech32 encoded
    #[n(1)]
    pub contract_id: String,
    #[n(2)]
    pub kind: SignatureKind,
    #[n(3)]
    pub role: Role,
    #[n(4)]
    pub timestamp: TimeStamp<Utc>,
    #[n(5)]
    pub signer: Option<SignerIdentity>,
    #[n(6)]
    pub ip: String,
    #[n(7)]
    pub device: String,
    #[n(8)]
    pub payload: String, // opaque base64-as-text signature image
    #[n(9)]
    pub witness: Option<WitnessSignature>,
}

/// Witness identity presented when countersigning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WitnessContact {
    pub name: String,
    pub email: String,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct WitnessSummary {
    #[n(0)]
    pub name: String,
    #[n(1)]
    pub email: String,
    #[n(2)]
    pub timestamp: TimeStamp<Utc>,
}

/// One line of the execution log. Derived from a [`SignatureEvent`]; only
/// persisted on the contract once it finalises.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct AuditEntry {
    #[n(0)]
    pub role: Role,
    #[n(1)]
    pub kind: SignatureKind,
    #[n(2)]
    pub timestamp: TimeStamp<Utc>,
    #[n(3)]
    pub signer: Option<SignerIdentity>,
    #[n(4)]
    pub witness: Option<WitnessSummary>,
    #[n(5)]
    pub ip: String,
    #[n(6)]
    pub device: String,
}

/// Signed-role coverage, derived by scanning events. A `Signed` event
/// contributes its role; an attached witness contributes the paired witness
/// role. Viewing or declining never counts toward coverage. This is the one
/// shared derivation used by both the query surface and the finalisation
/// check.
pub fn derive_signed_roles(events: &[SignatureEvent]) -> BTreeSet<Role> {
    let mut roles = BTreeSet::new();
    for event in events {
        if event.kind != SignatureKind::Signed {
            continue;
        }
        roles.insert(event.role);
        if event.witness.is_some() {
            roles.insert(event.role.witness_role());
        }
    }
    roles
}

/// Expand events into the execution log: one entry per event, plus a
/// witness-only entry (null signer, witness summary, witness role) for each
/// attached countersignature. Entries come out in timestamp order.
pub fn assemble_audit_trail(events: &[SignatureEvent]) -> Vec<AuditEntry> {
    let mut trail = Vec::new();
    for event in events {
        trail.push(AuditEntry {
            role: event.role,
            kind: event.kind,
            timestamp: event.timestamp.clone(),
            signer: event.signer.clone(),
            witness: None,
            ip: event.ip.clone(),
            device: event.device.clone(),
        });
        if let Some(w) = &event.witness {
            trail.push(AuditEntry {
                role: event.role.witness_role(),
                kind: event.kind,
                timestamp: w.timestamp.clone(),
                signer: None,
                witness: Some(WitnessSummary {
                    name: w.name.clone(),
                    email: w.email.clone(),
                    timestamp: w.timestamp.clone(),
                }),
                ip: w.ip.clone(),
                device: w.device.clone(),
            });
        }
    }
    trail.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    trail
}
