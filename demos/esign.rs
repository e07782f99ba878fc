//! End-to-end walkthrough: four signatures, finalisation, verification.
//!
//! Run with `cargo run --example esign`.

use contract_esign::{
    contract::TimeStamp,
    service::EsignService,
    signature::{Role, SignatureKind, SignerIdentity, WitnessContact},
    store::NewSignature,
    utils,
};
use std::sync::Arc;

fn signer(name: &str) -> anyhow::Result<SignerIdentity> {
    Ok(SignerIdentity {
        id: utils::new_uuid_to_bech32("signer_")?,
        email: format!("{name}@example.com"),
        name: name.to_string(),
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    let db = sled::open("esign-demo")?;

    if !db.is_empty() {
        db.clear()?;
    }

    let service = EsignService::new(Arc::new(db));

    let contract = service.create_contract(
        utils::new_uuid_to_bech32("client_")?,
        utils::new_uuid_to_bech32("owner_")?,
        utils::new_uuid_to_bech32("property_")?,
        4_800_000,
        "27 Glover Road, Ikoyi, Lagos".to_string(),
    )?;
    println!("contract: {}", contract.id);

    let owner = signer("adaeze")?;
    let tenant = signer("tunde")?;

    // both main signers execute their signatures
    for (who, role) in [(&owner, Role::PropertyOwner), (&tenant, Role::Tenant)] {
        let outcome = service.record_signature(NewSignature {
            contract_id: contract.id.clone(),
            role,
            kind: SignatureKind::Signed,
            signer: Some(who.clone()),
            witness: None,
            payload: "bWFpbi1zaWduYXR1cmU=".to_string(),
            ip: "203.0.113.50".to_string(),
            device: "demo".to_string(),
            timestamp: TimeStamp::new(),
        })?;
        println!("{} signed as {}", who.name, outcome.event.role.as_str());
    }

    // each main signer invites a witness; the witness signs through the token
    for (who, role, witness_name) in [
        (&owner, Role::PropertyOwnerWitness, "chika"),
        (&tenant, Role::TenantWitness, "bisi"),
    ] {
        let invite = service.create_witness_invite(
            &contract.id,
            witness_name,
            &format!("{witness_name}@example.com"),
            role,
            who,
        )?;

        let outcome = service.record_witness_signature(
            &invite.token,
            "d2l0bmVzcy1zaWduYXR1cmU=".to_string(),
            "203.0.113.51".to_string(),
            "demo".to_string(),
            TimeStamp::new(),
        )?;
        println!("{witness_name} countersigned as {}", role.as_str());

        if let Some(finalization) = outcome.finalization {
            println!("contract fully executed");
            println!("digest: {}", finalization.document_hash);
            for entry in &finalization.audit_trail {
                println!(
                    "  {} {} at {}",
                    entry.role.as_str(),
                    entry.kind.as_str(),
                    entry.timestamp.to_datetime_utc()
                );
            }
        }
    }

    let report = service.verify_contract(&contract.id)?;
    println!("verified: {}", report.is_verified);

    Ok(())
}
