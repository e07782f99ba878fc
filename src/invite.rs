//! Witness signing invitations and token lifecycle
use crate::contract::TimeStamp;
use crate::error::SignatureError;
use crate::signature::{Role, SignerIdentity};
use crate::utils;
use chrono::{Duration, Utc};
use sled::Db;
use std::sync::Arc;

pub const TOKEN_TTL_HOURS: i64 = 48;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Signed,
    #[n(2)]
    Revoked,
    #[n(3)]
    Expired,
}

/// A pending invitation for a witness to countersign. The token authorises
/// exactly one contract/role/witness-email triple and dies on first use.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct WitnessSignatureInvite {
    #[n(0)]
    pub contract_id: String,
    #[n(1)]
    pub witness_email: String,
    #[n(2)]
    pub witness_name: String,
    #[n(3)]
    pub role: Role,
    #[n(4)]
    pub inviter_name: String,
    #[n(5)]
    pub inviter_id: String,
    #[n(6)]
    pub token: String, // 32 random bytes, hex encoded
    #[n(7)]
    pub status: InviteStatus,
    #[n(8)]
    pub sent_at: TimeStamp<Utc>,
    #[n(9)]
    pub signed_at: Option<TimeStamp<Utc>>,
    #[n(10)]
    pub token_expires_at: TimeStamp<Utc>,
}

fn invite_key(token: &str) -> Vec<u8> {
    format!("invite/{token}").into_bytes()
}

impl WitnessSignatureInvite {
    pub fn save_to_db(&self, db: &Db) -> anyhow::Result<()> {
        db.insert(invite_key(&self.token), minicbor::to_vec(self)?)?;
        Ok(())
    }
}

pub struct WitnessInviteRegistry {
    instance: Arc<Db>,
}

impl WitnessInviteRegistry {
    pub fn new(instance: Arc<Db>) -> Self {
        Self { instance }
    }

    pub fn create_invite(
        &self,
        contract_id: &str,
        witness_name: &str,
        witness_email: &str,
        role: Role,
        inviter: &SignerIdentity,
    ) -> anyhow::Result<WitnessSignatureInvite> {
        if !role.is_witness() {
            return Err(SignatureError::Validation(
                "witness invites are issued for witness roles only".into(),
            )
            .into());
        }
        if witness_name.is_empty() || witness_email.is_empty() {
            return Err(
                SignatureError::Validation("witness name and email are required".into()).into(),
            );
        }

        let sent_at = Utc::now();
        let invite = WitnessSignatureInvite {
            contract_id: contract_id.to_string(),
            witness_email: witness_email.to_string(),
            witness_name: witness_name.to_string(),
            role,
            inviter_name: inviter.name.clone(),
            inviter_id: inviter.id.clone(),
            token: utils::new_signing_token(),
            status: InviteStatus::Pending,
            sent_at: sent_at.into(),
            signed_at: None,
            token_expires_at: (sent_at + Duration::hours(TOKEN_TTL_HOURS)).into(),
        };

        invite.save_to_db(&self.instance)?;

        Ok(invite)
    }

    fn load(&self, token: &str) -> anyhow::Result<Option<WitnessSignatureInvite>> {
        match self.instance.get(invite_key(token))? {
            Some(bytes) => Ok(Some(minicbor::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Check a presented token. Read-only: the `Signed` transition happens in
    /// [`mark_signed`] once the witness actually signs.
    ///
    /// [`mark_signed`]: WitnessInviteRegistry::mark_signed
    pub fn validate_token(&self, token: &str) -> anyhow::Result<WitnessSignatureInvite> {
        let invite = self.load(token)?.ok_or(SignatureError::InvalidToken)?;

        if invite.status != InviteStatus::Pending {
            return Err(SignatureError::InvalidToken.into());
        }
        if Utc::now() > invite.token_expires_at.to_datetime_utc() {
            return Err(SignatureError::TokenExpired.into());
        }

        Ok(invite)
    }

    /// Close the token after its witness signature landed. Single-use rule:
    /// once signed, [`validate_token`] rejects the token for good.
    ///
    /// [`validate_token`]: WitnessInviteRegistry::validate_token
    pub fn mark_signed(&self, token: &str) -> anyhow::Result<WitnessSignatureInvite> {
        let mut invite = self.load(token)?.ok_or(SignatureError::InvalidToken)?;

        if invite.status != InviteStatus::Pending {
            return Err(SignatureError::InvalidToken.into());
        }

        invite.status = InviteStatus::Signed;
        invite.signed_at = Some(TimeStamp::new());
        invite.save_to_db(&self.instance)?;

        Ok(invite)
    }

    /// Inviter-initiated withdrawal of a pending invite.
    pub fn revoke(&self, token: &str) -> anyhow::Result<WitnessSignatureInvite> {
        let mut invite = self.load(token)?.ok_or(SignatureError::InvalidToken)?;

        if invite.status != InviteStatus::Pending {
            return Err(SignatureError::InvalidToken.into());
        }

        invite.status = InviteStatus::Revoked;
        invite.save_to_db(&self.instance)?;

        Ok(invite)
    }
}
