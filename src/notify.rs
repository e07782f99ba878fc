//! Best-effort delivery of witness signing links
use crate::signature::Role;
use tracing::info;

/// Template data handed to the delivery collaborator. The signing link embeds
/// the contract, token, and role.
#[derive(Debug, Clone)]
pub struct InviteNotification {
    pub contract_id: String,
    pub witness_name: String,
    pub inviter_name: String,
    pub role: Role,
    pub signing_link: String,
}

/// Delivery seam. Failures are logged by the caller and never roll back the
/// operation that produced the notification.
pub trait NotificationSender: Send + Sync {
    fn notify(&self, recipient: &str, payload: &InviteNotification) -> anyhow::Result<()>;
}

/// Default sender: logs the delivery instead of sending it. Real deployments
/// plug an email/WhatsApp sender in behind the same trait.
pub struct TracingNotifier;

impl NotificationSender for TracingNotifier {
    fn notify(&self, recipient: &str, payload: &InviteNotification) -> anyhow::Result<()> {
        info!(
            recipient,
            contract_id = %payload.contract_id,
            role = payload.role.as_str(),
            link = %payload.signing_link,
            "witness invite ready for delivery"
        );
        Ok(())
    }
}

pub fn signing_link(base_url: &str, contract_id: &str, token: &str, role: Role) -> String {
    format!(
        "{base_url}?contractId={contract_id}&token={token}&role={}",
        role.as_str()
    )
}
