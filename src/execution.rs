//! Fully-executed derivation over signed-role coverage
use crate::signature::Role;
use std::collections::BTreeSet;

/// Every role that must be covered before a contract is fully executed.
pub const REQUIRED_ROLES: [Role; 4] = [
    Role::PropertyOwner,
    Role::PropertyOwnerWitness,
    Role::Tenant,
    Role::TenantWitness,
];

/// Per-contract signing state. Derived fresh from stored events on every
/// check; never persisted as its own column. `FullyExecuted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Pending,
    FullyExecuted,
}

pub fn is_complete(signed_roles: &BTreeSet<Role>) -> bool {
    REQUIRED_ROLES.iter().all(|role| signed_roles.contains(role))
}

pub fn execution_state(signed_roles: &BTreeSet<Role>) -> ExecutionState {
    if is_complete(signed_roles) {
        ExecutionState::FullyExecuted
    } else {
        ExecutionState::Pending
    }
}
