use thiserror::Error;

use crate::{Permission, Principal, permissions_for};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: role '{role}' lacks permission '{permission}'")]
    Forbidden { role: String, permission: String },
}

/// Authorize a principal for an endpoint-level permission.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if permissions_for(principal.role).contains(required) {
        return Ok(());
    }

    tracing::debug!(
        principal = %principal.principal_id,
        role = %principal.role,
        permission = %required,
        "authorization denied"
    );

    Err(AuthzError::Forbidden {
        role: principal.role.to_string(),
        permission: required.to_string(),
    })
}
