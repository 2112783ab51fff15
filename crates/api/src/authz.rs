//! API-side endpoint guard.
//!
//! Checks the coarse role → permission policy before a handler touches the
//! registry. Stage ownership stays with the case rules.

use shipline_auth::{AuthzError, Permission, authorize};

use crate::context::PrincipalContext;

/// Check an endpoint permission for the current request.
pub fn authorize_endpoint(principal: &PrincipalContext, permission: &Permission) -> Result<(), AuthzError> {
    authorize(principal.principal(), permission)
}
