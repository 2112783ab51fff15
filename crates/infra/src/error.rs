use thiserror::Error;

use shipline_core::DomainError;

use crate::audit_log::AuditLogError;

/// Case registry operation error.
///
/// Domain rejections pass through untouched so transports can render their
/// structured detail; everything else is an infrastructure failure.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    AuditLog(#[from] AuditLogError),

    #[error("lock poisoned: {0}")]
    Poisoned(String),
}

impl RegistryError {
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            RegistryError::Domain(err) => Some(err),
            _ => None,
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;
