//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every variant carries enough structure for a client to render a specific
/// message (e.g. the exact document kinds that are still missing). Storage and
/// transport failures belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input (empty required field, out-of-range value).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A case or company does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The acting role (or company) may not perform the requested action.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The action is not legal from the case's current stage.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Documents required to enter the target stage are absent.
    #[error("missing documents: {}", .0.join(", "))]
    MissingDocuments(Vec<String>),

    /// An assignment slot is already bound.
    #[error("already assigned: {0}")]
    AlreadyAssigned(String),

    /// A role-bound stage needs a slot that has no company yet.
    #[error("slot '{0}' has no assigned company")]
    SlotUnassigned(String),

    /// Optimistic concurrency conflict: the caller observed an older version.
    #[error("stale version (expected {expected}, actual {actual})")]
    StaleVersion { expected: u64, actual: u64 },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn already_assigned(msg: impl Into<String>) -> Self {
        Self::AlreadyAssigned(msg.into())
    }

    pub fn missing_documents<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MissingDocuments(kinds.into_iter().map(Into::into).collect())
    }

    /// Stable machine-readable code, used by transports for error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation_error",
            DomainError::InvalidId(_) => "invalid_id",
            DomainError::NotFound(_) => "not_found",
            DomainError::Unauthorized(_) => "unauthorized",
            DomainError::InvalidTransition(_) => "invalid_transition",
            DomainError::MissingDocuments(_) => "missing_documents",
            DomainError::AlreadyAssigned(_) => "already_assigned",
            DomainError::SlotUnassigned(_) => "slot_unassigned",
            DomainError::StaleVersion { .. } => "stale_version",
        }
    }

    /// The one error a well-behaved caller retries automatically (re-read, retry).
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::StaleVersion { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_documents_lists_every_kind() {
        let err = DomainError::missing_documents(["export-declaration", "packing-list"]);
        assert_eq!(
            err.to_string(),
            "missing documents: export-declaration, packing-list"
        );
        assert_eq!(err.code(), "missing_documents");
    }

    #[test]
    fn only_stale_version_is_retryable() {
        assert!(DomainError::StaleVersion { expected: 1, actual: 2 }.is_retryable());
        assert!(!DomainError::not_found("case").is_retryable());
        assert!(!DomainError::validation("empty").is_retryable());
    }
}
