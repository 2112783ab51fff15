use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::{Value as JsonValue, json};

use shipline_auth::AuthzError;
use shipline_core::DomainError;
use shipline_infra::{AuditLogError, RegistryError};

pub fn registry_error_to_response(err: RegistryError) -> axum::response::Response {
    match err {
        RegistryError::Domain(e) => domain_error_to_response(e),
        RegistryError::AuditLog(AuditLogError::Concurrency(msg)) => {
            json_error(StatusCode::CONFLICT, "conflict", msg)
        }
        RegistryError::AuditLog(e) => {
            tracing::error!(error = %e, "audit log failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
        RegistryError::Poisoned(what) => {
            tracing::error!(what = %what, "lock poisoned");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "internal state unavailable")
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let status = match &err {
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Unauthorized(_) => StatusCode::FORBIDDEN,
        DomainError::StaleVersion { .. } | DomainError::AlreadyAssigned(_) => StatusCode::CONFLICT,
        DomainError::InvalidTransition(_)
        | DomainError::MissingDocuments(_)
        | DomainError::SlotUnassigned(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::Validation(_) | DomainError::InvalidId(_) => StatusCode::BAD_REQUEST,
    };

    let detail = match &err {
        DomainError::MissingDocuments(kinds) => json!({ "missing": kinds }),
        DomainError::StaleVersion { expected, actual } => {
            json!({ "expected": expected, "actual": actual, "retryable": err.is_retryable() })
        }
        _ => JsonValue::Null,
    };

    json_error_with(status, err.code(), err.to_string(), detail)
}

pub fn forbidden(err: AuthzError) -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    json_error_with(status, code, message, JsonValue::Null)
}

/// Error body with extra top-level fields merged in.
fn json_error_with(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    detail: JsonValue,
) -> axum::response::Response {
    let mut body = json!({
        "error": code,
        "message": message.into(),
    });
    if let (Some(body), JsonValue::Object(extra)) = (body.as_object_mut(), detail) {
        body.extend(extra);
    }

    (status, axum::Json(body)).into_response()
}

/// Parse a path or query value, answering 400 with the domain message.
pub fn parse<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: core::str::FromStr<Err = DomainError>,
{
    raw.parse().map_err(domain_error_to_response)
}
