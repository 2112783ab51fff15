use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shipline_core::{ActorRole, AggregateId};

use crate::PrincipalId;

/// JWT claims model (transport-agnostic).
///
/// This is the minimal set of claims shipline expects once a token has been
/// decoded and its signature verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject / principal identifier.
    pub sub: PrincipalId,

    /// The single role this principal acts as.
    pub role: ActorRole,

    /// Company the principal works for (customs broker, shoring company, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<AggregateId>,

    /// Issued-at timestamp.
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("malformed token: {0}")]
    Malformed(String),
}

/// Deterministically validate JWT claims.
///
/// Note: this validates the *claims* only; see [`crate::JwtValidator`] for
/// signature verification.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims_at(issued_at: DateTime<Utc>, ttl_minutes: i64) -> JwtClaims {
        JwtClaims {
            sub: PrincipalId::new(),
            role: ActorRole::Exporter,
            company_id: None,
            issued_at,
            expires_at: issued_at + Duration::minutes(ttl_minutes),
        }
    }

    #[test]
    fn accepts_claims_inside_window() {
        let now = Utc::now();
        assert!(validate_claims(&claims_at(now - Duration::minutes(1), 10), now).is_ok());
    }

    #[test]
    fn rejects_expired_and_future_tokens() {
        let now = Utc::now();
        assert_eq!(
            validate_claims(&claims_at(now - Duration::minutes(20), 10), now),
            Err(TokenValidationError::Expired)
        );
        assert_eq!(
            validate_claims(&claims_at(now + Duration::minutes(5), 10), now),
            Err(TokenValidationError::NotYetValid)
        );
        assert_eq!(
            validate_claims(&claims_at(now, 0), now),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }

    #[test]
    fn company_id_is_optional_on_the_wire() {
        let now = Utc::now();
        let json = serde_json::to_value(claims_at(now, 5)).unwrap();
        assert!(json.get("company_id").is_none());
        assert_eq!(json["role"], "exporter");
    }
}
