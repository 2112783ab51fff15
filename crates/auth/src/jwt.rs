//! Bearer token verification (HS256).

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};

/// Resolves a bearer token into verified claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

/// Shared-secret HS256 validator.
pub struct Hs256JwtValidator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();

        // Time-window checks use our own claim names (issued_at/expires_at),
        // so the registered `exp` claim is neither required nor checked here.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = false;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign claims with the same secret (dev tooling and tests).
    pub fn issue(&self, claims: &JwtClaims) -> Result<String, TokenValidationError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))
    }
}

impl core::fmt::Debug for Hs256JwtValidator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256JwtValidator").finish_non_exhaustive()
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PrincipalId;
    use chrono::Duration;
    use shipline_core::{ActorRole, AggregateId};

    fn claims(role: ActorRole) -> JwtClaims {
        let now = Utc::now();
        JwtClaims {
            sub: PrincipalId::new(),
            role,
            company_id: Some(AggregateId::new()),
            issued_at: now - Duration::seconds(5),
            expires_at: now + Duration::minutes(10),
        }
    }

    #[test]
    fn issued_token_validates_with_same_secret() {
        let validator = Hs256JwtValidator::new("s3cret");
        let original = claims(ActorRole::Customs);
        let token = validator.issue(&original).unwrap();

        let decoded = validator.validate(&token, Utc::now()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn wrong_secret_is_malformed() {
        let token = Hs256JwtValidator::new("one")
            .issue(&claims(ActorRole::Buyer))
            .unwrap();

        let err = Hs256JwtValidator::new("two")
            .validate(&token, Utc::now())
            .unwrap_err();
        assert!(matches!(err, TokenValidationError::Malformed(_)));
    }

    #[test]
    fn expired_claims_are_rejected_after_signature_check() {
        let validator = Hs256JwtValidator::new("s3cret");
        let token = validator.issue(&claims(ActorRole::Observer)).unwrap();

        let later = Utc::now() + Duration::hours(1);
        assert_eq!(
            validator.validate(&token, later),
            Err(TokenValidationError::Expired)
        );
    }
}
