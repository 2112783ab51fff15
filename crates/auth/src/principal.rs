use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shipline_core::{ActorRole, AggregateId};

use crate::JwtClaims;

/// Identity of an authenticated principal (a person at one organization).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(Uuid);

impl PrincipalId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl core::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for PrincipalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// A fully resolved principal for authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub principal_id: PrincipalId,
    pub role: ActorRole,
    pub company_id: Option<AggregateId>,
}

impl From<&JwtClaims> for Principal {
    fn from(claims: &JwtClaims) -> Self {
        Self {
            principal_id: claims.sub,
            role: claims.role,
            company_id: claims.company_id,
        }
    }
}
