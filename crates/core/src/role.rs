//! Organizational roles that act on an export case.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The role a principal acts as.
///
/// Credentials resolve to exactly one of these; stage ownership in the
/// transition rules is expressed in the same vocabulary.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Exporter,
    Customs,
    Shoring,
    Shipping,
    Buyer,
    /// Read-only oversight role; its only write path is the audited override.
    Observer,
}

impl ActorRole {
    pub const ALL: [ActorRole; 6] = [
        ActorRole::Exporter,
        ActorRole::Customs,
        ActorRole::Shoring,
        ActorRole::Shipping,
        ActorRole::Buyer,
        ActorRole::Observer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Exporter => "exporter",
            ActorRole::Customs => "customs",
            ActorRole::Shoring => "shoring",
            ActorRole::Shipping => "shipping",
            ActorRole::Buyer => "buyer",
            ActorRole::Observer => "observer",
        }
    }
}

impl core::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActorRole::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::validation(format!("unknown actor role '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Customs".parse::<ActorRole>().unwrap(), ActorRole::Customs);
        assert_eq!(" observer ".parse::<ActorRole>().unwrap(), ActorRole::Observer);
        assert!("admin".parse::<ActorRole>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&ActorRole::Shipping).unwrap();
        assert_eq!(json, "\"shipping\"");
    }
}
