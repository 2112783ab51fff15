use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shipline_core::{ActorRole, AggregateId, DomainError, DomainResult};

/// Company identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(pub AggregateId);

impl CompanyId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for CompanyId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for CompanyId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// The service a company provides. Doubles as the assignment slot on a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Customs,
    Shoring,
    Shipping,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 3] = [ServiceKind::Customs, ServiceKind::Shoring, ServiceKind::Shipping];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Customs => "customs",
            ServiceKind::Shoring => "shoring",
            ServiceKind::Shipping => "shipping",
        }
    }

    /// The actor role whose principals work for companies of this kind.
    pub fn actor_role(&self) -> ActorRole {
        match self {
            ServiceKind::Customs => ActorRole::Customs,
            ServiceKind::Shoring => ActorRole::Shoring,
            ServiceKind::Shipping => ActorRole::Shipping,
        }
    }
}

impl core::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "unknown slot '{s}' (expected customs, shoring or shipping)"
                ))
            })
    }
}

/// Contact information for a company.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Star rating, 0.0–5.0, kept in tenths so records stay `Eq`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct Rating(u8);

impl Rating {
    pub const MAX_TENTHS: u8 = 50;

    pub fn from_tenths(tenths: u8) -> DomainResult<Self> {
        if tenths > Self::MAX_TENTHS {
            return Err(DomainError::validation("rating must be between 0.0 and 5.0"));
        }
        Ok(Self(tenths))
    }

    pub fn tenths(&self) -> u8 {
        self.0
    }

    pub fn stars(&self) -> f32 {
        f32::from(self.0) / 10.0
    }
}

impl TryFrom<f32> for Rating {
    type Error = DomainError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        if !value.is_finite() || !(0.0..=5.0).contains(&value) {
            return Err(DomainError::validation("rating must be between 0.0 and 5.0"));
        }
        Self::from_tenths((value * 10.0).round() as u8)
    }
}

impl From<Rating> for f32 {
    fn from(value: Rating) -> Self {
        value.stars()
    }
}

impl core::fmt::Display for Rating {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.0 / 10, self.0 % 10)
    }
}

/// A vendor record in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub service: ServiceKind,
    pub contact: ContactInfo,
    pub rating: Rating,
    pub specialties: Vec<String>,
    /// Cases handled per month, when the vendor advertises it.
    pub monthly_capacity: Option<u32>,
    pub registered_at: DateTime<Utc>,
}

impl Company {
    pub fn has_specialty(&self, specialty: &str) -> bool {
        let needle = specialty.trim().to_lowercase();
        self.specialties
            .iter()
            .any(|s| s.to_lowercase().contains(&needle))
    }
}

/// Registration input for a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCompany {
    pub name: String,
    pub service: ServiceKind,
    #[serde(default)]
    pub contact: Option<ContactInfo>,
    #[serde(default)]
    pub rating: Option<Rating>,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub monthly_capacity: Option<u32>,
}

impl NewCompany {
    pub fn new(name: impl Into<String>, service: ServiceKind) -> Self {
        Self {
            name: name.into(),
            service,
            contact: None,
            rating: None,
            specialties: Vec::new(),
            monthly_capacity: None,
        }
    }

    pub fn with_rating(mut self, rating: Rating) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_specialties<I, S>(mut self, specialties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.specialties = specialties.into_iter().map(Into::into).collect();
        self
    }

    /// Validate and turn into a directory record.
    pub fn into_company(self, id: CompanyId, registered_at: DateTime<Utc>) -> DomainResult<Company> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("company name cannot be empty"));
        }
        if self.monthly_capacity == Some(0) {
            return Err(DomainError::validation("monthly_capacity must be positive when given"));
        }

        let specialties = self
            .specialties
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Company {
            id,
            name,
            service: self.service,
            contact: self.contact.unwrap_or_default(),
            rating: self.rating.unwrap_or_default(),
            specialties,
            monthly_capacity: self.monthly_capacity,
            registered_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> CompanyId {
        CompanyId::new(AggregateId::new())
    }

    #[test]
    fn rejects_blank_name() {
        let err = NewCompany::new("   ", ServiceKind::Customs)
            .into_company(id(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn trims_name_and_drops_blank_specialties() {
        let company = NewCompany::new("  Hanjin Customs  ", ServiceKind::Customs)
            .with_specialties(["used cars", " ", "middle east "])
            .into_company(id(), Utc::now())
            .unwrap();
        assert_eq!(company.name, "Hanjin Customs");
        assert_eq!(company.specialties, vec!["used cars", "middle east"]);
    }

    #[test]
    fn rating_rounds_to_tenths() {
        let rating = Rating::try_from(4.84).unwrap();
        assert_eq!(rating.tenths(), 48);
        assert_eq!(rating.to_string(), "4.8");
        assert!(Rating::try_from(5.1).is_err());
        assert!(Rating::try_from(f32::NAN).is_err());
    }

    #[test]
    fn rating_serializes_as_stars() {
        let json = serde_json::to_string(&Rating::from_tenths(45).unwrap()).unwrap();
        assert_eq!(json, "4.5");
        let back: Rating = serde_json::from_str("3.7").unwrap();
        assert_eq!(back.tenths(), 37);
    }

    #[test]
    fn specialty_match_is_case_insensitive_substring() {
        let company = NewCompany::new("Busan Shoring", ServiceKind::Shoring)
            .with_specialties(["RoRo Vessels"])
            .into_company(id(), Utc::now())
            .unwrap();
        assert!(company.has_specialty("roro"));
        assert!(!company.has_specialty("container"));
    }

    #[test]
    fn slot_parses_and_maps_to_role() {
        let slot: ServiceKind = "Shipping".parse().unwrap();
        assert_eq!(slot, ServiceKind::Shipping);
        assert_eq!(slot.actor_role(), ActorRole::Shipping);
        assert!("warehouse".parse::<ServiceKind>().is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: accepted ratings never exceed five stars.
            #[test]
            fn accepted_ratings_stay_in_range(stars in -10.0f32..10.0) {
                match Rating::try_from(stars) {
                    Ok(rating) => {
                        prop_assert!((0.0..=5.0).contains(&stars));
                        prop_assert!(rating.tenths() <= Rating::MAX_TENTHS);
                    }
                    Err(_) => prop_assert!(!(0.0..=5.0).contains(&stars)),
                }
            }
        }
    }
}
