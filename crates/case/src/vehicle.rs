use serde::{Deserialize, Serialize};

use shipline_core::{DomainError, DomainResult};

const MAX_VIN_LEN: usize = 32;
const FIRST_MODEL_YEAR: i32 = 1900;

/// Vehicle descriptor; immutable after registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Chassis number / VIN.
    pub vin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mileage_km: Option<u32>,
}

impl Vehicle {
    pub fn new(vin: impl Into<String>) -> Self {
        Self {
            vin: vin.into(),
            ..Self::default()
        }
    }

    /// Validate and canonicalize (upper-case VIN, trimmed model).
    ///
    /// Model years up to `current_year + 1` are accepted.
    pub fn normalized(self, current_year: i32) -> DomainResult<Self> {
        let vin = self.vin.trim().to_ascii_uppercase();
        if vin.is_empty() {
            return Err(DomainError::validation("vehicle VIN cannot be empty"));
        }
        if vin.len() > MAX_VIN_LEN {
            return Err(DomainError::validation(format!(
                "vehicle VIN must be at most {MAX_VIN_LEN} characters"
            )));
        }
        if !vin.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(DomainError::validation(
                "vehicle VIN may only contain letters, digits and '-'",
            ));
        }

        if let Some(year) = self.year {
            if !(FIRST_MODEL_YEAR..=current_year + 1).contains(&year) {
                return Err(DomainError::validation(format!(
                    "vehicle year {year} is outside {FIRST_MODEL_YEAR}..={}",
                    current_year + 1
                )));
            }
        }

        let model = self
            .model
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        Ok(Self {
            vin,
            model,
            year: self.year,
            mileage_km: self.mileage_km,
        })
    }
}
