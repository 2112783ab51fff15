use serde::{Deserialize, Serialize};

use shipline_core::{DomainError, DomainResult};

/// Buyer side of the deal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buyer {
    pub name: String,
    pub country: String,
    /// Price in smallest currency unit (e.g., cents).
    pub agreed_price: u64,
    /// Three-letter ISO-4217 style code.
    pub currency: String,
}

impl Buyer {
    pub fn normalized(self) -> DomainResult<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("buyer name cannot be empty"));
        }

        let country = self.country.trim().to_string();
        if country.is_empty() {
            return Err(DomainError::validation("buyer country cannot be empty"));
        }

        if self.agreed_price == 0 {
            return Err(DomainError::validation("agreed_price must be positive"));
        }

        let currency = self.currency.trim().to_ascii_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(DomainError::validation(format!(
                "currency '{}' must be a three-letter code",
                self.currency
            )));
        }

        Ok(Self {
            name,
            country,
            agreed_price: self.agreed_price,
            currency,
        })
    }

    pub fn is_in_country(&self, country: &str) -> bool {
        self.country.eq_ignore_ascii_case(country.trim())
    }
}
