use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use shipline_core::{AggregateId, DomainError, DomainResult};

use crate::company::{Company, CompanyId, NewCompany, Rating, ServiceKind};

/// Listing filter for the directory (mirrors the broker-selection search box).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyFilter {
    pub service: Option<ServiceKind>,
    pub specialty: Option<String>,
    pub min_rating: Option<Rating>,
}

impl CompanyFilter {
    pub fn matches(&self, company: &Company) -> bool {
        self.service.is_none_or(|s| company.service == s)
            && self
                .specialty
                .as_deref()
                .is_none_or(|s| company.has_specialty(s))
            && self.min_rating.is_none_or(|r| company.rating >= r)
    }
}

/// Read-mostly company lookup.
///
/// Nothing in the transition rules requires this to be hard-consistent; callers
/// may cache results freely.
pub trait CompanyDirectory: Send + Sync {
    fn register(&self, company: NewCompany) -> DomainResult<Company>;

    fn get(&self, id: CompanyId) -> Option<Company>;

    /// Matching companies, best rated first (ties by name).
    fn list(&self, filter: &CompanyFilter) -> Vec<Company>;
}

impl<S> CompanyDirectory for Arc<S>
where
    S: CompanyDirectory + ?Sized,
{
    fn register(&self, company: NewCompany) -> DomainResult<Company> {
        (**self).register(company)
    }

    fn get(&self, id: CompanyId) -> Option<Company> {
        (**self).get(id)
    }

    fn list(&self, filter: &CompanyFilter) -> Vec<Company> {
        (**self).list(filter)
    }
}

/// In-memory directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCompanyDirectory {
    companies: RwLock<BTreeMap<CompanyId, Company>>,
}

impl InMemoryCompanyDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CompanyDirectory for InMemoryCompanyDirectory {
    fn register(&self, company: NewCompany) -> DomainResult<Company> {
        let company = company.into_company(CompanyId::new(AggregateId::new()), Utc::now())?;

        let mut map = self
            .companies
            .write()
            .map_err(|_| DomainError::validation("company directory unavailable"))?;
        map.insert(company.id, company.clone());

        Ok(company)
    }

    fn get(&self, id: CompanyId) -> Option<Company> {
        self.companies.read().ok()?.get(&id).cloned()
    }

    fn list(&self, filter: &CompanyFilter) -> Vec<Company> {
        let map = match self.companies.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };

        let mut out: Vec<Company> = map.values().filter(|c| filter.matches(c)).cloned().collect();
        out.sort_by(|a, b| b.rating.cmp(&a.rating).then_with(|| a.name.cmp(&b.name)));
        out
    }
}
