//! Company Directory: customs brokers, shoring companies and shipping agents.
//!
//! Read-mostly vendor records with capability metadata. Cases reference
//! companies by [`CompanyId`]; records are never copied into a case.

pub mod company;
pub mod directory;

pub use company::{Company, CompanyId, ContactInfo, NewCompany, Rating, ServiceKind};
pub use directory::{CompanyDirectory, CompanyFilter, InMemoryCompanyDirectory};
