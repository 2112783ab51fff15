//! `shipline-auth`: credentials to role resolution (authorization boundary).
//!
//! This crate is intentionally decoupled from HTTP and storage. It answers two
//! questions: *which role is this caller acting as* and *may that role hit this
//! endpoint at all*. Stage ownership is decided by the case rules, not here.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod principal;

pub use authorize::{AuthzError, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use permissions::{Permission, permissions_for};
pub use principal::{Principal, PrincipalId};
