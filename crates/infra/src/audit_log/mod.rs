//! Append-only audit log boundary.
//!
//! One ordered stream of [`AuditEntry`]s per case. Appends are the only write
//! path; entries are never updated or deleted.

pub mod in_memory;
pub mod replay;
pub mod r#trait;

pub use in_memory::InMemoryAuditLog;
pub use replay::{Replayed, replay};
pub use r#trait::{AuditEntry, AuditLog, AuditLogError, UncommittedEntry};
