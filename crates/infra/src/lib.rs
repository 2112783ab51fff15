//! Infrastructure layer: case registry, audit log, notifications and workers.
//!
//! Domain decisions live in `shipline-case`; this crate serializes them per
//! case, makes them durable in the audit log and fans committed events out.

pub mod audit_log;
pub mod error;
pub mod notifications;
pub mod query;
pub mod registry;
pub mod workers;


pub use audit_log::{AuditEntry, AuditLog, AuditLogError, InMemoryAuditLog, Replayed, UncommittedEntry, replay};
pub use error::{RegistryError, RegistryResult};
pub use notifications::{LoggingNotifier, NotificationService, NotifyError};
pub use query::{CaseFilter, Page, Pagination};
pub use registry::{CaseListing, CaseRegistry, NewCase, RecordOutcome, TransitionOutcome, Verification};
pub use workers::{NotificationWorker, WorkerHandle};
