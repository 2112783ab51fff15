//! Export case domain module (event-sourced).
//!
//! Stage Table, document and assignment rules, and the transition decision
//! logic, implemented purely as deterministic domain logic (no IO, no HTTP,
//! no storage).

pub mod action;
pub mod assignments;
pub mod buyer;
pub mod case;
pub mod documents;
pub mod stage;
pub mod vehicle;

pub use action::{Action, Actor, Decision, Evidence, NewDocument};
pub use assignments::{AssignmentChange, Assignments, CompanyRef};
pub use buyer::Buyer;
pub use case::{
    AGGREGATE_TYPE, AssignCompany, CaseCommand, CaseEvent, CaseId, CaseRegistered,
    CaseTransitioned, CompanyAssigned, CompanyReassigned, DocumentRecorded, ExportCase,
    ReassignCompany, RecordDocument, RegisterCase, TransitionCase,
};
pub use documents::{DocumentKind, DocumentRecord, DocumentTracker, required_for};
pub use stage::{STAGE_TABLE, Stage, StageSpec};
pub use vehicle::Vehicle;
