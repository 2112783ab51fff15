use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shipline_case::{AssignmentChange, CaseEvent, CaseId, Decision, DocumentKind, Stage};
use shipline_core::{ActorRole, EntryId, ExpectedVersion};

/// An entry ready to be appended (not yet assigned a sequence number).
///
/// Built from the committed case event that caused it; see
/// [`UncommittedEntry::from_event`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEntry {
    pub entry_id: EntryId,
    pub case_id: CaseId,
    pub from_stage: Stage,
    pub to_stage: Stage,
    pub actor_role: ActorRole,
    pub decision: Decision,
    pub note: Option<String>,
    /// Document kinds merged by this entry.
    pub documents: Vec<DocumentKind>,
    /// Slot change, for side-channel assign/reassign entries.
    pub assignment: Option<AssignmentChange>,
    /// Case version after this entry.
    pub case_version: u64,
    pub timestamp: DateTime<Utc>,
}

/// A stored, immutable audit entry.
///
/// `sequence` is per case, starts at 1 and has no gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub entry_id: EntryId,
    pub case_id: CaseId,
    pub sequence: u64,
    pub from_stage: Stage,
    pub to_stage: Stage,
    pub actor_role: ActorRole,
    pub decision: Decision,
    pub note: Option<String>,
    pub documents: Vec<DocumentKind>,
    pub assignment: Option<AssignmentChange>,
    pub case_version: u64,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    /// Did this entry move the case (as opposed to a side-channel assignment)?
    pub fn is_transition(&self) -> bool {
        self.decision.is_transition()
    }
}

impl UncommittedEntry {
    /// Audit entry for a case event, or `None` for events that are not audited
    /// (registration, document recording).
    ///
    /// `stage` and `version` are the case's stage and version at the time of
    /// the event; side-channel entries repeat them.
    pub fn from_event(event: &CaseEvent, stage: Stage, version: u64) -> Option<Self> {
        match event {
            CaseEvent::CaseTransitioned(e) => Some(Self {
                entry_id: e.entry_id,
                case_id: e.case_id,
                from_stage: e.from,
                to_stage: e.to,
                actor_role: e.actor_role,
                decision: e.decision,
                note: e.note.clone(),
                documents: e.documents.iter().map(|d| d.kind).collect(),
                assignment: None,
                case_version: e.version,
                timestamp: e.occurred_at,
            }),
            CaseEvent::CompanyAssigned(e) => Some(Self {
                entry_id: e.entry_id,
                case_id: e.case_id,
                from_stage: stage,
                to_stage: stage,
                actor_role: e.actor_role,
                decision: Decision::Assign,
                note: None,
                documents: Vec::new(),
                assignment: Some(e.change),
                case_version: version,
                timestamp: e.occurred_at,
            }),
            CaseEvent::CompanyReassigned(e) => Some(Self {
                entry_id: e.entry_id,
                case_id: e.case_id,
                from_stage: stage,
                to_stage: stage,
                actor_role: e.actor_role,
                decision: Decision::Reassign,
                note: Some(e.reason.clone()),
                documents: Vec::new(),
                assignment: Some(e.change),
                case_version: version,
                timestamp: e.occurred_at,
            }),
            CaseEvent::CaseRegistered(_) | CaseEvent::DocumentRecorded(_) => None,
        }
    }

    pub(crate) fn into_stored(self, sequence: u64) -> AuditEntry {
        AuditEntry {
            entry_id: self.entry_id,
            case_id: self.case_id,
            sequence,
            from_stage: self.from_stage,
            to_stage: self.to_stage,
            actor_role: self.actor_role,
            decision: self.decision,
            note: self.note,
            documents: self.documents,
            assignment: self.assignment,
            case_version: self.case_version,
            timestamp: self.timestamp,
        }
    }
}

/// Audit log operation error.
///
/// These are **infrastructure errors**, as opposed to the domain errors a
/// transition is rejected with.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditLogError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("audit log lock poisoned")]
    Poisoned,
}

/// Append-only, per-case audit log.
///
/// Implementations must:
/// - accept a batch for a single case only
/// - check `expected` against the case's current last sequence
/// - assign sequences `current + 1, current + 2, ...` atomically
/// - return entries from `list_for` ordered by timestamp, then sequence
pub trait AuditLog: Send + Sync {
    fn append(
        &self,
        entries: Vec<UncommittedEntry>,
        expected: ExpectedVersion,
    ) -> Result<Vec<AuditEntry>, AuditLogError>;

    /// All entries of a case; empty for a case without history.
    fn list_for(&self, case_id: CaseId) -> Result<Vec<AuditEntry>, AuditLogError>;
}

impl<L> AuditLog for Arc<L>
where
    L: AuditLog + ?Sized,
{
    fn append(
        &self,
        entries: Vec<UncommittedEntry>,
        expected: ExpectedVersion,
    ) -> Result<Vec<AuditEntry>, AuditLogError> {
        (**self).append(entries, expected)
    }

    fn list_for(&self, case_id: CaseId) -> Result<Vec<AuditEntry>, AuditLogError> {
        (**self).list_for(case_id)
    }
}
