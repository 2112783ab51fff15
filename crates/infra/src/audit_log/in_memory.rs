use std::collections::HashMap;
use std::sync::RwLock;

use shipline_case::CaseId;
use shipline_core::ExpectedVersion;

use super::r#trait::{AuditEntry, AuditLog, AuditLogError, UncommittedEntry};

/// In-memory append-only audit log.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    streams: RwLock<HashMap<CaseId, Vec<AuditEntry>>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_sequence(stream: &[AuditEntry]) -> u64 {
        stream.last().map(|e| e.sequence).unwrap_or(0)
    }
}

impl AuditLog for InMemoryAuditLog {
    fn append(
        &self,
        entries: Vec<UncommittedEntry>,
        expected: ExpectedVersion,
    ) -> Result<Vec<AuditEntry>, AuditLogError> {
        if entries.is_empty() {
            return Ok(vec![]);
        }

        let case_id = entries[0].case_id;
        if let Some(idx) = entries.iter().position(|e| e.case_id != case_id) {
            return Err(AuditLogError::InvalidAppend(format!(
                "batch contains multiple case_ids (index {idx})"
            )));
        }

        let mut streams = self.streams.write().map_err(|_| AuditLogError::Poisoned)?;
        let stream = streams.entry(case_id).or_default();
        let current = Self::current_sequence(stream);

        if !expected.matches(current) {
            return Err(AuditLogError::Concurrency(format!(
                "expected {expected:?}, found {current}"
            )));
        }

        if let Some(dup) = entries
            .iter()
            .find(|e| stream.iter().any(|s| s.entry_id == e.entry_id))
        {
            return Err(AuditLogError::InvalidAppend(format!(
                "entry {} already exists",
                dup.entry_id
            )));
        }

        let committed: Vec<AuditEntry> = entries
            .into_iter()
            .zip(current + 1..)
            .map(|(e, seq)| e.into_stored(seq))
            .collect();
        stream.extend(committed.iter().cloned());

        Ok(committed)
    }

    fn list_for(&self, case_id: CaseId) -> Result<Vec<AuditEntry>, AuditLogError> {
        let streams = self.streams.read().map_err(|_| AuditLogError::Poisoned)?;

        let mut entries = streams.get(&case_id).cloned().unwrap_or_default();
        entries.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.sequence.cmp(&b.sequence))
        });
        Ok(entries)
    }
}
