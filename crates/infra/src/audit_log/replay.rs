//! Fold an audit stream back into case position.
//!
//! A consistency cross-check for the registry's cached stage, not the
//! primary read path.

use serde::Serialize;

use shipline_case::Stage;

use super::r#trait::AuditEntry;

/// Stage and version implied by an audit stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Replayed {
    pub stage: Stage,
    pub version: u64,
}

impl Default for Replayed {
    fn default() -> Self {
        Self {
            stage: Stage::Registered,
            version: 0,
        }
    }
}

/// Fold entries in order. Side-channel (assign/reassign) entries are skipped.
pub fn replay<'a, I>(entries: I) -> Replayed
where
    I: IntoIterator<Item = &'a AuditEntry>,
{
    entries
        .into_iter()
        .filter(|e| e.is_transition())
        .fold(Replayed::default(), |acc, e| Replayed {
            stage: e.to_stage,
            version: acc.version + 1,
        })
}
