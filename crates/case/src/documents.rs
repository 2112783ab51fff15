//! Document Tracker.
//!
//! Tracks which document kinds a case has produced and the stage that produced
//! them. File bytes live with an external renderer/storage service; a record
//! only holds its opaque reference.

use core::str::FromStr;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shipline_core::DomainError;

use crate::stage::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    Registration,
    CancellationCertificate,
    ExportDeclaration,
    ApprovalCertificate,
    RejectionReason,
    PackingList,
    BillOfLading,
    Invoice,
    ShippingMark,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 9] = [
        DocumentKind::Registration,
        DocumentKind::CancellationCertificate,
        DocumentKind::ExportDeclaration,
        DocumentKind::ApprovalCertificate,
        DocumentKind::RejectionReason,
        DocumentKind::PackingList,
        DocumentKind::BillOfLading,
        DocumentKind::Invoice,
        DocumentKind::ShippingMark,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Registration => "registration",
            DocumentKind::CancellationCertificate => "cancellation-certificate",
            DocumentKind::ExportDeclaration => "export-declaration",
            DocumentKind::ApprovalCertificate => "approval-certificate",
            DocumentKind::RejectionReason => "rejection-reason",
            DocumentKind::PackingList => "packing-list",
            DocumentKind::BillOfLading => "bill-of-lading",
            DocumentKind::Invoice => "invoice",
            DocumentKind::ShippingMark => "shipping-mark",
        }
    }
}

impl core::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('_', "-");
        DocumentKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| DomainError::validation(format!("unknown document kind '{s}'")))
    }
}

/// Document kinds required to enter `stage`.
pub fn required_for(stage: Stage) -> &'static [DocumentKind] {
    stage.spec().entry_documents
}

/// One produced document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub kind: DocumentKind,
    /// Stage that produced the document.
    pub stage: Stage,
    /// Opaque pointer into the document store.
    pub reference: String,
    pub recorded_at: DateTime<Utc>,
}

/// Kind → record, at most one record per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentTracker {
    records: BTreeMap<DocumentKind, DocumentRecord>,
}

impl DocumentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` (and keeps the first record) when the kind is already present.
    pub fn record(&mut self, record: DocumentRecord) -> bool {
        if self.records.contains_key(&record.kind) {
            return false;
        }
        self.records.insert(record.kind, record);
        true
    }

    pub fn has(&self, kind: DocumentKind) -> bool {
        self.records.contains_key(&kind)
    }

    pub fn get(&self, kind: DocumentKind) -> Option<&DocumentRecord> {
        self.records.get(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = DocumentKind> + '_ {
        self.records.keys().copied()
    }

    pub fn records(&self) -> impl Iterator<Item = &DocumentRecord> + '_ {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Kinds required by `stage` that are neither tracked nor in `incoming`,
    /// in Stage Table order.
    pub fn missing_for(&self, stage: Stage, incoming: &BTreeSet<DocumentKind>) -> Vec<DocumentKind> {
        required_for(stage)
            .iter()
            .copied()
            .filter(|k| !self.has(*k) && !incoming.contains(k))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: DocumentKind, reference: &str) -> DocumentRecord {
        DocumentRecord {
            kind,
            stage: Stage::Registered,
            reference: reference.to_string(),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn recording_twice_keeps_the_first_record() {
        let mut tracker = DocumentTracker::new();
        assert!(tracker.record(record(DocumentKind::Invoice, "s3://a")));
        assert!(!tracker.record(record(DocumentKind::Invoice, "s3://b")));

        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.get(DocumentKind::Invoice).unwrap().reference, "s3://a");
    }

    #[test]
    fn missing_for_accounts_for_incoming_documents() {
        let tracker = DocumentTracker::new();
        assert_eq!(
            tracker.missing_for(Stage::CustomsReview, &BTreeSet::new()),
            vec![DocumentKind::ExportDeclaration]
        );

        let incoming = BTreeSet::from([DocumentKind::ExportDeclaration]);
        assert!(tracker.missing_for(Stage::CustomsReview, &incoming).is_empty());
    }

    #[test]
    fn delivered_requires_nothing() {
        assert!(required_for(Stage::Delivered).is_empty());
        assert_eq!(required_for(Stage::Shipped), &[DocumentKind::BillOfLading]);
    }

    #[test]
    fn kinds_use_kebab_case() {
        let json = serde_json::to_string(&DocumentKind::BillOfLading).unwrap();
        assert_eq!(json, "\"bill-of-lading\"");
        assert_eq!(
            "packing_list".parse::<DocumentKind>().unwrap(),
            DocumentKind::PackingList
        );
        assert!("passport".parse::<DocumentKind>().is_err());
    }
}
