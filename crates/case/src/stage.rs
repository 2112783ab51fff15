//! The canonical Stage Table.
//!
//! Every dashboard's status vocabulary is a view onto this one pipeline.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use shipline_core::{ActorRole, DomainError};
use shipline_directory::ServiceKind;

use crate::documents::DocumentKind;

/// A named point in the case lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    Registered,
    /// Title de-registration.
    Cancelled,
    CustomsReview,
    CustomsApproved,
    CustomsRejected,
    Shoring,
    Shipped,
    Delivered,
}

/// Static configuration of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageSpec {
    pub stage: Stage,
    pub label: &'static str,
    /// The role that moves a case *into* this stage.
    pub actor: ActorRole,
    /// Document kinds that must be present to enter.
    pub entry_documents: &'static [DocumentKind],
    /// Slot that must be bound to enter.
    pub slot: Option<ServiceKind>,
    /// Where `advance` leads.
    pub advance_to: Option<Stage>,
    /// Where `reject` / `requestModification` lead.
    pub review_to: Option<Stage>,
}

pub const STAGE_TABLE: [StageSpec; 8] = [
    StageSpec {
        stage: Stage::Registered,
        label: "Registered",
        actor: ActorRole::Exporter,
        entry_documents: &[DocumentKind::Registration],
        slot: None,
        advance_to: Some(Stage::Cancelled),
        review_to: None,
    },
    StageSpec {
        stage: Stage::Cancelled,
        label: "Cancelled (title de-registration)",
        actor: ActorRole::Exporter,
        entry_documents: &[DocumentKind::CancellationCertificate],
        slot: None,
        advance_to: Some(Stage::CustomsReview),
        review_to: None,
    },
    StageSpec {
        stage: Stage::CustomsReview,
        label: "Customs review",
        actor: ActorRole::Customs,
        entry_documents: &[DocumentKind::ExportDeclaration],
        slot: Some(ServiceKind::Customs),
        advance_to: Some(Stage::CustomsApproved),
        review_to: Some(Stage::CustomsRejected),
    },
    StageSpec {
        stage: Stage::CustomsApproved,
        label: "Customs approved",
        actor: ActorRole::Customs,
        entry_documents: &[DocumentKind::ApprovalCertificate],
        slot: Some(ServiceKind::Customs),
        advance_to: Some(Stage::Shoring),
        review_to: None,
    },
    StageSpec {
        stage: Stage::CustomsRejected,
        label: "Customs rejected",
        actor: ActorRole::Customs,
        entry_documents: &[DocumentKind::RejectionReason],
        slot: Some(ServiceKind::Customs),
        advance_to: Some(Stage::CustomsReview),
        review_to: None,
    },
    StageSpec {
        stage: Stage::Shoring,
        label: "Shoring",
        actor: ActorRole::Shoring,
        entry_documents: &[DocumentKind::PackingList],
        slot: Some(ServiceKind::Shoring),
        advance_to: Some(Stage::Shipped),
        review_to: None,
    },
    StageSpec {
        stage: Stage::Shipped,
        label: "Shipped",
        actor: ActorRole::Shipping,
        entry_documents: &[DocumentKind::BillOfLading],
        slot: Some(ServiceKind::Shipping),
        advance_to: Some(Stage::Delivered),
        review_to: None,
    },
    StageSpec {
        stage: Stage::Delivered,
        label: "Delivered",
        actor: ActorRole::Buyer,
        entry_documents: &[],
        slot: None,
        advance_to: None,
        review_to: None,
    },
];

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Registered,
        Stage::Cancelled,
        Stage::CustomsReview,
        Stage::CustomsApproved,
        Stage::CustomsRejected,
        Stage::Shoring,
        Stage::Shipped,
        Stage::Delivered,
    ];

    pub fn spec(self) -> &'static StageSpec {
        &STAGE_TABLE[self as usize]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Registered => "Registered",
            Stage::Cancelled => "Cancelled",
            Stage::CustomsReview => "CustomsReview",
            Stage::CustomsApproved => "CustomsApproved",
            Stage::CustomsRejected => "CustomsRejected",
            Stage::Shoring => "Shoring",
            Stage::Shipped => "Shipped",
            Stage::Delivered => "Delivered",
        }
    }

    /// Stages reachable by a normal (non-override) action.
    pub fn allowed_next(self) -> Vec<Stage> {
        let spec = self.spec();
        spec.advance_to.into_iter().chain(spec.review_to).collect()
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }
}

impl core::fmt::Display for Stage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = DomainError;

    /// Accepts `CustomsReview`, `customs_review` and `customs-review` alike.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect();

        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| DomainError::validation(format!("unknown stage '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_stage() {
        for stage in Stage::ALL {
            assert_eq!(stage.spec().stage, stage);
        }
    }

    #[test]
    fn delivered_is_the_only_terminal_stage() {
        let terminal: Vec<Stage> = Stage::ALL.into_iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![Stage::Delivered]);
    }

    #[test]
    fn customs_review_branches_to_approval_or_rejection() {
        assert_eq!(
            Stage::CustomsReview.allowed_next(),
            vec![Stage::CustomsApproved, Stage::CustomsRejected]
        );
        assert_eq!(Stage::CustomsRejected.allowed_next(), vec![Stage::CustomsReview]);
    }

    #[test]
    fn every_stage_is_reachable_from_registered() {
        let mut seen = vec![Stage::Registered];
        let mut frontier = vec![Stage::Registered];
        while let Some(stage) = frontier.pop() {
            for next in stage.allowed_next() {
                if !seen.contains(&next) {
                    seen.push(next);
                    frontier.push(next);
                }
            }
        }
        assert_eq!(seen.len(), Stage::ALL.len());
    }

    #[test]
    fn parses_loose_spellings() {
        assert_eq!("Shipped".parse::<Stage>().unwrap(), Stage::Shipped);
        assert_eq!("customs_review".parse::<Stage>().unwrap(), Stage::CustomsReview);
        assert_eq!("customs-approved".parse::<Stage>().unwrap(), Stage::CustomsApproved);
        assert!("loading".parse::<Stage>().is_err());
    }
}
