use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

use shipline_case::{Action, Evidence, ExportCase, NewDocument, STAGE_TABLE, Stage};
use shipline_core::{ActorRole, AggregateRoot};
use shipline_directory::{CompanyFilter, Rating, ServiceKind};
use shipline_infra::{CaseFilter, Pagination};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

/// `POST /cases/:id/transition`.
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    /// `advance`, `reject` or `request_modification`.
    pub action: String,
    /// Must match the authenticated role when given.
    #[serde(default)]
    pub actor_role: Option<ActorRole>,
    #[serde(default)]
    pub expected_version: Option<u64>,
    #[serde(default)]
    pub new_documents: Vec<NewDocument>,
    #[serde(default)]
    pub note: Option<String>,
}

impl TransitionRequest {
    /// Split into the case action and its evidence.
    ///
    /// For reject and request_modification the note is the reason and is
    /// required by the case rules; an absent note is passed through as empty.
    pub fn into_action(self) -> Result<(Action, Evidence), axum::response::Response> {
        let evidence = Evidence {
            new_documents: self.new_documents,
            note: None,
        };

        let action = match self.action.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "advance" | "approve" => {
                return Ok((
                    Action::Advance,
                    Evidence {
                        note: self.note,
                        ..evidence
                    },
                ));
            }
            "reject" => Action::Reject {
                reason: self.note.unwrap_or_default(),
            },
            "request_modification" | "requestmodification" => Action::RequestModification {
                notes: self.note.unwrap_or_default(),
            },
            _ => {
                return Err(errors::json_error(
                    axum::http::StatusCode::BAD_REQUEST,
                    "validation_error",
                    "action must be one of: advance, reject, request_modification",
                ));
            }
        };

        Ok((action, evidence))
    }
}

/// `POST /cases/:id/assignment`.
#[derive(Debug, Deserialize)]
pub struct AssignmentRequest {
    pub slot: String,
    pub company_id: String,
    /// Present → rebind an occupied slot.
    #[serde(default)]
    pub reassign_reason: Option<String>,
}

/// `POST /cases/:id/documents`.
#[derive(Debug, Deserialize)]
pub struct RecordDocumentRequest {
    pub kind: String,
    pub reference: String,
}

/// `POST /cases/:id/admin-override`.
#[derive(Debug, Deserialize)]
pub struct AdminOverrideRequest {
    pub target_stage: String,
    pub note: String,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

/// `GET /cases` query string.
#[derive(Debug, Default, Deserialize)]
pub struct ListCasesQuery {
    pub stage: Option<String>,
    pub assigned_company: Option<String>,
    pub buyer_country: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListCasesQuery {
    pub fn into_parts(self) -> Result<(CaseFilter, Pagination), axum::response::Response> {
        let stage = self.stage.as_deref().map(errors::parse::<Stage>).transpose()?;
        let assigned_company = self.assigned_company.as_deref().map(errors::parse).transpose()?;
        let buyer_country = self.buyer_country.filter(|c| !c.trim().is_empty());

        Ok((
            CaseFilter {
                stage,
                assigned_company,
                buyer_country,
            },
            Pagination::new(self.limit, self.offset),
        ))
    }
}

/// `GET /companies` query string.
#[derive(Debug, Default, Deserialize)]
pub struct ListCompaniesQuery {
    pub service: Option<String>,
    pub specialty: Option<String>,
    pub min_rating: Option<f32>,
}

impl ListCompaniesQuery {
    pub fn into_filter(self) -> Result<CompanyFilter, axum::response::Response> {
        let service = self.service.as_deref().map(errors::parse::<ServiceKind>).transpose()?;
        let min_rating = self
            .min_rating
            .map(Rating::try_from)
            .transpose()
            .map_err(errors::domain_error_to_response)?;

        Ok(CompanyFilter {
            service,
            specialty: self.specialty,
            min_rating,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    pub case_id: Option<String>,
}

// -------------------------
// Response mapping
// -------------------------

pub fn case_to_json(case: &ExportCase) -> JsonValue {
    json!({
        "id": case.id_typed().to_string(),
        "stage": case.stage(),
        "stage_label": case.stage().spec().label,
        "version": case.version(),
        "vehicle": case.vehicle(),
        "buyer": case.buyer(),
        "assignments": case.assignments(),
        "documents": case.documents().records().collect::<Vec<_>>(),
        "history": case.history(),
        "allowed_next": case.stage().allowed_next(),
        "terminal": case.is_terminal(),
        "created_at": case.created_at(),
        "updated_at": case.updated_at(),
    })
}

/// The canonical pipeline, one row per stage.
pub fn stage_table_json() -> JsonValue {
    let stages = STAGE_TABLE
        .iter()
        .map(|spec| {
            json!({
                "stage": spec.stage,
                "label": spec.label,
                "actor": spec.actor,
                "entry_documents": spec.entry_documents,
                "slot": spec.slot,
                "allowed_next": spec.stage.allowed_next(),
                "terminal": spec.stage.is_terminal(),
            })
        })
        .collect::<Vec<_>>();

    json!({ "stages": stages })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(action: &str, note: Option<&str>) -> TransitionRequest {
        TransitionRequest {
            action: action.to_string(),
            actor_role: None,
            expected_version: None,
            new_documents: vec![],
            note: note.map(str::to_string),
        }
    }

    #[test]
    fn reject_note_becomes_the_reason() {
        let (action, evidence) = request("reject", Some("문서 누락")).into_action().unwrap();
        assert_eq!(
            action,
            Action::Reject {
                reason: "문서 누락".to_string()
            }
        );
        assert_eq!(evidence.note, None);
    }

    #[test]
    fn advance_keeps_the_note_as_evidence() {
        let (action, evidence) = request("Advance", Some("all good")).into_action().unwrap();
        assert_eq!(action, Action::Advance);
        assert_eq!(evidence.note.as_deref(), Some("all good"));
    }

    #[test]
    fn kebab_case_actions_are_accepted() {
        let (action, _) = request("request-modification", Some("fix vin")).into_action().unwrap();
        assert!(matches!(action, Action::RequestModification { .. }));
    }

    #[test]
    fn unknown_actions_are_bad_requests() {
        let err = request("teleport", None).into_action().unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn stage_table_lists_every_stage() {
        let table = stage_table_json();
        assert_eq!(table["stages"].as_array().unwrap().len(), Stage::ALL.len());
        assert_eq!(table["stages"][0]["stage"], "Registered");
    }
}
