use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use shipline_auth::Permission;
use shipline_case::{CaseId, DocumentKind, Stage};
use shipline_core::{DomainError, ExpectedVersion};
use shipline_directory::{CompanyId, ServiceKind};
use shipline_infra::NewCase;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz::authorize_endpoint;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_case).get(list_cases))
        .route("/:id", get(get_case))
        .route("/:id/transition", post(transition_case))
        .route("/:id/admin-override", post(admin_override))
        .route("/:id/assignment", post(assign_company))
        .route("/:id/assignments/:slot", get(get_assignment))
        .route("/:id/documents", get(list_documents).post(record_document))
        .route("/:id/audit", get(get_audit))
        .route("/:id/verify", get(verify_case))
}

pub async fn create_case(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<NewCase>,
) -> axum::response::Response {
    if let Err(e) = authorize_endpoint(&principal, &Permission::CASE_CREATE) {
        return errors::forbidden(e);
    }

    match services.registry().create(body) {
        Ok(case) => (StatusCode::CREATED, Json(dto::case_to_json(&case))).into_response(),
        Err(e) => errors::registry_error_to_response(e),
    }
}

pub async fn list_cases(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::ListCasesQuery>,
) -> axum::response::Response {
    if let Err(e) = authorize_endpoint(&principal, &Permission::CASE_READ) {
        return errors::forbidden(e);
    }

    let (filter, pagination) = match query.into_parts() {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let listing = match services
        .registry()
        .list(&filter)
        .and_then(|listing| listing.collect::<Result<Vec<_>, _>>())
    {
        Ok(cases) => cases,
        Err(e) => return errors::registry_error_to_response(e),
    };

    let page = pagination.paginate(listing);
    (
        StatusCode::OK,
        Json(json!({
            "items": page.items.iter().map(dto::case_to_json).collect::<Vec<_>>(),
            "total": page.total,
            "limit": page.pagination.limit,
            "offset": page.pagination.offset,
            "has_more": page.has_more,
        })),
    )
        .into_response()
}

pub async fn get_case(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = authorize_endpoint(&principal, &Permission::CASE_READ) {
        return errors::forbidden(e);
    }
    let case_id: CaseId = match errors::parse(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.registry().get(case_id) {
        Ok(case) => (StatusCode::OK, Json(dto::case_to_json(&case))).into_response(),
        Err(e) => errors::registry_error_to_response(e),
    }
}

pub async fn transition_case(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::TransitionRequest>,
) -> axum::response::Response {
    if let Err(e) = authorize_endpoint(&principal, &Permission::CASE_TRANSITION) {
        return errors::forbidden(e);
    }
    let case_id: CaseId = match errors::parse(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Some(claimed) = body.actor_role.filter(|r| *r != principal.role()) {
        return errors::domain_error_to_response(DomainError::unauthorized(format!(
            "token role '{}' cannot act as '{claimed}'",
            principal.role()
        )));
    }

    let expected = ExpectedVersion::from(body.expected_version);
    let (action, evidence) = match body.into_action() {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .registry()
        .transition(case_id, principal.actor(), action, evidence, expected)
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "case": dto::case_to_json(&outcome.case),
                "entry": outcome.entry,
            })),
        )
            .into_response(),
        Err(e) => errors::registry_error_to_response(e),
    }
}

pub async fn admin_override(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::AdminOverrideRequest>,
) -> axum::response::Response {
    if let Err(e) = authorize_endpoint(&principal, &Permission::CASE_OVERRIDE) {
        return errors::forbidden(e);
    }
    let case_id: CaseId = match errors::parse(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let target: Stage = match errors::parse(&body.target_stage) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.registry().admin_override(
        case_id,
        principal.actor(),
        target,
        body.note,
        ExpectedVersion::from(body.expected_version),
    ) {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "case": dto::case_to_json(&outcome.case),
                "entry": outcome.entry,
            })),
        )
            .into_response(),
        Err(e) => errors::registry_error_to_response(e),
    }
}

pub async fn assign_company(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::AssignmentRequest>,
) -> axum::response::Response {
    if let Err(e) = authorize_endpoint(&principal, &Permission::CASE_ASSIGN) {
        return errors::forbidden(e);
    }
    let case_id: CaseId = match errors::parse(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let slot: ServiceKind = match errors::parse(&body.slot) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let company_id: CompanyId = match errors::parse(&body.company_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let registry = services.registry();
    let result = match body.reassign_reason {
        Some(reason) => registry.reassign(case_id, principal.actor(), slot, company_id, reason),
        None => registry.assign(case_id, principal.actor(), slot, company_id),
    };

    match result.and_then(|entry| Ok((entry, registry.get(case_id)?))) {
        Ok((entry, case)) => (
            StatusCode::OK,
            Json(json!({
                "case": dto::case_to_json(&case),
                "entry": entry,
            })),
        )
            .into_response(),
        Err(e) => errors::registry_error_to_response(e),
    }
}

pub async fn get_assignment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, slot)): Path<(String, String)>,
) -> axum::response::Response {
    if let Err(e) = authorize_endpoint(&principal, &Permission::CASE_READ) {
        return errors::forbidden(e);
    }
    let case_id: CaseId = match errors::parse(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let slot: ServiceKind = match errors::parse(&slot) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.registry().assigned_company(case_id, slot) {
        Ok(company) => (StatusCode::OK, Json(json!({ "slot": slot, "company": company }))).into_response(),
        Err(e) => errors::registry_error_to_response(e),
    }
}

pub async fn list_documents(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = authorize_endpoint(&principal, &Permission::CASE_READ) {
        return errors::forbidden(e);
    }
    let case_id: CaseId = match errors::parse(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.registry().get(case_id) {
        Ok(case) => {
            let items = case.documents().records().cloned().collect::<Vec<_>>();
            (StatusCode::OK, Json(json!({ "items": items }))).into_response()
        }
        Err(e) => errors::registry_error_to_response(e),
    }
}

pub async fn record_document(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::RecordDocumentRequest>,
) -> axum::response::Response {
    if let Err(e) = authorize_endpoint(&principal, &Permission::DOCUMENTS_RECORD) {
        return errors::forbidden(e);
    }
    let case_id: CaseId = match errors::parse(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let kind: DocumentKind = match errors::parse(&body.kind) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .registry()
        .record_document(case_id, principal.actor(), kind, body.reference)
    {
        Ok(outcome) => {
            let status = if outcome.recorded {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, Json(outcome)).into_response()
        }
        Err(e) => errors::registry_error_to_response(e),
    }
}

pub async fn get_audit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = authorize_endpoint(&principal, &Permission::AUDIT_READ) {
        return errors::forbidden(e);
    }
    let case_id: CaseId = match errors::parse(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.registry().audit(case_id) {
        Ok(entries) => (StatusCode::OK, Json(json!({ "items": entries }))).into_response(),
        Err(e) => errors::registry_error_to_response(e),
    }
}

pub async fn verify_case(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = authorize_endpoint(&principal, &Permission::AUDIT_READ) {
        return errors::forbidden(e);
    }
    let case_id: CaseId = match errors::parse(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.registry().verify(case_id) {
        Ok(verification) => (StatusCode::OK, Json(verification)).into_response(),
        Err(e) => errors::registry_error_to_response(e),
    }
}
