use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
};

use shipline_case::CaseId;

use crate::app::{
    dto, errors,
    services::{self, AppServices},
};
use crate::context::PrincipalContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "principal_id": principal.principal_id().to_string(),
        "role": principal.role(),
        "company_id": principal.company_id().map(|c| c.to_string()),
    }))
}

pub async fn stages() -> impl IntoResponse {
    Json(dto::stage_table_json())
}

pub async fn stream(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::StreamQuery>,
) -> axum::response::Response {
    let case_id = match query.case_id.as_deref().map(errors::parse::<CaseId>).transpose() {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    services::case_sse_stream(services, case_id).into_response()
}

