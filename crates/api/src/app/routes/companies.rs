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
use shipline_core::DomainError;
use shipline_directory::{CompanyDirectory, CompanyId, NewCompany};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz::authorize_endpoint;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_company).get(list_companies))
        .route("/:id", get(get_company))
}

pub async fn register_company(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<NewCompany>,
) -> axum::response::Response {
    if let Err(e) = authorize_endpoint(&principal, &Permission::DIRECTORY_WRITE) {
        return errors::forbidden(e);
    }

    match services.registry().directory().register(body) {
        Ok(company) => {
            tracing::info!(company_id = %company.id, service = %company.service, "company registered");
            (StatusCode::CREATED, Json(company)).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list_companies(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::ListCompaniesQuery>,
) -> axum::response::Response {
    if let Err(e) = authorize_endpoint(&principal, &Permission::DIRECTORY_READ) {
        return errors::forbidden(e);
    }
    let filter = match query.into_filter() {
        Ok(f) => f,
        Err(resp) => return resp,
    };

    let items = services.registry().directory().list(&filter);
    (StatusCode::OK, Json(json!({ "items": items }))).into_response()
}

pub async fn get_company(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = authorize_endpoint(&principal, &Permission::DIRECTORY_READ) {
        return errors::forbidden(e);
    }
    let company_id: CompanyId = match errors::parse(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.registry().directory().get(company_id) {
        Some(company) => (StatusCode::OK, Json(company)).into_response(),
        None => errors::domain_error_to_response(DomainError::not_found(format!("company {company_id}"))),
    }
}
