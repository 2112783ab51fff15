//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: registry, audit log, directory and bus wiring
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router with fresh in-memory services.
pub async fn build_app(config: &ApiConfig) -> std::io::Result<Router> {
    let services = services::build_services(config)?;
    Ok(router(config, Arc::new(services)))
}

/// Router over existing services (lets `main` keep a handle for workers).
pub fn router(config: &ApiConfig, services: Arc<AppServices>) -> Router {
    let jwt = Arc::new(shipline_auth::Hs256JwtValidator::new(config.jwt_secret.as_bytes()));
    let auth_state = middleware::AuthState { jwt };

    // Protected routes: require a valid bearer token.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
