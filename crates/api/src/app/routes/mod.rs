use axum::{Router, routing::get};

pub mod cases;
pub mod companies;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/stages", get(system::stages))
        .route("/stream", get(system::stream))
        .nest("/cases", cases::router())
        .nest("/companies", companies::router())
}
