//! HTTP router
//!
//! Returns a composable `Router`; `app::run_server` binds and serves it.

use axum::routing::{get, post};
use axum::Router;

use crate::api::handlers;
use crate::api::types::ApiContext;

pub fn build_router(ctx: ApiContext) -> Router {
    Router::new()
        .route("/start_job", post(handlers::start_job))
        .route("/status", get(handlers::status))
        .route("/availability", get(handlers::availability))
        .route("/input_schema", get(handlers::input_schema))
        .route("/health", get(handlers::health))
        .with_state(ctx)
}

/// Routes, for the startup log
pub const ENDPOINTS: &[(&str, &str)] = &[
    ("POST", "/start_job"),
    ("GET", "/status"),
    ("GET", "/availability"),
    ("GET", "/input_schema"),
    ("GET", "/health"),
];
