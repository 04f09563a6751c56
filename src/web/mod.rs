// src/web/mod.rs
// HTTP layer: router, handlers, error mapping

pub mod analyze;
pub mod config;
pub mod error;
pub mod state;

use axum::{
    Json, Router,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::web::state::AppState;

/// Liveness probe
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Create the web server router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/analyze", post(analyze::analyze))
        .route("/config", get(config::get_config).post(config::update_config))
        .route("/config/startup", get(config::get_startup))
        .route("/config/token-usage", get(config::get_token_usage))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
