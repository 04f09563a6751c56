// src/web/config.rs
// Config and token-usage endpoints

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde_json::{Value, json};
use tracing::info;

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use crate::config::{EffectiveConfig, StartupCheck};
use crate::usage::UsageSnapshot;

/// GET /config - effective config, credential masked
pub async fn get_config(State(state): State<AppState>) -> Json<EffectiveConfig> {
    Json(state.config.current().config.clone())
}

/// POST /config - merge a partial record into the user config, then reload
pub async fn update_config(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body.map_err(|e| ApiError::unprocessable_entity(e.body_text()))?;
    let Value::Object(partial) = body else {
        return Err(ApiError::unprocessable_entity(
            "config update must be a JSON object",
        ));
    };

    let store = state.config.clone();
    let (resolved, warnings) = tokio::task::spawn_blocking(move || store.update(&partial))
        .await
        .map_err(|e| ApiError::internal(format!("config update task failed: {}", e)))??;

    info!(warnings = warnings.len(), "Configuration updated");
    Ok(Json(json!({
        "status": "ok",
        "message": "Configuration updated successfully",
        "warnings": warnings,
        "config": resolved.config,
    })))
}

/// GET /config/startup - where the config came from and what it enables
pub async fn get_startup(State(state): State<AppState>) -> Json<StartupCheck> {
    Json(state.config.current().startup_check())
}

/// GET /config/token-usage - process-lifetime counters and alert state
pub async fn get_token_usage(State(state): State<AppState>) -> Json<UsageSnapshot> {
    let config = state.config.current();
    Json(state.usage.snapshot(&config.config))
}
