// tests/config_api.rs
// Health, config and token-usage endpoints

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::{Value, json};
use upgradesage::config::CONFIG_FILE_NAME;
use upgradesage::web::state::AppState;

fn parse(body: &str) -> Value {
    serde_json::from_str(body).unwrap()
}

#[tokio::test]
async fn test_health() {
    let cfg = tempfile::tempdir().unwrap();
    let state = AppState::new(store_with(&cfg, None), None);

    let (status, body) = send(router(state), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    let body = parse(&body);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_get_config_defaults() {
    let cfg = tempfile::tempdir().unwrap();
    let state = AppState::new(store_with(&cfg, None), None);

    let (status, body) = send(router(state), get("/config")).await;

    assert_eq!(status, StatusCode::OK);
    let body = parse(&body);
    assert!(body["github_token"].is_null());
    assert_eq!(body["token_usage_threshold"], 80);
    assert_eq!(body["include_migration_paths"], true);
}

#[tokio::test]
async fn test_config_never_returns_the_credential() {
    let cfg = tempfile::tempdir().unwrap();
    let state = AppState::new(
        store_with(&cfg, Some(json!({"github_token": "ghp_secret_value"}))),
        None,
    );

    let (_, body) = send(router(state), get("/config")).await;

    assert!(!body.contains("ghp_secret_value"));
    assert!(parse(&body)["github_token"].is_string());
}

#[tokio::test]
async fn test_update_config_persists_and_reloads() {
    let cfg = tempfile::tempdir().unwrap();
    let state = AppState::new(store_with(&cfg, None), None);
    let app = router(state);

    let (status, body) = send(
        app.clone(),
        post_json(
            "/config",
            json!({
                "github_token": "ghp_new",
                "include_migration_paths": false,
                "token_usage_threshold": 150,
                "colour": "blue"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = parse(&body);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["warnings"].as_array().unwrap().len(), 2);
    assert_eq!(body["config"]["include_migration_paths"], false);
    assert_eq!(body["config"]["token_usage_threshold"], 100);
    assert!(!body.to_string().contains("ghp_new"));

    // Only the accepted fields reach disk
    let saved = parse(&std::fs::read_to_string(cfg.path().join(CONFIG_FILE_NAME)).unwrap());
    assert_eq!(saved["github_token"], "ghp_new");
    assert_eq!(saved["include_migration_paths"], false);
    assert!(saved.get("colour").is_none());
    assert_eq!(saved["token_usage_threshold"], 100);

    let (_, startup) = send(app, get("/config/startup")).await;
    let startup = parse(&startup);
    assert_eq!(startup["config_loaded"], true);
    assert_eq!(startup["github_token_configured"], true);
    assert_eq!(startup["settings"]["include_migration_paths"], false);
}

#[tokio::test]
async fn test_update_config_requires_object() {
    let cfg = tempfile::tempdir().unwrap();
    let state = AppState::new(store_with(&cfg, None), None);

    let (status, _) = send(router(state), post_json("/config", json!([1, 2, 3]))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(!cfg.path().join(CONFIG_FILE_NAME).exists());
}

#[tokio::test]
async fn test_startup_check_without_record() {
    let cfg = tempfile::tempdir().unwrap();
    let state = AppState::new(store_with(&cfg, None), None);

    let (_, body) = send(router(state), get("/config/startup")).await;

    let body = parse(&body);
    assert_eq!(body["config_loaded"], false);
    assert_eq!(body["config_path"], "Using defaults");
    assert_eq!(body["github_token_configured"], false);
    assert_eq!(body["github_token_from_env"], false);
}

#[tokio::test]
async fn test_token_usage_starts_at_zero() {
    let cfg = tempfile::tempdir().unwrap();
    let state = AppState::new(store_with(&cfg, None), None);
    let usage = state.usage.clone();
    let app = router(state);

    let (_, body) = send(app.clone(), get("/config/token-usage")).await;
    let body = parse(&body);
    assert_eq!(body["usage"]["total_tokens"], 0);
    assert_eq!(body["alert"], false);

    usage.record(100_000, 5_000);
    let (_, body) = send(app, get("/config/token-usage")).await;
    let body = parse(&body);
    assert_eq!(body["usage"]["total_tokens"], 105_000);
    assert_eq!(body["usage"]["requests_count"], 1);
    assert_eq!(body["alert"], true);
}
