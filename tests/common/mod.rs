// tests/common/mod.rs
// Shared helpers for the HTTP-level tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{Router, body::Body, http::Request};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use upgradesage::config::{CONFIG_FILE_NAME, ConfigLocation, ConfigResolver, ConfigStore, EnvOverrides};
use upgradesage::llm::{ChatResult, LlmClient, Message, Provider, Usage};
use upgradesage::web::{create_router, state::AppState};

pub const GOOD_REPLY: &str = r##"{"riskScore": 40, "breakingChanges": [{"title": "connect() now requires a port", "details": "callers must pass a port", "mitigations": ["pass 443 explicitly"]}], "markdownReport": "# Breaking changes\n\n- connect() signature"}"##;

/// Model double: replays canned replies, optionally after a delay
pub struct MockModel {
    replies: Mutex<VecDeque<String>>,
    delay: Duration,
    pub calls: Mutex<Vec<Vec<Message>>>,
}

impl MockModel {
    pub fn replying(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn stalled(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            delay,
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LlmClient for MockModel {
    async fn chat(&self, messages: Vec<Message>) -> anyhow::Result<ChatResult> {
        self.calls.lock().push(messages);
        tokio::time::sleep(self.delay).await;
        let reply = self
            .replies
            .lock()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("mock model has no reply left"))?;
        Ok(ChatResult {
            request_id: "mock".into(),
            content: Some(reply),
            usage: Some(Usage {
                prompt_tokens: 1_000,
                completion_tokens: 200,
                total_tokens: 1_200,
            }),
            duration_ms: 5,
        })
    }

    fn provider_type(&self) -> Provider {
        Provider::OpenAiCompatible
    }

    fn model_name(&self) -> String {
        "mock-model".into()
    }
}

/// Config store backed by a record in a fresh temp dir
pub fn store_with(dir: &TempDir, record: Option<Value>) -> Arc<ConfigStore> {
    let path = dir.path().join(CONFIG_FILE_NAME);
    if let Some(record) = record {
        std::fs::write(&path, record.to_string()).unwrap();
    }
    Arc::new(ConfigStore::new(ConfigResolver::new(
        ConfigLocation::explicit(path),
        EnvOverrides::default(),
    )))
}

pub fn router(state: AppState) -> Router {
    create_router(state)
}

pub async fn send(app: Router, request: Request<Body>) -> (axum::http::StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// One parsed server-sent event
#[derive(Debug)]
pub struct SseEvent {
    pub name: String,
    pub data: Value,
}

/// Split a complete SSE body into events, skipping keep-alive comments
pub fn parse_sse(body: &str) -> Vec<SseEvent> {
    body.split("\n\n")
        .filter_map(|block| {
            let mut name = None;
            let mut data = String::new();
            for line in block.lines() {
                if let Some(v) = line.strip_prefix("event:") {
                    name = Some(v.trim().to_string());
                } else if let Some(v) = line.strip_prefix("data:") {
                    data.push_str(v.trim_start());
                }
            }
            let name = name?;
            Some(SseEvent {
                name,
                data: serde_json::from_str(&data).unwrap_or(Value::String(data)),
            })
        })
        .collect()
}

pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
        .args(["-c", "commit.gpgsign=false", "-c", "tag.gpgsign=false"])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Local origin with tags v1 and v2 that differ in one signature
pub fn origin_repo() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path();
    git(p, &["init", "-q"]);
    std::fs::write(p.join("client.rs"), "pub fn connect(host: &str) {}\n").unwrap();
    git(p, &["add", "."]);
    git(p, &["commit", "-q", "-m", "v1"]);
    git(p, &["tag", "v1"]);
    std::fs::write(
        p.join("client.rs"),
        "pub fn connect(host: &str, port: u16) {}\n",
    )
    .unwrap();
    git(p, &["commit", "-q", "-am", "v2"]);
    git(p, &["tag", "v2"]);
    dir
}

pub fn file_url(dir: &Path) -> String {
    format!("file://{}", dir.display())
}

/// An HTTP remote that accepts connections and never answers.
///
/// Returns the listener's `host:port`; accepted sockets stay open until the runtime ends.
pub async fn silent_remote() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr.to_string()
}

pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
