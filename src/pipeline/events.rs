// src/pipeline/events.rs
// Event shapes and the stage state machine for one analysis run

use crate::analysis::AnalysisResult;
use crate::error::{AnalysisError, FailureKind};
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::debug;

/// Pipeline stages, in the only order they may be entered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Started,
    Fetching,
    Diffing,
    Prompting,
    Completed,
    Failed,
}

impl Stage {
    /// The next non-terminal stage, if any
    pub fn successor(self) -> Option<Stage> {
        match self {
            Self::Started => Some(Self::Fetching),
            Self::Fetching => Some(Self::Diffing),
            Self::Diffing => Some(Self::Prompting),
            Self::Prompting | Self::Completed | Self::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// `step` label carried by status events emitted in this stage
    pub fn step(self) -> &'static str {
        match self {
            Self::Started => "start",
            Self::Fetching => "fetch",
            Self::Diffing => "diff",
            Self::Prompting => "llm",
            Self::Completed => "done",
            Self::Failed => "error",
        }
    }
}

/// One observable event. The set is closed: status, result, error.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisEvent {
    Status { step: &'static str, message: String },
    Result(AnalysisResult),
    Error { kind: FailureKind, message: String },
}

impl AnalysisEvent {
    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Result(_) => "result",
            Self::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Status { .. })
    }

    /// SSE data payload
    pub fn data(&self) -> Value {
        match self {
            Self::Status { step, message } => json!({ "step": step, "message": message }),
            Self::Result(result) => serde_json::to_value(result).unwrap_or(Value::Null),
            Self::Error { kind, message } => json!({ "kind": kind, "message": message }),
        }
    }
}

/// Receives intermediate progress lines from a stage
#[async_trait]
pub trait ProgressSink: Send {
    async fn report(&mut self, message: String);
}

#[async_trait]
impl ProgressSink for Vec<String> {
    async fn report(&mut self, message: String) {
        self.push(message);
    }
}

/// Emits events for one run and enforces the stage order.
///
/// `complete` and `fail` consume the stream, so nothing can be sent after the
/// terminal event; dropping the stream closes the channel.
pub struct EventStream {
    tx: mpsc::Sender<AnalysisEvent>,
    stage: Stage,
}

impl EventStream {
    pub fn new(tx: mpsc::Sender<AnalysisEvent>) -> Self {
        Self {
            tx,
            stage: Stage::Started,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    async fn emit(&self, event: AnalysisEvent) {
        if self.tx.send(event).await.is_err() {
            debug!(stage = ?self.stage, "Event receiver gone");
        }
    }

    /// First event of every run
    pub async fn start(&mut self, message: impl Into<String>) {
        self.status(Stage::Started.step(), message.into()).await;
    }

    /// Enter the next stage and announce it
    pub async fn advance(&mut self, next: Stage, message: impl Into<String>) {
        debug_assert_eq!(self.stage.successor(), Some(next), "out-of-order stage");
        self.stage = next;
        self.status(next.step(), message.into()).await;
    }

    /// Informational status inside the current stage
    pub async fn info(&mut self, step: &'static str, message: impl Into<String>) {
        self.status(step, message.into()).await;
    }

    async fn status(&self, step: &'static str, message: String) {
        self.emit(AnalysisEvent::Status { step, message }).await;
    }

    pub async fn complete(mut self, result: AnalysisResult) {
        self.stage = Stage::Completed;
        self.emit(AnalysisEvent::Result(result)).await;
    }

    pub async fn fail(mut self, error: AnalysisError) {
        self.stage = Stage::Failed;
        self.emit(AnalysisEvent::Error {
            kind: error.kind,
            message: error.message,
        })
        .await;
    }
}

#[async_trait]
impl ProgressSink for EventStream {
    async fn report(&mut self, message: String) {
        let step = self.stage.step();
        self.status(step, message).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> AnalysisResult {
        AnalysisResult {
            risk_score: 0,
            breaking_changes: vec![],
            markdown_report: "# ok".into(),
        }
    }

    async fn drain(mut rx: mpsc::Receiver<AnalysisEvent>) -> Vec<AnalysisEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_stage_order() {
        assert_eq!(Stage::Started.successor(), Some(Stage::Fetching));
        assert_eq!(Stage::Prompting.successor(), None);
        assert!(Stage::Failed.is_terminal());
        assert!(!Stage::Diffing.is_terminal());
        assert!(Stage::Started < Stage::Prompting);
    }

    #[tokio::test]
    async fn test_happy_path_sequence() {
        let (tx, rx) = mpsc::channel(16);
        let mut events = EventStream::new(tx);
        events.start("go").await;
        events.advance(Stage::Fetching, "fetching").await;
        events.report("progress".into()).await;
        events.advance(Stage::Diffing, "diffing").await;
        events.advance(Stage::Prompting, "prompting").await;
        events.info("token_alert", "alert").await;
        events.complete(result()).await;

        let got = drain(rx).await;
        let names: Vec<&str> = got.iter().map(|e| e.name()).collect();
        assert_eq!(
            names,
            vec!["status", "status", "status", "status", "status", "status", "result"]
        );
        assert_eq!(got[2].data()["step"], "fetch");
        assert_eq!(got.iter().filter(|e| e.is_terminal()).count(), 1);
        assert!(got.last().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn test_failure_from_any_stage() {
        let (tx, rx) = mpsc::channel(16);
        let mut events = EventStream::new(tx);
        events.start("go").await;
        events.advance(Stage::Fetching, "fetching").await;
        assert_eq!(events.stage(), Stage::Fetching);
        events
            .fail(AnalysisError::ref_not_found("no such tag"))
            .await;

        let got = drain(rx).await;
        assert_eq!(got.len(), 3);
        let last = got.last().unwrap();
        assert_eq!(last.name(), "error");
        assert_eq!(last.data()["kind"], "RefNotFound");
        assert_eq!(last.data()["message"], "no such tag");
    }

    #[test]
    fn test_result_data_uses_wire_names() {
        let data = AnalysisEvent::Result(result()).data();
        assert_eq!(data["riskScore"], 0);
        assert!(data["breakingChanges"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_after_receiver_drop_is_quiet() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut events = EventStream::new(tx);
        events.start("nobody listening").await;
        events.complete(result()).await;
    }
}
