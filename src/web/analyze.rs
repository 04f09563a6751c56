// src/web/analyze.rs
// POST /analyze: live SSE stream of one analysis

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use tokio::sync::mpsc;
use tracing::info;

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use crate::pipeline::{AnalysisEvent, AnalysisRequest, EventStream, run_analysis};

/// Events buffered between the pipeline task and the HTTP stream
const EVENT_BUFFER: usize = 32;

/// Request body. Fields are optional here so missing ones become a 422 with a clear message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeBody {
    pub repo_url: Option<String>,
    pub from_ref: Option<String>,
    pub to_ref: Option<String>,
    pub github_token: Option<String>,
}

/// `event: <name>` plus a single-line JSON `data:` field
fn to_sse(event: &AnalysisEvent) -> Event {
    Event::default().event(event.name()).data(event.data().to_string())
}

/// Streaming analysis endpoint
pub async fn analyze(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeBody>, JsonRejection>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let Json(body) = body.map_err(|e| ApiError::unprocessable_entity(e.body_text()))?;
    let request =
        AnalysisRequest::new(body.repo_url, body.from_ref, body.to_ref, body.github_token)?;

    let (tx, mut rx) = mpsc::channel::<AnalysisEvent>(EVENT_BUFFER);
    let ctx = state.analysis_context();
    let events = EventStream::new(tx.clone());

    // The pipeline runs in its own task; it is dropped (and its workspace removed)
    // as soon as the client goes away.
    tokio::spawn(async move {
        tokio::select! {
            _ = run_analysis(ctx, request, events) => {}
            _ = tx.closed() => {
                info!("Client disconnected, analysis aborted");
            }
        }
    });

    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            let terminal = event.is_terminal();
            yield Ok(to_sse(&event));
            if terminal {
                break;
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
