// src/pipeline/run.rs
// One analysis run: fetch, diff, prompt, with events after every stage

use super::events::{EventStream, Stage};
use crate::analysis::{AnalysisResult, PromptOrchestrator};
use crate::config::ResolvedConfig;
use crate::error::AnalysisError;
use crate::git::{DiffExtractor, SnapshotFetcher, display_url, validate_ref};
use crate::llm::LlmClient;
use crate::usage::TokenUsageTracker;
use crate::utils::format_secs;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Span, info, instrument, warn};
use uuid::Uuid;

/// A validated analysis request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub repo_url: String,
    pub from_ref: String,
    pub to_ref: String,
    /// Per-request repository credential; wins over the configured one
    pub credential: Option<String>,
}

impl AnalysisRequest {
    /// Build from raw fields, rejecting missing or unusable values
    pub fn new(
        repo_url: Option<String>,
        from_ref: Option<String>,
        to_ref: Option<String>,
        credential: Option<String>,
    ) -> Result<Self, AnalysisError> {
        let required = |value: Option<String>, field: &str| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AnalysisError::malformed(format!("'{}' is required", field)))
        };

        let request = Self {
            repo_url: required(repo_url, "repoUrl")?,
            from_ref: required(from_ref, "fromRef")?,
            to_ref: required(to_ref, "toRef")?,
            credential: credential.filter(|c| !c.trim().is_empty()),
        };

        for r in [&request.from_ref, &request.to_ref] {
            validate_ref(r).map_err(AnalysisError::malformed)?;
        }
        if request.repo_url.starts_with('-') {
            return Err(AnalysisError::malformed(format!(
                "invalid repoUrl '{}'",
                request.repo_url
            )));
        }
        Ok(request)
    }
}

/// Everything one run needs, captured when the request arrives
#[derive(Clone)]
pub struct AnalysisContext {
    /// Config snapshot; later reloads do not affect this run
    pub config: Arc<ResolvedConfig>,
    pub fetcher: SnapshotFetcher,
    pub llm: Option<Arc<dyn LlmClient>>,
    pub usage: Arc<TokenUsageTracker>,
}

/// Run one analysis to completion, sending exactly one terminal event.
///
/// Dropping the returned future (caller disconnect) stops the run at its next
/// suspension point; the snapshot workspace is released on drop.
#[instrument(skip_all, fields(request_id, repo = %display_url(&request.repo_url), from = %request.from_ref, to = %request.to_ref))]
pub async fn run_analysis(ctx: AnalysisContext, request: AnalysisRequest, mut events: EventStream) {
    let request_id = Uuid::new_v4().to_string();
    Span::current().record("request_id", request_id.as_str());
    let started = Instant::now();

    match execute(&ctx, &request, &mut events, started).await {
        Ok(result) => {
            info!(
                risk_score = result.risk_score,
                duration_ms = started.elapsed().as_millis() as u64,
                "Analysis complete"
            );
            events.complete(result).await;
        }
        Err(e) => {
            warn!(kind = %e.kind, stage = ?events.stage(), error = %e.message, "Analysis failed");
            events.fail(e).await;
        }
    }
}

async fn execute(
    ctx: &AnalysisContext,
    request: &AnalysisRequest,
    events: &mut EventStream,
    started: Instant,
) -> Result<AnalysisResult, AnalysisError> {
    let config = &ctx.config.config;

    events
        .start(format!(
            "Starting analysis: {}  {} → {}",
            display_url(&request.repo_url),
            request.from_ref,
            request.to_ref
        ))
        .await;

    if config.show_startup_check {
        events
            .info("config", format!("Config: {}", ctx.config.describe_source()))
            .await;
    }
    for warning in &ctx.config.source.warnings {
        events
            .info("config", format!("Config warning: {}", warning))
            .await;
    }

    let orchestrator = match ctx.llm {
        Some(ref client) => PromptOrchestrator::new(client.clone(), ctx.usage.clone()),
        None => {
            return Err(AnalysisError::model_unavailable(
                "no model endpoint configured (set AZURE_AI_FOUNDRY_ENDPOINT and \
                 AZURE_AI_FOUNDRY_API_KEY, or OPENAI_API_KEY)",
            ));
        }
    };

    // Fetch
    events
        .advance(Stage::Fetching, format!("Fetching {} …", display_url(&request.repo_url)))
        .await;
    let credential = request
        .credential
        .as_deref()
        .or(config.github_token.as_deref());
    let snapshot = ctx
        .fetcher
        .fetch(
            &request.repo_url,
            &request.from_ref,
            &request.to_ref,
            credential,
            config.fetch_timeout(),
            events,
        )
        .await?;

    // Diff
    events.advance(Stage::Diffing, "Computing diff …").await;
    let diff_started = Instant::now();
    let extracted = DiffExtractor::new(config.max_diff_chars, config.diff_timeout())
        .extract(&snapshot)
        .await;
    snapshot.cleanup();
    let diff = extracted?;

    if diff.is_empty() {
        events
            .info(
                "diff",
                format!(
                    "No diff output ({}): refs point to the same content",
                    format_secs(diff_started.elapsed())
                ),
            )
            .await;
    } else {
        events
            .info(
                "diff",
                format!(
                    "Diff ready: {} file(s), +{} / -{} lines, {} chars ({})",
                    diff.stats.files_changed,
                    diff.stats.lines_added,
                    diff.stats.lines_removed,
                    diff.original_len,
                    format_secs(diff_started.elapsed())
                ),
            )
            .await;
    }
    if diff.truncated {
        events
            .info(
                "diff",
                format!(
                    "Diff truncated to its first {} of {} characters; later changes will not be analysed",
                    diff.truncated_len, diff.original_len
                ),
            )
            .await;
    }

    // Prompt
    let message = if diff.is_empty() {
        "No changes to analyse; skipping model call".to_string()
    } else {
        let note = if diff.truncated { " (truncated)" } else { "" };
        format!("Sending diff to {}{} …", orchestrator.model_name(), note)
    };
    events.advance(Stage::Prompting, message).await;

    let outcome = orchestrator.analyze(&diff, config).await?;
    if outcome.model_calls > 0 {
        events
            .info(
                "llm",
                format!(
                    "Model responded ({}, prompt={}, completion={}{})",
                    format_secs(outcome.duration),
                    outcome.usage.prompt_tokens,
                    outcome.usage.completion_tokens,
                    if outcome.model_calls > 1 {
                        format!(", {} calls", outcome.model_calls)
                    } else {
                        String::new()
                    }
                ),
            )
            .await;
    }

    if let Some(alert) = ctx.usage.snapshot(config).alert_message() {
        events.info("token_alert", alert).await;
    }

    events
        .info(
            "done",
            format!("Analysis complete in {}", format_secs(started.elapsed())),
        )
        .await;

    Ok(outcome.result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_requires_fields() {
        let err = AnalysisRequest::new(None, Some("a".into()), Some("b".into()), None).unwrap_err();
        assert_eq!(err.kind, crate::error::FailureKind::RequestMalformed);
        assert!(err.message.contains("repoUrl"));

        let err = AnalysisRequest::new(
            Some("https://github.com/a/b".into()),
            Some("  ".into()),
            Some("b".into()),
            None,
        )
        .unwrap_err();
        assert!(err.message.contains("fromRef"));
    }

    #[test]
    fn test_request_rejects_flag_like_values() {
        let err = AnalysisRequest::new(
            Some("https://github.com/a/b".into()),
            Some("--upload-pack=x".into()),
            Some("v2".into()),
            None,
        )
        .unwrap_err();
        assert_eq!(err.kind, crate::error::FailureKind::RequestMalformed);

        assert!(
            AnalysisRequest::new(Some("-c".into()), Some("a".into()), Some("b".into()), None)
                .is_err()
        );
    }

    #[test]
    fn test_request_trims_and_drops_blank_credential() {
        let req = AnalysisRequest::new(
            Some(" https://github.com/a/b ".into()),
            Some("v1".into()),
            Some("v2".into()),
            Some("".into()),
        )
        .unwrap();
        assert_eq!(req.repo_url, "https://github.com/a/b");
        assert!(req.credential.is_none());
    }
}
