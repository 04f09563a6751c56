// src/analysis/orchestrator.rs
// Prompt, model call, validation with corrective retry, usage accounting

use super::types::AnalysisResult;
use super::validate::{ValidationRules, validate_response};
use crate::config::EffectiveConfig;
use crate::error::AnalysisError;
use crate::git::DiffPayload;
use crate::llm::{ChatResult, LlmClient, Message, PromptBuilder, Usage};
use crate::usage::TokenUsageTracker;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Marker appended to a truncated diff inside the prompt
const TRUNCATION_MARKER: &str = "\n\n... [diff truncated] ...";

/// What one `analyze` call produced, for status reporting
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub result: AnalysisResult,
    /// Tokens summed over every model call of this analysis
    pub usage: Usage,
    /// Model calls made (0 when the diff was empty)
    pub model_calls: u32,
    pub duration: Duration,
}

/// Drives the model for one analysis at a time; cheap to clone per request
#[derive(Clone)]
pub struct PromptOrchestrator {
    client: Arc<dyn LlmClient>,
    usage: Arc<TokenUsageTracker>,
}

impl PromptOrchestrator {
    pub fn new(client: Arc<dyn LlmClient>, usage: Arc<TokenUsageTracker>) -> Self {
        Self { client, usage }
    }

    pub fn model_name(&self) -> String {
        self.client.model_name()
    }

    /// Analyse a diff. An empty diff short-circuits to a zero-risk result without a model call.
    pub async fn analyze(
        &self,
        diff: &DiffPayload,
        config: &EffectiveConfig,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let started = Instant::now();

        if diff.is_empty() {
            debug!("Empty diff, skipping model call");
            return Ok(AnalysisOutcome {
                result: no_change_result(diff),
                usage: Usage::default(),
                model_calls: 0,
                duration: started.elapsed(),
            });
        }

        let builder = PromptBuilder::new()
            .breaking_changes_only(config.enable_breaking_changes_only)
            .include_migration_paths(config.include_migration_paths)
            .require_mitigations(config.validate_upgrade_logic);
        let rules = ValidationRules {
            require_mitigations: config.validate_upgrade_logic,
        };

        let mut messages = builder.build_messages(&diff_section(diff));
        let max_calls = config.model_response_retries.saturating_add(1);
        let mut total = Usage::default();
        let mut last_problem = String::new();

        for call in 1..=max_calls {
            let response = self.call_model(messages.clone(), config.model_timeout()).await?;
            let usage = response.usage_or_default();
            self.usage.record(usage.prompt_tokens, usage.completion_tokens);
            total.prompt_tokens += usage.prompt_tokens;
            total.completion_tokens += usage.completion_tokens;
            total.total_tokens = total.prompt_tokens + total.completion_tokens;

            let content = response.content.unwrap_or_default();
            match validate_response(&content, rules) {
                Ok(mut result) => {
                    if diff.truncated {
                        result.markdown_report.push_str(&truncation_note(diff));
                    }
                    info!(
                        call,
                        risk_score = result.risk_score,
                        breaking_changes = result.breaking_changes.len(),
                        "Model response accepted"
                    );
                    return Ok(AnalysisOutcome {
                        result,
                        usage: total,
                        model_calls: call,
                        duration: started.elapsed(),
                    });
                }
                Err(problem) => {
                    warn!(call, max_calls, problem = %problem, "Model response rejected");
                    messages.push(Message::assistant(content));
                    messages.push(PromptBuilder::corrective_message(&problem));
                    last_problem = problem;
                }
            }
        }

        Err(AnalysisError::model_invalid(format!(
            "model response still invalid after {} attempt(s): {}",
            max_calls, last_problem
        )))
    }

    async fn call_model(
        &self,
        messages: Vec<Message>,
        timeout: Duration,
    ) -> Result<ChatResult, AnalysisError> {
        match tokio::time::timeout(timeout, self.client.chat(messages)).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(AnalysisError::model_unavailable(format!(
                "model call failed: {}",
                crate::utils::truncate(&e.to_string(), 500)
            ))),
            Err(_) => Err(AnalysisError::model_unavailable(format!(
                "model did not respond within {}s",
                timeout.as_secs()
            ))),
        }
    }
}

fn short(commit: &str) -> String {
    commit.chars().take(12).collect()
}

/// Header plus diff text as sent to the model
fn diff_section(diff: &DiffPayload) -> String {
    let stats = &diff.stats;
    let mut out = format!(
        "Comparing {} -> {}: {} file(s) changed, +{} / -{} lines.\n",
        short(&diff.from_commit),
        short(&diff.to_commit),
        stats.files_changed,
        stats.lines_added,
        stats.lines_removed
    );
    if diff.truncated {
        out.push_str(&format!(
            "Note: the diff was truncated to its first {} of {} characters. Base your analysis on \
             what is shown and mention that later changes were not visible.\n",
            diff.truncated_len, diff.original_len
        ));
    }
    out.push_str("\nHere is the diff:\n\n");
    out.push_str(&diff.text);
    if diff.truncated {
        out.push_str(TRUNCATION_MARKER);
    }
    out
}

fn truncation_note(diff: &DiffPayload) -> String {
    format!(
        "\n\n---\n\n> **Note:** the diff was truncated to its first {} of {} characters; \
         changes beyond that point were not analysed.\n",
        diff.truncated_len, diff.original_len
    )
}

fn no_change_result(diff: &DiffPayload) -> AnalysisResult {
    let reason = if diff.identical {
        format!(
            "Both refs resolve to the same commit (`{}`), so there are no code changes.",
            short(&diff.from_commit)
        )
    } else {
        format!(
            "Commits `{}` and `{}` have identical content, so there are no code changes.",
            short(&diff.from_commit),
            short(&diff.to_commit)
        )
    };

    AnalysisResult {
        risk_score: 0,
        breaking_changes: Vec::new(),
        markdown_report: format!(
            "# Upgrade analysis\n\n**Risk score: 0 / 100**\n\n{}\n\nNo breaking changes were found.\n",
            reason
        ),
    }
}
