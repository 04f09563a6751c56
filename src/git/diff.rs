// src/git/diff.rs
// Unified diff between two fetched commits, with a character budget

use super::{RepoSnapshot, run_git};
use crate::error::AnalysisError;
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

/// Context lines around each hunk
const DIFF_CONTEXT_LINES: &str = "--unified=5";

/// Diff statistics derived from the full (untruncated) diff
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffStats {
    pub files_changed: usize,
    pub lines_added: usize,
    pub lines_removed: usize,
    pub files: Vec<String>,
}

/// Diff text ready for prompting, with its truncation record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffPayload {
    /// Prefix of the diff, at most the configured budget in characters
    pub text: String,
    /// Length of the full diff in characters
    pub original_len: usize,
    /// Length of `text` in characters
    pub truncated_len: usize,
    pub truncated: bool,
    pub stats: DiffStats,
    pub from_commit: String,
    pub to_commit: String,
    /// Both refs resolved to the same commit
    pub identical: bool,
}

impl DiffPayload {
    /// Explicit empty payload for two refs at the same commit
    pub fn identical(commit: &str) -> Self {
        Self {
            text: String::new(),
            original_len: 0,
            truncated_len: 0,
            truncated: false,
            stats: DiffStats::default(),
            from_commit: commit.to_string(),
            to_commit: commit.to_string(),
            identical: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Keep at most `cap` characters of `text`.
///
/// Returns the kept prefix, the original length and whether anything was cut.
/// Text at or under the cap comes back unchanged.
pub fn truncate_diff(text: &str, cap: usize) -> (String, usize, bool) {
    match text.char_indices().nth(cap) {
        Some((idx, _)) => (text[..idx].to_string(), text.chars().count(), true),
        None => (text.to_string(), text.chars().count(), false),
    }
}

/// Derive diff statistics directly from a unified diff string.
///
/// Counts `+`/`-` lines and takes file paths from `diff --git` headers.
pub fn derive_stats_from_unified_diff(diff: &str) -> DiffStats {
    let mut stats = DiffStats::default();
    let mut seen_files = HashSet::new();

    for line in diff.lines() {
        if line.starts_with("diff --git ") {
            if let Some(b_part) = line.split(" b/").last()
                && seen_files.insert(b_part.to_string())
            {
                stats.files.push(b_part.to_string());
            }
        } else if line.starts_with('+') && !line.starts_with("+++") {
            stats.lines_added += 1;
        } else if line.starts_with('-') && !line.starts_with("---") {
            stats.lines_removed += 1;
        }
    }

    stats.files_changed = stats.files.len();
    stats
}

/// Computes the diff for a snapshot
#[derive(Debug, Clone, Copy)]
pub struct DiffExtractor {
    max_chars: usize,
    timeout: Duration,
}

impl DiffExtractor {
    pub fn new(max_chars: usize, timeout: Duration) -> Self {
        Self { max_chars, timeout }
    }

    pub async fn extract(&self, snapshot: &RepoSnapshot) -> Result<DiffPayload, AnalysisError> {
        if snapshot.same_commit() {
            debug!(commit = %snapshot.from.commit, "Refs resolve to the same commit");
            return Ok(DiffPayload::identical(&snapshot.from.commit));
        }

        let output = run_git(
            snapshot.git_dir(),
            &[
                "diff",
                DIFF_CONTEXT_LINES,
                "--no-color",
                "--no-ext-diff",
                &snapshot.from.commit,
                &snapshot.to.commit,
            ],
            self.timeout,
        )
        .await
        .map_err(|e| AnalysisError::diff(e.to_string()))?;

        if !output.success() {
            return Err(AnalysisError::diff(format!(
                "git diff failed: {}",
                crate::utils::truncate(output.stderr.trim(), 500)
            )));
        }

        let stats = derive_stats_from_unified_diff(&output.stdout);
        let (text, original_len, truncated) = truncate_diff(&output.stdout, self.max_chars);
        let truncated_len = if truncated { self.max_chars } else { original_len };

        info!(
            files = stats.files_changed,
            added = stats.lines_added,
            removed = stats.lines_removed,
            chars = original_len,
            truncated,
            "Diff extracted"
        );

        Ok(DiffPayload {
            text,
            original_len,
            truncated_len,
            truncated,
            stats,
            from_commit: snapshot.from.commit.clone(),
            to_commit: snapshot.to.commit.clone(),
            identical: false,
        })
    }
}
