// src/git/mod.rs
// Git subprocess plumbing
//
// - snapshot: shallow two-ref fetch into an ephemeral bare repository
// - diff: unified diff between the fetched commits, truncation, stats

mod diff;
mod snapshot;

pub use diff::{DiffExtractor, DiffPayload, DiffStats, derive_stats_from_unified_diff, truncate_diff};
pub use snapshot::{
    RepoSnapshot, ResolvedRef, SnapshotFetcher, display_url, remote_url_with_credential,
};

use crate::error::FailureKind;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;

/// Captured result of a finished git process
#[derive(Debug)]
pub(crate) struct GitOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Why a git process produced no output at all
#[derive(Debug)]
pub(crate) enum GitRunError {
    /// The binary could not be started
    Spawn(std::io::Error),
    /// The process did not exit within its budget and was killed
    TimedOut(Duration),
}

impl std::fmt::Display for GitRunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spawn(e) => write!(f, "failed to run git: {}", e),
            Self::TimedOut(d) => write!(f, "git timed out after {}s", d.as_secs()),
        }
    }
}

/// Validate that a git ref doesn't look like a CLI flag or carry control characters
pub fn validate_ref(r: &str) -> Result<(), String> {
    if r.trim().is_empty() {
        return Err("git ref must not be empty".to_string());
    }
    if r.starts_with('-') {
        return Err(format!("Invalid git ref: '{}'", r));
    }
    if r.contains('\0') || r.contains('\n') || r.contains('\r') || r.contains(' ') {
        return Err("Invalid git ref: contains forbidden characters".to_string());
    }
    Ok(())
}

/// Run git with `args` in `dir`, suspending the task until it exits or `timeout` elapses.
///
/// The child is killed if the future is dropped (timeout or caller cancellation).
/// Non-zero exits are returned as output, not errors; callers map them.
pub(crate) async fn run_git(
    dir: &Path,
    args: &[&str],
    timeout: Duration,
) -> Result<GitOutput, GitRunError> {
    let child = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(timeout, child).await {
        Ok(Ok(output)) => Ok(GitOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }),
        Ok(Err(e)) => Err(GitRunError::Spawn(e)),
        Err(_) => Err(GitRunError::TimedOut(timeout)),
    }
}

const AUTH_MARKERS: &[&str] = &[
    "authentication failed",
    "could not read username",
    "could not read password",
    "terminal prompts disabled",
    "invalid username or password",
    "permission denied",
    "returned error: 401",
    "returned error: 403",
];

const REF_MARKERS: &[&str] = &[
    "couldn't find remote ref",
    "not our ref",
    "no such ref",
    "unadvertised object",
    "invalid refspec",
    "bad object",
];

const SHALLOW_UNSUPPORTED_MARKERS: &[&str] = &[
    "does not support shallow",
    "shallow capabilities",
];

/// Map a failed fetch's stderr to a failure kind
pub(crate) fn classify_fetch_failure(stderr: &str) -> FailureKind {
    let lower = stderr.to_lowercase();
    if AUTH_MARKERS.iter().any(|m| lower.contains(m)) {
        FailureKind::AuthenticationRejected
    } else if REF_MARKERS.iter().any(|m| lower.contains(m)) {
        FailureKind::RefNotFound
    } else {
        FailureKind::RemoteUnreachable
    }
}

/// True when the remote refused a depth-limited fetch but may serve a full one
pub(crate) fn shallow_unsupported(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    SHALLOW_UNSUPPORTED_MARKERS.iter().any(|m| lower.contains(m))
}

/// Strip a credential from text that may echo the remote URL, and trim it for display
pub(crate) fn redact(text: &str, credential: Option<&str>) -> String {
    let mut out = text.trim().to_string();
    if let Some(secret) = credential.filter(|s| !s.is_empty()) {
        out = out.replace(secret, "***");
    }
    crate::utils::truncate(&out, 500)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ref() {
        assert!(validate_ref("v1.2.3").is_ok());
        assert!(validate_ref("feature/foo").is_ok());
        assert!(validate_ref("0123456789abcdef0123456789abcdef01234567").is_ok());
        assert!(validate_ref("--upload-pack=evil").is_err());
        assert!(validate_ref("").is_err());
        assert!(validate_ref("a\nb").is_err());
        assert!(validate_ref("a b").is_err());
    }

    #[test]
    fn test_classify_auth() {
        let stderr = "remote: Invalid username or password.\nfatal: Authentication failed for 'https://github.com/x/y'";
        assert_eq!(classify_fetch_failure(stderr), FailureKind::AuthenticationRejected);
        let stderr = "fatal: could not read Username for 'https://github.com': terminal prompts disabled";
        assert_eq!(classify_fetch_failure(stderr), FailureKind::AuthenticationRejected);
    }

    #[test]
    fn test_classify_missing_ref() {
        let stderr = "fatal: couldn't find remote ref v99.0.0";
        assert_eq!(classify_fetch_failure(stderr), FailureKind::RefNotFound);
    }

    #[test]
    fn test_classify_unreachable() {
        let stderr = "fatal: unable to access 'https://nope.invalid/x.git/': Could not resolve host: nope.invalid";
        assert_eq!(classify_fetch_failure(stderr), FailureKind::RemoteUnreachable);
        assert_eq!(classify_fetch_failure(""), FailureKind::RemoteUnreachable);
    }

    #[test]
    fn test_shallow_unsupported() {
        assert!(shallow_unsupported("fatal: dumb http transport does not support shallow capabilities"));
        assert!(!shallow_unsupported("fatal: couldn't find remote ref main"));
    }

    #[test]
    fn test_redact_hides_credential() {
        let text = "fatal: unable to access 'https://ghp_123@github.com/x/y/'";
        let out = redact(text, Some("ghp_123"));
        assert!(!out.contains("ghp_123"));
        assert!(out.contains("***"));
        assert_eq!(redact(" plain ", None), "plain");
    }

    #[tokio::test]
    async fn test_run_git_reports_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        match run_git(dir.path(), &["rev-parse", "--git-dir"], Duration::from_secs(10)).await {
            Ok(output) => assert!(!output.success(), "empty dir is not a repository"),
            // git binary unavailable in this environment
            Err(GitRunError::Spawn(_)) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
}
