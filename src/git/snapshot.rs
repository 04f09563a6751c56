// src/git/snapshot.rs
// Shallow two-ref snapshot of a remote repository in an ephemeral workspace

use super::{
    GitOutput, GitRunError, classify_fetch_failure, redact, run_git, shallow_unsupported,
    validate_ref,
};
use crate::error::{AnalysisError, FailureKind};
use crate::pipeline::ProgressSink;
use crate::utils::format_secs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Budget for purely local git steps (init, remote add, rev-parse)
const LOCAL_STEP_TIMEOUT: Duration = Duration::from_secs(10);
const WORKSPACE_PREFIX: &str = "upgradesage_";
/// Fetched refs are stored under this namespace as `<ns>/from` and `<ns>/to`
const LOCAL_REF_NAMESPACE: &str = "refs/upgradesage";

/// A ref as requested, plus the commit it resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRef {
    pub name: String,
    pub commit: String,
}

/// Two fetched commits inside an ephemeral bare repository.
///
/// The workspace directory is removed when the snapshot is dropped or cleaned up.
#[derive(Debug)]
pub struct RepoSnapshot {
    workspace: TempDir,
    git_dir: PathBuf,
    pub from: ResolvedRef,
    pub to: ResolvedRef,
}

impl RepoSnapshot {
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Both refs resolved to the same commit
    pub fn same_commit(&self) -> bool {
        self.from.commit == self.to.commit
    }

    /// Remove the workspace now, logging instead of failing
    pub fn cleanup(self) {
        let path = self.workspace.path().to_path_buf();
        match self.workspace.close() {
            Ok(()) => debug!(path = %path.display(), "Removed snapshot workspace"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove snapshot workspace"),
        }
    }
}

/// Inject a repository credential into an https GitHub URL.
///
/// Other URLs are returned unchanged; the credential is only meaningful for GitHub.
pub fn remote_url_with_credential(repo_url: &str, credential: Option<&str>) -> String {
    let Some(token) = credential.filter(|t| !t.is_empty()) else {
        return repo_url.to_string();
    };

    match url::Url::parse(repo_url) {
        Ok(mut url)
            if url.scheme() == "https"
                && url.username().is_empty()
                && url
                    .host_str()
                    .is_some_and(|h| h == "github.com" || h.ends_with(".github.com")) =>
        {
            if url.set_username("x-access-token").is_ok() && url.set_password(Some(token)).is_ok() {
                url.to_string()
            } else {
                repo_url.to_string()
            }
        }
        _ => repo_url.to_string(),
    }
}

/// Repository URL safe to show in events and logs: userinfo is removed
pub fn display_url(repo_url: &str) -> String {
    match url::Url::parse(repo_url) {
        Ok(mut url) if !url.username().is_empty() || url.password().is_some() => {
            if url.set_password(None).is_ok() && url.set_username("").is_ok() {
                url.to_string()
            } else {
                "<redacted url>".to_string()
            }
        }
        Ok(_) => repo_url.to_string(),
        // scp-like `user@host:path` and local paths carry no password
        Err(_) => repo_url.to_string(),
    }
}

/// Password embedded in the URL's userinfo, if any
fn url_password(repo_url: &str) -> Option<String> {
    url::Url::parse(repo_url)
        .ok()
        .and_then(|u| u.password().map(String::from))
        .filter(|p| !p.is_empty())
}

/// Overall budget for the network part of a fetch
struct FetchClock {
    deadline: Instant,
    budget: Duration,
}

impl FetchClock {
    fn start(budget: Duration) -> Self {
        Self {
            deadline: Instant::now() + budget,
            budget,
        }
    }

    fn remaining(&self) -> Option<Duration> {
        let left = self.deadline.saturating_duration_since(Instant::now());
        (!left.is_zero()).then_some(left)
    }
}

/// Creates one isolated workspace per fetch; workspaces are never shared or reused
#[derive(Debug, Clone, Default)]
pub struct SnapshotFetcher {
    workspace_root: Option<PathBuf>,
}

impl SnapshotFetcher {
    /// Workspaces go under the system temp directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Workspaces go under `root`
    pub fn with_workspace_root(root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: Some(root.into()),
        }
    }

    fn allocate_workspace(&self) -> Result<TempDir, AnalysisError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let result = match self.workspace_root {
            Some(ref root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        result.map_err(|e| AnalysisError::workspace(format!("could not create workspace: {}", e)))
    }

    /// Fetch exactly `from_ref` and `to_ref` (depth 1) from `repo_url`.
    ///
    /// On failure the partially built workspace is removed before the error is returned.
    pub async fn fetch(
        &self,
        repo_url: &str,
        from_ref: &str,
        to_ref: &str,
        credential: Option<&str>,
        timeout: Duration,
        progress: &mut dyn ProgressSink,
    ) -> Result<RepoSnapshot, AnalysisError> {
        for r in [from_ref, to_ref] {
            validate_ref(r).map_err(AnalysisError::malformed)?;
        }

        let workspace = self.allocate_workspace()?;
        let git_dir = workspace.path().join("repo.git");
        let remote = remote_url_with_credential(repo_url, credential);
        let shown = display_url(repo_url);
        // A password in the URL itself takes precedence over the injected credential
        let embedded = url_password(repo_url);
        let secret = embedded.as_deref().or(credential);

        progress
            .report(format!("Initializing local repository for {} …", shown))
            .await;
        info!(repo = %shown, workspace = %workspace.path().display(), "Init bare repo");
        init_bare(workspace.path(), &git_dir, &remote, secret).await?;

        progress
            .report(format!("Fetching {} and {} (shallow) …", from_ref, to_ref))
            .await;
        let clock = FetchClock::start(timeout);
        let started = std::time::Instant::now();

        let from = fetch_ref(&git_dir, from_ref, "from", &clock, secret, progress).await?;
        let to = if to_ref == from_ref {
            ResolvedRef {
                name: to_ref.to_string(),
                commit: from.commit.clone(),
            }
        } else {
            fetch_ref(&git_dir, to_ref, "to", &clock, secret, progress).await?
        };

        let elapsed = started.elapsed();
        info!(
            from = %from.commit,
            to = %to.commit,
            duration_ms = elapsed.as_millis() as u64,
            "Fetch done"
        );
        progress
            .report(format!("Refs fetched ({})", format_secs(elapsed)))
            .await;

        Ok(RepoSnapshot {
            workspace,
            git_dir,
            from,
            to,
        })
    }
}

async fn init_bare(
    workspace: &Path,
    git_dir: &Path,
    remote: &str,
    credential: Option<&str>,
) -> Result<(), AnalysisError> {
    let git_dir_str = git_dir.to_string_lossy();
    let steps: [(&Path, Vec<&str>); 2] = [
        (workspace, vec!["init", "--bare", "-q", git_dir_str.as_ref()]),
        (git_dir, vec!["remote", "add", "origin", remote]),
    ];

    for (dir, args) in steps {
        let output = run_git(dir, &args, LOCAL_STEP_TIMEOUT)
            .await
            .map_err(|e| AnalysisError::workspace(e.to_string()))?;
        if !output.success() {
            return Err(AnalysisError::workspace(format!(
                "git {} failed: {}",
                args[0],
                redact(&output.stderr, credential)
            )));
        }
    }
    Ok(())
}

async fn run_fetch(
    git_dir: &Path,
    args: &[&str],
    clock: &FetchClock,
) -> Result<GitOutput, AnalysisError> {
    let timed_out = || {
        AnalysisError::remote_unreachable(format!(
            "fetch timed out after {}s",
            clock.budget.as_secs()
        ))
    };
    let remaining = clock.remaining().ok_or_else(timed_out)?;

    match run_git(git_dir, args, remaining).await {
        Ok(output) => Ok(output),
        Err(GitRunError::TimedOut(_)) => Err(timed_out()),
        Err(e @ GitRunError::Spawn(_)) => Err(AnalysisError::workspace(e.to_string())),
    }
}

async fn fetch_ref(
    git_dir: &Path,
    name: &str,
    slot: &str,
    clock: &FetchClock,
    credential: Option<&str>,
    progress: &mut dyn ProgressSink,
) -> Result<ResolvedRef, AnalysisError> {
    let local = format!("{}/{}", LOCAL_REF_NAMESPACE, slot);
    let refspec = format!("+{}:{}", name, local);

    debug!(git_ref = %name, local = %local, "Fetching ref (depth 1)");
    let mut output = run_fetch(
        git_dir,
        &["fetch", "--depth=1", "--no-tags", "origin", &refspec],
        clock,
    )
    .await?;

    if !output.success() && shallow_unsupported(&output.stderr) {
        warn!(git_ref = %name, "Remote refused shallow fetch, falling back to full fetch");
        progress
            .report(format!("Shallow fetch refused for {}, trying full fetch …", name))
            .await;
        output = run_fetch(git_dir, &["fetch", "--no-tags", "origin", &refspec], clock).await?;
    }

    if !output.success() {
        return Err(fetch_failure(name, &output.stderr, credential));
    }

    let commit = resolve_commit(git_dir, &local, name).await?;
    debug!(git_ref = %name, commit = %commit, "Ref resolved");
    Ok(ResolvedRef {
        name: name.to_string(),
        commit,
    })
}

fn fetch_failure(name: &str, stderr: &str, credential: Option<&str>) -> AnalysisError {
    let kind = classify_fetch_failure(stderr);
    let detail = redact(stderr, credential);
    let message = match kind {
        FailureKind::RefNotFound => format!("ref '{}' not found on remote: {}", name, detail),
        FailureKind::AuthenticationRejected => {
            format!("authentication rejected while fetching '{}': {}", name, detail)
        }
        _ => format!("could not fetch '{}' from remote: {}", name, detail),
    };
    warn!(git_ref = %name, kind = %kind, "Fetch failed");
    AnalysisError::new(kind, message)
}

async fn resolve_commit(git_dir: &Path, local: &str, name: &str) -> Result<String, AnalysisError> {
    let peeled = format!("{}^{{commit}}", local);
    let output = run_git(
        git_dir,
        &["rev-parse", "--verify", "--quiet", &peeled],
        LOCAL_STEP_TIMEOUT,
    )
    .await
    .map_err(|e| AnalysisError::workspace(e.to_string()))?;

    let commit = output.stdout.trim();
    if !output.success() || commit.is_empty() {
        return Err(AnalysisError::ref_not_found(format!(
            "ref '{}' does not point to a commit",
            name
        )));
    }
    Ok(commit.to_string())
}
