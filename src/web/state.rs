// src/web/state.rs
// Shared application state

use crate::config::ConfigStore;
use crate::git::SnapshotFetcher;
use crate::llm::LlmClient;
use crate::pipeline::AnalysisContext;
use crate::usage::TokenUsageTracker;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Current resolved config, reloadable
    pub config: Arc<ConfigStore>,

    /// Process-lifetime token counters
    pub usage: Arc<TokenUsageTracker>,

    /// Model client; `None` when no endpoint is configured
    pub llm: Option<Arc<dyn LlmClient>>,

    pub fetcher: SnapshotFetcher,
}

impl AppState {
    pub fn new(config: Arc<ConfigStore>, llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self {
            config,
            usage: Arc::new(TokenUsageTracker::new()),
            llm,
            fetcher: SnapshotFetcher::new(),
        }
    }

    /// Put snapshot workspaces under `fetcher` instead of the system temp dir
    pub fn with_fetcher(mut self, fetcher: SnapshotFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Capture a per-request context with the config snapshot taken now
    pub fn analysis_context(&self) -> AnalysisContext {
        AnalysisContext {
            config: self.config.current(),
            fetcher: self.fetcher.clone(),
            llm: self.llm.clone(),
            usage: self.usage.clone(),
        }
    }
}
