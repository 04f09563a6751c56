// src/config/mod.rs
// Configuration: defaults, user record, environment overrides

pub mod env;
pub mod file;
mod resolver;

pub use env::{ConfigValidation, EnvConfig, EnvOverrides, ModelKeys};
pub use file::{CONFIG_FILE_NAME, ConfigLocation};
pub use resolver::{ConfigResolver, ConfigSource, ConfigStore, ResolvedConfig, StartupCheck};

use serde::{Serialize, Serializer};
use std::time::Duration;

/// Default character budget for the diff sent to the model
pub const DEFAULT_MAX_DIFF_CHARS: usize = 120_000;

/// The effective configuration shared by all analyses.
///
/// Serializing this type never exposes the credential: `github_token` renders as a
/// fixed mask when set and `null` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveConfig {
    #[serde(serialize_with = "serialize_masked")]
    pub github_token: Option<String>,
    pub include_public_repos: bool,
    pub enable_token_monitoring: bool,
    /// Alert threshold, percent of `max_tokens_per_request` (0-100)
    pub token_usage_threshold: u8,
    pub max_tokens_per_request: u64,
    pub enable_breaking_changes_only: bool,
    pub include_migration_paths: bool,
    pub validate_upgrade_logic: bool,
    pub show_startup_check: bool,
    pub max_diff_chars: usize,
    pub fetch_timeout_secs: u64,
    pub diff_timeout_secs: u64,
    pub model_timeout_secs: u64,
    /// Corrective retries after a response fails validation
    pub model_response_retries: u32,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            github_token: None,
            include_public_repos: true,
            enable_token_monitoring: true,
            token_usage_threshold: 80,
            max_tokens_per_request: 120_000,
            enable_breaking_changes_only: false,
            include_migration_paths: true,
            validate_upgrade_logic: true,
            show_startup_check: true,
            max_diff_chars: DEFAULT_MAX_DIFF_CHARS,
            fetch_timeout_secs: 300,
            diff_timeout_secs: 120,
            model_timeout_secs: 180,
            model_response_retries: 1,
        }
    }
}

impl EffectiveConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn diff_timeout(&self) -> Duration {
        Duration::from_secs(self.diff_timeout_secs)
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }
}

const CREDENTIAL_MASK: &str = "********";

fn serialize_masked<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(_) => s.serialize_str(CREDENTIAL_MASK),
        None => s.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = EffectiveConfig::default();
        assert_eq!(config.token_usage_threshold, 80);
        assert_eq!(config.max_tokens_per_request, 120_000);
        assert_eq!(config.max_diff_chars, 120_000);
        assert_eq!(config.model_response_retries, 1);
        assert!(config.validate_upgrade_logic);
        assert!(!config.enable_breaking_changes_only);
    }

    #[test]
    fn test_serialization_masks_credential() {
        let config = EffectiveConfig {
            github_token: Some("ghp_secret".into()),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("ghp_secret"));
        assert!(json.contains(CREDENTIAL_MASK));

        let value = serde_json::to_value(EffectiveConfig::default()).unwrap();
        assert!(value["github_token"].is_null());
    }
}
