// src/config/resolver.rs
// Layered config resolution and the shared, reloadable config store

use super::env::EnvOverrides;
use super::file::{ConfigLocation, apply_record, read_record, write_record};
use super::EffectiveConfig;
use crate::error::Result;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where the effective config came from, for display to callers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSource {
    /// User record that was read, if one was found
    pub path: Option<PathBuf>,
    /// True when the user record was found and parsed
    pub loaded: bool,
    /// True when the credential came from the environment override
    pub credential_from_env: bool,
    /// Skipped fields and unreadable-file notes
    pub warnings: Vec<String>,
}

/// An effective config plus its provenance
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    pub config: EffectiveConfig,
    pub source: ConfigSource,
}

/// Startup check record (GET /config/startup, `upgradesage check`)
#[derive(Debug, Clone, Serialize)]
pub struct StartupCheck {
    pub config_loaded: bool,
    pub config_path: String,
    pub github_token_configured: bool,
    /// `GITHUB_TOKEN` overrides the credential in the user record
    pub github_token_from_env: bool,
    pub token_monitoring_enabled: bool,
    pub settings: StartupSettings,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartupSettings {
    pub include_public_repos: bool,
    pub include_migration_paths: bool,
    pub validate_upgrade_logic: bool,
}

impl ResolvedConfig {
    /// Human-readable config origin
    pub fn describe_source(&self) -> String {
        match (&self.source.path, self.source.loaded) {
            (Some(path), true) => path.display().to_string(),
            (Some(path), false) => format!("{} (unreadable, using defaults)", path.display()),
            (None, _) => "Using defaults".to_string(),
        }
    }

    pub fn startup_check(&self) -> StartupCheck {
        let config = &self.config;
        StartupCheck {
            config_loaded: self.source.loaded,
            config_path: self.describe_source(),
            github_token_configured: config.github_token.is_some(),
            github_token_from_env: self.source.credential_from_env,
            token_monitoring_enabled: config.enable_token_monitoring,
            settings: StartupSettings {
                include_public_repos: config.include_public_repos,
                include_migration_paths: config.include_migration_paths,
                validate_upgrade_logic: config.validate_upgrade_logic,
            },
            warnings: self.source.warnings.clone(),
        }
    }
}

/// Merges defaults, the user record and environment overrides, in that order
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    location: ConfigLocation,
    env: EnvOverrides,
}

impl ConfigResolver {
    pub fn new(location: ConfigLocation, env: EnvOverrides) -> Self {
        Self { location, env }
    }

    /// Resolve a fresh snapshot. Never fails: a bad record degrades to defaults.
    pub fn resolve(&self) -> ResolvedConfig {
        let mut config = EffectiveConfig::default();
        let mut source = ConfigSource::default();

        if let Some(path) = self.location.locate() {
            match read_record(&path) {
                Ok(record) => {
                    source.warnings = apply_record(&mut config, &record);
                    source.loaded = true;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Invalid config file, using defaults");
                    source
                        .warnings
                        .push(format!("invalid config file {}: {}", path.display(), e));
                }
            }
            source.path = Some(path);
        } else {
            debug!("No config file found, using defaults");
        }

        if let Some(ref token) = self.env.github_token {
            config.github_token = Some(token.clone());
            source.credential_from_env = true;
        }

        ResolvedConfig { config, source }
    }

    /// Merge a partial record into the persisted user record.
    ///
    /// Unknown or malformed fields are not written; they come back as warnings. An
    /// out-of-range threshold is written clamped and also reported.
    pub fn persist(&self, partial: &Map<String, Value>) -> Result<(PathBuf, Vec<String>)> {
        let target = self.location.write_target();

        let mut probe = EffectiveConfig::default();
        let warnings = apply_record(&mut probe, partial);
        let rejected: Vec<&String> = partial
            .keys()
            .filter(|k| warnings.iter().any(|w| w.starts_with(&format!("'{}':", k))))
            .collect();

        let mut record = if target.is_file() {
            read_record(&target).unwrap_or_else(|e| {
                warn!(path = %target.display(), error = %e, "Replacing unreadable config file");
                Map::new()
            })
        } else {
            Map::new()
        };

        for (key, value) in partial {
            if key == "token_usage_threshold" && value.is_i64() {
                // Out-of-range integers are stored clamped, matching how a record is read
                record.insert(key.clone(), Value::from(probe.token_usage_threshold));
            } else if !rejected.contains(&key) {
                record.insert(key.clone(), value.clone());
            }
        }

        write_record(&target, &record)?;
        info!(path = %target.display(), fields = partial.len(), "Persisted config record");
        Ok((target, warnings))
    }
}

/// Process-wide holder of the current resolved config.
///
/// Readers clone the inner `Arc`, so a reload never changes a snapshot that an
/// in-flight analysis already holds.
pub struct ConfigStore {
    resolver: ConfigResolver,
    current: RwLock<Arc<ResolvedConfig>>,
    write_lock: Mutex<()>,
}

impl ConfigStore {
    pub fn new(resolver: ConfigResolver) -> Self {
        let resolved = resolver.resolve();
        Self {
            resolver,
            current: RwLock::new(Arc::new(resolved)),
            write_lock: Mutex::new(()),
        }
    }

    pub fn current(&self) -> Arc<ResolvedConfig> {
        self.current.read().clone()
    }

    /// Re-resolve from all sources and publish the result
    pub fn reload(&self) -> Arc<ResolvedConfig> {
        let resolved = Arc::new(self.resolver.resolve());
        *self.current.write() = resolved.clone();
        resolved
    }

    /// Persist a partial record, then reload
    pub fn update(&self, partial: &Map<String, Value>) -> Result<(Arc<ResolvedConfig>, Vec<String>)> {
        let _guard = self.write_lock.lock();
        let (_, warnings) = self.resolver.persist(partial)?;
        Ok((self.reload(), warnings))
    }
}
