// src/config/file.rs
// User config record (.upgradesage JSON) - lookup, loading, field application

use super::EffectiveConfig;
use crate::error::{Result, SageError};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name of the user config record
pub const CONFIG_FILE_NAME: &str = ".upgradesage";

/// Where the user config record may live, in lookup order
#[derive(Debug, Clone)]
pub struct ConfigLocation {
    candidates: Vec<PathBuf>,
}

impl ConfigLocation {
    /// Working directory first, then home directory
    pub fn discover() -> Self {
        let mut candidates = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            candidates.push(cwd.join(CONFIG_FILE_NAME));
        }
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(CONFIG_FILE_NAME));
        }
        Self { candidates }
    }

    /// A single explicit path (e.g. from `--config`)
    pub fn explicit(path: impl Into<PathBuf>) -> Self {
        Self {
            candidates: vec![path.into()],
        }
    }

    /// First candidate that exists on disk
    pub fn locate(&self) -> Option<PathBuf> {
        self.candidates.iter().find(|p| p.is_file()).cloned()
    }

    /// Path new records are written to when none exists yet
    pub fn write_target(&self) -> PathBuf {
        self.locate()
            .or_else(|| self.candidates.first().cloned())
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
    }
}

/// Read a config record from disk. The record must be a JSON object.
pub fn read_record(path: &Path) -> Result<Map<String, Value>> {
    let contents = std::fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&contents)? {
        Value::Object(map) => {
            debug!(path = %path.display(), fields = map.len(), "Loaded config record");
            Ok(map)
        }
        other => Err(SageError::Config(format!(
            "expected a JSON object, found {}",
            json_type_name(&other)
        ))),
    }
}

/// Write a config record to disk as pretty JSON
pub fn write_record(path: &Path, record: &Map<String, Value>) -> Result<()> {
    let body = serde_json::to_string_pretty(record)?;
    std::fs::write(path, body)?;
    Ok(())
}

/// Apply every recognized field of `record` onto `config`.
///
/// Unknown or malformed fields are skipped and described in the returned warnings.
pub fn apply_record(config: &mut EffectiveConfig, record: &Map<String, Value>) -> Vec<String> {
    let mut warnings = Vec::new();

    for (key, value) in record {
        let outcome = match key.as_str() {
            "github_token" => set_credential(&mut config.github_token, value),
            "include_public_repos" => set_bool(&mut config.include_public_repos, value),
            "enable_token_monitoring" => set_bool(&mut config.enable_token_monitoring, value),
            "token_usage_threshold" => set_threshold(&mut config.token_usage_threshold, value),
            "max_tokens_per_request" => set_positive(&mut config.max_tokens_per_request, value),
            "enable_breaking_changes_only" => {
                set_bool(&mut config.enable_breaking_changes_only, value)
            }
            "include_migration_paths" => set_bool(&mut config.include_migration_paths, value),
            "validate_upgrade_logic" => set_bool(&mut config.validate_upgrade_logic, value),
            "show_startup_check" => set_bool(&mut config.show_startup_check, value),
            "max_diff_chars" => set_positive(&mut config.max_diff_chars, value),
            "fetch_timeout_secs" => set_positive(&mut config.fetch_timeout_secs, value),
            "diff_timeout_secs" => set_positive(&mut config.diff_timeout_secs, value),
            "model_timeout_secs" => set_positive(&mut config.model_timeout_secs, value),
            "model_response_retries" => set_count(&mut config.model_response_retries, value),
            _ => Err("unknown field, ignored".to_string()),
        };

        if let Err(reason) = outcome {
            let warning = format!("'{}': {}", key, reason);
            warn!(field = %key, "Config field skipped: {}", reason);
            warnings.push(warning);
        }
    }

    warnings
}

fn set_bool(slot: &mut bool, value: &Value) -> std::result::Result<(), String> {
    match value.as_bool() {
        Some(b) => {
            *slot = b;
            Ok(())
        }
        None => Err(format!("expected boolean, found {}", json_type_name(value))),
    }
}

fn set_credential(slot: &mut Option<String>, value: &Value) -> std::result::Result<(), String> {
    match value {
        Value::Null => {
            *slot = None;
            Ok(())
        }
        Value::String(s) => {
            *slot = Some(s.trim().to_string()).filter(|s| !s.is_empty());
            Ok(())
        }
        other => Err(format!("expected string or null, found {}", json_type_name(other))),
    }
}

/// Threshold is a percentage; out-of-range integers are clamped but still reported
fn set_threshold(slot: &mut u8, value: &Value) -> std::result::Result<(), String> {
    let Some(raw) = value.as_i64() else {
        return Err(format!("expected integer, found {}", json_type_name(value)));
    };
    let clamped = raw.clamp(0, 100);
    *slot = clamped as u8;
    if clamped != raw {
        return Err(format!("{} is outside 0-100, clamped to {}", raw, clamped));
    }
    Ok(())
}

fn set_positive<T>(slot: &mut T, value: &Value) -> std::result::Result<(), String>
where
    T: TryFrom<u64>,
{
    match value.as_u64() {
        Some(0) => Err("must be greater than zero, keeping default".to_string()),
        Some(n) => match T::try_from(n) {
            Ok(v) => {
                *slot = v;
                Ok(())
            }
            Err(_) => Err(format!("{} is too large", n)),
        },
        None => Err(format!("expected positive integer, found {}", json_type_name(value))),
    }
}

fn set_count(slot: &mut u32, value: &Value) -> std::result::Result<(), String> {
    match value.as_u64().and_then(|n| u32::try_from(n).ok()) {
        Some(n) => {
            *slot = n;
            Ok(())
        }
        None => Err(format!("expected non-negative integer, found {}", value)),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
