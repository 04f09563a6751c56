// src/config/env.rs
// Environment-based configuration - single source of truth for all env vars

use tracing::{debug, info, warn};

/// Default Azure AI Foundry deployment name
pub const DEFAULT_AZURE_MODEL: &str = "gpt-4o";
/// Default OpenAI-compatible base URL
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
/// Default OpenAI-compatible model
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
/// Default bind host for `serve`
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default bind port for `serve`
pub const DEFAULT_PORT: u16 = 8000;

/// Overrides applied on top of the user config record (last in merge order)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    /// Repository credential (GITHUB_TOKEN)
    pub github_token: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            github_token: read_var("GITHUB_TOKEN"),
        }
    }
}

/// Model endpoint settings loaded from environment variables
#[derive(Debug, Clone, Default)]
pub struct ModelKeys {
    /// Azure AI Foundry endpoint (AZURE_AI_FOUNDRY_ENDPOINT)
    pub azure_endpoint: Option<String>,
    /// Azure AI Foundry API key (AZURE_AI_FOUNDRY_API_KEY)
    pub azure_api_key: Option<String>,
    /// Azure deployment name (AZURE_AI_FOUNDRY_MODEL)
    pub azure_model: String,
    /// OpenAI-compatible API key (OPENAI_API_KEY)
    pub openai_api_key: Option<String>,
    /// OpenAI-compatible base URL (OPENAI_BASE_URL)
    pub openai_base_url: String,
    /// OpenAI-compatible model (OPENAI_MODEL)
    pub openai_model: String,
}

impl ModelKeys {
    /// Load model settings from environment variables
    pub fn from_env() -> Self {
        let keys = Self {
            azure_endpoint: read_var("AZURE_AI_FOUNDRY_ENDPOINT"),
            azure_api_key: read_var("AZURE_AI_FOUNDRY_API_KEY"),
            azure_model: read_var("AZURE_AI_FOUNDRY_MODEL")
                .unwrap_or_else(|| DEFAULT_AZURE_MODEL.to_string()),
            openai_api_key: read_var("OPENAI_API_KEY"),
            openai_base_url: read_var("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            openai_model: read_var("OPENAI_MODEL")
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
        };
        keys.log_status();
        keys
    }

    pub fn has_azure(&self) -> bool {
        self.azure_endpoint.is_some() && self.azure_api_key.is_some()
    }

    pub fn has_openai(&self) -> bool {
        self.openai_api_key.is_some()
    }

    /// Check if any model endpoint is usable
    pub fn has_model(&self) -> bool {
        self.has_azure() || self.has_openai()
    }

    /// Log which endpoints are available (without exposing values)
    fn log_status(&self) {
        if self.has_azure() {
            debug!(model = %self.azure_model, "Azure AI Foundry endpoint configured");
        } else if self.azure_endpoint.is_some() || self.azure_api_key.is_some() {
            warn!("Azure AI Foundry is partially configured (need both endpoint and API key)");
        }
        if self.has_openai() {
            debug!(model = %self.openai_model, base_url = %self.openai_base_url, "OpenAI-compatible endpoint configured");
        }
    }
}

/// Configuration validation result
#[derive(Debug, Default)]
pub struct ConfigValidation {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ConfigValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }
}

/// Environment configuration - all env vars in one place
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub overrides: EnvOverrides,
    pub model: ModelKeys,
    /// Bind host (UPGRADESAGE_HOST)
    pub host: String,
    /// Bind port (UPGRADESAGE_PORT)
    pub port: u16,
}

impl EnvConfig {
    /// Load all environment configuration (call once at startup)
    pub fn load() -> Self {
        info!("Loading environment configuration");

        let port = match read_var("UPGRADESAGE_PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(value = %raw, "Invalid UPGRADESAGE_PORT, using default");
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        Self {
            overrides: EnvOverrides::from_env(),
            model: ModelKeys::from_env(),
            host: read_var("UPGRADESAGE_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
        }
    }

    pub fn validate(&self) -> ConfigValidation {
        let mut validation = ConfigValidation::default();

        if !self.model.has_model() {
            validation.add_warning(
                "No model endpoint configured. Set AZURE_AI_FOUNDRY_ENDPOINT and AZURE_AI_FOUNDRY_API_KEY, or OPENAI_API_KEY.",
            );
        }

        if let Some(ref endpoint) = self.model.azure_endpoint
            && url::Url::parse(endpoint).is_err()
        {
            validation.add_error(format!("AZURE_AI_FOUNDRY_ENDPOINT is not a valid URL: {}", endpoint));
        }

        if url::Url::parse(&self.model.openai_base_url).is_err() {
            validation.add_error(format!(
                "OPENAI_BASE_URL is not a valid URL: {}",
                self.model.openai_base_url
            ));
        }

        validation
    }
}

/// Read a single variable from environment, filtering empty values
fn read_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
