// src/llm/factory.rs
// Pick the model client from the configured endpoints

use crate::config::ModelKeys;
use crate::llm::azure::AzureFoundryClient;
use crate::llm::openai::OpenAiCompatClient;
use crate::llm::provider::LlmClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Build the model client. Azure AI Foundry wins when both endpoints are configured.
///
/// `timeout` bounds each HTTP attempt; the orchestrator applies its own overall deadline.
pub fn client_from_keys(keys: &ModelKeys, timeout: Duration) -> Option<Arc<dyn LlmClient>> {
    if let (Some(endpoint), Some(api_key)) = (&keys.azure_endpoint, &keys.azure_api_key) {
        info!(deployment = %keys.azure_model, "Using Azure AI Foundry");
        return Some(Arc::new(AzureFoundryClient::new(
            endpoint.clone(),
            api_key.clone(),
            keys.azure_model.clone(),
            timeout,
        )));
    }

    if let Some(ref api_key) = keys.openai_api_key {
        info!(model = %keys.openai_model, base_url = %keys.openai_base_url, "Using OpenAI-compatible endpoint");
        return Some(Arc::new(OpenAiCompatClient::new(
            keys.openai_base_url.clone(),
            api_key.clone(),
            keys.openai_model.clone(),
            timeout,
        )));
    }

    warn!("No model endpoint configured; analyses will fail with ModelUnavailable");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Provider;

    fn keys() -> ModelKeys {
        ModelKeys {
            azure_model: "gpt-4o".into(),
            openai_base_url: "https://api.openai.com/v1".into(),
            openai_model: "gpt-4o-mini".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_keys_no_client() {
        assert!(client_from_keys(&keys(), Duration::from_secs(1)).is_none());
    }

    #[test]
    fn test_azure_preferred() {
        let keys = ModelKeys {
            azure_endpoint: Some("https://x.azure.com".into()),
            azure_api_key: Some("a".into()),
            openai_api_key: Some("o".into()),
            ..keys()
        };
        let client = client_from_keys(&keys, Duration::from_secs(1)).unwrap();
        assert_eq!(client.provider_type(), Provider::AzureFoundry);
        assert_eq!(client.model_name(), "gpt-4o");
    }

    #[test]
    fn test_partial_azure_falls_back_to_openai() {
        let keys = ModelKeys {
            azure_endpoint: Some("https://x.azure.com".into()),
            openai_api_key: Some("o".into()),
            ..keys()
        };
        let client = client_from_keys(&keys, Duration::from_secs(1)).unwrap();
        assert_eq!(client.provider_type(), Provider::OpenAiCompatible);
        assert_eq!(client.model_name(), "gpt-4o-mini");
    }
}
