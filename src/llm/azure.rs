// src/llm/azure.rs
// Azure AI Foundry chat-completions client (non-streaming)

use crate::llm::http_client::LlmHttpClient;
use crate::llm::openai_compat::{ChatRequest, parse_chat_response};
use crate::llm::provider::{LlmClient, Provider};
use crate::llm::{ChatResult, Message};
use anyhow::Result;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{Span, debug, info, instrument};
use uuid::Uuid;

const API_VERSION: &str = "2024-12-01-preview";
const TEMPERATURE: f32 = 0.2;
const MAX_OUTPUT_TOKENS: u32 = 4096;

/// Azure AI Foundry client, authenticating with the `api-key` header
pub struct AzureFoundryClient {
    endpoint: String,
    api_key: String,
    deployment: String,
    http: LlmHttpClient,
}

impl AzureFoundryClient {
    pub fn new(endpoint: String, api_key: String, deployment: String, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            deployment,
            http: LlmHttpClient::new(timeout),
        }
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, API_VERSION
        )
    }

    #[instrument(skip(self, messages), fields(request_id, deployment = %self.deployment, message_count = messages.len()))]
    pub async fn chat(&self, messages: Vec<Message>) -> Result<ChatResult> {
        let request_id = Uuid::new_v4().to_string();
        let start_time = Instant::now();
        Span::current().record("request_id", request_id.as_str());

        info!(
            request_id = %request_id,
            endpoint = %self.endpoint,
            deployment = %self.deployment,
            "Calling Azure AI Foundry"
        );

        let request = ChatRequest::new(messages)
            .with_temperature(TEMPERATURE)
            .with_max_tokens(MAX_OUTPUT_TOKENS);
        let body = serde_json::to_string(&request)?;
        debug!(request_id = %request_id, body_len = body.len(), "Azure request built");

        let url = self.completions_url();
        let response_body = self
            .http
            .execute_with_retry(&request_id, body, |client, body| {
                client
                    .post(&url)
                    .header("api-key", &self.api_key)
                    .header("Content-Type", "application/json")
                    .body(body)
            })
            .await?;

        let duration_ms = start_time.elapsed().as_millis() as u64;
        let result = parse_chat_response(&response_body, &request_id, duration_ms)?;

        if let Some(ref usage) = result.usage {
            crate::llm::logging::log_usage(&request_id, "Azure", usage);
        }
        crate::llm::logging::log_completion(
            &request_id,
            "Azure",
            duration_ms,
            result.content.as_ref().map(|c| c.len()).unwrap_or(0),
        );

        Ok(result)
    }
}

#[async_trait]
impl LlmClient for AzureFoundryClient {
    async fn chat(&self, messages: Vec<Message>) -> Result<ChatResult> {
        self.chat(messages).await
    }

    fn provider_type(&self) -> Provider {
        Provider::AzureFoundry
    }

    fn model_name(&self) -> String {
        self.deployment.clone()
    }
}
