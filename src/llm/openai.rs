// src/llm/openai.rs
// OpenAI-compatible chat-completions client (Bearer auth)

use crate::llm::http_client::LlmHttpClient;
use crate::llm::openai_compat::{ChatRequest, parse_chat_response};
use crate::llm::provider::{LlmClient, Provider};
use crate::llm::{ChatResult, Message};
use anyhow::Result;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{Span, info, instrument};
use uuid::Uuid;

const TEMPERATURE: f32 = 0.2;
const MAX_OUTPUT_TOKENS: u32 = 4096;

/// Client for OpenAI and any server speaking the same API
pub struct OpenAiCompatClient {
    base_url: String,
    api_key: String,
    model: String,
    http: LlmHttpClient,
}

impl OpenAiCompatClient {
    pub fn new(base_url: String, api_key: String, model: String, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            http: LlmHttpClient::new(timeout),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    #[instrument(skip(self, messages), fields(request_id, model = %self.model, message_count = messages.len()))]
    pub async fn chat(&self, messages: Vec<Message>) -> Result<ChatResult> {
        let request_id = Uuid::new_v4().to_string();
        let start_time = Instant::now();
        Span::current().record("request_id", request_id.as_str());

        info!(request_id = %request_id, model = %self.model, "Starting chat request");

        let request = ChatRequest::new(messages)
            .with_model(&self.model)
            .with_temperature(TEMPERATURE)
            .with_max_tokens(MAX_OUTPUT_TOKENS);
        let body = serde_json::to_string(&request)?;

        let response_body = self
            .http
            .post_bearer(&request_id, &self.completions_url(), &self.api_key, body)
            .await?;

        let duration_ms = start_time.elapsed().as_millis() as u64;
        let result = parse_chat_response(&response_body, &request_id, duration_ms)?;

        if let Some(ref usage) = result.usage {
            crate::llm::logging::log_usage(&request_id, "OpenAI", usage);
        }
        crate::llm::logging::log_completion(
            &request_id,
            "OpenAI",
            duration_ms,
            result.content.as_ref().map(|c| c.len()).unwrap_or(0),
        );

        Ok(result)
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn chat(&self, messages: Vec<Message>) -> Result<ChatResult> {
        self.chat(messages).await
    }

    fn provider_type(&self) -> Provider {
        Provider::OpenAiCompatible
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}
