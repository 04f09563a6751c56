// src/llm/provider.rs
// LLM provider abstraction layer

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

use super::{ChatResult, Message};

/// Supported model endpoint kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Azure AI Foundry deployment (`api-key` header)
    AzureFoundry,
    /// Any OpenAI-compatible `/chat/completions` endpoint (Bearer auth)
    OpenAiCompatible,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AzureFoundry => write!(f, "azure_foundry"),
            Self::OpenAiCompatible => write!(f, "openai_compatible"),
        }
    }
}

/// Trait for model clients. The pipeline only ever sees `Arc<dyn LlmClient>`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a chat completion request
    async fn chat(&self, messages: Vec<Message>) -> Result<ChatResult>;

    fn provider_type(&self) -> Provider;

    /// Model or deployment name, for status messages
    fn model_name(&self) -> String;
}
