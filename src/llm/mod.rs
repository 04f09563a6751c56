// src/llm/mod.rs
// Model clients (Azure AI Foundry, OpenAI-compatible)

mod azure;
mod factory;
pub mod http_client;
pub mod logging;
mod openai;
pub mod openai_compat;
mod prompt;
mod provider;
mod types;

pub use azure::AzureFoundryClient;
pub use factory::client_from_keys;
pub use openai::OpenAiCompatClient;
pub use prompt::PromptBuilder;
pub use provider::{LlmClient, Provider};
pub use types::{ChatResult, Message, Usage};
