// src/llm/openai_compat/mod.rs
// OpenAI chat-completions wire format, shared by Azure and OpenAI-compatible endpoints

mod request;
mod response;

pub use request::ChatRequest;
pub use response::{ChatResponse, parse_chat_response};
