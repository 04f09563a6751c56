// src/analysis/mod.rs
// Breaking-change analysis: prompt orchestration and the response contract

mod orchestrator;
mod types;
mod validate;

pub use orchestrator::{AnalysisOutcome, PromptOrchestrator};
pub use types::{AnalysisResult, BreakingChange};
pub use validate::{ValidationRules, parse_json_hardened, strip_code_fences, validate_response};
