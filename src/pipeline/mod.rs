// src/pipeline/mod.rs
// Analysis orchestration pipeline
//
// - events: stage state machine and the closed set of emitted events
// - run: the fetch -> diff -> prompt sequence for one request

mod events;
mod run;

pub use events::{AnalysisEvent, EventStream, ProgressSink, Stage};
pub use run::{AnalysisContext, AnalysisRequest, run_analysis};
