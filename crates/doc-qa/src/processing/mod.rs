//! Question batching and the per-request answering pipeline

mod batcher;
mod orchestrator;

pub use batcher::{split_into_parts, QuestionGroup};
pub use orchestrator::{AnswerOrchestrator, RunOutcome};
