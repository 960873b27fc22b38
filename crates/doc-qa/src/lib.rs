//! doc-qa: answer batches of questions about a single document with an LLM
//!
//! A request names one document (URL or local path) and an ordered list of
//! questions. The document is extracted to text and chunked, questions are
//! partitioned into groups that are answered concurrently, and each group's
//! model call carries only the chunks relevant to its questions. Answers come
//! back in question order, with placeholders where a group's call failed.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod processing;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::QaConfig;
pub use error::{Error, GatewayError, Result};
pub use processing::{AnswerOrchestrator, RunOutcome};
pub use types::{Chunk, FileType, RunRequest, RunResponse};
