//! Core types for the question answering pipeline

pub mod document;
pub mod query;

pub use document::{Chunk, FileType};
pub use query::{
    RunRequest, RunResponse, ValidatedRun, LLM_ERROR_ANSWER, UNEXPECTED_FORMAT_ANSWER,
};
