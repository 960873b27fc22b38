//! Prompt construction and model output decoding

pub mod answers;
pub mod prompt;

pub use answers::parse_answers;
pub use prompt::{truncate_chars, PromptBuilder, CHUNK_SEPARATOR};
