//! Provider abstractions for the model gateway and embeddings
//!
//! The orchestrator only sees the `ModelGateway` and `EmbeddingProvider`
//! traits; `ChatGateway` and `OllamaEmbedder` are the shipped backends.

pub mod chat;
pub mod embedding;
pub mod llm;
pub mod ollama;
pub mod retry;
pub mod rotation;

pub use chat::ChatGateway;
pub use embedding::{ensure_uniform_dimensions, EmbeddingProvider};
pub use llm::{GatewayResponse, ModelGateway};
pub use ollama::OllamaEmbedder;
pub use retry::RetryPolicy;
pub use rotation::{KeyRotation, RotationKey};
