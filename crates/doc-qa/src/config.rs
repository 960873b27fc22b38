//! Configuration for the question answering service

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable pointing at a TOML config file
pub const CONFIG_PATH_ENV: &str = "DOC_QA_CONFIG";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct QaConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Bearer token authentication
    pub auth: AuthConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Relevance selection configuration
    pub retrieval: RetrievalConfig,
    /// Question batching and scheduling
    pub batching: BatchingConfig,
    /// Chat completion backend
    pub llm: LlmConfig,
    /// Embedding backend (semantic retrieval only)
    pub embeddings: EmbeddingConfig,
    /// Document download and parsing
    pub extraction: ExtractionConfig,
}

impl QaConfig {
    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Load from `DOC_QA_CONFIG` when set, otherwise defaults, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Secrets and deployment knobs that should not live in the config file
    pub fn apply_env_overrides(&mut self) {
        if let Ok(keys) = std::env::var("LLM_API_KEYS") {
            let keys: Vec<String> = keys
                .split(',')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
            if !keys.is_empty() {
                self.llm.api_keys = keys;
            }
        }
        if let Ok(base_url) = std::env::var("LLM_BASE_URL") {
            self.llm.base_url = base_url;
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Ok(token) = std::env::var("AUTH_TOKEN") {
            self.auth.token = Some(token);
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.chunking.max_tokens == 0 {
            return Err(Error::Config("chunking.max_tokens must be greater than 0".to_string()));
        }
        if self.retrieval.max_context_length == 0 {
            return Err(Error::Config(
                "retrieval.max_context_length must be greater than 0".to_string(),
            ));
        }
        if self.batching.groups == 0 || self.batching.sub_groups == 0 {
            return Err(Error::Config(
                "batching.groups and batching.sub_groups must be greater than 0".to_string(),
            ));
        }
        if self.llm.retry.max_attempts == 0 {
            return Err(Error::Config("llm.retry.max_attempts must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
        }
    }
}

/// Bearer token authentication for the run endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Expected bearer token; `None` disables authentication
    pub token: Option<String>,
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum whitespace-delimited tokens per chunk
    pub max_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_tokens: 500 }
    }
}

/// Which relevance selector builds the context
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalStrategy {
    /// Significant-word overlap scoring
    #[default]
    Lexical,
    /// Embedding cosine similarity with per-question rank interleaving
    Semantic,
}

/// Relevance selection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Selector used for every group
    pub strategy: RetrievalStrategy,
    /// Hard character budget for the context sent with each group
    pub max_context_length: usize,
    /// Append a sentence- or word-trimmed remainder of the first chunk that overflows
    pub smart_trim: bool,
    /// Minimum cosine similarity kept by the semantic selector
    pub similarity_threshold: f32,
    /// Matches kept per question by the semantic selector
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            strategy: RetrievalStrategy::Lexical,
            max_context_length: 29_999,
            smart_trim: true,
            similarity_threshold: 0.1,
            top_k: 30,
        }
    }
}

/// How sub-groups inside one top-level group are dispatched
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SubGroupSchedule {
    /// Fire every sub-group at once
    Concurrent,
    /// One sub-group at a time with a pause between calls
    Sequential {
        /// Pause between consecutive sub-group calls
        delay_ms: u64,
    },
}

impl Default for SubGroupSchedule {
    fn default() -> Self {
        Self::Concurrent
    }
}

impl SubGroupSchedule {
    /// Pause between sub-group calls, if any
    pub fn delay(&self) -> Option<Duration> {
        match self {
            SubGroupSchedule::Concurrent => None,
            SubGroupSchedule::Sequential { delay_ms } => Some(Duration::from_millis(*delay_ms)),
        }
    }
}

/// Question batching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchingConfig {
    /// Number of top-level question groups (processed concurrently)
    pub groups: usize,
    /// Number of sub-groups each top-level group is split into
    pub sub_groups: usize,
    /// Sub-group dispatch mode
    pub schedule: SubGroupSchedule,
    /// Upper bound on concurrent gateway calls per request (`None` = unbounded)
    pub max_in_flight: Option<usize>,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            groups: 12,
            sub_groups: 2,
            schedule: SubGroupSchedule::Concurrent,
            max_in_flight: None,
        }
    }
}

/// Retry configuration for gateway calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Base delay for exponential backoff in milliseconds
    pub base_delay_ms: u64,
    /// Upper bound on a single backoff in milliseconds
    pub max_delay_ms: u64,
    /// Random extra delay as a fraction of the backoff (0.0 - 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
            jitter_factor: 0.2,
        }
    }
}

/// Chat completion (OpenAI-compatible) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API (without `/chat/completions`)
    pub base_url: String,
    /// Model name
    pub model: String,
    /// API keys rotated across calls
    pub api_keys: Vec<String>,
    /// Temperature for generation
    pub temperature: f32,
    /// Nucleus sampling
    pub top_p: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retry policy
    pub retry: RetryConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://models.github.ai/inference".to_string(),
            model: "openai/gpt-4.1".to_string(),
            api_keys: Vec::new(),
            temperature: 0.7,
            top_p: 0.9,
            timeout_secs: 120,
            retry: RetryConfig::default(),
        }
    }
}

/// Embedding (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub model: String,
    /// Chunks embedded per batch
    pub batch_size: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            batch_size: 32,
            timeout_secs: 60,
        }
    }
}

/// Document download and parsing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Download timeout in seconds
    pub download_timeout_secs: u64,
    /// Largest document accepted, in bytes
    pub max_document_bytes: usize,
    /// Run tesseract on images and text-less PDFs
    pub enable_ocr: bool,
    /// PDF text layers shorter than this fall back to OCR
    pub min_pdf_text_chars: usize,
    /// Nested archive depth followed inside ZIP files
    pub max_zip_depth: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            download_timeout_secs: 60,
            max_document_bytes: 100 * 1024 * 1024, // 100MB
            enable_ocr: true,
            min_pdf_text_chars: 30,
            max_zip_depth: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = QaConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retrieval.max_context_length, 29_999);
        assert_eq!(config.batching.groups, 12);
        assert_eq!(config.batching.sub_groups, 2);
        assert_eq!(config.chunking.max_tokens, 500);
    }

    #[test]
    fn test_partial_toml() {
        let raw = r#"
            [batching]
            groups = 4
            schedule = { mode = "sequential", delay_ms = 8000 }

            [retrieval]
            strategy = "semantic"
        "#;
        let config: QaConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.batching.groups, 4);
        assert_eq!(config.batching.sub_groups, 2);
        assert_eq!(
            config.batching.schedule.delay(),
            Some(Duration::from_millis(8000))
        );
        assert_eq!(config.retrieval.strategy, RetrievalStrategy::Semantic);
        assert_eq!(config.retrieval.max_context_length, 29_999);
    }

    #[test]
    fn test_zero_groups_rejected() {
        let mut config = QaConfig::default();
        config.batching.groups = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
