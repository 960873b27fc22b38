//! Application state for the question answering server

use std::sync::Arc;

use crate::config::{QaConfig, RetrievalStrategy};
use crate::error::Result;
use crate::ingestion::{DocumentExtractor, TextExtractor};
use crate::processing::AnswerOrchestrator;
use crate::providers::{ChatGateway, ModelGateway, OllamaEmbedder};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: QaConfig,
    /// Request pipeline
    orchestrator: AnswerOrchestrator,
}

impl AppState {
    /// Build the default backends from configuration
    pub fn new(config: QaConfig) -> Result<Self> {
        tracing::info!("Initializing application state...");

        let extractor: Arc<dyn TextExtractor> =
            Arc::new(DocumentExtractor::new(config.extraction.clone())?);

        let gateway = ChatGateway::new(&config.llm)?;
        tracing::info!(
            "Chat gateway ready ({} at {}, {} keys)",
            gateway.model(),
            config.llm.base_url,
            gateway.keys().len()
        );

        let mut orchestrator = AnswerOrchestrator::new(extractor, Arc::new(gateway), &config);
        if config.retrieval.strategy == RetrievalStrategy::Semantic {
            let embedder = OllamaEmbedder::new(config.embeddings.clone())?;
            tracing::info!("Semantic retrieval with {}", config.embeddings.model);
            orchestrator = orchestrator.with_embedder(Arc::new(embedder));
        }

        Ok(Self::from_parts(config, orchestrator))
    }

    /// Assemble state around an existing orchestrator
    pub fn from_parts(config: QaConfig, orchestrator: AnswerOrchestrator) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                orchestrator,
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &QaConfig {
        &self.inner.config
    }

    /// Get the request pipeline
    pub fn orchestrator(&self) -> &AnswerOrchestrator {
        &self.inner.orchestrator
    }

    /// Expected bearer token, if authentication is enabled
    pub fn auth_token(&self) -> Option<&str> {
        self.inner.config.auth.token.as_deref()
    }
}
