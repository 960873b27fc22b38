//! Ollama embedding provider

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{EmbeddingConfig, RetryConfig};
use crate::error::{Error, GatewayError, Result};

use super::embedding::{ensure_uniform_dimensions, EmbeddingProvider};
use super::retry::RetryPolicy;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Ollama embedding provider using nomic-embed-text or similar models
pub struct OllamaEmbedder {
    client: Client,
    config: EmbeddingConfig,
    retry: RetryPolicy,
}

impl OllamaEmbedder {
    /// Create a new Ollama embedder
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            client,
            config,
            retry: RetryPolicy::from(&RetryConfig::default()),
        })
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn embed_once(&self, text: &str) -> std::result::Result<Vec<f32>, GatewayError> {
        let url = format!("{}/api/embeddings", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                model: &self.config.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::from_status(status.as_u16(), body));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(format!("Invalid embedding response: {}", e)))?;
        Ok(parsed.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.retry
            .run("Ollama embedding", |_| self.embed_once(text))
            .await
            .map_err(|e| Error::embedding(e.to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // Ollama's embeddings endpoint takes one prompt, so batches are concurrent requests
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size.max(1)) {
            let results = join_all(batch.iter().map(|text| self.embed(text))).await;
            for result in results {
                embeddings.push(result?);
            }
        }
        ensure_uniform_dimensions(&embeddings)?;
        Ok(embeddings)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
