//! Embedding-based relevance selection with per-question rank interleaving

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use super::lexical::LexicalSelector;
use super::{accumulate_within_budget, RelevanceSelector};
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::Chunk;

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Merge per-question rankings rank by rank: every question's best match,
/// then every question's second best, and so on
pub fn interleave_rankings<T: Copy>(rankings: &[Vec<T>]) -> Vec<T> {
    let depth = rankings.iter().map(Vec::len).max().unwrap_or(0);
    let mut merged = Vec::with_capacity(rankings.iter().map(Vec::len).sum());

    for rank in 0..depth {
        for ranking in rankings {
            if let Some(&item) = ranking.get(rank) {
                merged.push(item);
            }
        }
    }

    merged
}

/// Chunk embeddings for one document, keyed by chunk index
#[derive(Debug, Clone, Default)]
pub struct SemanticIndex {
    embeddings: HashMap<usize, Vec<f32>>,
}

impl SemanticIndex {
    /// Embed every chunk once
    pub async fn build(embedder: &dyn EmbeddingProvider, chunks: &[Chunk]) -> Result<Self> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await?;

        if vectors.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        tracing::info!("Embedded {} chunks with {}", chunks.len(), embedder.name());
        Ok(Self::from_embeddings(
            chunks.iter().map(|c| c.index).zip(vectors),
        ))
    }

    /// Build from precomputed `(chunk index, embedding)` pairs
    pub fn from_embeddings(pairs: impl IntoIterator<Item = (usize, Vec<f32>)>) -> Self {
        Self {
            embeddings: pairs.into_iter().collect(),
        }
    }

    /// Number of embedded chunks
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    /// Whether no chunk is embedded
    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    /// Chunks scoring above `threshold` against `query`, best first, at most `top_k`
    pub fn rank<'c>(
        &self,
        chunks: &'c [Chunk],
        query: &[f32],
        threshold: f32,
        top_k: usize,
    ) -> Vec<&'c Chunk> {
        let mut scored: Vec<(&Chunk, f32)> = chunks
            .iter()
            .filter_map(|chunk| {
                let embedding = self.embeddings.get(&chunk.index)?;
                let score = cosine_similarity(embedding, query);
                (score > threshold).then_some((chunk, score))
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);
        scored.into_iter().map(|(chunk, _)| chunk).collect()
    }
}

/// Selects chunks by embedding similarity to each question
pub struct SemanticSelector {
    index: SemanticIndex,
    embedder: Arc<dyn EmbeddingProvider>,
    similarity_threshold: f32,
    top_k: usize,
    smart_trim: bool,
    fallback: LexicalSelector,
}

impl SemanticSelector {
    /// Create a selector over an already built index
    pub fn new(
        index: SemanticIndex,
        embedder: Arc<dyn EmbeddingProvider>,
        similarity_threshold: f32,
        top_k: usize,
        smart_trim: bool,
    ) -> Self {
        Self {
            index,
            embedder,
            similarity_threshold,
            top_k,
            smart_trim,
            fallback: LexicalSelector::new(smart_trim),
        }
    }
}

#[async_trait]
impl RelevanceSelector for SemanticSelector {
    async fn select(&self, chunks: &[Chunk], questions: &[String], max_chars: usize) -> Vec<String> {
        if chunks.is_empty() || questions.is_empty() {
            return self.fallback.select_sync(chunks, questions, max_chars);
        }

        let question_vectors = match self.embedder.embed_batch(questions).await {
            Ok(vectors) => vectors,
            Err(e) => {
                tracing::warn!("Question embedding failed, using lexical selection: {}", e);
                return self.fallback.select_sync(chunks, questions, max_chars);
            }
        };

        let rankings: Vec<Vec<&Chunk>> = question_vectors
            .iter()
            .map(|q| self.index.rank(chunks, q, self.similarity_threshold, self.top_k))
            .collect();

        let merged = interleave_rankings(&rankings);
        let candidates: Vec<&str> = if merged.is_empty() {
            tracing::warn!(
                "No chunk passed similarity threshold {}, using document order",
                self.similarity_threshold
            );
            chunks.iter().map(|c| c.text.as_str()).collect()
        } else {
            merged.iter().map(|c| c.text.as_str()).collect()
        };

        accumulate_within_budget(candidates, max_chars, self.smart_trim)
    }

    fn name(&self) -> &str {
        "semantic"
    }
}
