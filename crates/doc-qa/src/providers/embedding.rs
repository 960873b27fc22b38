//! Embedding backends for semantic chunk selection

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Turns chunk and question text into vectors comparable by cosine similarity
///
/// Implementations:
/// - `OllamaEmbedder`: local Ollama server (nomic-embed-text)
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, one vector per input in input order.
    ///
    /// The default embeds one text at a time and rejects vectors of differing length.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        ensure_uniform_dimensions(&embeddings)?;
        Ok(embeddings)
    }

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Vectors of differing length would make every similarity score 0
pub fn ensure_uniform_dimensions(vectors: &[Vec<f32>]) -> Result<()> {
    let Some(first) = vectors.first() else {
        return Ok(());
    };

    if first.is_empty() {
        return Err(Error::embedding("Backend returned an empty embedding"));
    }

    match vectors.iter().position(|v| v.len() != first.len()) {
        Some(i) => Err(Error::embedding(format!(
            "Embedding {} has {} dimensions, expected {}",
            i,
            vectors[i].len(),
            first.len()
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LengthEmbedder;

    #[async_trait]
    impl EmbeddingProvider for LengthEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0; text.len()])
        }

        fn name(&self) -> &str {
            "length"
        }
    }

    #[test]
    fn test_uniform_dimensions() {
        assert!(ensure_uniform_dimensions(&[]).is_ok());
        assert!(ensure_uniform_dimensions(&[vec![0.1, 0.2], vec![0.3, 0.4]]).is_ok());
        assert!(ensure_uniform_dimensions(&[vec![]]).is_err());
        assert!(matches!(
            ensure_uniform_dimensions(&[vec![0.1, 0.2], vec![0.3]]),
            Err(Error::Embedding(_))
        ));
    }

    #[tokio::test]
    async fn test_default_batch_keeps_order_and_checks_dimensions() {
        let same = LengthEmbedder
            .embed_batch(&["ab".to_string(), "cd".to_string()])
            .await
            .unwrap();
        assert_eq!(same.len(), 2);

        let mixed = LengthEmbedder
            .embed_batch(&["ab".to_string(), "cde".to_string()])
            .await;
        assert!(mixed.is_err());
    }
}
