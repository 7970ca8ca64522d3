//! Embedder trait for turning text into fixed-dimension vectors

use async_trait::async_trait;

use crate::error::Result;

/// Trait for generating text embeddings
///
/// Implementations:
/// - `LlamaEmbedder`: llama.cpp server `/embedding` endpoint
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embeddings for a batch of texts, one vector per input,
    /// preserving order
    async fn tokenize(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embedding dimensions (e.g. 384 for MiniLM-class models)
    fn dimensions(&self) -> usize;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
