//! Embedding service trait.

use async_trait::async_trait;

use crate::error::EmbeddingError;

/// Produces vector embeddings for semantic matching.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for text.
    ///
    /// Returns a vector (typically 1536 dimensions) for cosine search.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}
