//! Vector index trait for storing chunks and running similarity queries

use async_trait::async_trait;
use crate::error::Result;
use crate::types::{Candidate, Chunk};

/// Trait for vector storage and similarity search
///
/// The index owns embedding: callers hand it chunk text and query text.
/// Locator metadata is written under `page`, `slide` or `frame`; a missing
/// key reads back as `Locator::NotApplicable`.
///
/// Implementations:
/// - `MemoryIndex`: in-process flat cosine scan
/// - `ChromaIndex`: Chroma server over its REST API
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Embed and store chunks in one batch
    async fn add(&self, chunks: &[Chunk]) -> Result<()>;

    /// Up to `k` candidates for `text`, most similar first
    async fn query(&self, text: &str, k: usize) -> Result<Vec<Candidate>>;

    /// Get total number of chunks stored
    async fn len(&self) -> Result<usize>;

    /// Check if index is empty
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Check if the backend is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}
