//! In-process vector index with a flat cosine scan

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::{Candidate, Chunk};

use super::embedding::EmbeddingProvider;
use super::vector_store::VectorIndex;

struct Entry {
    chunk: Chunk,
    embedding: Vec<f32>,
}

/// Memory-only index; contents are lost when the process exits
pub struct MemoryIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    entries: RwLock<Vec<Entry>>,
}

impl MemoryIndex {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Snapshot of every stored chunk in insertion order
    pub fn chunks(&self) -> Vec<Chunk> {
        self.entries.read().iter().map(|e| e.chunk.clone()).collect()
    }
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn add(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(Error::vector_index(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let mut entries = self.entries.write();
        entries.extend(
            chunks
                .iter()
                .cloned()
                .zip(embeddings)
                .map(|(chunk, embedding)| Entry { chunk, embedding }),
        );
        tracing::debug!("Memory index now holds {} chunks", entries.len());
        Ok(())
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<Candidate>> {
        if k == 0 || self.entries.read().is_empty() {
            return Ok(Vec::new());
        }

        let query = self.embedder.embed(text).await?;
        let entries = self.entries.read();

        let mut scores: Vec<(f32, &Entry)> = entries
            .iter()
            .map(|e| (cosine_similarity(&query, &e.embedding), e))
            .collect();

        // Stable sort keeps insertion order among equal scores
        scores.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scores
            .into_iter()
            .take(k)
            .map(|(similarity, e)| Candidate::new(e.chunk.clone(), similarity))
            .collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().len())
    }

    async fn health_check(&self) -> Result<bool> {
        self.embedder.health_check().await
    }

    fn name(&self) -> &str {
        "memory"
    }
}
