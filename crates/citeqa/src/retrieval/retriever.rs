//! Candidate retrieval with optional multi-query expansion

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::Result;
use crate::providers::VectorIndex;
use crate::types::{Candidate, Locator};

use super::expansion::QueryExpander;

/// Retrieves deduplicated candidates for a question
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    expander: QueryExpander,
}

/// First-seen merge keyed by `(source_id, locator)`
#[derive(Default)]
struct CandidateSet {
    seen: HashSet<(String, Locator)>,
    candidates: Vec<Candidate>,
}

impl CandidateSet {
    fn extend(&mut self, batch: Vec<Candidate>) {
        for candidate in batch {
            let key = (candidate.chunk.source_id.clone(), candidate.chunk.locator);
            if self.seen.insert(key) {
                self.candidates.push(candidate);
            }
        }
    }
}

impl Retriever {
    pub fn new(index: Arc<dyn VectorIndex>, expander: QueryExpander) -> Self {
        Self { index, expander }
    }

    /// Retrieve candidates for `question`.
    ///
    /// `top_k` bounds each per-phrasing query, not the merged result. With
    /// expansion on, the original question is queried first and each
    /// alternate phrasing after it in generation order. Expansion failures
    /// and failing alternate queries degrade to fewer phrasings; a failing
    /// original query is an error.
    pub async fn retrieve(
        &self,
        question: &str,
        top_k: usize,
        query_expansion: bool,
    ) -> Result<Vec<Candidate>> {
        let phrasings = if query_expansion {
            match self.expander.expand(question).await {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!("Query expansion failed, using the original question only: {}", e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let mut merged = CandidateSet::default();
        merged.extend(self.index.query(question, top_k).await?);

        for phrasing in &phrasings {
            match self.index.query(phrasing, top_k).await {
                Ok(batch) => merged.extend(batch),
                Err(e) => tracing::warn!("Skipping phrasing {:?}: {}", phrasing, e),
            }
        }

        tracing::debug!(
            "Retrieved {} unique candidates from {} phrasings",
            merged.candidates.len(),
            phrasings.len() + 1
        );
        Ok(merged.candidates)
    }
}
