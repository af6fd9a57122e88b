//! Chroma vector store client (REST API v1)
//!
//! Embeddings are computed client-side and sent with each add/query, so the
//! collection works with any embedding provider. The collection is created
//! with cosine space and similarity is reported as `1 - distance`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::config::VectorStoreConfig;
use crate::error::{Error, Result};
use crate::types::{Candidate, Chunk};

use super::embedding::EmbeddingProvider;
use super::http::{build_client, check_status};
use super::vector_store::VectorIndex;

/// Chroma-backed vector index
pub struct ChromaIndex {
    client: Client,
    base_url: String,
    collection: String,
    collection_id: OnceCell<String>,
    embedder: Arc<dyn EmbeddingProvider>,
}

#[derive(Deserialize)]
struct CollectionResponse {
    id: String,
}

#[derive(Serialize)]
struct AddRequest<'a> {
    ids: Vec<String>,
    embeddings: Vec<Vec<f32>>,
    metadatas: Vec<Map<String, Value>>,
    documents: Vec<&'a str>,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query_embeddings: Vec<Vec<f32>>,
    n_results: usize,
    include: [&'a str; 3],
}

#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Map<String, Value>>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<f32>>>,
}

impl ChromaIndex {
    pub fn new(config: &VectorStoreConfig, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            base_url: config.chroma_url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
            collection_id: OnceCell::new(),
            embedder,
        })
    }

    /// Resolve (creating if needed) the collection id once per process
    async fn collection_id(&self) -> Result<&str> {
        let id = self
            .collection_id
            .get_or_try_init(|| async {
                let url = format!("{}/api/v1/collections", self.base_url);
                let body = json!({
                    "name": self.collection,
                    "get_or_create": true,
                    "metadata": { "hnsw:space": "cosine" },
                });

                let response = self
                    .client
                    .post(&url)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| Error::vector_index(format!("Chroma request failed: {}", e)))?;
                let response = check_status(response, "Chroma collection", Error::VectorIndex).await?;
                let collection: CollectionResponse = response
                    .json()
                    .await
                    .map_err(|e| Error::vector_index(format!("Invalid collection response: {}", e)))?;

                tracing::info!("Using Chroma collection '{}' ({})", self.collection, collection.id);
                Ok::<_, Error>(collection.id)
            })
            .await?;
        Ok(id.as_str())
    }

    async fn post_json(&self, path: &str, body: &impl Serialize) -> Result<reqwest::Response> {
        let id = self.collection_id().await?;
        let url = format!("{}/api/v1/collections/{}/{}", self.base_url, id, path);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::vector_index(format!("Chroma {} failed: {}", path, e)))?;
        check_status(response, "Chroma", Error::VectorIndex).await
    }
}

/// Flatten the nested single-query response into candidates
fn candidates_from_response(response: QueryResponse) -> Vec<Candidate> {
    let ids = response.ids.into_iter().next().unwrap_or_default();
    let documents = response
        .documents
        .and_then(|d| d.into_iter().next())
        .unwrap_or_default();
    let metadatas = response
        .metadatas
        .and_then(|m| m.into_iter().next())
        .unwrap_or_default();
    let distances = response
        .distances
        .and_then(|d| d.into_iter().next())
        .unwrap_or_default();

    ids.iter()
        .enumerate()
        .filter_map(|(i, id)| {
            let text = documents.get(i).cloned().flatten()?;
            if text.trim().is_empty() {
                return None;
            }
            let meta = metadatas.get(i).cloned().flatten().unwrap_or_default();
            let similarity = distances.get(i).map(|d| 1.0 - d).unwrap_or(0.0);
            Some(Candidate::new(
                Chunk::from_vector_metadata(id, text, &meta),
                similarity,
            ))
        })
        .collect()
}

#[async_trait]
impl VectorIndex for ChromaIndex {
    async fn add(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let request = AddRequest {
            ids: chunks.iter().map(|c| c.id.to_string()).collect(),
            embeddings,
            metadatas: chunks.iter().map(Chunk::to_vector_metadata).collect(),
            documents: chunks.iter().map(|c| c.text.as_str()).collect(),
        };

        self.post_json("add", &request).await?;
        tracing::debug!("Added {} chunks to Chroma collection '{}'", chunks.len(), self.collection);
        Ok(())
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<Candidate>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(text).await?;
        let request = QueryRequest {
            query_embeddings: vec![embedding],
            n_results: k,
            include: ["documents", "metadatas", "distances"],
        };

        let response: QueryResponse = self
            .post_json("query", &request)
            .await?
            .json()
            .await
            .map_err(|e| Error::vector_index(format!("Invalid query response: {}", e)))?;

        Ok(candidates_from_response(response))
    }

    async fn len(&self) -> Result<usize> {
        let id = self.collection_id().await?;
        let url = format!("{}/api/v1/collections/{}/count", self.base_url, id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::vector_index(format!("Chroma count failed: {}", e)))?;
        let response = check_status(response, "Chroma count", Error::VectorIndex).await?;
        response
            .json::<usize>()
            .await
            .map_err(|e| Error::vector_index(format!("Invalid count response: {}", e)))
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/v1/heartbeat", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "chroma"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Locator;

    #[test]
    fn test_candidates_from_query_response() {
        let response: QueryResponse = serde_json::from_value(json!({
            "ids": [["6f1c3c1e-8a4e-4d8e-9a57-2c7d8a1e0b11", "b"]],
            "documents": [["Alice lives in Paris.", "Slide text"]],
            "metadatas": [[
                {"source": "doc1.pdf", "page": 1, "byte_start": 0, "byte_end": 21},
                {"source": "deck.pptx", "slide": 3}
            ]],
            "distances": [[0.25, 0.5]]
        }))
        .unwrap();

        let candidates = candidates_from_response(response);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].chunk.source_id, "doc1.pdf");
        assert_eq!(candidates[0].chunk.locator, Locator::Page(1));
        assert_eq!(candidates[0].chunk.id.to_string(), "6f1c3c1e-8a4e-4d8e-9a57-2c7d8a1e0b11");
        assert!((candidates[0].similarity - 0.75).abs() < 1e-6);
        assert_eq!(candidates[1].chunk.locator, Locator::Slide(3));
    }

    #[test]
    fn test_empty_query_response() {
        let response: QueryResponse = serde_json::from_value(json!({"ids": [[]]})).unwrap();
        assert!(candidates_from_response(response).is_empty());
    }

    #[test]
    fn test_blank_documents_are_dropped() {
        let response: QueryResponse = serde_json::from_value(json!({
            "ids": [["a"]],
            "documents": [[null]],
            "metadatas": [[{"source": "x.png"}]],
            "distances": [[0.1]]
        }))
        .unwrap();
        assert!(candidates_from_response(response).is_empty());
    }
}
