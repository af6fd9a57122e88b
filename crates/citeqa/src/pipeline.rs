//! The question-answering service: ingestion, retrieval, and answer composition

use serde::Serialize;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::AnswerComposer;
use crate::ingestion::{Extractor, Ingestor, TextChunker};
use crate::providers::{
    embedder_from_config, index_from_config, llm_from_config, FfmpegDecoder, LlmProvider,
    OcrEngine, TesseractOcr, VectorIndex, VideoDecoder,
};
use crate::retrieval::{QueryExpander, Retriever};
use crate::types::{DocumentSource, IngestReport, QueryResult, SearchHit};

/// Collaborators the pipeline is built from
pub struct PipelineParts {
    pub index: Arc<dyn VectorIndex>,
    pub llm: Arc<dyn LlmProvider>,
    pub ocr: Arc<dyn OcrEngine>,
    pub video: Arc<dyn VideoDecoder>,
}

/// Backend summary reported by the health endpoint and the CLI
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub index: String,
    pub chunks: usize,
    pub llm: String,
    pub model: String,
    pub llm_reachable: bool,
    pub ocr: String,
    pub ocr_available: bool,
}

/// Document question answering over a vector index
pub struct RagPipeline {
    config: RagConfig,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LlmProvider>,
    ocr: Arc<dyn OcrEngine>,
    ingestor: Ingestor,
    retriever: Retriever,
    composer: AnswerComposer,
}

impl RagPipeline {
    /// Wire a pipeline from explicit collaborators
    pub fn new(config: RagConfig, parts: PipelineParts) -> Self {
        let extractor = Extractor::new(
            parts.ocr.clone(),
            parts.video,
            config.media.frame_interval_secs,
        );
        let ingestor = Ingestor::new(
            TextChunker::from_config(&config.chunking),
            extractor,
            parts.index.clone(),
        );
        let retriever = Retriever::new(
            parts.index.clone(),
            QueryExpander::new(parts.llm.clone(), config.retrieval.expansion_variants),
        );
        let composer = AnswerComposer::new(parts.llm.clone(), config.llm.refusal.clone());

        Self {
            config,
            index: parts.index,
            llm: parts.llm,
            ocr: parts.ocr,
            ingestor,
            retriever,
            composer,
        }
    }

    /// Build every collaborator from configuration
    pub fn from_config(config: RagConfig) -> Result<Self> {
        let embedder = embedder_from_config(&config)?;
        let index = index_from_config(&config, embedder.clone())?;
        let llm = llm_from_config(&config)?;

        tracing::info!(
            "Pipeline: {} embeddings ({}), {} index, {} model {}",
            embedder.name(),
            embedder.dimensions(),
            index.name(),
            llm.name(),
            llm.model()
        );

        let parts = PipelineParts {
            index,
            llm,
            ocr: Arc::new(TesseractOcr::new(&config.media)),
            video: Arc::new(FfmpegDecoder::new(&config.media)),
        };
        Ok(Self::new(config, parts))
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Answer with the configured `top_k` and expansion setting
    pub async fn ask(&self, question: &str) -> QueryResult {
        let retrieval = &self.config.retrieval;
        self.ask_with(question, retrieval.top_k, retrieval.query_expansion)
            .await
    }

    /// Answer with explicit retrieval knobs; never fails, errors become `Failed` results
    pub async fn ask_with(&self, question: &str, top_k: usize, query_expansion: bool) -> QueryResult {
        let question = question.trim();
        if question.is_empty() {
            return QueryResult::failed("question is empty");
        }

        tracing::info!("Question: {:?} (top_k={}, expansion={})", question, top_k, query_expansion);

        let candidates = match self.retriever.retrieve(question, top_k, query_expansion).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Retrieval failed: {}", e);
                return QueryResult::failed(e);
            }
        };

        let result = self.composer.answer(question, &candidates).await;
        tracing::info!(
            "Answered from {} candidates: {:?}, {} citations",
            candidates.len(),
            result.outcome,
            result.citations.len()
        );
        result
    }

    /// Ingest one document, returning the number of chunks written
    pub async fn ingest(&self, source: DocumentSource) -> Result<usize> {
        self.ingestor.ingest(source).await
    }

    /// Ingest several documents, continuing past the ones that fail to extract
    pub async fn ingest_batch(&self, sources: Vec<DocumentSource>) -> Result<IngestReport> {
        self.ingestor.ingest_batch(sources).await
    }

    /// Raw similarity search over the index, without expansion or generation
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidRequest("query is empty".to_string()));
        }
        let candidates = self.index.query(query, k).await?;
        tracing::debug!("Search {:?} returned {} hits", query, candidates.len());
        Ok(SearchHit::ranked(candidates))
    }

    /// Index size and collaborator reachability
    pub async fn status(&self) -> Result<PipelineStatus> {
        let llm_reachable = self.llm.health_check().await.unwrap_or(false);
        let ocr_available = self.ocr.health_check().await.unwrap_or(false);
        Ok(PipelineStatus {
            index: self.index.name().to_string(),
            chunks: self.index.len().await?,
            llm: self.llm.name().to_string(),
            model: self.llm.model().to_string(),
            llm_reachable,
            ocr: self.ocr.name().to_string(),
            ocr_available,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::extract::tests::{EchoOcr, ScriptedVideo};
    use crate::types::{AnswerOutcome, Candidate, Chunk};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct CountingLlm {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl LlmProvider for CountingLlm {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            *self.calls.lock() += 1;
            Ok("unused".to_string())
        }

        async fn health_check(&self) -> Result<bool> {
            Err(Error::llm("offline"))
        }

        fn name(&self) -> &str {
            "counting"
        }

        fn model(&self) -> &str {
            "counting-1"
        }
    }

    struct BrokenIndex;

    #[async_trait]
    impl VectorIndex for BrokenIndex {
        async fn add(&self, _chunks: &[Chunk]) -> Result<()> {
            Err(Error::vector_index("read-only"))
        }

        async fn query(&self, _text: &str, _k: usize) -> Result<Vec<Candidate>> {
            Err(Error::vector_index("connection refused"))
        }

        async fn len(&self) -> Result<usize> {
            Ok(0)
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(false)
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn pipeline(llm: Arc<CountingLlm>) -> RagPipeline {
        let parts = PipelineParts {
            index: Arc::new(BrokenIndex),
            llm,
            ocr: Arc::new(EchoOcr),
            video: Arc::new(ScriptedVideo {
                frame_rate: 30.0,
                frames: Vec::new(),
            }),
        };
        RagPipeline::new(RagConfig::default(), parts)
    }

    fn counting() -> Arc<CountingLlm> {
        Arc::new(CountingLlm {
            calls: Mutex::new(0),
        })
    }

    #[tokio::test]
    async fn test_blank_question_fails_without_model_call() {
        let llm = counting();
        let result = pipeline(llm.clone()).ask("   ").await;

        assert_eq!(result.outcome, AnswerOutcome::Failed);
        assert!(result.answer.contains("question is empty"));
        assert!(result.citations.is_empty());
        assert_eq!(*llm.calls.lock(), 0);
    }

    #[tokio::test]
    async fn test_retrieval_error_becomes_failed_result() {
        let result = pipeline(counting()).ask_with("Where?", 4, false).await;

        assert_eq!(result.outcome, AnswerOutcome::Failed);
        assert!(result.answer.contains("connection refused"));
        assert!(result.citations.is_empty());
    }

    #[tokio::test]
    async fn test_index_write_failure_is_an_error() {
        let source = DocumentSource::from_bytes("notes.txt", b"Some text".to_vec());
        assert!(matches!(
            pipeline(counting()).ingest(source).await,
            Err(Error::VectorIndex(_))
        ));
    }

    #[tokio::test]
    async fn test_status_reports_unreachable_model() {
        let status = pipeline(counting()).status().await.unwrap();
        assert_eq!(status.index, "broken");
        assert_eq!(status.model, "counting-1");
        assert!(!status.llm_reachable);
        assert_eq!(status.ocr, "echo");
        assert!(status.ocr_available);
    }

    #[tokio::test]
    async fn test_blank_search_is_invalid() {
        assert!(matches!(
            pipeline(counting()).search("  ", 5).await,
            Err(Error::InvalidRequest(_))
        ));
    }
}
