//! Provider abstractions for embeddings, LLM, vector index, OCR and video
//!
//! Trait-based seams so the pipeline can switch between local (Ollama,
//! in-memory) and hosted (OpenAI-compatible, Chroma) backends.

pub mod chroma;
pub mod embedding;
pub mod hash;
mod http;
pub mod llm;
pub mod memory;
pub mod ocr;
pub mod ollama;
pub mod openai;
pub mod vector_store;
pub mod video;

use std::sync::Arc;

use crate::config::{EmbeddingBackend, LlmBackend, RagConfig, VectorBackend};
use crate::error::Result;

pub use chroma::ChromaIndex;
pub use embedding::EmbeddingProvider;
pub use hash::HashEmbedder;
pub use llm::LlmProvider;
pub use memory::MemoryIndex;
pub use ocr::{OcrEngine, TesseractOcr};
pub use ollama::{OllamaEmbedder, OllamaLlm};
pub use openai::OpenAiCompatLlm;
pub use vector_store::VectorIndex;
pub use video::{FfmpegDecoder, VideoDecoder, VideoFrame, VideoInfo};

/// Embedding provider selected by `embeddings.backend`
pub fn embedder_from_config(config: &RagConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    Ok(match config.embeddings.backend {
        EmbeddingBackend::Ollama => Arc::new(OllamaEmbedder::new(&config.embeddings)?),
        EmbeddingBackend::Hash => Arc::new(HashEmbedder::new(config.embeddings.dimensions)),
    })
}

/// Vector index selected by `vector_store.backend`
pub fn index_from_config(
    config: &RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
) -> Result<Arc<dyn VectorIndex>> {
    Ok(match config.vector_store.backend {
        VectorBackend::Memory => Arc::new(MemoryIndex::new(embedder)),
        VectorBackend::Chroma => Arc::new(ChromaIndex::new(&config.vector_store, embedder)?),
    })
}

/// Language model selected by `llm.backend`
pub fn llm_from_config(config: &RagConfig) -> Result<Arc<dyn LlmProvider>> {
    Ok(match config.llm.backend {
        LlmBackend::Ollama => Arc::new(OllamaLlm::new(&config.llm)?),
        LlmBackend::OpenAiCompat => Arc::new(OpenAiCompatLlm::new(&config.llm)?),
    })
}
