//! citeqa: document question answering with page-level citations
//!
//! Documents (PDF pages, slide decks, images, video frames, plain text) are
//! split into located chunks and written to a vector index. Questions are
//! answered by a language model from retrieved chunks only, and every answer
//! carries citations taken from the chunks the model was shown.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use generation::DEFAULT_REFUSAL;
pub use pipeline::{PipelineParts, PipelineStatus, RagPipeline};
pub use types::{
    AnswerOutcome, Candidate, Chunk, Citation, DocumentKind, DocumentSource, IngestReport,
    IngestStatus, Locator, QueryResult, SearchHit, TextUnit,
};
