//! Document ingestion: per-kind extraction, chunking, and indexing

pub mod chunker;
pub mod extract;
pub mod ingestor;

pub use chunker::{split, TextChunker};
pub use extract::{pdf_pages, pptx_slides, Extractor};
pub use ingestor::Ingestor;
