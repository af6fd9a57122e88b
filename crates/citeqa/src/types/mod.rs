//! Core types for the question-answering pipeline

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, DocumentKind, DocumentSource, Locator, SourceData, TextUnit};
pub use query::{AskRequest, SearchParams};
pub use response::{
    AnswerOutcome, Candidate, Citation, DocumentReport, IngestReport, IngestStatus, QueryResult,
    SearchHit,
};
