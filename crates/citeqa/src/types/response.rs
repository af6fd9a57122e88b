//! Response types for questions and ingestion

use serde::{Deserialize, Serialize};
use std::fmt;

use super::document::{Chunk, DocumentKind, Locator};

/// A retrieved chunk with the similarity reported by the index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub chunk: Chunk,
    /// Similarity score, higher is closer
    pub similarity: f32,
}

impl Candidate {
    pub fn new(chunk: Chunk, similarity: f32) -> Self {
        Self { chunk, similarity }
    }
}

/// Citation to a source position that was shown to the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Citation {
    /// Source document name
    pub source_id: String,
    /// Page, slide or frame inside the source
    pub locator: Locator,
}

impl Citation {
    pub fn new(source_id: impl Into<String>, locator: Locator) -> Self {
        Self {
            source_id: source_id.into(),
            locator,
        }
    }

    /// Create a citation from a chunk's provenance
    pub fn from_chunk(chunk: &Chunk) -> Self {
        Self::new(chunk.source_id.clone(), chunk.locator)
    }
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.locator {
            Locator::NotApplicable => f.write_str(&self.source_id),
            locator => write!(f, "{}, {}", self.source_id, locator),
        }
    }
}

/// How a question was resolved
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    /// The model produced a grounded answer
    Answered,
    /// The context did not support an answer
    Refused,
    /// Retrieval or generation failed
    Failed,
}

/// Answer to one question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    pub answer: String,
    /// Deduplicated in first-seen candidate order
    pub citations: Vec<Citation>,
    pub outcome: AnswerOutcome,
}

impl QueryResult {
    pub fn answered(answer: String, citations: Vec<Citation>) -> Self {
        Self {
            answer,
            citations,
            outcome: AnswerOutcome::Answered,
        }
    }

    /// Refusal never carries citations
    pub fn refused(refusal: impl Into<String>) -> Self {
        Self {
            answer: refusal.into(),
            citations: Vec::new(),
            outcome: AnswerOutcome::Refused,
        }
    }

    pub fn failed(message: impl fmt::Display) -> Self {
        Self {
            answer: format!("Unable to generate an answer: {}", message),
            citations: Vec::new(),
            outcome: AnswerOutcome::Failed,
        }
    }

    pub fn is_refusal(&self) -> bool {
        self.outcome == AnswerOutcome::Refused
    }
}

/// Result of ingesting one document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum IngestStatus {
    /// At least one chunk was written
    Indexed,
    /// Extraction succeeded but produced no text
    Empty,
    /// Extraction failed; the document was skipped
    Failed(String),
}

/// Per-document ingestion summary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentReport {
    pub source_id: String,
    pub kind: Option<DocumentKind>,
    /// Extracted units (pages, slides, frames)
    pub units: usize,
    pub chunks: usize,
    #[serde(flatten)]
    pub status: IngestStatus,
}

/// Summary of a batch ingestion
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IngestReport {
    pub documents: Vec<DocumentReport>,
    pub total_chunks: usize,
}

impl IngestReport {
    /// Number of documents that were skipped after a failure
    pub fn failed_count(&self) -> usize {
        self.documents
            .iter()
            .filter(|d| matches!(d.status, IngestStatus::Failed(_)))
            .count()
    }
}

/// Characters of chunk text shown in a search listing
const PREVIEW_CHARS: usize = 100;

/// One ranked index hit, as listed by the search command and endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    /// Position in the result list, starting at 1
    pub rank: usize,
    pub citation: Citation,
    pub similarity: f32,
    pub preview: String,
}

impl SearchHit {
    /// Number candidates in index order
    pub fn ranked(candidates: Vec<Candidate>) -> Vec<Self> {
        candidates
            .into_iter()
            .enumerate()
            .map(|(i, candidate)| Self {
                rank: i + 1,
                citation: Citation::from_chunk(&candidate.chunk),
                similarity: candidate.similarity,
                preview: candidate.chunk.text.chars().take(PREVIEW_CHARS).collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_citation_display() {
        assert_eq!(Citation::new("doc1.pdf", Locator::Page(1)).to_string(), "doc1.pdf, p.1");
        assert_eq!(Citation::new("deck.pptx", Locator::Slide(3)).to_string(), "deck.pptx, slide 3");
        assert_eq!(Citation::new("clip.mp4", Locator::Frame(900)).to_string(), "clip.mp4, frame 900");
        assert_eq!(Citation::new("photo.png", Locator::NotApplicable).to_string(), "photo.png");
    }

    #[test]
    fn test_failed_result_has_no_citations() {
        let result = QueryResult::failed("connection refused");
        assert_eq!(result.answer, "Unable to generate an answer: connection refused");
        assert!(result.citations.is_empty());
        assert_eq!(result.outcome, AnswerOutcome::Failed);
    }

    #[test]
    fn test_report_serializes_status_inline() {
        let report = DocumentReport {
            source_id: "bad.pdf".to_string(),
            kind: Some(DocumentKind::PagedText),
            units: 0,
            chunks: 0,
            status: IngestStatus::Failed("corrupt".to_string()),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["message"], "corrupt");
    }

    #[test]
    fn test_search_hits_rank_from_one_and_truncate_by_chars() {
        let long = "é".repeat(150);
        let candidates = vec![
            Candidate::new(Chunk::new(long, "doc1.pdf", Locator::Page(2), 0, 300), 0.9),
            Candidate::new(Chunk::new("short".to_string(), "notes.txt", Locator::NotApplicable, 0, 5), 0.4),
        ];

        let hits = SearchHit::ranked(candidates);

        assert_eq!(hits[0].rank, 1);
        assert_eq!(hits[0].citation.to_string(), "doc1.pdf, p.2");
        assert_eq!(hits[0].preview.chars().count(), 100);
        assert_eq!(hits[1].rank, 2);
        assert_eq!(hits[1].preview, "short");
        assert_eq!(hits[1].similarity, 0.4);
    }
}
