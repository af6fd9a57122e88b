//! Citation extraction from the candidates shown to the model

use std::collections::HashSet;

use crate::types::{Candidate, Citation, Locator};

/// Deduplicated citations in first-seen candidate order.
///
/// Citations come only from chunk metadata, never from model output, so
/// every citation names a position the model actually saw.
pub fn extract_citations(candidates: &[Candidate]) -> Vec<Citation> {
    let mut seen: HashSet<(&str, Locator)> = HashSet::new();

    candidates
        .iter()
        .filter(|c| seen.insert(c.chunk.citation_key()))
        .map(|c| Citation::from_chunk(&c.chunk))
        .collect()
}

/// Render citations as a bulleted list for terminal output
pub fn format_citation_list(citations: &[Citation]) -> String {
    if citations.is_empty() {
        return "No relevant sources found.".to_string();
    }
    citations
        .iter()
        .map(|c| format!("- {}", c))
        .collect::<Vec<_>>()
        .join("\n")
}
