//! Answer generation with LLM and citation handling

pub mod citation;
pub mod composer;
pub mod prompt;

pub use citation::{extract_citations, format_citation_list};
pub use composer::{classify, AnswerComposer, Generation};
pub use prompt::PromptBuilder;

/// Reply the model is told to give when the context does not hold the answer
pub const DEFAULT_REFUSAL: &str = "I don't know based on the provided documents.";
