//! Answer composition: one grounded model call plus deterministic citations

use std::sync::Arc;

use crate::error::Result;
use crate::providers::LlmProvider;
use crate::types::{Candidate, QueryResult};

use super::citation::extract_citations;
use super::prompt::PromptBuilder;

/// Outcome of the grounded model call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    /// The model answered from the context
    Answer(String),
    /// The model replied with the refusal string
    Refusal,
}

/// Classify trimmed model output against the exact refusal string.
/// One pair of surrounding straight or curly double quotes is ignored.
pub fn classify(output: &str, refusal: &str) -> Generation {
    let trimmed = output.trim();
    let unquoted = strip_quotes(trimmed).trim();

    if trimmed == refusal || unquoted == refusal {
        Generation::Refusal
    } else {
        Generation::Answer(trimmed.to_string())
    }
}

fn strip_quotes(text: &str) -> &str {
    const PAIRS: &[(char, char)] = &[('"', '"'), ('\u{201C}', '\u{201D}')];

    PAIRS
        .iter()
        .find_map(|&(open, close)| {
            text.strip_prefix(open)
                .and_then(|rest| rest.strip_suffix(close))
        })
        .unwrap_or(text)
}

/// Produces answers grounded in retrieved candidates
pub struct AnswerComposer {
    llm: Arc<dyn LlmProvider>,
    refusal: String,
}

impl AnswerComposer {
    pub fn new(llm: Arc<dyn LlmProvider>, refusal: impl Into<String>) -> Self {
        Self {
            llm,
            refusal: refusal.into(),
        }
    }

    /// Run the grounded prompt once and classify the output
    pub async fn generate(&self, question: &str, candidates: &[Candidate]) -> Result<Generation> {
        let context = PromptBuilder::build_context(candidates);
        let prompt = PromptBuilder::build_grounded_prompt(question, &context, &self.refusal);

        tracing::debug!(
            "Generating answer from {} candidates with {}",
            candidates.len(),
            self.llm.model()
        );
        let output = self.llm.complete(&prompt).await?;
        Ok(classify(&output, &self.refusal))
    }

    /// Answer a question from candidates; model failures become a `Failed` result
    pub async fn answer(&self, question: &str, candidates: &[Candidate]) -> QueryResult {
        if candidates.is_empty() {
            tracing::info!("No candidates retrieved, refusing without a model call");
            return QueryResult::refused(&self.refusal);
        }

        match self.generate(question, candidates).await {
            Ok(Generation::Answer(text)) => {
                QueryResult::answered(text, extract_citations(candidates))
            }
            Ok(Generation::Refusal) => QueryResult::refused(&self.refusal),
            Err(e) => {
                tracing::warn!("Answer generation failed: {}", e);
                QueryResult::failed(e)
            }
        }
    }
}
