//! Multi-query expansion: alternate phrasings of a question from the LLM

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::Result;
use crate::generation::PromptBuilder;
use crate::providers::LlmProvider;

/// Generates alternate phrasings of a question
pub struct QueryExpander {
    llm: Arc<dyn LlmProvider>,
    variants: usize,
}

impl QueryExpander {
    pub fn new(llm: Arc<dyn LlmProvider>, variants: usize) -> Self {
        Self { llm, variants }
    }

    /// Up to `variants` phrasings distinct from `question`, in generation order
    pub async fn expand(&self, question: &str) -> Result<Vec<String>> {
        if self.variants == 0 {
            return Ok(Vec::new());
        }

        let prompt = PromptBuilder::build_paraphrase_prompt(question, self.variants);
        let output = self.llm.complete(&prompt).await?;
        let phrasings = parse_paraphrases(&output, question, self.variants);

        tracing::debug!("Generated {} alternate phrasings: {:?}", phrasings.len(), phrasings);
        Ok(phrasings)
    }
}

/// Parse model output into phrasings, one per line.
///
/// Numbering and bullets are stripped; blank lines, repeats, and copies of
/// the original question are dropped; at most `limit` are kept.
pub fn parse_paraphrases(output: &str, original: &str, limit: usize) -> Vec<String> {
    let original = original.trim().to_lowercase();
    let mut seen = HashSet::new();

    output
        .lines()
        .map(clean_line)
        .filter(|line| !line.is_empty())
        .filter(|line| {
            let key = line.to_lowercase();
            key != original && seen.insert(key)
        })
        .take(limit)
        .collect()
}

fn clean_line(line: &str) -> String {
    let mut text = line.trim();

    // "1." / "2)" / "3:" numbering
    let digits = text.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = text[digits..].strip_prefix(['.', ')', ':']) {
            text = rest.trim_start();
        }
    }

    // Bullets
    if let Some(rest) = text.strip_prefix(['-', '*', '\u{2022}']) {
        text = rest.trim_start();
    }

    let text = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text);

    text.trim().to_string()
}
