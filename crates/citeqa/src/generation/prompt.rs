//! Prompt templates for grounded answering and question paraphrasing

use crate::types::Candidate;

/// Prompt builder for the two model calls of a question
pub struct PromptBuilder;

impl PromptBuilder {
    /// Candidate texts in rank order, separated by a blank line
    pub fn build_context(candidates: &[Candidate]) -> String {
        candidates
            .iter()
            .map(|c| c.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Build the grounded answering prompt
    pub fn build_grounded_prompt(question: &str, context: &str, refusal: &str) -> String {
        format!(
            r#"Use ONLY the context provided below to answer the question.

DO NOT copy or include citation numbers such as [1], [2], [3], or references from a document's bibliography.
Ignore any citation numbers present in the text.
Do NOT write a list of sources; the system attaches page-level citations itself.

If the answer is not in the context, reply with exactly:
{refusal}

Provide the answer in clean paragraphs.

Context:
{context}

Question:
{question}

Answer:"#,
            refusal = refusal,
            context = context,
            question = question
        )
    }

    /// Build the prompt asking for alternate phrasings, one per line
    pub fn build_paraphrase_prompt(question: &str, variants: usize) -> String {
        format!(
            r#"You are an AI language model assistant. Your task is to generate {variants} different versions of the given user question to retrieve relevant documents from a vector database. By generating multiple perspectives on the user question, your goal is to help the user overcome some of the limitations of distance-based similarity search.

Provide these alternative questions separated by newlines. Output only the questions, without numbering or commentary.

Original question: {question}"#,
            variants = variants,
            question = question
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, Locator};

    #[test]
    fn test_context_joins_with_blank_line() {
        let candidates = vec![
            Candidate::new(Chunk::new("First.".to_string(), "a.pdf", Locator::Page(1), 0, 6), 0.9),
            Candidate::new(Chunk::new("Second.".to_string(), "b.pdf", Locator::Page(2), 0, 7), 0.8),
        ];
        assert_eq!(PromptBuilder::build_context(&candidates), "First.\n\nSecond.");
        assert_eq!(PromptBuilder::build_context(&[]), "");
    }

    #[test]
    fn test_grounded_prompt_carries_refusal_and_inputs() {
        let prompt = PromptBuilder::build_grounded_prompt(
            "Where does Alice live?",
            "Alice lives in Paris.",
            "I don't know based on the provided documents.",
        );
        assert!(prompt.contains("I don't know based on the provided documents."));
        assert!(prompt.contains("Context:\nAlice lives in Paris."));
        assert!(prompt.contains("Question:\nWhere does Alice live?"));
        assert!(prompt.ends_with("Answer:"));
    }

    #[test]
    fn test_paraphrase_prompt_asks_for_n_versions() {
        let prompt = PromptBuilder::build_paraphrase_prompt("Where does Alice live?", 3);
        assert!(prompt.contains("generate 3 different versions"));
        assert!(prompt.ends_with("Original question: Where does Alice live?"));
    }
}
