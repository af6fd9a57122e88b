//! Retrieval: similarity queries over the vector index with multi-query expansion

pub mod expansion;
pub mod retriever;

pub use expansion::{parse_paraphrases, QueryExpander};
pub use retriever::Retriever;
