//! Text chunking with locator and offset tracking
//!
//! Windows hold at most `chunk_size` characters and share up to `overlap`
//! characters with their predecessor. A window ends at the last paragraph
//! break in reach, else the last line break, sentence boundary or whitespace,
//! and only then at a hard character cut.

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::types::{Chunk, Locator, TextUnit};

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker, clamping settings that could never make progress
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = if chunk_size == 0 {
            tracing::warn!("chunk_size of 0 clamped to 1");
            1
        } else {
            chunk_size
        };

        let overlap = if overlap >= chunk_size {
            tracing::warn!(
                "chunk_overlap {} >= chunk_size {}, clamped to {}",
                overlap,
                chunk_size,
                chunk_size - 1
            );
            chunk_size - 1
        } else {
            overlap
        };

        Self { chunk_size, overlap }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Chunk one extracted unit; every chunk carries the unit's locator and extras
    pub fn chunk_unit(&self, unit: &TextUnit, source_id: &str) -> Vec<Chunk> {
        let mut chunks = self.split(&unit.text, source_id, unit.locator);
        if !unit.extra.is_empty() {
            for chunk in &mut chunks {
                chunk.extra = unit.extra.clone();
            }
        }
        chunks
    }

    /// Split text into overlapping windows that all share `source_id` and `locator`
    pub fn split(&self, text: &str, source_id: &str, locator: Locator) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let layout = Layout::new(text);
        let n = layout.chars.len();
        let mut chunks = Vec::new();
        let mut start = 0usize;

        loop {
            let end = if n - start <= self.chunk_size {
                n
            } else {
                let lo = start + self.overlap;
                let hi = start + self.chunk_size;
                layout.best_break(lo, hi).unwrap_or(hi)
            };

            let (byte_start, byte_end) = (layout.bounds[start], layout.bounds[end]);
            let window = &text[byte_start..byte_end];
            if !window.trim().is_empty() {
                chunks.push(Chunk::new(
                    window.to_string(),
                    source_id,
                    locator,
                    byte_start,
                    byte_end,
                ));
            }

            if end == n {
                break;
            }
            start = layout.next_start(end - self.overlap, end);
        }

        chunks
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}

/// Split `text` with explicit settings
pub fn split(
    text: &str,
    source_id: &str,
    locator: Locator,
    max_size: usize,
    overlap: usize,
) -> Vec<Chunk> {
    TextChunker::new(max_size, overlap).split(text, source_id, locator)
}

/// Character layout of a text plus candidate break positions, all as char indices.
/// A break position `p` means a window may end right before char `p`.
struct Layout {
    chars: Vec<char>,
    /// Byte offset of every char, plus the text length
    bounds: Vec<usize>,
    paragraphs: Vec<usize>,
    lines: Vec<usize>,
    sentences: Vec<usize>,
    words: Vec<usize>,
}

impl Layout {
    fn new(text: &str) -> Self {
        let mut chars = Vec::new();
        let mut bounds = Vec::new();
        for (i, c) in text.char_indices() {
            bounds.push(i);
            chars.push(c);
        }
        bounds.push(text.len());

        let mut paragraphs = Vec::new();
        let mut lines = Vec::new();
        let mut words = Vec::new();
        for p in 1..=chars.len() {
            let prev = chars[p - 1];
            if prev == '\n' {
                lines.push(p);
                if p >= 2 && chars[p - 2] == '\n' {
                    paragraphs.push(p);
                }
            }
            if prev.is_whitespace() {
                words.push(p);
            }
        }

        let sentences = text
            .split_sentence_bound_indices()
            .map(|(i, s)| i + s.len())
            .filter_map(|byte| bounds.binary_search(&byte).ok())
            .collect();

        Self {
            chars,
            bounds,
            paragraphs,
            lines,
            sentences,
            words,
        }
    }

    /// Highest-priority break in `(lo, hi]`, taking the last one of that kind
    fn best_break(&self, lo: usize, hi: usize) -> Option<usize> {
        [&self.paragraphs, &self.lines, &self.sentences, &self.words]
            .into_iter()
            .find_map(|breaks| last_in_range(breaks, lo, hi))
    }

    /// Start of the next window: `from`, moved past the word it lands in when
    /// whitespace occurs before `end`
    fn next_start(&self, from: usize, end: usize) -> usize {
        if from == 0 || self.chars[from - 1].is_whitespace() {
            return from;
        }
        (from..end)
            .find(|&i| self.chars[i].is_whitespace())
            .map(|i| i + 1)
            .unwrap_or(from)
    }
}

fn last_in_range(sorted: &[usize], lo: usize, hi: usize) -> Option<usize> {
    let idx = sorted.partition_point(|&p| p <= hi);
    if idx == 0 {
        return None;
    }
    let p = sorted[idx - 1];
    (p > lo).then_some(p)
}
