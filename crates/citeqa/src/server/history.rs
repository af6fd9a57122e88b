//! Rolling log of recent questions and their results

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

use crate::types::QueryResult;

/// One answered question
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub question: String,
    pub result: QueryResult,
    pub asked_at: DateTime<Utc>,
}

/// Fixed-capacity history; the oldest entry is evicted first
#[derive(Debug)]
pub struct History {
    capacity: usize,
    entries: VecDeque<HistoryEntry>,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, question: impl Into<String>, result: QueryResult) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry {
            question: question.into(),
            result,
            asked_at: Utc::now(),
        });
    }

    /// Entries oldest first, newest last
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_last_entries_newest_last() {
        let mut history = History::new(5);
        for i in 0..7 {
            history.push(format!("q{}", i), QueryResult::refused("no"));
        }

        let questions: Vec<_> = history.entries().into_iter().map(|e| e.question).collect();
        assert_eq!(questions, vec!["q2", "q3", "q4", "q5", "q6"]);
    }

    #[test]
    fn test_zero_capacity_records_nothing() {
        let mut history = History::new(0);
        history.push("q", QueryResult::refused("no"));
        assert!(history.entries().is_empty());
    }
}
