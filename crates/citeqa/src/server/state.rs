//! Shared application state for the HTTP server

use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::Result;
use crate::pipeline::RagPipeline;
use crate::types::{DocumentSource, IngestReport, QueryResult};

use super::history::{History, HistoryEntry};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pipeline: RagPipeline,
    /// Held for the duration of an upload so only one ingestion runs at a time
    ingest_lock: tokio::sync::Mutex<()>,
    history: Mutex<History>,
}

impl AppState {
    pub fn new(pipeline: RagPipeline) -> Self {
        let history = History::new(pipeline.config().server.history_size);
        Self {
            inner: Arc::new(AppStateInner {
                pipeline,
                ingest_lock: tokio::sync::Mutex::new(()),
                history: Mutex::new(history),
            }),
        }
    }

    pub fn pipeline(&self) -> &RagPipeline {
        &self.inner.pipeline
    }

    /// Ingest uploaded documents, waiting for any ingestion already running
    pub async fn ingest(&self, sources: Vec<DocumentSource>) -> Result<IngestReport> {
        let _guard = self.inner.ingest_lock.lock().await;
        self.inner.pipeline.ingest_batch(sources).await
    }

    pub fn record(&self, question: &str, result: QueryResult) {
        self.inner.history.lock().push(question, result);
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.inner.history.lock().entries()
    }
}
