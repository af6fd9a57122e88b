//! Ingestion: extract, chunk, and index documents

use std::sync::Arc;
use std::time::Instant;

use crate::error::Result;
use crate::providers::VectorIndex;
use crate::types::{Chunk, DocumentReport, DocumentSource, IngestReport, IngestStatus};

use super::chunker::TextChunker;
use super::extract::Extractor;

/// Writes documents into the vector index
pub struct Ingestor {
    chunker: TextChunker,
    extractor: Extractor,
    index: Arc<dyn VectorIndex>,
}

impl Ingestor {
    pub fn new(chunker: TextChunker, extractor: Extractor, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            chunker,
            extractor,
            index,
        }
    }

    /// Ingest one document and return the number of chunks written.
    ///
    /// An extraction failure is reported as zero chunks, like in a batch.
    pub async fn ingest(&self, source: DocumentSource) -> Result<usize> {
        let report = self.ingest_batch(vec![source]).await?;
        Ok(report.total_chunks)
    }

    /// Ingest a batch, continuing past documents that fail to extract.
    ///
    /// All chunks are written with a single index call; an index failure
    /// fails the whole batch.
    pub async fn ingest_batch(&self, sources: Vec<DocumentSource>) -> Result<IngestReport> {
        let start = Instant::now();
        let mut report = IngestReport::default();
        let mut pending: Vec<Chunk> = Vec::new();

        for source in &sources {
            let (document, chunks) = self.prepare(source).await;
            report.total_chunks += chunks.len();
            report.documents.push(document);
            pending.extend(chunks);
        }

        if !pending.is_empty() {
            self.index.add(&pending).await?;
        }

        tracing::info!(
            "Ingested {} documents ({} failed) into {} chunks in {:.1}s",
            report.documents.len(),
            report.failed_count(),
            report.total_chunks,
            start.elapsed().as_secs_f64()
        );
        Ok(report)
    }

    /// Extract and chunk one document without touching the index
    async fn prepare(&self, source: &DocumentSource) -> (DocumentReport, Vec<Chunk>) {
        let mut document = DocumentReport {
            source_id: source.name.clone(),
            kind: source.kind,
            units: 0,
            chunks: 0,
            status: IngestStatus::Empty,
        };

        let units = match self.extractor.extract(source).await {
            Ok(units) => units,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", source.name, e);
                document.status = IngestStatus::Failed(e.to_string());
                return (document, Vec::new());
            }
        };

        let chunks: Vec<Chunk> = units
            .iter()
            .flat_map(|unit| self.chunker.chunk_unit(unit, &source.name))
            .collect();

        document.units = units.len();
        document.chunks = chunks.len();
        if chunks.is_empty() {
            tracing::info!("No text found in {}", source.name);
        } else {
            document.status = IngestStatus::Indexed;
            tracing::info!(
                "Prepared {}: {} units, {} chunks",
                source.name,
                document.units,
                document.chunks
            );
        }

        (document, chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::extract::tests::{build_pptx, EchoOcr, ScriptedVideo};
    use crate::providers::{HashEmbedder, MemoryIndex};
    use crate::types::{DocumentKind, Locator, TextUnit};

    fn ingestor() -> (Ingestor, Arc<MemoryIndex>) {
        let index = Arc::new(MemoryIndex::new(Arc::new(HashEmbedder::new(64))));
        let video = ScriptedVideo {
            frame_rate: 25.0,
            frames: vec!["Opening title"],
        };
        let extractor = Extractor::new(Arc::new(EchoOcr), Arc::new(video), 30.0);
        (Ingestor::new(TextChunker::new(200, 20), extractor, index.clone()), index)
    }

    fn alice_pdf() -> DocumentSource {
        DocumentSource::pre_extracted(
            "doc1.pdf",
            DocumentKind::PagedText,
            vec![
                TextUnit::new(Locator::Page(1), "Alice lives in Paris."),
                TextUnit::new(Locator::Page(2), "Bob lives in Rome."),
            ],
        )
    }

    #[tokio::test]
    async fn test_pages_keep_their_locators() {
        let (ingestor, index) = ingestor();
        assert_eq!(ingestor.ingest(alice_pdf()).await.unwrap(), 2);

        let keys: Vec<_> = index
            .chunks()
            .iter()
            .map(|c| (c.source_id.clone(), c.locator))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("doc1.pdf".to_string(), Locator::Page(1)),
                ("doc1.pdf".to_string(), Locator::Page(2)),
            ]
        );
    }

    #[tokio::test]
    async fn test_reingest_writes_independent_chunks() {
        let (ingestor, index) = ingestor();
        ingestor.ingest(alice_pdf()).await.unwrap();
        ingestor.ingest(alice_pdf()).await.unwrap();

        let chunks = index.chunks();
        assert_eq!(chunks.len(), 4);
        assert_ne!(chunks[0].id, chunks[2].id);
        assert_eq!(chunks[0].text, chunks[2].text);
    }

    #[tokio::test]
    async fn test_batch_continues_past_corrupt_file() {
        let (ingestor, index) = ingestor();
        let sources = vec![
            DocumentSource::from_bytes("broken.pdf", b"%PDF-garbage".to_vec()),
            DocumentSource::from_bytes("deck.pptx", build_pptx(&[&["Quarterly results"]])),
            DocumentSource::from_bytes("blank.png", Vec::new()),
            DocumentSource::from_bytes("budget.xlsx", b"cells".to_vec()),
            DocumentSource::from_bytes("talk.mp4", b"video".to_vec()),
        ];

        let report = ingestor.ingest_batch(sources).await.unwrap();
        let statuses: Vec<_> = report.documents.iter().map(|d| d.status.clone()).collect();

        assert!(matches!(statuses[0], IngestStatus::Failed(_)));
        assert_eq!(statuses[1], IngestStatus::Indexed);
        assert_eq!(statuses[2], IngestStatus::Empty);
        assert!(matches!(statuses[3], IngestStatus::Failed(_)));
        assert_eq!(statuses[4], IngestStatus::Indexed);
        assert_eq!(report.failed_count(), 2);
        assert_eq!(report.total_chunks, 2);

        let locators: Vec<_> = index.chunks().iter().map(|c| c.locator).collect();
        assert_eq!(locators, vec![Locator::Slide(1), Locator::Frame(0)]);
    }

    #[tokio::test]
    async fn test_empty_batch_leaves_index_untouched() {
        let (ingestor, index) = ingestor();
        let report = ingestor.ingest_batch(Vec::new()).await.unwrap();
        assert_eq!(report.total_chunks, 0);
        assert!(index.chunks().is_empty());
    }
}
