//! End-to-end scenarios over the in-memory index with fake model, OCR and video collaborators

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use citeqa::ingestion::pdf_pages;
use citeqa::providers::{
    HashEmbedder, LlmProvider, MemoryIndex, OcrEngine, VectorIndex, VideoDecoder, VideoFrame,
    VideoInfo,
};
use citeqa::{
    AnswerOutcome, Citation, DocumentKind, DocumentSource, IngestStatus, Locator, PipelineParts,
    RagConfig, RagPipeline, Result, TextUnit, DEFAULT_REFUSAL,
};

/// Paraphrase prompts get two fixed phrasings; answer prompts get Alice's
/// sentence when it is in the context and a quoted refusal otherwise
struct ScriptedLlm {
    answer_prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            answer_prompts: Mutex::new(Vec::new()),
        })
    }

    fn answer_calls(&self) -> usize {
        self.answer_prompts.lock().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        if prompt.contains("Original question:") {
            return Ok("1. What city is Alice's home?\n2. Where is Alice based?".to_string());
        }

        self.answer_prompts.lock().push(prompt.to_string());
        if prompt.contains("Alice lives in Paris.") {
            Ok("Alice lives in Paris.".to_string())
        } else {
            Ok(format!("\"{}\"", DEFAULT_REFUSAL))
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }
}

/// OCR that never finds text
struct BlankOcr;

#[async_trait]
impl OcrEngine for BlankOcr {
    async fn extract_text(&self, _image: &[u8]) -> Result<String> {
        Ok(String::new())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }

    fn name(&self) -> &str {
        "blank"
    }
}

struct NoVideo;

#[async_trait]
impl VideoDecoder for NoVideo {
    async fn probe(&self, _video: &[u8]) -> Result<VideoInfo> {
        Ok(VideoInfo { frame_rate: 0.0 })
    }

    async fn extract_frames(&self, _video: &[u8], _step: u64) -> Result<Vec<VideoFrame>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "none"
    }
}

fn pipeline(llm: Arc<ScriptedLlm>) -> (RagPipeline, Arc<MemoryIndex>) {
    let index = Arc::new(MemoryIndex::new(Arc::new(HashEmbedder::new(128))));
    let parts = PipelineParts {
        index: index.clone(),
        llm,
        ocr: Arc::new(BlankOcr),
        video: Arc::new(NoVideo),
    };
    (RagPipeline::new(RagConfig::default(), parts), index)
}

fn alice_pdf() -> DocumentSource {
    DocumentSource::pre_extracted(
        "doc1.pdf",
        DocumentKind::PagedText,
        vec![TextUnit::new(Locator::Page(1), "Alice lives in Paris.")],
    )
}

#[tokio::test]
async fn answer_cites_the_page_it_came_from() {
    let llm = ScriptedLlm::new();
    let (pipeline, _) = pipeline(llm.clone());
    assert_eq!(pipeline.ingest(alice_pdf()).await.unwrap(), 1);

    let result = pipeline.ask("Where does Alice live?").await;

    assert_eq!(result.outcome, AnswerOutcome::Answered);
    assert_eq!(result.answer, "Alice lives in Paris.");
    assert_eq!(result.citations, vec![Citation::new("doc1.pdf", Locator::Page(1))]);
    assert_eq!(result.citations[0].to_string(), "doc1.pdf, p.1");
    assert_eq!(llm.answer_calls(), 1);
}

#[tokio::test]
async fn empty_index_refuses_without_citations() {
    let llm = ScriptedLlm::new();
    let (pipeline, _) = pipeline(llm.clone());

    let result = pipeline.ask("Where does Alice live?").await;

    assert!(result.is_refusal());
    assert_eq!(result.answer, DEFAULT_REFUSAL);
    assert!(result.citations.is_empty());
    assert_eq!(llm.answer_calls(), 0);
}

#[tokio::test]
async fn quoted_refusal_from_model_drops_citations() {
    let (pipeline, _) = pipeline(ScriptedLlm::new());
    let notes = DocumentSource::from_bytes("notes.txt", b"Bob keeps bees in Lyon.".to_vec());
    pipeline.ingest(notes).await.unwrap();

    let result = pipeline.ask_with("What is the capital of Peru?", 4, false).await;

    assert_eq!(result.outcome, AnswerOutcome::Refused);
    assert!(result.citations.is_empty());
}

#[tokio::test]
async fn image_without_text_ingests_nothing() {
    let (pipeline, index) = pipeline(ScriptedLlm::new());
    let scan = DocumentSource::from_bytes("scan.png", vec![0x89, b'P', b'N', b'G']);

    assert_eq!(pipeline.ingest(scan).await.unwrap(), 0);
    assert_eq!(index.len().await.unwrap(), 0);
}

#[tokio::test]
async fn reingest_adds_a_second_independent_set() {
    let (pipeline, index) = pipeline(ScriptedLlm::new());
    pipeline.ingest(alice_pdf()).await.unwrap();
    pipeline.ingest(alice_pdf()).await.unwrap();

    let chunks = index.chunks();
    assert_eq!(chunks.len(), 2);
    assert_ne!(chunks[0].id, chunks[1].id);

    // Both copies share one citation key, so the answer cites the page once
    let result = pipeline.ask("Where does Alice live?").await;
    assert_eq!(result.citations, vec![Citation::new("doc1.pdf", Locator::Page(1))]);
}

#[tokio::test]
async fn batch_continues_past_corrupt_documents() {
    let (pipeline, index) = pipeline(ScriptedLlm::new());
    let sources = vec![
        DocumentSource::from_bytes("corrupt.pdf", b"%PDF-1.4 truncated".to_vec()),
        DocumentSource::from_bytes("corrupt.pptx", b"PK not really".to_vec()),
        alice_pdf(),
    ];

    let report = pipeline.ingest_batch(sources).await.unwrap();

    assert_eq!(report.failed_count(), 2);
    assert_eq!(report.documents[2].status, IngestStatus::Indexed);
    assert_eq!(report.total_chunks, 1);
    assert_eq!(index.len().await.unwrap(), 1);
}

#[tokio::test]
async fn directory_corpus_is_discovered_and_ingested() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "Alice lives in Paris.").unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    std::fs::write(dir.path().join("nested").join("b.md"), "# Bob\nBob lives in Rome.").unwrap();
    std::fs::write(dir.path().join("ignored.xlsx"), "cells").unwrap();

    let sources = DocumentSource::discover(dir.path());
    let names: Vec<_> = sources.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "b.md"]);

    let (pipeline, _) = pipeline(ScriptedLlm::new());
    let report = pipeline.ingest_batch(sources).await.unwrap();
    assert_eq!(report.total_chunks, 2);
    assert_eq!(report.failed_count(), 0);
}

#[tokio::test]
async fn search_ranks_chunks_without_asking_the_model() {
    let llm = ScriptedLlm::new();
    let (pipeline, _) = pipeline(llm.clone());
    let notes = DocumentSource::from_bytes("notes.txt", b"Bob keeps bees in Lyon.".to_vec());
    pipeline.ingest_batch(vec![notes, alice_pdf()]).await.unwrap();

    let hits = pipeline.search("Alice Paris", 20).await.unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].rank, 1);
    assert_eq!(hits[0].citation, Citation::new("doc1.pdf", Locator::Page(1)));
    assert_eq!(hits[0].preview, "Alice lives in Paris.");
    assert!(hits[0].similarity > hits[1].similarity);
    assert_eq!(hits[1].rank, 2);

    assert_eq!(pipeline.search("Alice Paris", 1).await.unwrap().len(), 1);
    assert_eq!(llm.answer_calls(), 0);
}

#[test]
fn pdf_pages_are_numbered_from_one() {
    let bytes = two_page_pdf(["Alice lives in Paris.", "Bob lives in Rome."]);
    let units = pdf_pages("doc1.pdf", &bytes).unwrap();

    assert_eq!(units.len(), 2);
    assert_eq!(units[0].locator, Locator::Page(1));
    assert!(units[0].text.contains("Alice lives in Paris."));
    assert_eq!(units[1].locator, Locator::Page(2));
    assert!(units[1].text.contains("Bob lives in Rome."));
}

fn two_page_pdf(pages: [&str; 2]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => 2,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}
