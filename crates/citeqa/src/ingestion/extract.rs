//! Per-kind text extraction into ordered, addressable units

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::{HashMap, HashSet};
use std::io::{Read, Seek};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::video::{frame_step, FALLBACK_FPS};
use crate::providers::{OcrEngine, VideoDecoder};
use crate::types::{DocumentKind, DocumentSource, Locator, SourceData, TextUnit};

/// Turns documents into `(locator, text)` units using the OCR and video collaborators
pub struct Extractor {
    ocr: Arc<dyn OcrEngine>,
    video: Arc<dyn VideoDecoder>,
    frame_interval_secs: f64,
}

impl Extractor {
    pub fn new(ocr: Arc<dyn OcrEngine>, video: Arc<dyn VideoDecoder>, frame_interval_secs: f64) -> Self {
        Self {
            ocr,
            video,
            frame_interval_secs,
        }
    }

    /// Extract every non-blank unit of a document, in document order
    pub async fn extract(&self, source: &DocumentSource) -> Result<Vec<TextUnit>> {
        let kind = source
            .kind
            .ok_or_else(|| Error::UnsupportedDocument(source.name.clone()))?;

        let units = match &source.data {
            SourceData::Extracted(units) => units.clone(),
            SourceData::Bytes(bytes) => self.extract_bytes(&source.name, kind, bytes.clone()).await?,
            SourceData::Path(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| Error::extraction(&source.name, format!("cannot read file: {}", e)))?;
                self.extract_bytes(&source.name, kind, bytes).await?
            }
        };

        Ok(units
            .into_iter()
            .filter(|u| !u.text.trim().is_empty())
            .collect())
    }

    async fn extract_bytes(&self, name: &str, kind: DocumentKind, bytes: Vec<u8>) -> Result<Vec<TextUnit>> {
        match kind {
            DocumentKind::PagedText => {
                let owned = name.to_string();
                tokio::task::spawn_blocking(move || pdf_pages(&owned, &bytes))
                    .await
                    .map_err(|e| Error::internal(format!("PDF extraction task failed: {}", e)))?
            }
            DocumentKind::Slides => pptx_slides(name, &bytes),
            DocumentKind::PlainText => Ok(vec![plain_text(&bytes)]),
            DocumentKind::Image => {
                let text = self
                    .ocr
                    .extract_text(&bytes)
                    .await
                    .map_err(|e| Error::extraction(name, e.to_string()))?;
                Ok(vec![TextUnit::new(Locator::NotApplicable, text)])
            }
            DocumentKind::Video => self.video_frames(name, &bytes).await,
        }
    }

    /// OCR one frame every `frame_interval_secs` of video time
    async fn video_frames(&self, name: &str, bytes: &[u8]) -> Result<Vec<TextUnit>> {
        let info = self
            .video
            .probe(bytes)
            .await
            .map_err(|e| Error::extraction(name, e.to_string()))?;
        let step = frame_step(info.frame_rate, self.frame_interval_secs);
        let fps = if info.frame_rate.is_finite() && info.frame_rate > 0.0 {
            info.frame_rate
        } else {
            FALLBACK_FPS
        };

        let frames = self
            .video
            .extract_frames(bytes, step)
            .await
            .map_err(|e| Error::extraction(name, e.to_string()))?;
        tracing::info!("Sampled {} frames from {} (every {} frames)", frames.len(), name, step);

        let mut units = Vec::new();
        for frame in frames {
            let text = self
                .ocr
                .extract_text(&frame.image)
                .await
                .map_err(|e| Error::extraction(name, e.to_string()))?;
            if text.trim().is_empty() {
                continue;
            }
            let seconds = frame.index as f64 / fps;
            units.push(
                TextUnit::new(Locator::Frame(frame.index), text)
                    .with_extra("frame_time_secs", format!("{:.1}", seconds)),
            );
        }
        Ok(units)
    }
}

/// One unit per PDF page, numbered from 1
pub fn pdf_pages(name: &str, data: &[u8]) -> Result<Vec<TextUnit>> {
    let doc = lopdf::Document::load_mem(data)
        .map_err(|e| Error::extraction(name, format!("Failed to load PDF: {}", e)))?;

    let pages = doc.get_pages();
    let mut units = Vec::with_capacity(pages.len());

    for page_number in pages.keys().copied() {
        match doc.extract_text(&[page_number]) {
            Ok(text) => units.push(TextUnit::new(Locator::Page(page_number), clean_pdf_text(&text))),
            Err(e) => tracing::debug!("No text on page {} of {}: {}", page_number, name, e),
        }
    }

    tracing::debug!("Extracted {} of {} pages from {}", units.len(), pages.len(), name);
    Ok(units)
}

fn clean_pdf_text(text: &str) -> String {
    text.replace('\0', "")
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// One unit per slide in deck order, one line per text paragraph
///
/// Deck order is the `<p:sldIdLst>` of `ppt/presentation.xml`. Archives
/// without a usable presentation part fall back to the slide file numbers.
pub fn pptx_slides(name: &str, data: &[u8]) -> Result<Vec<TextUnit>> {
    let cursor = std::io::Cursor::new(data);
    let mut archive = zip::ZipArchive::new(cursor)
        .map_err(|e| Error::extraction(name, format!("Invalid slide deck: {}", e)))?;

    let slides = match presentation_order(&mut archive) {
        Some(entries) if !entries.is_empty() => entries,
        _ => {
            tracing::debug!("No slide list in {}, ordering by file name", name);
            numbered_slide_entries(&archive)
        }
    };

    let mut units = Vec::with_capacity(slides.len());
    for (position, entry) in slides.iter().enumerate() {
        let mut xml = String::new();
        archive
            .by_name(entry)
            .map_err(|e| Error::extraction(name, e.to_string()))?
            .read_to_string(&mut xml)
            .map_err(|e| Error::extraction(name, format!("{}: {}", entry, e)))?;

        units.push(TextUnit::new(
            Locator::Slide(position as u32 + 1),
            slide_text(&xml),
        ));
    }

    Ok(units)
}

/// Slide parts listed by the presentation, resolved through its relationships
fn presentation_order<R: Read + Seek>(archive: &mut zip::ZipArchive<R>) -> Option<Vec<String>> {
    let presentation = read_entry(archive, "ppt/presentation.xml")?;
    let rels = read_entry(archive, "ppt/_rels/presentation.xml.rels")?;

    let targets = relationship_targets(&rels);
    let present: HashSet<&str> = archive.file_names().collect();

    Some(
        slide_rel_ids(&presentation)
            .iter()
            .filter_map(|id| targets.get(id))
            .map(|target| match target.strip_prefix('/') {
                Some(absolute) => absolute.to_string(),
                None => format!("ppt/{}", target),
            })
            .filter(|entry| present.contains(entry.as_str()))
            .collect(),
    )
}

/// `ppt/slides/slideN.xml` entries sorted by `N`
fn numbered_slide_entries<R: Read + Seek>(archive: &zip::ZipArchive<R>) -> Vec<String> {
    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|entry| {
            let number = entry
                .strip_prefix("ppt/slides/slide")?
                .strip_suffix(".xml")?
                .parse::<u32>()
                .ok()?;
            Some((number, entry.to_string()))
        })
        .collect();
    slides.sort();
    slides.into_iter().map(|(_, entry)| entry).collect()
}

fn read_entry<R: Read + Seek>(archive: &mut zip::ZipArchive<R>, entry: &str) -> Option<String> {
    let mut file = archive.by_name(entry).ok()?;
    let mut xml = String::new();
    file.read_to_string(&mut xml).ok()?;
    Some(xml)
}

/// Relationship ids (`r:id`) of each `<p:sldId>`, in list order
fn slide_rel_ids(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    let mut ids = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sldId" => {
                let rel = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.prefix().is_some() && a.key.local_name().as_ref() == b"id");
                if let Some(attr) = rel {
                    if let Ok(value) = attr.unescape_value() {
                        ids.push(value.into_owned());
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }
    ids
}

/// `Id -> Target` for every `<Relationship>`
fn relationship_targets(xml: &str) -> HashMap<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut targets = HashMap::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes().flatten() {
                    let Ok(value) = attr.unescape_value() else {
                        continue;
                    };
                    match attr.key.as_ref() {
                        b"Id" => id = Some(value.into_owned()),
                        b"Target" => target = Some(value.into_owned()),
                        _ => {}
                    }
                }
                if let (Some(id), Some(target)) = (id, target) {
                    targets.insert(id, target);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }
    targets
}

/// Text of all `<a:t>` runs, one line per `<a:p>` paragraph
fn slide_text(xml: &str) -> String {
    let mut reader = Reader::from_str(xml);
    let mut lines = Vec::new();
    let mut paragraph = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(e)) if in_text => {
                if let Ok(text) = e.unescape() {
                    paragraph.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let line = paragraph.trim();
                    if !line.is_empty() {
                        lines.push(line.to_string());
                    }
                    paragraph.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    let tail = paragraph.trim();
    if !tail.is_empty() {
        lines.push(tail.to_string());
    }
    lines.join("\n")
}

fn plain_text(data: &[u8]) -> TextUnit {
    let text = String::from_utf8_lossy(data);
    TextUnit::new(Locator::NotApplicable, text.trim_start_matches('\u{feff}'))
}
