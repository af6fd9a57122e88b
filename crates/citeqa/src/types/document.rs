//! Document and chunk types with source tracking for citations

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Supported document kinds, one extraction strategy each
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Paged text (PDF), one unit per page
    PagedText,
    /// Raster image, OCR'd as one unit
    Image,
    /// Slide deck (.pptx), one unit per slide
    Slides,
    /// Video, OCR'd on sampled frames
    Video,
    /// Plain text or markdown, one unit
    PlainText,
}

impl DocumentKind {
    /// Detect document kind from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::PagedText),
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" | "tif" | "tiff" => Some(Self::Image),
            "pptx" => Some(Self::Slides),
            "mp4" | "mov" | "avi" | "mkv" | "webm" | "m4v" => Some(Self::Video),
            "txt" | "text" | "md" | "markdown" => Some(Self::PlainText),
            _ => None,
        }
    }

    /// Detect document kind from a file name
    pub fn from_name(name: &str) -> Option<Self> {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PagedText => "PDF",
            Self::Image => "Image",
            Self::Slides => "Slide deck",
            Self::Video => "Video",
            Self::PlainText => "Text",
        }
    }
}

/// Position of a chunk inside its source document
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Locator {
    /// 1-indexed page number
    Page(u32),
    /// 1-indexed slide number
    Slide(u32),
    /// 0-based video frame index
    Frame(u64),
    /// The source has no finer position (single image, plain text)
    NotApplicable,
}

impl Locator {
    /// Metadata key used when the locator is written to a vector index
    pub fn metadata_key(&self) -> Option<&'static str> {
        match self {
            Self::Page(_) => Some("page"),
            Self::Slide(_) => Some("slide"),
            Self::Frame(_) => Some("frame"),
            Self::NotApplicable => None,
        }
    }

    /// Numeric value stored under [`Locator::metadata_key`]
    pub fn metadata_value(&self) -> Option<u64> {
        match *self {
            Self::Page(p) => Some(p as u64),
            Self::Slide(s) => Some(s as u64),
            Self::Frame(f) => Some(f),
            Self::NotApplicable => None,
        }
    }

    /// Rebuild a locator from vector-index metadata
    pub fn from_metadata(meta: &serde_json::Map<String, serde_json::Value>) -> Self {
        let number = |key: &str| meta.get(key).and_then(|v| v.as_u64());

        if let Some(p) = number("page") {
            Self::Page(p as u32)
        } else if let Some(s) = number("slide") {
            Self::Slide(s as u32)
        } else if let Some(f) = number("frame") {
            Self::Frame(f)
        } else {
            Self::NotApplicable
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page(p) => write!(f, "p.{}", p),
            Self::Slide(s) => write!(f, "slide {}", s),
            Self::Frame(i) => write!(f, "frame {}", i),
            Self::NotApplicable => f.write_str("n/a"),
        }
    }
}

/// One extracted, addressable unit of a document: a page, slide, frame or whole text
#[derive(Debug, Clone, PartialEq)]
pub struct TextUnit {
    pub locator: Locator,
    pub text: String,
    pub extra: BTreeMap<String, String>,
}

impl TextUnit {
    pub fn new(locator: Locator, text: impl Into<String>) -> Self {
        Self {
            locator,
            text: text.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Attach an auxiliary metadata entry
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Where the bytes of a document come from
#[derive(Debug, Clone)]
pub enum SourceData {
    /// File on disk, read at extraction time
    Path(PathBuf),
    /// Uploaded bytes
    Bytes(Vec<u8>),
    /// Already split into units by the caller
    Extracted(Vec<TextUnit>),
}

/// A named document waiting to be ingested
#[derive(Debug, Clone)]
pub struct DocumentSource {
    /// Identifying name, used as `source_id` on every chunk (file name)
    pub name: String,
    /// Detected kind, `None` when the extension is not supported
    pub kind: Option<DocumentKind>,
    pub data: SourceData,
}

impl DocumentSource {
    /// Document backed by a file on disk; the name is the file's base name
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        Self {
            kind: DocumentKind::from_name(&name),
            name,
            data: SourceData::Path(path),
        }
    }

    /// Document from uploaded bytes
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Self {
        let name = name.into();
        Self {
            kind: DocumentKind::from_name(&name),
            name,
            data: SourceData::Bytes(data),
        }
    }

    /// Document whose per-unit text was extracted elsewhere
    pub fn pre_extracted(name: impl Into<String>, kind: DocumentKind, units: Vec<TextUnit>) -> Self {
        Self {
            name: name.into(),
            kind: Some(kind),
            data: SourceData::Extracted(units),
        }
    }

    /// Recursively collect every supported document under `dir`, sorted by path
    pub fn discover(dir: &Path) -> Vec<Self> {
        let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .and_then(DocumentKind::from_extension)
                    .is_some()
            })
            .collect();
        paths.sort();
        paths.into_iter().map(Self::from_path).collect()
    }
}

/// A chunk of text from a document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Text content (never empty)
    pub text: String,
    /// Originating document name
    pub source_id: String,
    /// Position inside the document
    pub locator: Locator,
    /// Byte offsets of this window inside the unit text it was cut from
    pub byte_start: usize,
    pub byte_end: usize,
    /// Auxiliary metadata (e.g. video timestamp)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(
        text: String,
        source_id: impl Into<String>,
        locator: Locator,
        byte_start: usize,
        byte_end: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            source_id: source_id.into(),
            locator,
            byte_start,
            byte_end,
            extra: BTreeMap::new(),
        }
    }

    /// Citation key shared by every chunk cut from the same unit
    pub fn citation_key(&self) -> (&str, Locator) {
        (self.source_id.as_str(), self.locator)
    }

    /// Convert to vector metadata for storage
    pub fn to_vector_metadata(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut meta = serde_json::Map::new();
        meta.insert("source".to_string(), serde_json::json!(self.source_id));
        if let (Some(key), Some(value)) = (self.locator.metadata_key(), self.locator.metadata_value()) {
            meta.insert(key.to_string(), serde_json::json!(value));
        }
        meta.insert("byte_start".to_string(), serde_json::json!(self.byte_start));
        meta.insert("byte_end".to_string(), serde_json::json!(self.byte_end));
        for (key, value) in &self.extra {
            meta.entry(key.clone()).or_insert_with(|| serde_json::json!(value));
        }
        meta
    }

    /// Rebuild a chunk from vector-index metadata and stored text
    pub fn from_vector_metadata(
        id: &str,
        text: String,
        meta: &serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        const RESERVED: &[&str] = &["source", "page", "slide", "frame", "byte_start", "byte_end"];

        let offset = |key: &str| meta.get(key).and_then(|v| v.as_u64()).unwrap_or(0) as usize;
        let extra = meta
            .iter()
            .filter(|(k, _)| !RESERVED.contains(&k.as_str()))
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect();

        Self {
            id: Uuid::parse_str(id).unwrap_or_else(|_| Uuid::new_v4()),
            text,
            source_id: meta
                .get("source")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string(),
            locator: Locator::from_metadata(meta),
            byte_start: offset("byte_start"),
            byte_end: offset("byte_end"),
            extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(DocumentKind::from_name("report.PDF"), Some(DocumentKind::PagedText));
        assert_eq!(DocumentKind::from_name("scan.jpeg"), Some(DocumentKind::Image));
        assert_eq!(DocumentKind::from_name("deck.pptx"), Some(DocumentKind::Slides));
        assert_eq!(DocumentKind::from_name("talk.mp4"), Some(DocumentKind::Video));
        assert_eq!(DocumentKind::from_name("notes.md"), Some(DocumentKind::PlainText));
        assert_eq!(DocumentKind::from_name("sheet.xlsx"), None);
        assert_eq!(DocumentKind::from_name("README"), None);
    }

    #[test]
    fn test_metadata_round_trip_keeps_citation_key() {
        let mut chunk = Chunk::new("Slide text".to_string(), "deck.pptx", Locator::Slide(3), 0, 10);
        chunk.extra.insert("kind".to_string(), "slides".to_string());

        let meta = chunk.to_vector_metadata();
        assert_eq!(meta.get("slide").and_then(|v| v.as_u64()), Some(3));
        assert!(meta.get("page").is_none());

        let back = Chunk::from_vector_metadata(&chunk.id.to_string(), chunk.text.clone(), &meta);
        assert_eq!(back, chunk);
    }

    #[test]
    fn test_kind_labels_follow_file_type() {
        let label = |name: &str| DocumentKind::from_name(name).map(|k| k.display_name());
        assert_eq!(label("deck.PPTX"), Some("Slide deck"));
        assert_eq!(label("doc1.pdf"), Some("PDF"));
        assert_eq!(label("clip.mp4"), Some("Video"));
        assert_eq!(label("sheet.xlsx"), None);
    }

    #[test]
    fn test_offsets_are_bytes_into_unit_text() {
        let text = "Café près de la gare.";
        let start = text.find("près").unwrap();
        let chunk = Chunk::new(text[start..].to_string(), "notes.txt", Locator::NotApplicable, start, text.len());

        assert_eq!(start, 6);
        assert_eq!(&text[chunk.byte_start..chunk.byte_end], chunk.text);

        let meta = chunk.to_vector_metadata();
        assert_eq!(meta.get("byte_start").and_then(|v| v.as_u64()), Some(6));
        assert_eq!(meta.get("byte_end").and_then(|v| v.as_u64()), Some(text.len() as u64));
        assert!(meta.get("char_start").is_none());
    }

    #[test]
    fn test_missing_locator_means_not_applicable() {
        let mut meta = serde_json::Map::new();
        meta.insert("source".to_string(), serde_json::json!("photo.png"));
        assert_eq!(Locator::from_metadata(&meta), Locator::NotApplicable);
    }

    #[test]
    fn test_discover_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"x").unwrap();
        std::fs::write(dir.path().join("a.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("sub/c.png"), b"x").unwrap();
        std::fs::write(dir.path().join("ignored.xlsx"), b"x").unwrap();

        let names: Vec<String> = DocumentSource::discover(dir.path())
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["a.txt", "b.pdf", "c.png"]);
    }
}
