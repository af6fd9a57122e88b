//! OCR engine trait and the tesseract subprocess implementation

use async_trait::async_trait;
use std::io::Write;
use std::path::PathBuf;
use tokio::process::Command;

use crate::config::MediaConfig;
use crate::error::{Error, Result};

/// Trait for extracting text from raster images
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Text found in the image; empty when there is none
    async fn extract_text(&self, image: &[u8]) -> Result<String>;

    /// Check whether the engine can run
    async fn health_check(&self) -> Result<bool>;

    /// Get engine name for logging
    fn name(&self) -> &str;
}

/// OCR via the `tesseract` command line tool
pub struct TesseractOcr {
    binary: PathBuf,
    language: String,
}

impl TesseractOcr {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            binary: config.tesseract_path.clone(),
            language: config.ocr_language.clone(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn extract_text(&self, image: &[u8]) -> Result<String> {
        let mut input = tempfile::NamedTempFile::new()?;
        input.write_all(image)?;
        input.flush()?;

        let output = Command::new(&self.binary)
            .arg(input.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .await
            .map_err(|e| {
                Error::ocr(format!(
                    "failed to run {}: {} (install with: apt install tesseract-ocr)",
                    self.binary.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::ocr(format!("tesseract error: {}", stderr.trim())));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        tracing::debug!("OCR extracted {} characters", text.len());
        Ok(text)
    }

    /// The tesseract binary can be launched
    async fn health_check(&self) -> Result<bool> {
        Ok(Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false))
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_ocr_error() {
        let config = MediaConfig {
            tesseract_path: PathBuf::from("/nonexistent/tesseract-binary"),
            ..MediaConfig::default()
        };
        let ocr = TesseractOcr::new(&config);

        assert!(!ocr.health_check().await.unwrap());
        assert!(matches!(ocr.extract_text(b"not an image").await, Err(Error::Ocr(_))));
    }
}
