//! Classic OCR: `pdftoppm` rasterization plus `tesseract` recognition.
//!
//! Tesseract's TSV output carries a per-word confidence, which is exactly the
//! signal the cascade's acceptance gate needs; plain stdout text would force
//! us to guess. Pages are rasterized at 300 DPI into a `TempDir` that cleans
//! itself up on drop, panic included.

use crate::confidence::Confidence;
use crate::document::{Document, MediaType};
use crate::engines::{rasterize_pdf, word_shape_ratio, OcrEngine, OcrResult};
use crate::error::EngineError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, warn};

/// OCR engine shelling out to tesseract.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    id: String,
    /// Language pack(s), e.g. "eng" or "fra+eng".
    language: String,
    /// Rasterization resolution for PDF pages.
    dpi: u32,
}

impl TesseractOcr {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            id: "tesseract".to_string(),
            language: language.into(),
            dpi: 300,
        }
    }

    /// Override the rasterization DPI (default 300).
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Run tesseract in TSV mode on one image.
    async fn recognize_image(&self, image: &Path) -> Result<PageRecognition, EngineError> {
        let output = Command::new("tesseract")
            .arg(image)
            .arg("stdout")
            .args(["-l", &self.language, "tsv"])
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => {
                Ok(parse_tsv(&String::from_utf8_lossy(&out.stdout)))
            }
            Ok(out) => Err(EngineError::Failed {
                engine: self.id.clone(),
                detail: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(EngineError::Unavailable {
                engine: self.id.clone(),
                detail: "tesseract (install tesseract-ocr) not found on PATH".to_string(),
            }),
            Err(e) => Err(EngineError::Failed {
                engine: self.id.clone(),
                detail: e.to_string(),
            }),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    fn id(&self) -> &str {
        &self.id
    }

    async fn recognize(&self, document: &Document) -> Result<OcrResult, EngineError> {
        // Keep the temp dir alive until all pages are recognized.
        let raster_dir;
        let pages: Vec<PathBuf> = match document.media_type {
            MediaType::Image => vec![document.path.clone()],
            MediaType::Pdf => {
                raster_dir = TempDir::new().map_err(|e| EngineError::Failed {
                    engine: self.id.clone(),
                    detail: e.to_string(),
                })?;
                rasterize_pdf(&document.path, raster_dir.path(), self.dpi, &self.id).await?
            }
        };

        let mut text = String::new();
        let mut conf_sum = 0.0f64;
        let mut conf_words = 0usize;
        let mut failed_pages = 0usize;

        for (i, image) in pages.iter().enumerate() {
            match self.recognize_image(image).await {
                Ok(page) => {
                    if !text.is_empty() {
                        text.push_str("\n\n");
                    }
                    text.push_str(&page.text);
                    conf_sum += page.confidence_sum;
                    conf_words += page.word_count;
                }
                Err(e) => {
                    warn!("tesseract failed on page {} of '{}': {}", i + 1, document.id, e);
                    failed_pages += 1;
                }
            }
        }

        if failed_pages == pages.len() {
            return Err(EngineError::Failed {
                engine: self.id.clone(),
                detail: format!("all {} pages failed recognition", pages.len()),
            });
        }

        let confidence = if conf_words > 0 {
            // Tesseract reports 0-100 per word.
            Confidence::new(conf_sum / conf_words as f64 / 100.0)
        } else {
            Confidence::NONE
        };
        let ratio = word_shape_ratio(&text);
        debug!(
            "tesseract on '{}': {} pages, confidence {}, word ratio {:.2}",
            document.id,
            pages.len(),
            confidence,
            ratio
        );

        Ok(OcrResult {
            text,
            confidence,
            recognized_word_ratio: ratio,
            engine_id: self.id.clone(),
        })
    }
}

/// One page's reconstructed text plus confidence accumulators.
struct PageRecognition {
    text: String,
    confidence_sum: f64,
    word_count: usize,
}

/// Rebuild line-structured text from tesseract's TSV output.
///
/// TSV rows at level 5 are words; a change in (block, paragraph, line) key
/// starts a new line. Words with negative confidence are layout artifacts
/// and are skipped.
fn parse_tsv(tsv: &str) -> PageRecognition {
    let mut text = String::new();
    let mut confidence_sum = 0.0f64;
    let mut word_count = 0usize;
    let mut current_line_key: Option<(u32, u32, u32)> = None;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let conf: f64 = cols[10].parse().unwrap_or(-1.0);
        let word = cols[11].trim();
        if conf < 0.0 || word.is_empty() {
            continue;
        }

        let key = (
            cols[2].parse().unwrap_or(0),
            cols[3].parse().unwrap_or(0),
            cols[4].parse().unwrap_or(0),
        );
        match current_line_key {
            Some(prev) if prev == key => text.push(' '),
            Some(_) => text.push('\n'),
            None => {}
        }
        current_line_key = Some(key);

        text.push_str(word);
        confidence_sum += conf;
        word_count += 1;
    }

    PageRecognition {
        text,
        confidence_sum,
        word_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn word_row(block: u32, line: u32, word: u32, conf: f64, text: &str) -> String {
        format!("5\t1\t{block}\t1\t{line}\t{word}\t0\t0\t10\t10\t{conf}\t{text}")
    }

    #[test]
    fn parse_tsv_rebuilds_lines() {
        let tsv = [
            HEADER.to_string(),
            word_row(1, 1, 1, 95.0, "Hello"),
            word_row(1, 1, 2, 90.0, "world"),
            word_row(1, 2, 1, 88.0, "again"),
        ]
        .join("\n");

        let page = parse_tsv(&tsv);
        assert_eq!(page.text, "Hello world\nagain");
        assert_eq!(page.word_count, 3);
        assert!((page.confidence_sum - 273.0).abs() < 1e-9);
    }

    #[test]
    fn parse_tsv_skips_layout_rows_and_negative_conf() {
        let tsv = [
            HEADER.to_string(),
            // level-4 line row, no text
            "4\t1\t1\t1\t1\t0\t0\t0\t10\t10\t-1\t".to_string(),
            word_row(1, 1, 1, -1.0, "ghost"),
            word_row(1, 1, 2, 80.0, "real"),
        ]
        .join("\n");

        let page = parse_tsv(&tsv);
        assert_eq!(page.text, "real");
        assert_eq!(page.word_count, 1);
    }

    #[test]
    fn parse_tsv_empty_input() {
        let page = parse_tsv("");
        assert!(page.text.is_empty());
        assert_eq!(page.word_count, 0);
    }
}
