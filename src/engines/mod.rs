//! Capability interfaces consumed by the orchestrator, plus the bundled
//! engines that implement them.
//!
//! The orchestrator never talks to poppler, tesseract, or an LLM directly —
//! it only sees these traits, held as `Arc<dyn Trait>`. That keeps the
//! decision logic (routing, escalation, degradation) testable with mock
//! engines and lets deployments swap engine families through configuration
//! instead of code. Heterogeneous engines (local subprocess, remote model)
//! all flatten onto the same uniform interface; there is deliberately no
//! inheritance-style hierarchy, only a priority list built from config.
//!
//! Bundled implementations:
//! - [`poppler`]     — `pdftotext`/`pdfinfo` extraction and inspection
//! - [`tesseract`]   — classic OCR via `pdftoppm` + `tesseract`
//! - [`vision`]      — vision-LLM OCR through the provider seam
//! - [`llm_correct`] — rule-based and AI text correction

use crate::confidence::Confidence;
use crate::document::{Document, InspectionReport};
use crate::error::EngineError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::process::Command;

pub mod llm_correct;
pub mod poppler;
pub mod tesseract;
pub mod vision;

/// Output of a fast structural text extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// The extracted text.
    pub text: String,
    /// Characters per page over the extracted pages.
    pub density: f64,
    /// Pages the engine saw.
    pub page_count: usize,
}

/// Output of one OCR engine invocation.
///
/// `confidence` and `recognized_word_ratio` are independent signals: an
/// engine may report high raw confidence yet low dictionary recognition
/// (garbled output that parses as high-entropy tokens). The cascade consults
/// both.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrResult {
    /// Recognized text.
    pub text: String,
    /// The engine's own reliability estimate.
    pub confidence: Confidence,
    /// Fraction of output tokens matching a reference vocabulary, in [0, 1].
    pub recognized_word_ratio: f64,
    /// Which engine produced this result.
    pub engine_id: String,
}

/// Cheap, read-only inspection of a document's structure.
///
/// Classification needs text-layer presence, density, and page count without
/// paying for a full extraction; keeping inspection on its own trait is what
/// lets "no text layer ⇒ the extraction engine is never invoked" hold.
#[async_trait]
pub trait DocumentInspector: Send + Sync {
    /// Stable identifier used in logs and warnings.
    fn id(&self) -> &str;

    /// Inspect the document. Errors degrade classification, never abort it.
    async fn inspect(&self, document: &Document) -> Result<InspectionReport, EngineError>;
}

/// Fast structural text extraction (e.g. reading an embedded text layer).
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    /// Stable identifier used in stage names and warnings.
    fn id(&self) -> &str;

    /// Extract the document's text layer.
    async fn extract(&self, document: &Document) -> Result<Extraction, EngineError>;
}

/// Image-to-text recognition with a reported confidence.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Stable identifier used in stage names and warnings.
    fn id(&self) -> &str;

    /// Recognize the document's pages. A returned error means the engine
    /// could not execute; quality problems are expressed through the result's
    /// `recognized_word_ratio`, not through errors.
    async fn recognize(&self, document: &Document) -> Result<OcrResult, EngineError>;
}

/// Text correction: a pure rule stage plus an optional AI stage.
#[async_trait]
pub trait CorrectionEngine: Send + Sync {
    /// Stable identifier used in warnings.
    fn id(&self) -> &str;

    /// Apply deterministic pattern-based fixes. Pure and total: never fails,
    /// and re-applying to already-corrected text is a no-op.
    fn apply_rules(&self, text: &str) -> String;

    /// Semantic correction through an AI model. May fail or time out; the
    /// pipeline degrades to the rule-corrected text in that case.
    async fn ai_correct(&self, text: &str) -> Result<String, EngineError>;
}

// ── Shared OCR quality heuristics ────────────────────────────────────────

static RE_WORD_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}][\p{L}'\-]*$").unwrap());

/// Fraction of whitespace-separated tokens that look like natural-language
/// words (letters with optional inner apostrophes/hyphens), after stripping
/// surrounding punctuation.
///
/// A word-shape check is a deliberately cheap stand-in for a full lexicon:
/// it cannot tell "hte" from "the", but it reliably separates running prose
/// from the high-entropy noise a misfiring OCR engine emits, which is all
/// the cascade's acceptance gate needs. Engines with a real dictionary
/// should report their own ratio instead.
pub fn word_shape_ratio(text: &str) -> f64 {
    let mut total = 0usize;
    let mut word_like = 0usize;
    for token in text.split_whitespace() {
        let stripped = token.trim_matches(|c: char| !c.is_alphanumeric());
        if stripped.is_empty() {
            continue;
        }
        total += 1;
        if stripped.chars().count() >= 2 && RE_WORD_SHAPE.is_match(stripped) {
            word_like += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        word_like as f64 / total as f64
    }
}

/// Rasterize a PDF into per-page PNGs inside `dir` via `pdftoppm`, returning
/// the image paths in page order.
///
/// Shared by every engine that consumes page images. `pdftoppm` zero-pads its
/// page numbers, so a lexicographic sort of the filenames is page order.
pub(crate) async fn rasterize_pdf(
    path: &Path,
    dir: &Path,
    dpi: u32,
    engine: &str,
) -> Result<Vec<PathBuf>, EngineError> {
    let status = Command::new("pdftoppm")
        .args(["-png", "-r", &dpi.to_string()])
        .arg(path)
        .arg(dir.join("page"))
        .status()
        .await;

    match status {
        Ok(s) if s.success() => {}
        Ok(_) => {
            return Err(EngineError::Failed {
                engine: engine.to_string(),
                detail: "pdftoppm failed to rasterize the document".to_string(),
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(EngineError::Unavailable {
                engine: engine.to_string(),
                detail: "pdftoppm (install poppler-utils) not found on PATH".to_string(),
            })
        }
        Err(e) => {
            return Err(EngineError::Failed {
                engine: engine.to_string(),
                detail: e.to_string(),
            })
        }
    }

    let mut pages: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| EngineError::Failed {
            engine: engine.to_string(),
            detail: e.to_string(),
        })?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.extension().map(|ext| ext == "png").unwrap_or(false))
        .collect();
    pages.sort();

    if pages.is_empty() {
        return Err(EngineError::Failed {
            engine: engine.to_string(),
            detail: "no page images generated from PDF".to_string(),
        });
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prose_scores_high() {
        let ratio = word_shape_ratio("The quick brown fox jumps over the lazy dog.");
        assert!(ratio > 0.9, "got {ratio}");
    }

    #[test]
    fn noise_scores_low() {
        let ratio = word_shape_ratio("x$ 9@@2 ~~ ##a 0b1 &*() 7^3");
        assert!(ratio < 0.3, "got {ratio}");
    }

    #[test]
    fn punctuation_is_stripped_before_matching() {
        // Trailing punctuation must not disqualify a word.
        assert_eq!(word_shape_ratio("hello, world!"), 1.0);
    }

    #[test]
    fn empty_text_scores_zero() {
        assert_eq!(word_shape_ratio(""), 0.0);
        assert_eq!(word_shape_ratio("   \n\t "), 0.0);
    }

    #[test]
    fn single_letters_do_not_count() {
        // OCR speckle often shows up as isolated single characters.
        let ratio = word_shape_ratio("a b c d");
        assert_eq!(ratio, 0.0);
    }
}
