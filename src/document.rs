//! Input documents and classification signals.
//!
//! A [`Document`] is an immutable handle to one input file: identity, declared
//! media type, byte length. It is created at batch-enumeration time, consumed
//! once by the orchestrator, and never mutated. Classification derives a
//! [`DocumentClass`] per pass; the class is never stored with the document.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Declared media type of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    /// A PDF document (digital, scanned, or mixed — classification decides).
    Pdf,
    /// A standalone raster image (always routed through OCR).
    Image,
}

impl MediaType {
    /// Guess the media type from a file extension.
    pub fn from_extension(path: &Path) -> Option<MediaType> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(MediaType::Pdf),
            "png" | "jpg" | "jpeg" | "tif" | "tiff" | "bmp" | "gif" => Some(MediaType::Image),
            _ => None,
        }
    }
}

/// An immutable handle to one input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Stable identity used in outcomes and logs (defaults to the path).
    pub id: String,
    /// Location of the bytes on disk.
    pub path: PathBuf,
    /// Declared media type.
    pub media_type: MediaType,
    /// Size in bytes at enumeration time.
    pub byte_len: u64,
}

impl Document {
    /// Create a handle from known parts without touching the filesystem.
    pub fn new(
        id: impl Into<String>,
        path: impl Into<PathBuf>,
        media_type: MediaType,
        byte_len: u64,
    ) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            media_type,
            byte_len,
        }
    }

    /// Create a handle from a local file, validating existence and media type.
    ///
    /// For PDFs, the `%PDF` magic bytes are checked so callers get a precise
    /// error instead of a garbled extraction downstream.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let path = path.into();

        let media_type = MediaType::from_extension(&path).ok_or_else(|| {
            PipelineError::UnsupportedMediaType {
                path: path.clone(),
                detail: "expected a .pdf or image file".to_string(),
            }
        })?;

        let meta = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(PipelineError::PermissionDenied { path });
            }
            Err(_) => return Err(PipelineError::FileNotFound { path }),
        };

        if media_type == MediaType::Pdf {
            use std::io::Read;
            let mut magic = [0u8; 4];
            match std::fs::File::open(&path) {
                Ok(mut f) => {
                    if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                        return Err(PipelineError::UnsupportedMediaType {
                            path,
                            detail: format!("not a PDF, first bytes: {magic:?}"),
                        });
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                    return Err(PipelineError::PermissionDenied { path });
                }
                Err(_) => return Err(PipelineError::FileNotFound { path }),
            }
        }

        let id = path.to_string_lossy().to_string();
        debug!("Enumerated document: {} ({} bytes)", id, meta.len());
        Ok(Self {
            id,
            path,
            media_type,
            byte_len: meta.len(),
        })
    }
}

/// Classification of one document, recomputed per pass.
///
/// Exactly one class per document per classification pass; classification is
/// deterministic given the same document bytes and thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentClass {
    /// Carries a usable embedded text layer; fast extraction suffices.
    TextBased,
    /// No text layer (or a negligible one); goes straight to OCR.
    Scanned,
    /// Partial text layer; fast extraction is attempted, then re-checked.
    Hybrid,
    /// Non-document raster input; always OCR.
    Image,
}

impl DocumentClass {
    /// Short tag used in stage names and log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentClass::TextBased => "text_based",
            DocumentClass::Scanned => "scanned",
            DocumentClass::Hybrid => "hybrid",
            DocumentClass::Image => "image",
        }
    }
}

/// Low-level facts gathered by a [`crate::engines::DocumentInspector`].
///
/// The classifier turns a report into an [`ExtractionSignal`]; the report
/// itself never travels past classification.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectionReport {
    /// Whether the file carries a structural text layer.
    pub has_text_layer: bool,
    /// Extracted characters per page over the inspected pages.
    pub text_density: f64,
    /// Total page count.
    pub page_count: usize,
}

/// Classifier output driving extraction routing. Never persisted downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionSignal {
    /// The derived class.
    pub class: DocumentClass,
    /// Characters per page measured during inspection (0 when unknown).
    pub text_density: f64,
    /// Whether a structural text layer is present.
    pub has_text_layer: bool,
    /// Page count (0 when unknown).
    pub page_count: usize,
}

/// Extracted character count normalised per page.
///
/// Whitespace does not count towards density: a page of layout artefacts
/// (spaces, newlines) must not masquerade as extracted content.
pub fn text_density(text: &str, page_count: usize) -> f64 {
    let chars = text.chars().filter(|c| !c.is_whitespace()).count();
    chars as f64 / page_count.max(1) as f64
}
