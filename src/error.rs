//! Error types for the textlift library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PipelineError`] — **Fatal for one document**: processing cannot
//!   produce any text (bad input file, every OCR engine failed to execute,
//!   invalid configuration). The orchestrator absorbs these at its outer
//!   boundary and converts them into a `ProcessingOutcome` with
//!   `fatal = true`, so one bad document never aborts a batch.
//!
//! * [`EngineError`] — **Non-fatal per engine**: a single engine invocation
//!   failed (binary missing, timeout, malformed response) but an alternative
//!   path exists. The OCR cascade advances to the next engine; the correction
//!   pipeline keeps the rule-corrected text; classification degrades to the
//!   conservative class. Each absorption surfaces as a warning string in the
//!   final outcome rather than as a propagated error.
//!
//! The separation keeps the recovery policy in exactly one place per stage:
//! a component either handles an `EngineError` locally or escalates it into
//! the one fatal variant that names what was exhausted.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal, per-document errors.
///
/// Only the orchestrator's outermost boundary sees these; stage-internal
/// failures use [`EngineError`] and are absorbed where they are detected.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file is not a media type the pipeline knows how to route.
    #[error("Unsupported input '{path}': {detail}")]
    UnsupportedMediaType { path: PathBuf, detail: String },

    // ── Stage errors ──────────────────────────────────────────────────────
    /// Every OCR engine in the cascade raised an execution error; there is
    /// no text to return, not even a low-confidence one.
    #[error(
        "No OCR engine produced a result for '{document}' ({attempts} attempted)\nLast error: {last_error}"
    )]
    OcrUnavailable {
        document: String,
        attempts: usize,
        last_error: String,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not write a finalized text file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A non-fatal error from one engine invocation.
///
/// Distinguishes *execution* failure (the engine could not run — the caller
/// advances with nothing to keep) from quality rejection, which is not an
/// error at all: a quality-rejected result is still kept as best-so-far.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineError {
    /// The engine cannot run at all (binary missing, provider not configured).
    #[error("Engine '{engine}' unavailable: {detail}")]
    Unavailable { engine: String, detail: String },

    /// The invocation exceeded its configured timeout.
    #[error("Engine '{engine}' timed out after {secs}s")]
    Timeout { engine: String, secs: u64 },

    /// The engine ran but produced no usable result.
    #[error("Engine '{engine}' failed: {detail}")]
    Failed { engine: String, detail: String },
}

impl EngineError {
    /// The id of the engine that raised this error.
    pub fn engine(&self) -> &str {
        match self {
            EngineError::Unavailable { engine, .. }
            | EngineError::Timeout { engine, .. }
            | EngineError::Failed { engine, .. } => engine,
        }
    }
}
