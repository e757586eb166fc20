//! # textlift
//!
//! Turn heterogeneous document files (digital PDFs, scans, raster images)
//! into corrected plain text, choosing the cheapest extraction path that
//! works and escalating only when quality demands it.
//!
//! ## Why this crate?
//!
//! A corpus is never uniform: some PDFs carry a perfect embedded text layer,
//! some are pure scans, some are a mix, and some inputs are photographs of
//! paper. Running OCR on everything wastes compute on documents `pdftotext`
//! reads in milliseconds; running fast extraction on everything silently
//! drops the scanned half of the corpus. This crate classifies each document
//! first, routes it down the cheapest viable path, and verifies the result
//! before trusting it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document
//!  │
//!  ├─ 1. Classify  text-layer presence + density → TextBased / Scanned /
//!  │               Hybrid / Image
//!  ├─ 2. Extract   TextBased: pdftotext, exact text layer
//!  │      or OCR   Scanned/Image: engine cascade (vision LLM first when a
//!  │               provider is configured, tesseract fallback), advancing
//!  │               while the recognized-word ratio is weak
//!  ├─ 3. Correct   deterministic rules, then policy-gated AI repair
//!  └─ 4. Outcome   text + class + stage trail + warnings, one per document
//! ```
//!
//! Every stage degrades instead of failing where an alternative exists: a
//! broken extraction falls back to OCR, a weak OCR result escalates, a dead
//! AI call keeps the rule-corrected text. A document is fatal only when no
//! path produced any text at all, and even then it is a structured outcome,
//! never a batch-aborting error.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use textlift::{Document, DocumentOrchestrator, ProcessingConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // LLM provider auto-detected from OPENAI_API_KEY etc.; without one,
//!     // vision OCR and AI correction degrade away and the rest still runs.
//!     let config = ProcessingConfig::default();
//!     let orchestrator = DocumentOrchestrator::from_config(config).await?;
//!
//!     let document = Document::from_path("report.pdf")?;
//!     let outcome = orchestrator.process(&document).await;
//!     println!("{}", outcome.final_text);
//!     eprintln!("class: {}, warnings: {}", outcome.class.as_str(), outcome.warnings.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `textlift` binary (clap + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when embedding only the library:
//! ```toml
//! textlift = { version = "0.3", default-features = false }
//! ```
//!
//! ## External tools
//!
//! The bundled engines shell out to `pdftotext`, `pdfinfo`, `pdftoppm`
//! (poppler-utils) and `tesseract`. A missing binary is a per-engine
//! degradation, not a crash: the cascade advances past it.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod confidence;
pub mod document;
pub mod engines;
pub mod error;
pub mod outcome;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod prompts;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use confidence::Confidence;
pub use config::{CorrectionStrategy, ProcessingConfig, ProcessingConfigBuilder};
pub use document::{Document, DocumentClass, ExtractionSignal, MediaType};
pub use error::{EngineError, PipelineError};
pub use outcome::{BatchSummary, CorrectionOutcome, ProcessingOutcome};
pub use process::DocumentOrchestrator;
pub use progress::{BatchProgress, BatchProgressCallback, NoopProgressCallback};
pub use stream::{process_stream, CancelFlag, OutcomeStream};
