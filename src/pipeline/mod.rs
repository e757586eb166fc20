//! Pipeline stages composed by the orchestrator.
//!
//! Each stage owns exactly one decision:
//!
//! - [`classify`] — which extraction route a document takes
//! - [`cascade`]  — which OCR result to keep, escalating on weak output
//! - [`rules`]    — deterministic text cleanup, always applied
//! - [`correct`]  — whether and how the AI correction stage runs
//!
//! Stages communicate only through their typed outputs; none of them touches
//! another stage's thresholds or engines.

pub mod cascade;
pub mod classify;
pub mod correct;
pub mod rules;
