//! Processing outcomes and batch statistics.
//!
//! A [`ProcessingOutcome`] is the unit handed to the downstream chunking
//! stage: exactly one per input document, created once, immutable after the
//! orchestrator returns it. Fatal conditions are still structured outcomes
//! (`fatal = true` plus a human-readable warning) rather than errors, which
//! is what lets a batch of N documents always produce N outcomes.

use crate::document::DocumentClass;
use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Finalized text plus provenance for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingOutcome {
    /// Identity of the source document.
    pub document_id: String,
    /// The corrected text, empty when `fatal` is set.
    pub final_text: String,
    /// Class assigned during this pass.
    pub class: DocumentClass,
    /// Ordered audit trail of stages that ran ("classify", "extract:poppler",
    /// "ocr:tesseract", "correct:rules", "correct:ai", ...). Append-only
    /// during the pass.
    pub stages_applied: Vec<String>,
    /// Non-fatal conditions absorbed along the way.
    pub warnings: Vec<String>,
    /// Whether processing ended in an unrecovered condition.
    pub fatal: bool,
}

impl ProcessingOutcome {
    /// Build the terminal outcome for an unrecovered condition.
    ///
    /// Whatever stages already ran stay in the audit trail; the error text
    /// becomes the last warning.
    pub fn failed(
        document_id: impl Into<String>,
        class: DocumentClass,
        stages_applied: Vec<String>,
        mut warnings: Vec<String>,
        error: impl std::fmt::Display,
    ) -> Self {
        warnings.push(format!("fatal: {error}"));
        Self {
            document_id: document_id.into(),
            final_text: String::new(),
            class,
            stages_applied,
            warnings,
            fatal: true,
        }
    }

    /// Succeeded with no warnings at all.
    pub fn is_clean(&self) -> bool {
        !self.fatal && self.warnings.is_empty()
    }

    /// Write the finalized text to `path`.
    pub fn write_text(&self, path: &Path) -> Result<(), PipelineError> {
        std::fs::write(path, &self.final_text).map_err(|source| {
            PipelineError::OutputWriteFailed {
                path: path.to_path_buf(),
                source,
            }
        })
    }
}

/// Result of one correction-pipeline run.
///
/// `stages_applied` is append-only during the run and forms the pipeline's
/// contribution to the document audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionOutcome {
    /// The corrected text.
    pub text: String,
    /// Stage names in application order.
    pub stages_applied: Vec<String>,
    /// Whether the AI stage ran to completion. Stays `false` when the AI
    /// stage was skipped by policy *or* attempted and degraded.
    pub ai_invoked: bool,
    /// Non-fatal conditions recorded during correction.
    pub warnings: Vec<String>,
}

/// Per-batch success/warning/fatal counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Documents submitted.
    pub total: usize,
    /// Outcomes with `fatal = false` and no warnings.
    pub succeeded: usize,
    /// Outcomes with `fatal = false` but at least one warning.
    pub with_warnings: usize,
    /// Outcomes with `fatal = true`.
    pub fatal: usize,
    /// Wall-clock duration of the whole batch.
    pub duration_ms: u64,
}

impl BatchSummary {
    /// Tally a slice of outcomes.
    pub fn from_outcomes(outcomes: &[ProcessingOutcome], duration_ms: u64) -> Self {
        let mut summary = BatchSummary {
            total: outcomes.len(),
            duration_ms,
            ..Default::default()
        };
        for outcome in outcomes {
            if outcome.fatal {
                summary.fatal += 1;
            } else if outcome.warnings.is_empty() {
                summary.succeeded += 1;
            } else {
                summary.with_warnings += 1;
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(fatal: bool, warnings: Vec<&str>) -> ProcessingOutcome {
        ProcessingOutcome {
            document_id: "doc".into(),
            final_text: String::new(),
            class: DocumentClass::TextBased,
            stages_applied: vec![],
            warnings: warnings.into_iter().map(String::from).collect(),
            fatal,
        }
    }

    #[test]
    fn failed_outcome_keeps_trail_and_appends_warning() {
        let o = ProcessingOutcome::failed(
            "doc-3",
            DocumentClass::Scanned,
            vec!["classify".into(), "ocr:tesseract".into()],
            vec!["engine 'vision' unavailable".into()],
            "no OCR engine produced a result",
        );
        assert!(o.fatal);
        assert!(o.final_text.is_empty());
        assert_eq!(o.stages_applied.len(), 2);
        assert_eq!(o.warnings.len(), 2);
        assert!(o.warnings.last().unwrap().starts_with("fatal:"));
    }

    #[test]
    fn write_text_reports_the_failing_path() {
        let o = ProcessingOutcome {
            document_id: "doc".into(),
            final_text: "text\n".into(),
            class: DocumentClass::TextBased,
            stages_applied: vec![],
            warnings: vec![],
            fatal: false,
        };

        let dir = tempfile::tempdir().unwrap();
        let ok_path = dir.path().join("doc.txt");
        o.write_text(&ok_path).unwrap();
        assert_eq!(std::fs::read_to_string(&ok_path).unwrap(), "text\n");

        let err = o.write_text(Path::new("/no/such/dir/doc.txt")).unwrap_err();
        assert!(matches!(err, PipelineError::OutputWriteFailed { .. }));
    }

    #[test]
    fn summary_counts_three_ways() {
        let outcomes = vec![
            outcome(false, vec![]),
            outcome(false, vec!["low confidence"]),
            outcome(true, vec!["fatal: boom"]),
            outcome(false, vec![]),
        ];
        let s = BatchSummary::from_outcomes(&outcomes, 42);
        assert_eq!(s.total, 4);
        assert_eq!(s.succeeded, 2);
        assert_eq!(s.with_warnings, 1);
        assert_eq!(s.fatal, 1);
        assert_eq!(s.duration_ms, 42);
    }
}
