//! Two-stage correction: deterministic rules, then policy-gated AI repair.
//!
//! The rule stage always runs. The AI stage runs only when the configured
//! [`CorrectionStrategy`] says so for the document's source confidence, and
//! it is strictly optional at runtime: a failed or timed-out AI call degrades
//! to the rule-corrected text with a warning. Correction therefore never
//! makes a document worse than the rule stage left it, and never turns a
//! readable document into a fatal outcome.

use crate::confidence::Confidence;
use crate::config::CorrectionStrategy;
use crate::engines::CorrectionEngine;
use crate::outcome::CorrectionOutcome;
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

/// Runs the rule stage and, per policy, the AI stage.
pub struct CorrectionPipeline {
    engine: Arc<dyn CorrectionEngine>,
    strategy: CorrectionStrategy,
    ai_timeout: Duration,
}

impl CorrectionPipeline {
    pub fn new(
        engine: Arc<dyn CorrectionEngine>,
        strategy: CorrectionStrategy,
        ai_timeout_secs: u64,
    ) -> Self {
        Self {
            engine,
            strategy,
            ai_timeout: Duration::from_secs(ai_timeout_secs),
        }
    }

    /// Correct one document's text given the confidence of its source stage.
    pub async fn run(&self, text: &str, source_confidence: Confidence) -> CorrectionOutcome {
        let mut stages = vec!["correct:rules".to_string()];
        let mut warnings = Vec::new();

        let ruled = self.engine.apply_rules(text);

        if !self.strategy.should_invoke_ai(source_confidence) {
            debug!(
                "AI correction skipped by policy (source confidence {})",
                source_confidence
            );
            return CorrectionOutcome {
                text: ruled,
                stages_applied: stages,
                ai_invoked: false,
                warnings,
            };
        }

        if ruled.trim().is_empty() {
            // Nothing for a model to repair.
            return CorrectionOutcome {
                text: ruled,
                stages_applied: stages,
                ai_invoked: false,
                warnings,
            };
        }

        stages.push("correct:ai".to_string());
        match timeout(self.ai_timeout, self.engine.ai_correct(&ruled)).await {
            Ok(Ok(corrected)) => CorrectionOutcome {
                text: corrected,
                stages_applied: stages,
                ai_invoked: true,
                warnings,
            },
            Ok(Err(e)) => {
                warn!("AI correction degraded to rule output: {}", e);
                warnings.push(format!("AI correction failed, kept rule-corrected text: {e}"));
                CorrectionOutcome {
                    text: ruled,
                    stages_applied: stages,
                    ai_invoked: false,
                    warnings,
                }
            }
            Err(_) => {
                let secs = self.ai_timeout.as_secs();
                warn!("AI correction timed out after {}s", secs);
                warnings.push(format!(
                    "AI correction timed out after {secs}s, kept rule-corrected text"
                ));
                CorrectionOutcome {
                    text: ruled,
                    stages_applied: stages,
                    ai_invoked: false,
                    warnings,
                }
            }
        }
    }
}
