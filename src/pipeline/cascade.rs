//! The OCR cascade: priority-ordered engines, advancing on weak results.
//!
//! Engines run in priority order under a per-attempt timeout. A result whose
//! recognized-word ratio clears the dictionary threshold is accepted
//! immediately and later engines never run. A result below the threshold is
//! not an error: it is kept as a candidate while the cascade escalates, and
//! if every engine produces weak output the best candidate still ships
//! (flagged with a warning) rather than being discarded. Only when every
//! engine fails to *execute* is there nothing to return, and that is the one
//! fatal case.

use crate::document::Document;
use crate::engines::{OcrEngine, OcrResult};
use crate::error::{EngineError, PipelineError};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

/// What one cascade run produced.
#[derive(Debug, Clone)]
pub struct CascadeOutcome {
    /// The selected result (accepted, or best-of-rejected).
    pub result: OcrResult,
    /// Whether the result cleared the dictionary threshold.
    pub accepted: bool,
}

/// Priority-ordered OCR engines plus the acceptance policy.
pub struct OcrCascade {
    engines: Vec<Arc<dyn OcrEngine>>,
    dictionary_threshold: f64,
    attempt_timeout: Duration,
}

impl OcrCascade {
    pub fn new(
        engines: Vec<Arc<dyn OcrEngine>>,
        dictionary_threshold: f64,
        attempt_timeout_secs: u64,
    ) -> Self {
        Self {
            engines,
            dictionary_threshold,
            attempt_timeout: Duration::from_secs(attempt_timeout_secs),
        }
    }

    /// Run the cascade for one document.
    ///
    /// Attempted engines are appended to `stages` as "ocr:<id>" entries and
    /// every absorbed condition to `warnings`, Err included, so the audit
    /// trail survives even when no engine produces a result.
    ///
    /// Returns `Err(PipelineError::OcrUnavailable)` only when every engine
    /// raised an execution error; weak-but-present results always return `Ok`.
    pub async fn run(
        &self,
        document: &Document,
        stages: &mut Vec<String>,
        warnings: &mut Vec<String>,
    ) -> Result<CascadeOutcome, PipelineError> {
        let mut best: Option<OcrResult> = None;
        let mut last_error: Option<EngineError> = None;

        for engine in &self.engines {
            stages.push(format!("ocr:{}", engine.id()));

            let attempt = timeout(self.attempt_timeout, engine.recognize(document)).await;
            let outcome = match attempt {
                Ok(r) => r,
                Err(_) => Err(EngineError::Timeout {
                    engine: engine.id().to_string(),
                    secs: self.attempt_timeout.as_secs(),
                }),
            };

            match outcome {
                Ok(result) => {
                    if result.recognized_word_ratio >= self.dictionary_threshold {
                        debug!(
                            "'{}': accepted by '{}' (ratio {:.2}, confidence {})",
                            document.id,
                            engine.id(),
                            result.recognized_word_ratio,
                            result.confidence
                        );
                        return Ok(CascadeOutcome {
                            result,
                            accepted: true,
                        });
                    }

                    warn!(
                        "'{}': '{}' below dictionary threshold ({:.2} < {:.2}), escalating",
                        document.id,
                        engine.id(),
                        result.recognized_word_ratio,
                        self.dictionary_threshold
                    );
                    warnings.push(format!(
                        "engine '{}' rejected: recognized-word ratio {:.2} below {:.2}",
                        engine.id(),
                        result.recognized_word_ratio,
                        self.dictionary_threshold
                    ));
                    let better = best
                        .as_ref()
                        .map(|b| {
                            (result.recognized_word_ratio, result.confidence)
                                > (b.recognized_word_ratio, b.confidence)
                        })
                        .unwrap_or(true);
                    if better {
                        best = Some(result);
                    }
                }
                Err(e) => {
                    warn!("'{}': engine '{}' failed: {}", document.id, engine.id(), e);
                    warnings.push(format!("engine '{}' failed: {e}", engine.id()));
                    last_error = Some(e);
                }
            }
        }

        match best {
            Some(result) => {
                info!(
                    "'{}': no engine cleared the threshold, keeping best result from '{}'",
                    document.id, result.engine_id
                );
                warnings.push(format!(
                    "no engine cleared the dictionary threshold; kept best result from '{}' (ratio {:.2})",
                    result.engine_id, result.recognized_word_ratio
                ));
                Ok(CascadeOutcome {
                    result,
                    accepted: false,
                })
            }
            None => Err(PipelineError::OcrUnavailable {
                document: document.id.clone(),
                attempts: self.engines.len(),
                last_error: last_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no OCR engines configured".to_string()),
            }),
        }
    }
}
