//! Configuration types for document processing.
//!
//! All routing and correction behaviour is controlled through
//! [`ProcessingConfig`], built via its [`ProcessingConfigBuilder`]. Keeping
//! every knob in one struct makes it trivial to share configs across worker
//! tasks, serialise them for logging, and diff two runs to understand why
//! their outputs differ.
//!
//! The thresholds here are documented defaults taken from operating
//! experience, not values derived from data — treat them as policy constants
//! to tune per corpus, not invariants.

use crate::confidence::Confidence;
use crate::error::PipelineError;
use crate::progress::BatchProgress;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration for one processing run.
///
/// Built via [`ProcessingConfig::builder()`] or using
/// [`ProcessingConfig::default()`].
///
/// # Example
/// ```rust
/// use textlift::{CorrectionStrategy, ProcessingConfig};
///
/// let config = ProcessingConfig::builder()
///     .text_density_threshold(150.0)
///     .correction(CorrectionStrategy::RulesOnly)
///     .concurrency(8)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ProcessingConfig {
    /// Minimum chars/page for a text layer to count as complete. Default: 200.
    ///
    /// Below this, a PDF's embedded text layer is treated as partial (Hybrid)
    /// or absent (Scanned). 200 chars/page is roughly a third of a sparse
    /// typed page; genuinely digital documents sit far above it, while
    /// scanners that embed a junk text layer sit far below.
    pub text_density_threshold: f64,

    /// Density at or below which a text layer counts as absent. Default: 1.0.
    ///
    /// Some scan software embeds a near-empty text layer (a stray page number
    /// per page). Treating those as Hybrid would waste a fast-extraction pass
    /// that can never meet the threshold above.
    pub scanned_density_floor: f64,

    /// Minimum recognized-word ratio for an OCR result to be accepted
    /// without escalation. Default: 0.3.
    ///
    /// Garbled OCR output often parses into high-entropy tokens that an
    /// engine still reports with decent raw confidence; the dictionary ratio
    /// catches that case. 0.3 tolerates tables, codes, and part numbers while
    /// rejecting line noise.
    pub dictionary_threshold: f64,

    /// When to run AI correction after the rule stage. Default:
    /// `Hybrid { ai_confidence_threshold: 0.7 }`.
    pub correction: CorrectionStrategy,

    /// Route every document through the OCR cascade, ignoring classification.
    /// Default: false.
    ///
    /// Useful when a corpus is known to carry broken text layers that still
    /// pass the density check (e.g. wrong-encoding extractions).
    pub force_ocr: bool,

    /// Concurrent documents in a batch. Default: 4.
    ///
    /// OCR engines are CPU- or GPU-bound rather than network-bound, so the
    /// useful ceiling is engine capacity, not socket count. Raise it when the
    /// cascade is dominated by remote vision calls.
    pub concurrency: usize,

    /// Per-engine OCR attempt timeout in seconds. Default: 120.
    ///
    /// On expiry the attempt counts as an execution failure and the cascade
    /// advances to the next engine.
    pub ocr_timeout_secs: u64,

    /// AI-correction call timeout in seconds. Default: 60.
    ///
    /// On expiry the pipeline keeps the rule-corrected text and records a
    /// warning; correction never blocks a document indefinitely.
    pub ai_timeout_secs: u64,

    /// Maximum retry attempts on a transient LLM failure. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s, avoiding the
    /// thundering-herd problem when concurrent workers retry together.
    pub retry_backoff_ms: u64,

    /// Language pack passed to tesseract (`-l`). Default: "eng".
    pub ocr_language: String,

    /// LLM model identifier for AI correction / vision OCR, e.g.
    /// "gpt-4.1-nano". If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider factory auto-detects from
    /// environment API keys.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Progress callback fired per document. Default: none.
    pub progress_callback: Option<BatchProgress>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            text_density_threshold: 200.0,
            scanned_density_floor: 1.0,
            dictionary_threshold: 0.3,
            correction: CorrectionStrategy::default(),
            force_ocr: false,
            concurrency: 4,
            ocr_timeout_secs: 120,
            ai_timeout_secs: 60,
            max_retries: 3,
            retry_backoff_ms: 500,
            ocr_language: "eng".to_string(),
            model: None,
            provider_name: None,
            provider: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ProcessingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingConfig")
            .field("text_density_threshold", &self.text_density_threshold)
            .field("scanned_density_floor", &self.scanned_density_floor)
            .field("dictionary_threshold", &self.dictionary_threshold)
            .field("correction", &self.correction)
            .field("force_ocr", &self.force_ocr)
            .field("concurrency", &self.concurrency)
            .field("ocr_timeout_secs", &self.ocr_timeout_secs)
            .field("ai_timeout_secs", &self.ai_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("ocr_language", &self.ocr_language)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .finish()
    }
}

impl ProcessingConfig {
    /// Create a new builder for `ProcessingConfig`.
    pub fn builder() -> ProcessingConfigBuilder {
        ProcessingConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ProcessingConfig`].
#[derive(Debug)]
pub struct ProcessingConfigBuilder {
    config: ProcessingConfig,
}

impl ProcessingConfigBuilder {
    pub fn text_density_threshold(mut self, chars_per_page: f64) -> Self {
        self.config.text_density_threshold = chars_per_page.max(0.0);
        self
    }

    pub fn scanned_density_floor(mut self, chars_per_page: f64) -> Self {
        self.config.scanned_density_floor = chars_per_page.max(0.0);
        self
    }

    pub fn dictionary_threshold(mut self, ratio: f64) -> Self {
        self.config.dictionary_threshold = ratio.clamp(0.0, 1.0);
        self
    }

    pub fn correction(mut self, strategy: CorrectionStrategy) -> Self {
        self.config.correction = strategy;
        self
    }

    pub fn force_ocr(mut self, v: bool) -> Self {
        self.config.force_ocr = v;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs;
        self
    }

    pub fn ai_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ai_timeout_secs = secs;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn progress_callback(mut self, cb: BatchProgress) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ProcessingConfig, PipelineError> {
        let c = &self.config;
        if c.scanned_density_floor > c.text_density_threshold {
            return Err(PipelineError::InvalidConfig(format!(
                "scanned_density_floor ({}) must not exceed text_density_threshold ({})",
                c.scanned_density_floor, c.text_density_threshold
            )));
        }
        if !(0.0..=1.0).contains(&c.dictionary_threshold) {
            return Err(PipelineError::InvalidConfig(format!(
                "dictionary_threshold must be within [0, 1], got {}",
                c.dictionary_threshold
            )));
        }
        if c.concurrency == 0 {
            return Err(PipelineError::InvalidConfig(
                "concurrency must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Policy deciding when the AI correction stage runs.
///
/// Modelled as one tagged variant evaluated in a single place
/// ([`CorrectionStrategy::should_invoke_ai`]) rather than a boolean flag plus
/// threshold checks scattered across call sites.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionStrategy {
    /// Deterministic rules only; the AI stage never runs.
    RulesOnly,
    /// AI runs only when the source confidence falls below the threshold.
    /// (default, with threshold 0.7)
    Hybrid {
        /// Source-confidence cutoff below which AI correction is invoked.
        ai_confidence_threshold: f64,
    },
    /// AI always runs after the rule stage.
    AiOnly,
}

impl Default for CorrectionStrategy {
    fn default() -> Self {
        CorrectionStrategy::Hybrid {
            ai_confidence_threshold: 0.7,
        }
    }
}

impl CorrectionStrategy {
    /// Evaluate the policy for one document's source confidence.
    pub fn should_invoke_ai(&self, source_confidence: Confidence) -> bool {
        match self {
            CorrectionStrategy::RulesOnly => false,
            CorrectionStrategy::AiOnly => true,
            CorrectionStrategy::Hybrid {
                ai_confidence_threshold,
            } => source_confidence.is_below(*ai_confidence_threshold),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let c = ProcessingConfig::default();
        assert_eq!(c.text_density_threshold, 200.0);
        assert_eq!(c.dictionary_threshold, 0.3);
        assert_eq!(
            c.correction,
            CorrectionStrategy::Hybrid {
                ai_confidence_threshold: 0.7
            }
        );
        assert!(!c.force_ocr);
    }

    #[test]
    fn builder_clamps_ratio() {
        let c = ProcessingConfig::builder()
            .dictionary_threshold(1.7)
            .build()
            .unwrap();
        assert_eq!(c.dictionary_threshold, 1.0);
    }

    #[test]
    fn build_rejects_inverted_density_bounds() {
        let err = ProcessingConfig::builder()
            .scanned_density_floor(300.0)
            .text_density_threshold(200.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn hybrid_strategy_threshold_is_strict() {
        let strategy = CorrectionStrategy::default();
        assert!(strategy.should_invoke_ai(Confidence::new(0.5)));
        assert!(!strategy.should_invoke_ai(Confidence::new(0.9)));
        // Exactly at the threshold: confident enough, skip AI.
        assert!(!strategy.should_invoke_ai(Confidence::new(0.7)));
    }

    #[test]
    fn rules_only_and_ai_only_ignore_confidence() {
        assert!(!CorrectionStrategy::RulesOnly.should_invoke_ai(Confidence::NONE));
        assert!(CorrectionStrategy::AiOnly.should_invoke_ai(Confidence::CERTAIN));
    }
}
