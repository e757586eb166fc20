//! Correction engines: deterministic rules, optionally followed by an LLM.
//!
//! [`RulesCorrector`] is the always-available baseline; its AI stage reports
//! itself unavailable so the pipeline degrades cleanly when no provider is
//! configured. [`LlmCorrector`] layers semantic repair on top of the same
//! rule set through the `edgequake-llm` provider seam.

use crate::engines::CorrectionEngine;
use crate::error::EngineError;
use crate::pipeline::rules::apply_rules;
use crate::prompts::CORRECTION_SYSTEM_PROMPT;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Rule-only correction. `ai_correct` always reports unavailable.
#[derive(Debug, Clone, Default)]
pub struct RulesCorrector;

#[async_trait]
impl CorrectionEngine for RulesCorrector {
    fn id(&self) -> &str {
        "rules"
    }

    fn apply_rules(&self, text: &str) -> String {
        apply_rules(text)
    }

    async fn ai_correct(&self, _text: &str) -> Result<String, EngineError> {
        Err(EngineError::Unavailable {
            engine: "rules".to_string(),
            detail: "no LLM provider configured for AI correction".to_string(),
        })
    }
}

/// Rule correction plus LLM-based semantic repair.
pub struct LlmCorrector {
    id: String,
    provider: Arc<dyn LLMProvider>,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl LlmCorrector {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            id: "llm-correct".to_string(),
            provider,
            max_retries: 3,
            retry_backoff_ms: 500,
        }
    }

    /// Override the retry policy (defaults: 3 retries, 500 ms base backoff).
    pub fn with_retry(mut self, max_retries: u32, retry_backoff_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff_ms = retry_backoff_ms;
        self
    }
}

#[async_trait]
impl CorrectionEngine for LlmCorrector {
    fn id(&self) -> &str {
        &self.id
    }

    fn apply_rules(&self, text: &str) -> String {
        apply_rules(text)
    }

    async fn ai_correct(&self, text: &str) -> Result<String, EngineError> {
        let messages = vec![
            ChatMessage::system(CORRECTION_SYSTEM_PROMPT),
            ChatMessage::user(text),
        ];
        // The model must return the whole text, so budget output tokens from
        // input length rather than a flat cap.
        let options = CompletionOptions {
            temperature: Some(0.1),
            max_tokens: Some((text.len() / 3).clamp(1024, 16384)),
            ..Default::default()
        };

        let mut last_err: Option<String> = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "AI correction retry {}/{} after {}ms",
                    attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match self.provider.chat(&messages, Some(&options)).await {
                Ok(response) => {
                    let corrected = response.content.trim().to_string();
                    if corrected.is_empty() {
                        // An empty correction would destroy the document.
                        last_err = Some("model returned empty text".to_string());
                        continue;
                    }
                    debug!(
                        "AI correction: {} chars in, {} chars out, {} output tokens",
                        text.len(),
                        corrected.len(),
                        response.completion_tokens
                    );
                    return Ok(corrected);
                }
                Err(e) => {
                    warn!("AI correction attempt {} failed: {}", attempt + 1, e);
                    last_err = Some(e.to_string());
                }
            }
        }

        Err(EngineError::Failed {
            engine: self.id.clone(),
            detail: format!(
                "correction failed after {} retries: {}",
                self.max_retries,
                last_err.unwrap_or_else(|| "unknown error".to_string())
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rules_corrector_reports_ai_unavailable() {
        let corrector = RulesCorrector;
        let err = corrector.ai_correct("some text").await.unwrap_err();
        assert!(matches!(err, EngineError::Unavailable { .. }));
    }

    #[test]
    fn rules_corrector_applies_shared_rules() {
        let corrector = RulesCorrector;
        assert_eq!(corrector.apply_rules("a\r\nb"), "a\nb\n");
    }
}
