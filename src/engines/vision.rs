//! Vision-LLM OCR through the `edgequake-llm` provider seam.
//!
//! The cascade's primary tier when a provider is configured: each page is
//! rasterized, base64-encoded, and sent to a vision model with a strict
//! transcription prompt. Transient API errors (429, 503) are retried with
//! exponential backoff before the attempt counts as an execution failure.
//!
//! Vision models do not report a calibrated per-word confidence, so the
//! result carries a fixed nominal confidence and lets the shared word-shape
//! ratio carry the quality signal.

use crate::confidence::Confidence;
use crate::document::{Document, MediaType};
use crate::engines::{rasterize_pdf, word_shape_ratio, OcrEngine, OcrResult};
use crate::error::EngineError;
use crate::prompts::OCR_SYSTEM_PROMPT;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Confidence reported for a successful vision transcription.
///
/// Vision models expose no usable token-level confidence. 0.9 sits above the
/// default correction threshold, so HYBRID correction trusts a vision
/// transcription unless the caller lowers the bar.
const VISION_NOMINAL_CONFIDENCE: f64 = 0.9;

/// OCR engine backed by a vision-capable LLM provider.
pub struct VisionOcr {
    id: String,
    provider: Arc<dyn LLMProvider>,
    /// Rasterization resolution; vision models downscale internally, so 150
    /// DPI keeps payloads small without hurting recognition.
    dpi: u32,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl VisionOcr {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            id: "vision".to_string(),
            provider,
            dpi: 150,
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

    /// Override the rasterization DPI (default 150).
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Read an image file into the provider's attachment type.
    fn load_image(&self, path: &Path) -> Result<ImageData, EngineError> {
        let bytes = std::fs::read(path).map_err(|e| EngineError::Failed {
            engine: self.id.clone(),
            detail: format!("failed to read image '{}': {e}", path.display()),
        })?;
        let mime = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("bmp") => "image/bmp",
            Some("tif") | Some("tiff") => "image/tiff",
            _ => "image/png",
        };
        Ok(ImageData::new(BASE64.encode(&bytes), mime).with_detail("high"))
    }

    /// Transcribe one page image, retrying transient provider failures.
    async fn transcribe_page(
        &self,
        document_id: &str,
        page_num: usize,
        image: ImageData,
    ) -> Result<String, EngineError> {
        let messages = vec![
            ChatMessage::system(OCR_SYSTEM_PROMPT),
            // Providers require a user turn; the image carries the content.
            ChatMessage::user_with_images("", vec![image]),
        ];
        let options = CompletionOptions {
            temperature: Some(0.0),
            max_tokens: Some(4096),
            ..Default::default()
        };

        let mut last_err: Option<String> = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "'{}' page {}: retry {}/{} after {}ms",
                    document_id, page_num, attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match self.provider.chat(&messages, Some(&options)).await {
                Ok(response) => {
                    debug!(
                        "'{}' page {}: {} input tokens, {} output tokens",
                        document_id, page_num, response.prompt_tokens, response.completion_tokens
                    );
                    return Ok(response.content);
                }
                Err(e) => {
                    warn!(
                        "'{}' page {}: attempt {} failed: {}",
                        document_id,
                        page_num,
                        attempt + 1,
                        e
                    );
                    last_err = Some(e.to_string());
                }
            }
        }

        Err(EngineError::Failed {
            engine: self.id.clone(),
            detail: format!(
                "page {page_num} failed after {} retries: {}",
                self.max_retries,
                last_err.unwrap_or_else(|| "unknown error".to_string())
            ),
        })
    }
}

#[async_trait]
impl OcrEngine for VisionOcr {
    fn id(&self) -> &str {
        &self.id
    }

    async fn recognize(&self, document: &Document) -> Result<OcrResult, EngineError> {
        let raster_dir;
        let images: Vec<ImageData> = match document.media_type {
            MediaType::Image => vec![self.load_image(&document.path)?],
            MediaType::Pdf => {
                raster_dir = TempDir::new().map_err(|e| EngineError::Failed {
                    engine: self.id.clone(),
                    detail: e.to_string(),
                })?;
                let pages =
                    rasterize_pdf(&document.path, raster_dir.path(), self.dpi, &self.id).await?;
                pages
                    .iter()
                    .map(|p| self.load_image(p))
                    .collect::<Result<_, _>>()?
            }
        };

        let mut text = String::new();
        for (i, image) in images.into_iter().enumerate() {
            let page_text = self.transcribe_page(&document.id, i + 1, image).await?;
            if !text.is_empty() {
                text.push_str("\n\n");
            }
            text.push_str(page_text.trim_end());
        }

        let ratio = word_shape_ratio(&text);
        Ok(OcrResult {
            text,
            confidence: Confidence::new(VISION_NOMINAL_CONFIDENCE),
            recognized_word_ratio: ratio,
            engine_id: self.id.clone(),
        })
    }
}
