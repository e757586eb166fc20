//! The document orchestrator: classify, extract or OCR, correct, finalize.
//!
//! [`DocumentOrchestrator`] owns the per-document state machine and the batch
//! driver on top of it. Its one structural promise is fail-safe-per-document:
//! [`DocumentOrchestrator::process`] always returns a [`ProcessingOutcome`],
//! absorbing fatal errors into `fatal = true` outcomes at its outer boundary,
//! so a batch of N documents yields exactly N outcomes no matter what the
//! engines do.
//!
//! Routing per class:
//!
//! - TextBased — fast extraction; on engine failure, fall back to the cascade
//! - Hybrid    — fast extraction, then a density re-check over the full
//!   document; an incomplete layer discards the fast text and re-routes to
//!   the cascade
//! - Scanned / Image — straight to the OCR cascade
//!
//! `force_ocr` overrides all of this and sends every document to the cascade.

use crate::confidence::Confidence;
use crate::config::ProcessingConfig;
use crate::document::{text_density, Document, DocumentClass};
use crate::engines::llm_correct::{LlmCorrector, RulesCorrector};
use crate::engines::poppler::PopplerExtractor;
use crate::engines::tesseract::TesseractOcr;
use crate::engines::vision::VisionOcr;
use crate::engines::{CorrectionEngine, DocumentInspector, ExtractionEngine, OcrEngine};
use crate::error::PipelineError;
use crate::outcome::{BatchSummary, ProcessingOutcome};
use crate::pipeline::cascade::OcrCascade;
use crate::pipeline::classify::DocumentClassifier;
use crate::pipeline::correct::CorrectionPipeline;
use edgequake_llm::{LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Orchestrates the full pipeline for single documents and batches.
pub struct DocumentOrchestrator {
    config: ProcessingConfig,
    classifier: DocumentClassifier,
    extractor: Arc<dyn ExtractionEngine>,
    cascade: OcrCascade,
    correction: CorrectionPipeline,
}

impl DocumentOrchestrator {
    /// Assemble an orchestrator from explicit engines.
    ///
    /// This is the seam tests and embedders use; [`Self::from_config`] wires
    /// up the bundled engine set.
    pub fn new(
        config: ProcessingConfig,
        inspector: Arc<dyn DocumentInspector>,
        extractor: Arc<dyn ExtractionEngine>,
        ocr_engines: Vec<Arc<dyn OcrEngine>>,
        corrector: Arc<dyn CorrectionEngine>,
    ) -> Self {
        let classifier = DocumentClassifier::new(inspector, &config);
        let cascade = OcrCascade::new(
            ocr_engines,
            config.dictionary_threshold,
            config.ocr_timeout_secs,
        );
        let correction = CorrectionPipeline::new(corrector, config.correction, config.ai_timeout_secs);
        Self {
            config,
            classifier,
            extractor,
            cascade,
            correction,
        }
    }

    /// Assemble the bundled engine set: poppler for inspection and
    /// extraction, and — when an LLM provider can be resolved — vision OCR
    /// as the cascade's primary tier with tesseract as the fallback, plus AI
    /// correction. Without a provider, tesseract is the only OCR tier and
    /// AI-dependent stages degrade with warnings instead.
    pub async fn from_config(config: ProcessingConfig) -> Result<Self, PipelineError> {
        let poppler = Arc::new(PopplerExtractor::new());
        let tesseract: Arc<dyn OcrEngine> = Arc::new(TesseractOcr::new(&config.ocr_language));

        let (ocr_engines, corrector): (Vec<Arc<dyn OcrEngine>>, Arc<dyn CorrectionEngine>) =
            match resolve_provider(&config).await {
                Some(provider) => {
                    let vision: Arc<dyn OcrEngine> = Arc::new(
                        VisionOcr::new(Arc::clone(&provider))
                            .with_retry(config.max_retries, config.retry_backoff_ms),
                    );
                    (
                        cascade_order(Some(vision), tesseract),
                        Arc::new(
                            LlmCorrector::new(provider)
                                .with_retry(config.max_retries, config.retry_backoff_ms),
                        ),
                    )
                }
                None => {
                    info!("No LLM provider resolved; vision OCR and AI correction disabled");
                    (cascade_order(None, tesseract), Arc::new(RulesCorrector))
                }
            };

        Ok(Self::new(
            config,
            poppler.clone() as Arc<dyn DocumentInspector>,
            poppler as Arc<dyn ExtractionEngine>,
            ocr_engines,
            corrector,
        ))
    }

    /// The configuration this orchestrator was built with.
    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Process one document. Never fails: fatal conditions become outcomes.
    pub async fn process(&self, document: &Document) -> ProcessingOutcome {
        let start = Instant::now();
        let mut stages = Vec::new();
        let mut warnings = Vec::new();
        let mut class = DocumentClass::Image;

        let result = self
            .process_inner(document, &mut stages, &mut warnings, &mut class)
            .await;

        match result {
            Ok(final_text) => {
                info!(
                    "Processed '{}' as {} in {:?} ({} warnings)",
                    document.id,
                    class.as_str(),
                    start.elapsed(),
                    warnings.len()
                );
                ProcessingOutcome {
                    document_id: document.id.clone(),
                    final_text,
                    class,
                    stages_applied: stages,
                    warnings,
                    fatal: false,
                }
            }
            Err(e) => {
                warn!("Processing '{}' failed: {}", document.id, e);
                ProcessingOutcome::failed(&document.id, class, stages, warnings, e)
            }
        }
    }

    async fn process_inner(
        &self,
        document: &Document,
        stages: &mut Vec<String>,
        warnings: &mut Vec<String>,
        class: &mut DocumentClass,
    ) -> Result<String, PipelineError> {
        stages.push("classify".to_string());
        let classification = self.classifier.classify(document).await;
        warnings.extend(classification.warnings);
        *class = classification.signal.class;

        let class_routes_to_ocr = matches!(*class, DocumentClass::Scanned | DocumentClass::Image);
        if self.config.force_ocr && !class_routes_to_ocr {
            debug!("'{}': force_ocr overrides {} routing", document.id, class.as_str());
        }
        let route_to_ocr = self.config.force_ocr || class_routes_to_ocr;

        let (text, source_confidence) = if route_to_ocr {
            self.run_cascade(document, stages, warnings).await?
        } else {
            self.extract_with_fallback(document, *class, stages, warnings)
                .await?
        };

        let corrected = self.correction.run(&text, source_confidence).await;
        stages.extend(corrected.stages_applied);
        warnings.extend(corrected.warnings);

        Ok(corrected.text)
    }

    /// Fast extraction for TextBased and Hybrid documents, falling back to
    /// the cascade when the engine fails or a Hybrid layer proves incomplete.
    async fn extract_with_fallback(
        &self,
        document: &Document,
        class: DocumentClass,
        stages: &mut Vec<String>,
        warnings: &mut Vec<String>,
    ) -> Result<(String, Confidence), PipelineError> {
        stages.push(format!("extract:{}", self.extractor.id()));

        let extraction = match self.extractor.extract(document).await {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!("'{}': extraction failed, falling back to OCR: {}", document.id, e);
                warnings.push(format!("extraction failed, fell back to OCR: {e}"));
                return self.run_cascade(document, stages, warnings).await;
            }
        };

        if class == DocumentClass::Hybrid {
            // The classifier only sampled leading pages; re-check over the
            // whole document before trusting a partial layer.
            let full_density = text_density(&extraction.text, extraction.page_count);
            if full_density < self.config.text_density_threshold {
                warnings.push(format!(
                    "hybrid text layer incomplete ({full_density:.0} chars/page), re-routed to OCR"
                ));
                return self.run_cascade(document, stages, warnings).await;
            }
        }

        // A digital text layer is exact; recognition uncertainty is zero.
        Ok((extraction.text, Confidence::CERTAIN))
    }

    async fn run_cascade(
        &self,
        document: &Document,
        stages: &mut Vec<String>,
        warnings: &mut Vec<String>,
    ) -> Result<(String, Confidence), PipelineError> {
        let outcome = self.cascade.run(document, stages, warnings).await?;
        Ok((outcome.result.text, outcome.result.confidence))
    }

    /// Process a batch with bounded concurrency.
    ///
    /// Outcomes come back in submission order regardless of completion order,
    /// one per input document. Progress callbacks fire per document as each
    /// finishes.
    pub async fn process_batch(
        &self,
        documents: &[Document],
    ) -> (Vec<ProcessingOutcome>, BatchSummary) {
        let start = Instant::now();
        self.notify_batch_start(documents.len());

        let mut indexed: Vec<(usize, ProcessingOutcome)> =
            stream::iter(documents.iter().enumerate().map(|(index, document)| async move {
                self.notify_document_start(&document.id);
                let outcome = self.process(document).await;
                self.notify_document_done(&outcome);
                (index, outcome)
            }))
            .buffer_unordered(self.config.concurrency)
            .collect()
            .await;

        indexed.sort_by_key(|(index, _)| *index);
        let outcomes: Vec<ProcessingOutcome> = indexed.into_iter().map(|(_, o)| o).collect();

        let summary = BatchSummary::from_outcomes(&outcomes, start.elapsed().as_millis() as u64);
        info!(
            "Batch finished: {}/{} clean, {} with warnings, {} fatal in {}ms",
            summary.succeeded, summary.total, summary.with_warnings, summary.fatal, summary.duration_ms
        );
        if let Some(cb) = &self.config.progress_callback {
            cb.on_batch_complete(&summary);
        }
        (outcomes, summary)
    }

    pub(crate) fn notify_batch_start(&self, total: usize) {
        if let Some(cb) = &self.config.progress_callback {
            cb.on_batch_start(total);
        }
    }

    pub(crate) fn notify_document_start(&self, document_id: &str) {
        if let Some(cb) = &self.config.progress_callback {
            cb.on_document_start(document_id);
        }
    }

    pub(crate) fn notify_document_done(&self, outcome: &ProcessingOutcome) {
        if let Some(cb) = &self.config.progress_callback {
            if outcome.fatal {
                let error = outcome
                    .warnings
                    .last()
                    .map(String::as_str)
                    .unwrap_or("unknown error");
                cb.on_document_fatal(&outcome.document_id, error);
            } else {
                cb.on_document_complete(
                    &outcome.document_id,
                    outcome.final_text.len(),
                    outcome.warnings.len(),
                );
            }
        }
    }
}

/// Cascade priority for the bundled engines: the vision tier leads when a
/// provider is available, with classic OCR as the fallback.
fn cascade_order(
    vision: Option<Arc<dyn OcrEngine>>,
    classic: Arc<dyn OcrEngine>,
) -> Vec<Arc<dyn OcrEngine>> {
    match vision {
        Some(vision) => vec![vision, classic],
        None => vec![classic],
    }
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. Pre-built provider (`config.provider`) — used as-is.
/// 2. Named provider (`config.provider_name`) plus optional model; the
///    factory reads the matching API key from the environment.
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL` env pair.
/// 4. `OPENAI_API_KEY`, preferred when several keys are present.
/// 5. Full auto-detection via [`ProviderFactory::from_env`].
///
/// Returns `None` when nothing resolves: an LLM is an optional quality tier
/// here, not a requirement, so the caller degrades instead of failing.
async fn resolve_provider(config: &ProcessingConfig) -> Option<Arc<dyn LLMProvider>> {
    if let Some(ref provider) = config.provider {
        return Some(Arc::clone(provider));
    }

    let default_model = config.model.as_deref().unwrap_or("gpt-4.1-nano");

    if let Some(ref name) = config.provider_name {
        match ProviderFactory::create_llm_provider(name, default_model) {
            Ok(provider) => return Some(provider),
            Err(e) => {
                warn!("Provider '{}' not usable: {}", name, e);
                return None;
            }
        }
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            match ProviderFactory::create_llm_provider(&prov, &model) {
                Ok(provider) => return Some(provider),
                Err(e) => {
                    warn!("Provider '{}' from environment not usable: {}", prov, e);
                    return None;
                }
            }
        }
    }

    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        if !key.is_empty() {
            match ProviderFactory::create_llm_provider("openai", default_model) {
                Ok(provider) => return Some(provider),
                Err(e) => warn!("OpenAI provider not usable: {}", e),
            }
        }
    }

    match ProviderFactory::from_env() {
        Ok((provider, _embedding)) => Some(provider),
        Err(e) => {
            debug!("No LLM provider auto-detected: {}", e);
            None
        }
    }
}
