//! Integration tests for the full orchestrator pipeline.
//!
//! These run entirely on scripted in-memory engines — no poppler, no
//! tesseract, no LLM — so they exercise the routing, escalation, and
//! degradation decisions without external tools and always run in CI.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use textlift::engines::{
    CorrectionEngine, DocumentInspector, Extraction, ExtractionEngine, OcrEngine, OcrResult,
};
use textlift::{
    process_stream, CancelFlag, Confidence, CorrectionStrategy, Document, DocumentClass,
    DocumentOrchestrator, EngineError, MediaType, ProcessingConfig,
};

// ── Scripted engines ─────────────────────────────────────────────────────────

/// Inspector returning a per-document report, with a shared default.
struct StubInspector {
    by_id: HashMap<String, textlift::document::InspectionReport>,
    default: textlift::document::InspectionReport,
}

impl StubInspector {
    fn with_density(has_text_layer: bool, density: f64) -> Arc<Self> {
        Arc::new(Self {
            by_id: HashMap::new(),
            default: report(has_text_layer, density),
        })
    }
}

fn report(has_text_layer: bool, density: f64) -> textlift::document::InspectionReport {
    textlift::document::InspectionReport {
        has_text_layer,
        text_density: density,
        page_count: 1,
    }
}

#[async_trait]
impl DocumentInspector for StubInspector {
    fn id(&self) -> &str {
        "stub-inspect"
    }

    async fn inspect(
        &self,
        document: &Document,
    ) -> Result<textlift::document::InspectionReport, EngineError> {
        Ok(self
            .by_id
            .get(&document.id)
            .cloned()
            .unwrap_or_else(|| self.default.clone()))
    }
}

/// Extraction engine that returns fixed text, or fails for listed ids.
struct StubExtractor {
    text: String,
    fail_ids: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl StubExtractor {
    fn with_text(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            fail_ids: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            text: String::new(),
            fail_ids: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ExtractionEngine for StubExtractor {
    fn id(&self) -> &str {
        "stub-extract"
    }

    async fn extract(&self, document: &Document) -> Result<Extraction, EngineError> {
        self.calls.lock().unwrap().push(document.id.clone());
        if self.text.is_empty() || self.fail_ids.contains(&document.id) {
            return Err(EngineError::Failed {
                engine: "stub-extract".to_string(),
                detail: "scripted failure".to_string(),
            });
        }
        Ok(Extraction {
            text: self.text.clone(),
            density: textlift::document::text_density(&self.text, 1),
            page_count: 1,
        })
    }
}

/// OCR engine with a fixed result, failing for listed ids.
struct StubOcr {
    text: String,
    confidence: f64,
    ratio: f64,
    fail_ids: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl StubOcr {
    fn with_result(text: &str, confidence: f64, ratio: f64) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            confidence,
            ratio,
            fail_ids: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing_for(ids: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            text: "recognized text".to_string(),
            confidence: 0.85,
            ratio: 0.9,
            fail_ids: ids.iter().map(|s| s.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl OcrEngine for StubOcr {
    fn id(&self) -> &str {
        "stub-ocr"
    }

    async fn recognize(&self, document: &Document) -> Result<OcrResult, EngineError> {
        self.calls.lock().unwrap().push(document.id.clone());
        if self.fail_ids.contains(&document.id) {
            return Err(EngineError::Failed {
                engine: "stub-ocr".to_string(),
                detail: "scripted failure".to_string(),
            });
        }
        Ok(OcrResult {
            text: self.text.clone(),
            confidence: Confidence::new(self.confidence),
            recognized_word_ratio: self.ratio,
            engine_id: "stub-ocr".to_string(),
        })
    }
}

/// Corrector whose rule stage appends a newline and whose AI stage is counted.
struct StubCorrector {
    ai_succeeds: bool,
    ai_calls: AtomicUsize,
}

impl StubCorrector {
    fn new(ai_succeeds: bool) -> Arc<Self> {
        Arc::new(Self {
            ai_succeeds,
            ai_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl CorrectionEngine for StubCorrector {
    fn id(&self) -> &str {
        "stub-correct"
    }

    fn apply_rules(&self, text: &str) -> String {
        format!("{}\n", text.trim_end())
    }

    async fn ai_correct(&self, text: &str) -> Result<String, EngineError> {
        self.ai_calls.fetch_add(1, Ordering::SeqCst);
        if self.ai_succeeds {
            Ok(format!("AI<{}>", text.trim_end()))
        } else {
            Err(EngineError::Failed {
                engine: "stub-correct".to_string(),
                detail: "scripted failure".to_string(),
            })
        }
    }
}

// ── Harness ─────────────────────────────────────────────────────────────────

fn pdf(id: &str) -> Document {
    Document::new(id, format!("/tmp/{id}"), MediaType::Pdf, 1024)
}

fn image(id: &str) -> Document {
    Document::new(id, format!("/tmp/{id}"), MediaType::Image, 1024)
}

struct World {
    inspector: Arc<StubInspector>,
    extractor: Arc<StubExtractor>,
    ocr: Arc<StubOcr>,
    corrector: Arc<StubCorrector>,
}

impl World {
    fn orchestrator(&self, config: ProcessingConfig) -> DocumentOrchestrator {
        DocumentOrchestrator::new(
            config,
            self.inspector.clone(),
            self.extractor.clone(),
            vec![self.ocr.clone()],
            self.corrector.clone(),
        )
    }
}

/// A dense digital document plus a healthy OCR engine.
fn digital_world() -> World {
    World {
        inspector: StubInspector::with_density(true, 500.0),
        extractor: StubExtractor::with_text(&"x".repeat(300)),
        ocr: StubOcr::with_result("recognized text", 0.85, 0.9),
        corrector: StubCorrector::new(true),
    }
}

/// A scan with no text layer plus a healthy OCR engine.
fn scanned_world() -> World {
    World {
        inspector: StubInspector::with_density(false, 0.0),
        extractor: StubExtractor::with_text(&"x".repeat(300)),
        ocr: StubOcr::with_result("recognized text", 0.85, 0.9),
        corrector: StubCorrector::new(true),
    }
}

// ── Routing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn text_based_uses_extraction_and_never_ocr() {
    let w = digital_world();
    let orchestrator = w.orchestrator(ProcessingConfig::default());

    let outcome = orchestrator.process(&pdf("report.pdf")).await;

    assert!(!outcome.fatal);
    assert_eq!(outcome.class, DocumentClass::TextBased);
    assert_eq!(w.extractor.call_count(), 1);
    assert_eq!(w.ocr.call_count(), 0);
    assert!(outcome.stages_applied.contains(&"extract:stub-extract".to_string()));
    assert!(outcome.final_text.starts_with("xxx"));
}

#[tokio::test]
async fn scanned_goes_straight_to_ocr() {
    let w = scanned_world();
    let orchestrator = w.orchestrator(ProcessingConfig::default());

    let outcome = orchestrator.process(&pdf("scan.pdf")).await;

    assert!(!outcome.fatal);
    assert_eq!(outcome.class, DocumentClass::Scanned);
    // No text layer: the extraction engine must never be invoked.
    assert_eq!(w.extractor.call_count(), 0);
    assert_eq!(w.ocr.call_count(), 1);
    assert_eq!(outcome.final_text, "recognized text\n");
}

#[tokio::test]
async fn image_media_routes_to_ocr() {
    let w = digital_world();
    let orchestrator = w.orchestrator(ProcessingConfig::default());

    let outcome = orchestrator.process(&image("photo.png")).await;

    assert_eq!(outcome.class, DocumentClass::Image);
    assert_eq!(w.extractor.call_count(), 0);
    assert_eq!(w.ocr.call_count(), 1);
}

#[tokio::test]
async fn force_ocr_overrides_text_based_routing() {
    let w = digital_world();
    let config = ProcessingConfig::builder().force_ocr(true).build().unwrap();
    let orchestrator = w.orchestrator(config);

    let outcome = orchestrator.process(&pdf("report.pdf")).await;

    assert_eq!(outcome.class, DocumentClass::TextBased);
    assert_eq!(w.extractor.call_count(), 0);
    assert_eq!(w.ocr.call_count(), 1);
    assert_eq!(outcome.final_text, "recognized text\n");
}

// ── Hybrid re-check ─────────────────────────────────────────────────────────

#[tokio::test]
async fn hybrid_with_complete_extraction_keeps_fast_text() {
    let w = World {
        inspector: StubInspector::with_density(true, 100.0),
        extractor: StubExtractor::with_text(&"y".repeat(300)),
        ocr: StubOcr::with_result("recognized text", 0.85, 0.9),
        corrector: StubCorrector::new(true),
    };
    let orchestrator = w.orchestrator(ProcessingConfig::default());

    let outcome = orchestrator.process(&pdf("mixed.pdf")).await;

    assert_eq!(outcome.class, DocumentClass::Hybrid);
    assert_eq!(w.ocr.call_count(), 0);
    assert!(outcome.final_text.starts_with("yyy"));
}

#[tokio::test]
async fn hybrid_with_incomplete_extraction_reroutes_to_ocr() {
    let w = World {
        inspector: StubInspector::with_density(true, 100.0),
        // 50 chars over 1 page: below the 200 chars/page threshold.
        extractor: StubExtractor::with_text(&"y".repeat(50)),
        ocr: StubOcr::with_result("recognized text", 0.85, 0.9),
        corrector: StubCorrector::new(true),
    };
    let orchestrator = w.orchestrator(ProcessingConfig::default());

    let outcome = orchestrator.process(&pdf("mixed.pdf")).await;

    assert!(!outcome.fatal);
    assert_eq!(outcome.class, DocumentClass::Hybrid);
    assert_eq!(w.ocr.call_count(), 1);
    // The partial fast text is discarded, not merged.
    assert_eq!(outcome.final_text, "recognized text\n");
    assert!(outcome
        .warnings
        .iter()
        .any(|warning| warning.contains("re-routed to OCR")));
}

#[tokio::test]
async fn extraction_failure_falls_back_to_ocr() {
    let w = World {
        inspector: StubInspector::with_density(true, 500.0),
        extractor: StubExtractor::failing(),
        ocr: StubOcr::with_result("recognized text", 0.85, 0.9),
        corrector: StubCorrector::new(true),
    };
    let orchestrator = w.orchestrator(ProcessingConfig::default());

    let outcome = orchestrator.process(&pdf("broken-layer.pdf")).await;

    assert!(!outcome.fatal);
    assert_eq!(outcome.final_text, "recognized text\n");
    assert!(outcome
        .warnings
        .iter()
        .any(|warning| warning.contains("fell back to OCR")));
}

// ── Correction policy ───────────────────────────────────────────────────────

#[tokio::test]
async fn digital_text_skips_ai_under_default_hybrid_policy() {
    let w = digital_world();
    let orchestrator = w.orchestrator(ProcessingConfig::default());

    let outcome = orchestrator.process(&pdf("report.pdf")).await;

    // Digital extraction carries full confidence; hybrid policy skips AI.
    assert_eq!(w.corrector.ai_calls.load(Ordering::SeqCst), 0);
    assert!(!outcome.stages_applied.contains(&"correct:ai".to_string()));
}

#[tokio::test]
async fn weak_ocr_confidence_triggers_ai_correction() {
    let w = World {
        inspector: StubInspector::with_density(false, 0.0),
        extractor: StubExtractor::with_text("unused"),
        ocr: StubOcr::with_result("n0isy scan", 0.5, 0.9),
        corrector: StubCorrector::new(true),
    };
    let orchestrator = w.orchestrator(ProcessingConfig::default());

    let outcome = orchestrator.process(&pdf("scan.pdf")).await;

    assert_eq!(w.corrector.ai_calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.final_text, "AI<n0isy scan>");
    assert!(outcome.stages_applied.contains(&"correct:ai".to_string()));
}

#[tokio::test]
async fn confident_ocr_skips_ai_under_hybrid_policy() {
    let w = scanned_world();
    let orchestrator = w.orchestrator(ProcessingConfig::default());

    orchestrator.process(&pdf("scan.pdf")).await;

    assert_eq!(w.corrector.ai_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_ai_keeps_rule_corrected_text() {
    let w = World {
        inspector: StubInspector::with_density(false, 0.0),
        extractor: StubExtractor::with_text("unused"),
        ocr: StubOcr::with_result("n0isy scan", 0.5, 0.9),
        corrector: StubCorrector::new(false),
    };
    let orchestrator = w.orchestrator(ProcessingConfig::default());

    let outcome = orchestrator.process(&pdf("scan.pdf")).await;

    assert!(!outcome.fatal);
    assert_eq!(outcome.final_text, "n0isy scan\n");
    assert!(outcome
        .warnings
        .iter()
        .any(|warning| warning.contains("kept rule-corrected text")));
}

#[tokio::test]
async fn rules_only_strategy_never_touches_ai() {
    let w = World {
        inspector: StubInspector::with_density(false, 0.0),
        extractor: StubExtractor::with_text("unused"),
        ocr: StubOcr::with_result("n0isy scan", 0.1, 0.9),
        corrector: StubCorrector::new(true),
    };
    let config = ProcessingConfig::builder()
        .correction(CorrectionStrategy::RulesOnly)
        .build()
        .unwrap();
    let orchestrator = w.orchestrator(config);

    orchestrator.process(&pdf("scan.pdf")).await;

    assert_eq!(w.corrector.ai_calls.load(Ordering::SeqCst), 0);
}

// ── Fatal absorption and batch fail-safety ──────────────────────────────────

#[tokio::test]
async fn total_ocr_failure_is_a_fatal_outcome_not_an_error() {
    let w = World {
        inspector: StubInspector::with_density(false, 0.0),
        extractor: StubExtractor::with_text("unused"),
        ocr: StubOcr::failing_for(&["scan.pdf"]),
        corrector: StubCorrector::new(true),
    };
    let orchestrator = w.orchestrator(ProcessingConfig::default());

    let outcome = orchestrator.process(&pdf("scan.pdf")).await;

    assert!(outcome.fatal);
    assert!(outcome.final_text.is_empty());
    // The attempted OCR stage and its failure survive into the fatal outcome.
    assert_eq!(
        outcome.stages_applied,
        vec!["classify".to_string(), "ocr:stub-ocr".to_string()]
    );
    assert!(outcome
        .warnings
        .iter()
        .any(|warning| warning.contains("engine 'stub-ocr' failed")));
    assert!(outcome
        .warnings
        .last()
        .unwrap()
        .starts_with("fatal:"));
}

#[tokio::test]
async fn batch_isolates_the_failing_document() {
    // Five scans; OCR is scripted to fail only for doc-3.
    let w = World {
        inspector: StubInspector::with_density(false, 0.0),
        extractor: StubExtractor::with_text("unused"),
        ocr: StubOcr::failing_for(&["doc-3"]),
        corrector: StubCorrector::new(true),
    };
    let orchestrator = w.orchestrator(ProcessingConfig::default());

    let documents: Vec<Document> = (1..=5).map(|i| pdf(&format!("doc-{i}"))).collect();
    let (outcomes, summary) = orchestrator.process_batch(&documents).await;

    assert_eq!(outcomes.len(), 5);
    // Submission order survives concurrent completion.
    for (i, outcome) in outcomes.iter().enumerate() {
        assert_eq!(outcome.document_id, format!("doc-{}", i + 1));
    }
    assert!(outcomes[2].fatal);
    assert_eq!(outcomes.iter().filter(|o| !o.fatal).count(), 4);
    for outcome in outcomes.iter().filter(|o| !o.fatal) {
        assert_eq!(outcome.final_text, "recognized text\n");
    }

    assert_eq!(summary.total, 5);
    assert_eq!(summary.fatal, 1);
    assert_eq!(summary.succeeded, 4);
}

#[tokio::test]
async fn progress_callbacks_fire_per_document() {
    use textlift::{BatchProgressCallback, BatchSummary};

    #[derive(Default)]
    struct Counting {
        batch_total: AtomicUsize,
        starts: AtomicUsize,
        completes: AtomicUsize,
        fatals: AtomicUsize,
        summary_fatal: AtomicUsize,
    }

    impl BatchProgressCallback for Counting {
        fn on_batch_start(&self, total: usize) {
            self.batch_total.store(total, Ordering::SeqCst);
        }
        fn on_document_start(&self, _id: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }
        fn on_document_complete(&self, _id: &str, _len: usize, _warnings: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }
        fn on_document_fatal(&self, _id: &str, _error: &str) {
            self.fatals.fetch_add(1, Ordering::SeqCst);
        }
        fn on_batch_complete(&self, summary: &BatchSummary) {
            self.summary_fatal.store(summary.fatal, Ordering::SeqCst);
        }
    }

    let counting = Arc::new(Counting::default());
    let w = World {
        inspector: StubInspector::with_density(false, 0.0),
        extractor: StubExtractor::with_text("unused"),
        ocr: StubOcr::failing_for(&["doc-2"]),
        corrector: StubCorrector::new(true),
    };
    let config = ProcessingConfig::builder()
        .progress_callback(counting.clone())
        .build()
        .unwrap();
    let orchestrator = w.orchestrator(config);

    let documents: Vec<Document> = (1..=3).map(|i| pdf(&format!("doc-{i}"))).collect();
    orchestrator.process_batch(&documents).await;

    assert_eq!(counting.batch_total.load(Ordering::SeqCst), 3);
    assert_eq!(counting.starts.load(Ordering::SeqCst), 3);
    assert_eq!(counting.completes.load(Ordering::SeqCst), 2);
    assert_eq!(counting.fatals.load(Ordering::SeqCst), 1);
    assert_eq!(counting.summary_fatal.load(Ordering::SeqCst), 1);
}

// ── Streaming ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn stream_yields_every_outcome_when_uncancelled() {
    use futures::StreamExt;

    let w = scanned_world();
    let orchestrator = Arc::new(w.orchestrator(ProcessingConfig::default()));
    let documents: Vec<Document> = (1..=4).map(|i| pdf(&format!("doc-{i}"))).collect();

    let outcomes: Vec<_> = process_stream(orchestrator, documents, CancelFlag::new())
        .collect()
        .await;

    assert_eq!(outcomes.len(), 4);
    assert!(outcomes.iter().all(|o| !o.fatal));
}

#[tokio::test]
async fn stream_fires_per_document_progress_events() {
    use futures::StreamExt;
    use textlift::BatchProgressCallback;

    #[derive(Default)]
    struct Counting {
        batch_total: AtomicUsize,
        starts: AtomicUsize,
        completes: AtomicUsize,
        fatals: AtomicUsize,
    }

    impl BatchProgressCallback for Counting {
        fn on_batch_start(&self, total: usize) {
            self.batch_total.store(total, Ordering::SeqCst);
        }
        fn on_document_start(&self, _id: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }
        fn on_document_complete(&self, _id: &str, _len: usize, _warnings: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }
        fn on_document_fatal(&self, _id: &str, _error: &str) {
            self.fatals.fetch_add(1, Ordering::SeqCst);
        }
    }

    let counting = Arc::new(Counting::default());
    let w = World {
        inspector: StubInspector::with_density(false, 0.0),
        extractor: StubExtractor::with_text("unused"),
        ocr: StubOcr::failing_for(&["doc-2"]),
        corrector: StubCorrector::new(true),
    };
    let config = ProcessingConfig::builder()
        .progress_callback(counting.clone())
        .build()
        .unwrap();
    let orchestrator = Arc::new(w.orchestrator(config));

    let documents: Vec<Document> = (1..=3).map(|i| pdf(&format!("doc-{i}"))).collect();
    let outcomes: Vec<_> = process_stream(orchestrator, documents, CancelFlag::new())
        .collect()
        .await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(counting.batch_total.load(Ordering::SeqCst), 3);
    assert_eq!(counting.starts.load(Ordering::SeqCst), 3);
    assert_eq!(counting.completes.load(Ordering::SeqCst), 2);
    assert_eq!(counting.fatals.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancelled_stream_admits_no_documents() {
    use futures::StreamExt;

    let w = scanned_world();
    let orchestrator = Arc::new(w.orchestrator(ProcessingConfig::default()));
    let documents: Vec<Document> = (1..=4).map(|i| pdf(&format!("doc-{i}"))).collect();

    let cancel = CancelFlag::new();
    cancel.cancel();
    let outcomes: Vec<_> = process_stream(orchestrator, documents, cancel).collect().await;

    assert!(outcomes.is_empty());
    assert_eq!(w.ocr.call_count(), 0);
}
