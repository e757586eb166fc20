//! Document classification: decide the extraction route before paying for it.
//!
//! The classifier asks an inspector for three cheap facts (text-layer
//! presence, density, page count) and maps them onto a [`DocumentClass`].
//! It never runs an extraction engine itself; documents without a text layer
//! must reach OCR without a doomed extraction attempt in between.
//!
//! Classification is deterministic for fixed bytes and thresholds, and it
//! never fails: when inspection itself errors, the document degrades to the
//! conservative [`DocumentClass::Image`] route (full OCR) with a warning,
//! trading compute for the guarantee that no readable document is skipped.

use crate::config::ProcessingConfig;
use crate::document::{Document, DocumentClass, ExtractionSignal, MediaType};
use crate::engines::DocumentInspector;
use std::sync::Arc;
use tracing::{debug, warn};

/// Classifier output: the routing signal plus any degradation warnings.
#[derive(Debug, Clone)]
pub struct Classification {
    pub signal: ExtractionSignal,
    pub warnings: Vec<String>,
}

/// Maps inspection facts onto a [`DocumentClass`] using configured thresholds.
pub struct DocumentClassifier {
    inspector: Arc<dyn DocumentInspector>,
    text_density_threshold: f64,
    scanned_density_floor: f64,
}

impl DocumentClassifier {
    pub fn new(inspector: Arc<dyn DocumentInspector>, config: &ProcessingConfig) -> Self {
        Self {
            inspector,
            text_density_threshold: config.text_density_threshold,
            scanned_density_floor: config.scanned_density_floor,
        }
    }

    /// Classify one document.
    ///
    /// Decision order:
    /// 1. raster media is always [`DocumentClass::Image`]
    /// 2. inspection failure degrades to [`DocumentClass::Image`] (full OCR)
    /// 3. no text layer, or density at/below the floor, is Scanned
    /// 4. density at/above the threshold is TextBased
    /// 5. anything between floor and threshold is Hybrid
    pub async fn classify(&self, document: &Document) -> Classification {
        if document.media_type == MediaType::Image {
            return Classification {
                signal: ExtractionSignal {
                    class: DocumentClass::Image,
                    text_density: 0.0,
                    has_text_layer: false,
                    page_count: 1,
                },
                warnings: Vec::new(),
            };
        }

        let report = match self.inspector.inspect(document).await {
            Ok(report) => report,
            Err(e) => {
                warn!("Inspection failed for '{}', routing to OCR: {}", document.id, e);
                return Classification {
                    signal: ExtractionSignal {
                        class: DocumentClass::Image,
                        text_density: 0.0,
                        has_text_layer: false,
                        page_count: 0,
                    },
                    warnings: vec![format!(
                        "classification degraded, inspection failed: {e}"
                    )],
                };
            }
        };

        let class = if !report.has_text_layer || report.text_density <= self.scanned_density_floor
        {
            DocumentClass::Scanned
        } else if report.text_density >= self.text_density_threshold {
            DocumentClass::TextBased
        } else {
            DocumentClass::Hybrid
        };

        debug!(
            "Classified '{}' as {} ({:.0} chars/page over {} pages)",
            document.id,
            class.as_str(),
            report.text_density,
            report.page_count
        );

        Classification {
            signal: ExtractionSignal {
                class,
                text_density: report.text_density,
                has_text_layer: report.has_text_layer,
                page_count: report.page_count,
            },
            warnings: Vec::new(),
        }
    }
}
