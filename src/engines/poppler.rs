//! Fast structural extraction via poppler-utils (`pdftotext`, `pdfinfo`).
//!
//! Digital PDFs carry an embedded text layer that `pdftotext` reads in
//! milliseconds — no rasterization, no models. The same subprocess, limited
//! to a few leading pages, doubles as the classifier's inspection probe so
//! classification stays cheap on thousand-page documents.

use crate::document::{text_density, Document, InspectionReport, MediaType};
use crate::engines::{DocumentInspector, Extraction, ExtractionEngine};
use crate::error::EngineError;
use async_trait::async_trait;
use std::path::Path;
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

/// Pages sampled by [`PopplerExtractor::inspect`]. Densities are per-page, so
/// a small leading sample is representative for all but adversarial inputs.
const INSPECT_PAGE_SAMPLE: usize = 5;

/// Extraction and inspection backed by the poppler command-line tools.
#[derive(Debug, Clone)]
pub struct PopplerExtractor {
    id: String,
}

impl Default for PopplerExtractor {
    fn default() -> Self {
        Self {
            id: "poppler".to_string(),
        }
    }
}

impl PopplerExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `pdftotext` over an inclusive page range (or the whole file).
    async fn run_pdftotext(
        &self,
        path: &Path,
        pages: Option<(usize, usize)>,
    ) -> Result<String, EngineError> {
        let mut cmd = Command::new("pdftotext");
        cmd.args(["-layout", "-enc", "UTF-8"]);
        if let Some((first, last)) = pages {
            cmd.args(["-f", &first.to_string(), "-l", &last.to_string()]);
        }
        // "-" sends the text to stdout.
        cmd.arg(path).arg("-");

        let output = cmd.output().await;
        self.stdout_or_error(output, "pdftotext (install poppler-utils)")
    }

    /// Page count from `pdfinfo`, if the tool and the document cooperate.
    async fn page_count(&self, path: &Path) -> Result<usize, EngineError> {
        let output = Command::new("pdfinfo").arg(path).output().await;
        let stdout = self.stdout_or_error(output, "pdfinfo (install poppler-utils)")?;

        stdout
            .lines()
            .find_map(|line| {
                line.strip_prefix("Pages:")
                    .and_then(|rest| rest.trim().parse::<usize>().ok())
            })
            .ok_or_else(|| EngineError::Failed {
                engine: self.id.clone(),
                detail: "pdfinfo reported no page count".to_string(),
            })
    }

    fn stdout_or_error(
        &self,
        result: std::io::Result<Output>,
        tool_hint: &str,
    ) -> Result<String, EngineError> {
        match result {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            }
            Ok(output) => Err(EngineError::Failed {
                engine: self.id.clone(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(EngineError::Unavailable {
                engine: self.id.clone(),
                detail: format!("{tool_hint} not found on PATH"),
            }),
            Err(e) => Err(EngineError::Failed {
                engine: self.id.clone(),
                detail: e.to_string(),
            }),
        }
    }
}

#[async_trait]
impl ExtractionEngine for PopplerExtractor {
    fn id(&self) -> &str {
        &self.id
    }

    async fn extract(&self, document: &Document) -> Result<Extraction, EngineError> {
        if document.media_type != MediaType::Pdf {
            return Err(EngineError::Failed {
                engine: self.id.clone(),
                detail: "structural extraction requires a PDF".to_string(),
            });
        }

        let page_count = self.page_count(&document.path).await.unwrap_or(1);
        let text = self.run_pdftotext(&document.path, None).await?;
        let density = text_density(&text, page_count);
        debug!(
            "Extracted {} pages from '{}' at {:.0} chars/page",
            page_count, document.id, density
        );

        Ok(Extraction {
            text,
            density,
            page_count,
        })
    }
}

#[async_trait]
impl DocumentInspector for PopplerExtractor {
    fn id(&self) -> &str {
        &self.id
    }

    async fn inspect(&self, document: &Document) -> Result<InspectionReport, EngineError> {
        if document.media_type != MediaType::Pdf {
            // Raster inputs have no text layer by definition.
            return Ok(InspectionReport {
                has_text_layer: false,
                text_density: 0.0,
                page_count: 1,
            });
        }

        let page_count = self.page_count(&document.path).await?;
        let sampled = page_count.min(INSPECT_PAGE_SAMPLE).max(1);
        let text = self
            .run_pdftotext(&document.path, Some((1, sampled)))
            .await?;
        let density = text_density(&text, sampled);

        Ok(InspectionReport {
            // Whitespace-only layers count as absent, same rule as density.
            has_text_layer: density > 0.0,
            text_density: density,
            page_count,
        })
    }
}
