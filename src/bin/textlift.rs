//! CLI binary for textlift.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ProcessingConfig`, expands inputs, and writes per-document text files.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use textlift::{
    BatchProgress, BatchProgressCallback, BatchSummary, CorrectionStrategy, Document,
    DocumentOrchestrator, MediaType, ProcessingConfig, ProcessingOutcome,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per finished
/// document. Safe under concurrent completion order.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<String, Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_batch_start

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn elapsed_secs(&self, document_id: &str) -> f64 {
        self.start_times
            .lock()
            .unwrap()
            .remove(document_id)
            .map(|t| t.elapsed().as_millis() as f64 / 1000.0)
            .unwrap_or(0.0)
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total_documents as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Processing");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total_documents} documents…"))
        ));
    }

    fn on_document_start(&self, document_id: &str) {
        self.start_times
            .lock()
            .unwrap()
            .insert(document_id.to_string(), Instant::now());
        self.bar.set_message(document_id.to_string());
    }

    fn on_document_complete(&self, document_id: &str, text_len: usize, warnings: usize) {
        let elapsed = self.elapsed_secs(document_id);
        let warn_note = if warnings > 0 {
            cyan(&format!("{warnings} warnings"))
        } else {
            String::new()
        };
        self.bar.println(format!(
            "  {} {}  {}  {}  {}",
            green("✓"),
            document_id,
            dim(&format!("{text_len:>7} chars")),
            dim(&format!("{elapsed:.1}s")),
            warn_note,
        ));
        self.bar.inc(1);
    }

    fn on_document_fatal(&self, document_id: &str, error: &str) {
        let elapsed = self.elapsed_secs(document_id);
        let msg = if error.chars().count() > 80 {
            let head: String = error.chars().take(79).collect();
            format!("{head}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {}  {}  {}",
            red("✗"),
            document_id,
            red(&msg),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, summary: &BatchSummary) {
        self.bar.finish_and_clear();
        if summary.fatal == 0 {
            eprintln!(
                "{} {} documents processed ({} with warnings)",
                green("✔"),
                bold(&summary.total.to_string()),
                summary.with_warnings,
            );
        } else {
            eprintln!(
                "{} {}/{} documents processed  ({} fatal)",
                if summary.fatal == summary.total {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&(summary.total - summary.fatal).to_string()),
                summary.total,
                red(&summary.fatal.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Single document to stdout
  textlift report.pdf

  # Batch a directory of mixed scans and digital PDFs into out/
  textlift scans/ -o out/

  # Force OCR on a corpus with broken text layers
  textlift --force-ocr broken/*.pdf -o out/

  # Rules-only correction, no LLM anywhere
  textlift --correction rules-only scan.png

  # Always run AI correction with a specific model
  textlift --correction ai-only --model gpt-4.1-mini --provider openai letter.pdf

  # Structured JSON outcomes for downstream tooling
  textlift --json batch/*.pdf > outcomes.json

  # French OCR, higher concurrency
  textlift --language fra --concurrency 8 archive/ -o out/

CLASSIFICATION:
  Documents route by embedded-text density (chars/page):
    >= --density-threshold   TEXT_BASED  fast extraction (pdftotext)
    <= --density-floor       SCANNED     OCR cascade
    in between               HYBRID      extract, re-check, OCR if incomplete
    raster images            IMAGE       OCR cascade

  The OCR cascade runs a vision LLM first when a provider is configured and
  falls back to tesseract when the vision tier fails or its recognized-word
  ratio falls below --dictionary-threshold.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID

EXTERNAL TOOLS:
  pdftotext / pdfinfo / pdftoppm   poppler-utils (extraction, rasterization)
  tesseract                        tesseract-ocr (classic OCR tier)

  A missing tool disables its engine; the cascade advances past it. With no
  API key and no tesseract, scanned documents come back fatal but the batch
  still completes.
"#;

/// Extract corrected text from PDFs and scanned images.
#[derive(Parser, Debug)]
#[command(
    name = "textlift",
    version,
    about = "Extract corrected text from PDFs and scanned images",
    long_about = "Classify each input document (digital, scanned, hybrid, image), extract its \
text through the cheapest path that works — pdftotext for digital layers, a tesseract-to-vision-LLM \
OCR cascade for the rest — then correct the result with deterministic rules and optional AI repair.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input files or directories (.pdf, .png, .jpg, .jpeg, .tif, .tiff, .bmp, .gif).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Write one <stem>.txt per document into this directory instead of stdout.
    #[arg(short, long, env = "TEXTLIFT_OUTPUT")]
    output: Option<PathBuf>,

    /// Correction strategy: rules-only, hybrid, ai-only.
    #[arg(long, env = "TEXTLIFT_CORRECTION", value_enum, default_value = "hybrid")]
    correction: CorrectionArg,

    /// Source-confidence cutoff below which hybrid correction invokes AI.
    #[arg(long, env = "TEXTLIFT_AI_THRESHOLD", default_value_t = 0.7)]
    ai_threshold: f64,

    /// Route every document through the OCR cascade, ignoring classification.
    #[arg(long, env = "TEXTLIFT_FORCE_OCR")]
    force_ocr: bool,

    /// Chars/page at or above which a text layer counts as complete.
    #[arg(long, env = "TEXTLIFT_DENSITY_THRESHOLD", default_value_t = 200.0)]
    density_threshold: f64,

    /// Chars/page at or below which a text layer counts as absent.
    #[arg(long, env = "TEXTLIFT_DENSITY_FLOOR", default_value_t = 1.0)]
    density_floor: f64,

    /// Minimum recognized-word ratio for an OCR result to be accepted.
    #[arg(long, env = "TEXTLIFT_DICTIONARY_THRESHOLD", default_value_t = 0.3)]
    dictionary_threshold: f64,

    /// Tesseract language pack(s), e.g. eng or fra+eng.
    #[arg(long, env = "TEXTLIFT_LANGUAGE", default_value = "eng")]
    language: String,

    /// Number of documents processed concurrently.
    #[arg(short, long, env = "TEXTLIFT_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// LLM model ID for vision OCR and AI correction.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Per-engine OCR attempt timeout in seconds.
    #[arg(long, env = "TEXTLIFT_OCR_TIMEOUT", default_value_t = 120)]
    ocr_timeout: u64,

    /// AI-correction call timeout in seconds.
    #[arg(long, env = "TEXTLIFT_AI_TIMEOUT", default_value_t = 60)]
    ai_timeout: u64,

    /// Retries per LLM call on transient failure.
    #[arg(long, env = "TEXTLIFT_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Output structured JSON outcomes instead of plain text.
    #[arg(long, env = "TEXTLIFT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "TEXTLIFT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "TEXTLIFT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "TEXTLIFT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum CorrectionArg {
    RulesOnly,
    Hybrid,
    AiOnly,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar owns the terminal; suppress library INFO logs while
    // it is active unless the user asked for verbosity.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Enumerate documents ──────────────────────────────────────────────
    let documents = enumerate_documents(&cli.inputs)?;
    if documents.is_empty() {
        anyhow::bail!("No processable documents found in the given inputs");
    }

    // ── Build config and orchestrator ────────────────────────────────────
    let progress_cb: Option<BatchProgress> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let orchestrator = DocumentOrchestrator::from_config(config)
        .await
        .context("Failed to assemble the processing pipeline")?;

    // ── Run the batch ────────────────────────────────────────────────────
    let (outcomes, summary) = orchestrator.process_batch(&documents).await;

    // ── Emit results ─────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&outcomes).context("Failed to serialise outcomes")?;
        println!("{json}");
    } else if let Some(ref out_dir) = cli.output {
        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create output directory {out_dir:?}"))?;
        for outcome in &outcomes {
            if outcome.fatal {
                continue;
            }
            let path = output_path(out_dir, outcome);
            outcome.write_text(&path)?;
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        for outcome in &outcomes {
            if outcome.fatal {
                continue;
            }
            handle
                .write_all(outcome.final_text.as_bytes())
                .context("Failed to write to stdout")?;
        }
    }

    if !cli.quiet && !show_progress {
        eprintln!(
            "Processed {}/{} documents in {}ms ({} with warnings, {} fatal)",
            summary.total - summary.fatal,
            summary.total,
            summary.duration_ms,
            summary.with_warnings,
            summary.fatal
        );
        for outcome in outcomes.iter().filter(|o| o.fatal) {
            eprintln!(
                "  failed: {} — {}",
                outcome.document_id,
                outcome.warnings.last().map(String::as_str).unwrap_or("")
            );
        }
    }

    if summary.fatal == summary.total {
        anyhow::bail!("All documents failed");
    }
    Ok(())
}

/// Expand input paths into documents: files directly, directories one level.
fn enumerate_documents(inputs: &[PathBuf]) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let entries = std::fs::read_dir(input)
                .with_context(|| format!("Failed to read directory {input:?}"))?;
            let mut paths: Vec<PathBuf> = entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file() && MediaType::from_extension(p).is_some())
                .collect();
            paths.sort();
            for path in paths {
                documents.push(Document::from_path(path)?);
            }
        } else {
            documents.push(Document::from_path(input)?);
        }
    }
    Ok(documents)
}

/// Map CLI args to `ProcessingConfig`.
fn build_config(cli: &Cli, progress: Option<BatchProgress>) -> Result<ProcessingConfig> {
    let correction = match cli.correction {
        CorrectionArg::RulesOnly => CorrectionStrategy::RulesOnly,
        CorrectionArg::Hybrid => CorrectionStrategy::Hybrid {
            ai_confidence_threshold: cli.ai_threshold,
        },
        CorrectionArg::AiOnly => CorrectionStrategy::AiOnly,
    };

    let mut builder = ProcessingConfig::builder()
        .text_density_threshold(cli.density_threshold)
        .scanned_density_floor(cli.density_floor)
        .dictionary_threshold(cli.dictionary_threshold)
        .correction(correction)
        .force_ocr(cli.force_ocr)
        .concurrency(cli.concurrency)
        .ocr_timeout_secs(cli.ocr_timeout)
        .ai_timeout_secs(cli.ai_timeout)
        .max_retries(cli.max_retries)
        .ocr_language(&cli.language);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    let mut config = builder.build().context("Invalid configuration")?;
    config.model = cli.model.clone();
    config.provider_name = cli.provider.clone();
    Ok(config)
}

/// `<output dir>/<input stem>.txt`
fn output_path(out_dir: &std::path::Path, outcome: &ProcessingOutcome) -> PathBuf {
    let stem = std::path::Path::new(&outcome.document_id)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| outcome.document_id.clone());
    out_dir.join(format!("{stem}.txt"))
}
