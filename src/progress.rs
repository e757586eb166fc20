//! Progress-callback trait for per-document batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::ProcessingConfigBuilder::progress_callback`] to receive
//! real-time events as the batch driver finishes each document.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a Tokio broadcast channel, a database record, or a
//! terminal progress bar — without the library knowing anything about how the
//! host application communicates. The trait is `Send + Sync` so it works
//! correctly when documents are processed concurrently.

use crate::outcome::BatchSummary;
use std::sync::Arc;

/// Called by the batch driver as it processes each document.
///
/// Implementations must be `Send + Sync` (documents are processed
/// concurrently). All methods have default no-op implementations so callers
/// only override what they care about.
///
/// # Thread safety
///
/// `on_document_start`, `on_document_complete`, and `on_document_fatal` may
/// be called concurrently from different tasks. Implementations must protect
/// shared mutable state with appropriate synchronisation primitives.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before any document is processed.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called just before a document enters the pipeline.
    fn on_document_start(&self, document_id: &str) {
        let _ = document_id;
    }

    /// Called when a document finishes with a non-fatal outcome.
    ///
    /// # Arguments
    /// * `document_id` — identity of the finished document
    /// * `text_len`    — byte length of the finalized text
    /// * `warnings`    — number of warnings absorbed along the way
    fn on_document_complete(&self, document_id: &str, text_len: usize, warnings: usize) {
        let _ = (document_id, text_len, warnings);
    }

    /// Called when a document ends in a fatal outcome.
    fn on_document_fatal(&self, document_id: &str, error: &str) {
        let _ = (document_id, error);
    }

    /// Called once after every document has been attempted.
    fn on_batch_complete(&self, summary: &BatchSummary) {
        let _ = summary;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ProcessingConfig`].
pub type BatchProgress = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        fatals: AtomicUsize,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_document_start(&self, _document_id: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_complete(&self, _document_id: &str, _text_len: usize, _warnings: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_fatal(&self, _document_id: &str, _error: &str) {
            self.fatals.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(5);
        cb.on_document_start("a.pdf");
        cb.on_document_complete("a.pdf", 1024, 0);
        cb.on_document_fatal("b.pdf", "no OCR engine produced a result");
        cb.on_batch_complete(&BatchSummary::default());
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            starts: AtomicUsize::new(0),
            completes: AtomicUsize::new(0),
            fatals: AtomicUsize::new(0),
        };

        tracker.on_document_start("a.pdf");
        tracker.on_document_complete("a.pdf", 100, 0);
        tracker.on_document_start("b.pdf");
        tracker.on_document_fatal("b.pdf", "boom");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.fatals.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn BatchProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_batch_start(10);
        cb.on_document_start("x.pdf");
    }
}
