//! Streaming batch API: emit outcomes as documents complete.
//!
//! ## Why stream?
//!
//! Large batches take minutes. A streams-based API lets callers persist each
//! document's text as soon as it is ready, drive live progress displays, and
//! cancel a runaway batch without losing the work already finished — instead
//! of buffering every outcome until the slowest document lands.
//!
//! Unlike the eager [`crate::process::DocumentOrchestrator::process_batch`],
//! which returns outcomes in submission order, [`process_stream`] yields them
//! in completion order; match on `ProcessingOutcome::document_id` if identity
//! matters.
//!
//! ## Cancellation
//!
//! A [`CancelFlag`] is checked before each document is admitted: flipping it
//! stops new documents from starting while in-flight documents run to
//! completion, so every emitted outcome is always a finished one.

use crate::document::Document;
use crate::outcome::ProcessingOutcome;
use crate::process::DocumentOrchestrator;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of per-document outcomes, in completion order.
pub type OutcomeStream = Pin<Box<dyn Stream<Item = ProcessingOutcome> + Send>>;

/// Cooperative cancellation handle shared between a stream and its caller.
///
/// Cheap to clone; all clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop admitting new documents. In-flight documents still finish.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Process a batch, streaming outcomes as each document finishes.
///
/// Concurrency and engine behaviour follow the orchestrator's config exactly
/// as in `process_batch`; only the delivery contract differs. When `cancel`
/// fires, unstarted documents are dropped and the stream ends after the
/// in-flight tail drains, so the stream may yield fewer outcomes than the
/// batch has documents.
///
/// The configured progress callback receives `on_batch_start` (when the
/// stream is created) and the per-document events. `on_batch_complete` is
/// never fired: the stream does not aggregate a summary, so callers who need
/// one tally the yielded outcomes themselves.
pub fn process_stream(
    orchestrator: Arc<DocumentOrchestrator>,
    documents: Vec<Document>,
    cancel: CancelFlag,
) -> OutcomeStream {
    let total = documents.len();
    let concurrency = orchestrator.config().concurrency;
    orchestrator.notify_batch_start(total);
    info!("Streaming batch of {} documents", total);

    let admit = cancel.clone();
    let s = stream::iter(documents.into_iter().map(move |document| {
        let orchestrator = Arc::clone(&orchestrator);
        async move {
            orchestrator.notify_document_start(&document.id);
            let outcome = orchestrator.process(&document).await;
            orchestrator.notify_document_done(&outcome);
            outcome
        }
    }))
    .take_while(move |_| {
        let admitted = !admit.is_cancelled();
        async move { admitted }
    })
    .buffer_unordered(concurrency);

    Box::pin(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_flag_is_shared_across_clones() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_cancelled());
        flag.cancel();
        assert!(clone.is_cancelled());
    }
}
