//! Progress-callback trait for per-document conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::SlidesConfigBuilder::progress_callback`] to receive an
//! event when each document starts, finishes or fails. The CLI uses it to
//! print one line per document; tests use it to observe scheduling.
//!
//! # Thread safety
//!
//! Document tasks run concurrently, so `on_document_*` may be called in any
//! order relative to each other. Implementations must guard shared mutable
//! state with `Mutex` or atomics.
//!
//! # Example
//!
//! ```rust
//! use pdf2slides::{ConversionProgressCallback, SlidesConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl ConversionProgressCallback for Counter {
//!     fn on_document_complete(&self, _name: &str, _id: &str, _page_count: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = SlidesConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the orchestrator as it converts each document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once after discovery, before any document task starts.
    fn on_run_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called when a document task is picked up by a scheduler worker.
    ///
    /// `name` is the source file name, e.g. `intro.pdf`.
    fn on_document_start(&self, name: &str) {
        let _ = name;
    }

    /// Called when a document's record is complete.
    fn on_document_complete(&self, name: &str, id: &str, page_count: usize) {
        let _ = (name, id, page_count);
    }

    /// Called when a document task fails. The run will abort.
    fn on_document_error(&self, name: &str, error: &str) {
        let _ = (name, error);
    }

    /// Called once after every document converted and the manifest was written.
    fn on_run_complete(&self, converted: usize, elapsed_secs: f64) {
        let _ = (converted, elapsed_secs);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SlidesConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
