//! Progress-callback trait for conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to hear
//! about each stage as it starts and about every render backend that had to
//! be skipped.
//!
//! ```rust
//! use smartreader::{ConversionConfig, ConversionProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl ConversionProgressCallback for Printer {
//!     fn on_stage_start(&self, stage: Stage) {
//!         eprintln!("→ {stage}");
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(Printer))
//!     .build()
//!     .unwrap();
//! ```

use crate::error::Stage;
use std::sync::Arc;

/// Called by the pipeline as a conversion moves through its stages.
///
/// Implementations must be `Send + Sync`: the same callback may be shared by
/// conversions running on different threads. All methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called after extraction with the number of pages found.
    fn on_pages_extracted(&self, pages: usize, images: usize) {
        let _ = (pages, images);
    }

    /// Called when a render backend is skipped or fails and the chain moves
    /// on to the next one.
    fn on_backend_failed(&self, backend: &str, reason: &str) {
        let _ = (backend, reason);
    }

    /// Called once a PDF has been produced.
    fn on_conversion_complete(&self, backend: &str, output_bytes: usize) {
        let _ = (backend, output_bytes);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        stages: Mutex<Vec<Stage>>,
        failures: AtomicUsize,
        completed_bytes: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_stage_start(&self, stage: Stage) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_backend_failed(&self, _backend: &str, _reason: &str) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }

        fn on_conversion_complete(&self, _backend: &str, output_bytes: usize) {
            self.completed_bytes.store(output_bytes, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage_start(Stage::Extract);
        cb.on_pages_extracted(3, 1);
        cb.on_backend_failed("chromium", "not installed");
        cb.on_conversion_complete("flow", 1024);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_stage_start(Stage::Classify);
        tracker.on_stage_start(Stage::Render);
        tracker.on_backend_failed("chromium", "timed out");
        tracker.on_conversion_complete("flow", 2048);

        assert_eq!(*tracker.stages.lock().unwrap(), vec![Stage::Classify, Stage::Render]);
        assert_eq!(tracker.failures.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.completed_bytes.load(Ordering::SeqCst), 2048);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_stage_start(Stage::Assemble);
    }
}
