//! Progress-callback trait for per-segment translation events.
//!
//! Inject an [`Arc<dyn TranslationProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the translation client works through the segments of a
//! document.
//!
//! Callbacks keep the library ignorant of how the host reports progress: the
//! CLI drives a terminal progress bar, a service could forward events to a
//! channel or a status column. The trait is `Send + Sync` because segments
//! may be translated concurrently.
//!
//! # Example
//!
//! ```rust
//! use edgequake_doctranslate::{PipelineConfig, TranslationProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl TranslationProgressCallback for CountingCallback {
//!     fn on_segment_complete(&self, index: usize, total: usize, chars: usize) {
//!         let n = self.done.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("segment {index} done ({n}/{total}, {chars} chars)");
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { done: AtomicUsize::new(0) });
//! let config = PipelineConfig::builder()
//!     .progress_callback(cb as Arc<dyn TranslationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the translation client as it processes each segment.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. With `concurrency > 1` the segment methods may be
/// called concurrently and out of index order.
pub trait TranslationProgressCallback: Send + Sync {
    /// Called once before the first segment is sent.
    ///
    /// # Arguments
    /// * `total_segments`: number of segments that will be translated
    fn on_translation_start(&self, total_segments: usize) {
        let _ = total_segments;
    }

    /// Called before the first attempt for a segment.
    ///
    /// # Arguments
    /// * `index`: 0-based segment index
    /// * `total`: total segments
    fn on_segment_start(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called when an attempt fails and another attempt will follow.
    ///
    /// # Arguments
    /// * `index`  : 0-based segment index
    /// * `attempt`: 1-based number of the attempt that failed
    /// * `error`  : human-readable failure description
    fn on_segment_retry(&self, index: usize, attempt: u32, error: &str) {
        let _ = (index, attempt, error);
    }

    /// Called when a segment is translated.
    ///
    /// # Arguments
    /// * `index`: 0-based segment index
    /// * `total`: total segments
    /// * `chars`: characters in the translated segment
    fn on_segment_complete(&self, index: usize, total: usize, chars: usize) {
        let _ = (index, total, chars);
    }

    /// Called when a segment exhausts its attempts. The request aborts afterwards.
    fn on_segment_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once after every segment has been translated.
    fn on_translation_complete(&self, total_segments: usize) {
        let _ = total_segments;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl TranslationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn TranslationProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        retries: AtomicUsize,
        completes: AtomicUsize,
        total: AtomicUsize,
    }

    impl TranslationProgressCallback for TrackingCallback {
        fn on_translation_start(&self, total_segments: usize) {
            self.total.store(total_segments, Ordering::SeqCst);
        }

        fn on_segment_start(&self, _index: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_segment_retry(&self, _index: usize, _attempt: u32, _error: &str) {
            self.retries.fetch_add(1, Ordering::SeqCst);
        }

        fn on_segment_complete(&self, _index: usize, _total: usize, _chars: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_translation_start(2);
        cb.on_segment_start(0, 2);
        cb.on_segment_retry(0, 1, "HTTP 503");
        cb.on_segment_complete(0, 2, 42);
        cb.on_segment_error(1, 2, "timed out");
        cb.on_translation_complete(2);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_translation_start(2);
        tracker.on_segment_start(0, 2);
        tracker.on_segment_retry(0, 1, "HTTP 429");
        tracker.on_segment_complete(0, 2, 10);
        tracker.on_segment_start(1, 2);
        tracker.on_segment_complete(1, 2, 12);

        assert_eq!(tracker.total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.retries.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
    }
}
