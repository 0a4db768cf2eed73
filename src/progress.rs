//! Progress-callback trait for per-item pipeline events.
//!
//! Inject an [`Arc<dyn StageProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as each stage works through its files. The CLI forwards them to an
//! indicatif progress bar; library callers can log them, count them, or
//! ignore them.
//!
//! # Example
//!
//! ```rust
//! use bio2csv::{PipelineConfig, Stage, StageProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl StageProgressCallback for CountingCallback {
//!     fn on_item_complete(&self, stage: Stage, item: &str) {
//!         self.done.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{stage}: {item}");
//!     }
//! }
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One of the four pipeline phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Split,
    Extract,
    Parse,
    Join,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 4] = [Stage::Split, Stage::Extract, Stage::Parse, Stage::Join];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Split => "split",
            Stage::Extract => "extract",
            Stage::Parse => "parse",
            Stage::Join => "join",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Called by the pipeline as it processes each item of a stage.
///
/// Items are processed sequentially, but implementations must still be
/// `Send + Sync` so the config stays shareable. All methods have default
/// no-op implementations so callers only override what they care about.
pub trait StageProgressCallback: Send + Sync {
    /// Called once before a stage processes its first item.
    ///
    /// # Arguments
    /// * `total` — number of items the stage will attempt
    fn on_stage_start(&self, stage: Stage, total: usize) {
        let _ = (stage, total);
    }

    /// Called when an item produced its output.
    fn on_item_complete(&self, stage: Stage, item: &str) {
        let _ = (stage, item);
    }

    /// Called when an item failed in a degraded (non-fatal) way.
    fn on_item_error(&self, stage: Stage, item: &str, error: &str) {
        let _ = (stage, item, error);
    }

    /// Called once after every item has been attempted.
    ///
    /// # Arguments
    /// * `succeeded` — items that produced their output
    /// * `total`     — items attempted
    fn on_stage_complete(&self, stage: Stage, succeeded: usize, total: usize) {
        let _ = (stage, succeeded, total);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl StageProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn StageProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        started_total: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        succeeded: AtomicUsize,
    }

    impl StageProgressCallback for TrackingCallback {
        fn on_stage_start(&self, _stage: Stage, total: usize) {
            self.started_total.store(total, Ordering::SeqCst);
        }

        fn on_item_complete(&self, _stage: Stage, _item: &str) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_error(&self, _stage: Stage, _item: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_stage_complete(&self, _stage: Stage, succeeded: usize, _total: usize) {
            self.succeeded.store(succeeded, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage_start(Stage::Extract, 3);
        cb.on_item_complete(Stage::Extract, "a.pdf");
        cb.on_item_error(Stage::Extract, "b.pdf", "exit 1");
        cb.on_stage_complete(Stage::Extract, 1, 2);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_stage_start(Stage::Parse, 3);
        tracker.on_item_complete(Stage::Parse, "a.pdf.txt");
        tracker.on_item_complete(Stage::Parse, "b.pdf.txt");
        tracker.on_item_error(Stage::Parse, "c.pdf.txt", "timeout");
        tracker.on_stage_complete(Stage::Parse, 2, 3);

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.succeeded.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn stage_display_and_order() {
        let names: Vec<String> = Stage::ALL.iter().map(|s| s.to_string()).collect();
        assert_eq!(names, ["split", "extract", "parse", "join"]);
    }
}
