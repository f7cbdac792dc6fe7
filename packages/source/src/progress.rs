//! Progress reporting for pipeline stages.
//!
//! Stages report through [`ProgressCallback`] so that the CLI can render
//! `indicatif` bars while tests and library callers stay silent.

use std::sync::Arc;

/// Receives progress updates from a long-running stage.
///
/// Implementations must be `Send + Sync` so a callback can be shared
/// across tokio tasks behind an `Arc`.
pub trait ProgressCallback: Send + Sync {
    /// Sets the total number of work units.
    fn set_total(&self, total: u64);

    /// Advances by `delta` units.
    fn inc(&self, delta: u64);

    /// Replaces the message shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Marks the stage complete.
    fn finish(&self, msg: String);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
