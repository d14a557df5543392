//! Progress reporting for long-running transfers and batch jobs.
//!
//! Library crates report through [`ProgressCallback`] and never render
//! anything themselves; the CLI plugs in `indicatif` bars.

use std::sync::Arc;

/// Receives progress updates.
///
/// Implementations must be `Send + Sync` so one callback can be shared
/// across spawned tasks.
pub trait ProgressCallback: Send + Sync {
    /// Sets the total expected units of work (bytes, parcels, ...).
    fn set_total(&self, total: u64);

    /// Advances progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Updates the message displayed alongside the indicator.
    fn set_message(&self, msg: String);

    /// Marks progress as complete with a final message.
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

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
