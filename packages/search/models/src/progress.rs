//! Progress reporting for imports and paginated searches.
//!
//! Backends report through [`ProgressCallback`] and never touch a terminal
//! themselves. The command-line front end supplies an `indicatif`
//! implementation; tests and library callers use [`null_progress`].

use std::sync::Arc;

/// Receives progress from a tower import or a LIDAR page loop.
///
/// Implementations must be `Send + Sync` so one handle can be shared
/// through an `Arc`.
pub trait ProgressCallback: Send + Sync {
    /// Total units of work, once known.
    fn set_total(&self, total: u64);

    /// Absolute position.
    fn set_position(&self, pos: u64);

    /// Relative advance.
    fn inc(&self, delta: u64);

    /// Status text shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Completes with a final message left on screen.
    fn finish(&self, msg: String);

    /// Completes and removes the indicator.
    fn finish_and_clear(&self);
}

/// Discards every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn set_position(&self, _pos: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}

/// A shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_progress_accepts_every_call() {
        let progress = null_progress();
        progress.set_total(10);
        progress.inc(3);
        progress.set_position(5);
        progress.set_message("importing".to_string());
        progress.finish("done".to_string());
        progress.finish_and_clear();
    }
}
