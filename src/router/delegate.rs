use std::sync::atomic::{AtomicBool, Ordering};

use geo::Point;

/// Receives feedback from a running computation and may cancel it.
pub trait RouterDelegate {
    /// Progress in percent, non-decreasing within one computation.
    fn on_progress(&self, _percent: f32) {}

    /// A point the search is currently exploring.
    fn on_point_check(&self, _point: Point) {}

    fn is_cancelled(&self) -> bool {
        false
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullDelegate;

impl RouterDelegate for NullDelegate {}

/// A delegate that only carries a cancellation flag, settable from any thread.
#[derive(Debug, Default)]
pub struct CancelFlag(AtomicBool);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RouterDelegate for CancelFlag {
    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
