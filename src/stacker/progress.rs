//! Progress reporting and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receives coarse progress updates from the pipeline. Implementations must
/// be cheap; they are called from worker threads.
pub trait ProgressSink: Sync {
    fn report(&self, stage: &str, percent: f32);
}

/// Sink that discards all updates.
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _stage: &str, _percent: f32) {}
}

/// Shared cancellation flag. Clones observe the same flag; once set it
/// stays set. The pipeline polls it between frames, so cancellation takes
/// effect at the next frame boundary.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
