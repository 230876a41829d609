//! Result types returned by a stacking run.

use crate::image::FrameF32;
use serde::Serialize;

/// Summary of a completed stacking run.
#[derive(Clone, Debug, Serialize)]
pub struct StackReport {
    /// Number of input frames fused.
    pub frames: usize,
    /// Frames that fell back to the identity transform during alignment.
    pub identity_fallbacks: usize,
    /// Aligned frames spilled to scratch storage to honor the memory budget.
    pub spilled_frames: usize,
    /// Pyramid depth used for decomposition and fusion.
    pub pyramid_depth: usize,
    /// Wall-clock duration of the run in milliseconds.
    pub latency_ms: u128,
}

/// The composite frame plus run statistics.
#[derive(Clone, Debug)]
pub struct StackOutput {
    pub composite: FrameF32,
    pub report: StackReport,
}

/// Outcome of a stacking run. Cancellation is an ordinary outcome, not an
/// error: partial work is discarded and nothing is written.
#[derive(Clone, Debug)]
pub enum StackOutcome {
    Completed(StackOutput),
    Cancelled,
}

impl StackOutcome {
    /// The output, if the run was not cancelled.
    pub fn completed(self) -> Option<StackOutput> {
        match self {
            StackOutcome::Completed(out) => Some(out),
            StackOutcome::Cancelled => None,
        }
    }
}
