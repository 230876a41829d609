//! Stacking pipeline orchestration.
//!
//! [`FocusStacker`] wires the stages together: decode, alignment to the
//! first frame, Laplacian decomposition, sharpness fusion and
//! reconstruction. The submodules keep the orchestration separate from its
//! capabilities: [`params`] for configuration, [`progress`] for the
//! caller-injected progress/cancellation seam, [`scratch`] for spill
//! storage under the memory budget.

pub mod params;
pub mod pipeline;
pub mod progress;
pub mod scratch;

pub use params::StackParams;
pub use pipeline::FocusStacker;
pub use progress::{CancelToken, NoopProgress, ProgressSink};
