#![doc = include_str!("../README.md")]

pub mod align;
pub mod error;
pub mod fuse;
pub mod image;
pub mod natsort;
pub mod pyramid;
pub mod reconstruct;
pub mod stacker;
pub mod types;

pub use error::StackError;
pub use stacker::{CancelToken, FocusStacker, NoopProgress, ProgressSink, StackParams};
pub use types::{StackOutcome, StackOutput, StackReport};

/// Convenient glob import for library consumers.
pub mod prelude {
    pub use crate::error::StackError;
    pub use crate::image::io::OutputFormat;
    pub use crate::stacker::{CancelToken, FocusStacker, NoopProgress, ProgressSink, StackParams};
    pub use crate::types::{StackOutcome, StackOutput, StackReport};
}
