//! Error taxonomy for the stacking pipeline.
//!
//! Two conditions are deliberately *not* errors: alignment degradation
//! (insufficient correspondences falls back to the identity transform and is
//! logged) and cancellation (surfaced as
//! [`StackOutcome::Cancelled`](crate::StackOutcome::Cancelled)).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StackError {
    /// The caller supplied an empty file list.
    #[error("no input frames provided")]
    NoInput,

    /// A frame does not match the reference dimensions. This is a contract
    /// violation of the pipeline input, surfaced before any partial output.
    #[error(
        "frame {path} is {got_w}x{got_h}x{got_c}, expected {want_w}x{want_h}x{want_c} \
         to match the reference frame"
    )]
    DimensionMismatch {
        path: PathBuf,
        got_w: usize,
        got_h: usize,
        got_c: usize,
        want_w: usize,
        want_h: usize,
        want_c: usize,
    },

    /// Decoding an input frame failed.
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Encoding or writing the composite failed. Returned to the caller with
    /// diagnostic detail; presentation (dialog vs. exit code) is theirs.
    #[error("failed to save {path}: {detail}")]
    Save { path: PathBuf, detail: String },

    /// Scratch storage (spill) could not be created, written or read back.
    #[error("scratch storage failure: {0}")]
    Scratch(#[from] std::io::Error),

    /// The memory budget was exceeded and spilling could not recover.
    #[error("resource budget exceeded: {0}")]
    ResourceExhausted(String),
}
