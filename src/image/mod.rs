//! Raster types shared across the stacking pipeline.
//!
//! - [`FrameF32`] — owned interleaved multi-channel float raster; the unit of
//!   work for alignment, pyramids and fusion.
//! - [`ImageF32`] — owned single-channel float raster used for grayscale
//!   work (gradients, correlation, sharpness energy).
//! - [`Mask`] — per-pixel validity produced by warping and consumed by the
//!   fusion engine.
//! - [`io`] — the decode/encode boundary, including the export clamping
//!   contract (round + clamp to u8, scale-by-256 + clamp to u16).

pub mod f32;
pub mod frame;
pub mod io;
pub mod traits;

pub use self::f32::ImageF32;
pub use self::frame::{FrameF32, Mask};
pub use self::traits::{ImageView, ImageViewMut};
