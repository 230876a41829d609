//! Multi-resolution pyramids: separable blur, 2× decimation, signed
//! Laplacian residuals.
//!
//! Design
//! - Level k+1 = decimate(blur(level k)) with the 5-tap binomial kernel and
//!   replicate borders; level dimensions follow `div_ceil(2)` so odd sizes
//!   round up.
//! - Laplacian residual k = Gaussian k − upsample(Gaussian k+1). Residuals
//!   are signed f32 and never clamped.
//! - Upsampling samples the coarse level at `(x/2, y/2)` with bilinear
//!   interpolation; the reconstructor uses the same operator, which makes
//!   decompose → reconstruct exact up to f32 rounding.
//! - Depth is chosen once per run from the reference dimensions
//!   ([`depth_for`]) so pyramids from all frames are level-for-level
//!   comparable. A mismatch inside the builder is a contract violation, not
//!   a runtime condition.

pub mod filters;

use crate::image::{FrameF32, Mask};
use filters::{apply_frame, SeparableFilter, GAUSSIAN_5TAP};

/// Coarsest level must keep at least this many pixels on its short side.
pub const MIN_COARSEST_DIM: usize = 8;

/// Pyramid depth (number of Gaussian levels, including level 0) for a frame
/// of the given dimensions, capped at `max_levels`.
pub fn depth_for(w: usize, h: usize, max_levels: usize) -> usize {
    assert!(max_levels >= 1, "pyramid requires at least one level");
    let (mut w, mut h) = (w, h);
    let mut depth = 1;
    while depth < max_levels {
        let (nw, nh) = (w.div_ceil(2), h.div_ceil(2));
        if nw.min(nh) < MIN_COARSEST_DIM {
            break;
        }
        w = nw;
        h = nh;
        depth += 1;
    }
    depth
}

/// Dimensions of pyramid level `level` for a level-0 frame of `w × h`.
pub fn level_dims(w: usize, h: usize, level: usize) -> (usize, usize) {
    let (mut w, mut h) = (w, h);
    for _ in 0..level {
        w = w.div_ceil(2);
        h = h.div_ceil(2);
    }
    (w, h)
}

/// Blur with the given separable filter, then pick every other pixel.
pub fn downsample(frame: &FrameF32, filter: &dyn SeparableFilter) -> FrameF32 {
    let blurred = apply_frame(filter, frame);
    let (nw, nh) = (frame.w.div_ceil(2), frame.h.div_ceil(2));
    let mut down = FrameF32::new(nw, nh, frame.channels);
    for y in 0..nh {
        let sy = (y * 2).min(frame.h - 1);
        for x in 0..nw {
            let sx = (x * 2).min(frame.w - 1);
            let src = blurred.pixel(sx, sy);
            down.pixel_mut(x, y).copy_from_slice(src);
        }
    }
    down
}

/// Upsample a coarse frame to `tw × th` (its finer level's dimensions) by
/// bilinear sampling at half coordinates. Even target pixels land exactly on
/// source pixels; odd pixels interpolate their two neighbours.
pub fn upsample(frame: &FrameF32, tw: usize, th: usize) -> FrameF32 {
    debug_assert_eq!(tw.div_ceil(2), frame.w, "upsample target width mismatch");
    debug_assert_eq!(th.div_ceil(2), frame.h, "upsample target height mismatch");
    let c = frame.channels;
    let mut out = FrameF32::new(tw, th, c);
    for y in 0..th {
        let sy = y as f32 * 0.5;
        let y0 = sy.floor() as usize;
        let y1 = (y0 + 1).min(frame.h - 1);
        let fy = sy - y0 as f32;
        for x in 0..tw {
            let sx = x as f32 * 0.5;
            let x0 = sx.floor() as usize;
            let x1 = (x0 + 1).min(frame.w - 1);
            let fx = sx - x0 as f32;

            let p00 = frame.pixel(x0, y0);
            let p10 = frame.pixel(x1, y0);
            let p01 = frame.pixel(x0, y1);
            let p11 = frame.pixel(x1, y1);
            let dst = out.pixel_mut(x, y);
            for ch in 0..c {
                let top = p00[ch] * (1.0 - fx) + p10[ch] * fx;
                let bot = p01[ch] * (1.0 - fx) + p11[ch] * fx;
                dst[ch] = top * (1.0 - fy) + bot * fy;
            }
        }
    }
    out
}

/// Gaussian pyramid: level 0 is the input frame, each level half the linear
/// resolution of its predecessor.
#[derive(Clone, Debug)]
pub struct GaussianPyramid {
    pub levels: Vec<FrameF32>,
}

impl GaussianPyramid {
    /// Build a pyramid of exactly `depth` levels, consuming the input frame
    /// as level 0.
    pub fn build(frame: FrameF32, depth: usize) -> Self {
        assert!(depth >= 1, "pyramid requires at least one level");
        let mut levels = Vec::with_capacity(depth);
        levels.push(frame);
        for _ in 1..depth {
            let prev = levels.last().expect("previous level available");
            levels.push(downsample(prev, &GAUSSIAN_5TAP));
        }
        Self { levels }
    }
}

/// Laplacian pyramid: band-pass residuals plus the coarsest Gaussian base.
/// `residuals.len() == depth - 1`.
#[derive(Clone, Debug)]
pub struct LaplacianPyramid {
    pub residuals: Vec<FrameF32>,
    pub base: FrameF32,
}

impl LaplacianPyramid {
    /// Decompose a frame, consuming it. Residuals keep their sign; nothing
    /// is clamped.
    pub fn build(frame: FrameF32, depth: usize) -> Self {
        let gaussian = GaussianPyramid::build(frame, depth);
        Self::from_gaussian(gaussian)
    }

    /// Convert a Gaussian pyramid into its Laplacian form, consuming it.
    pub fn from_gaussian(gaussian: GaussianPyramid) -> Self {
        let mut levels = gaussian.levels;
        let base = levels.pop().expect("pyramid has at least one level");
        let mut residuals = Vec::with_capacity(levels.len());
        let mut coarser = &base;
        // Walk fine→coarse but compute residuals against the next-coarser
        // level, so iterate in reverse and flip at the end.
        for fine in levels.iter().rev() {
            let up = upsample(coarser, fine.w, fine.h);
            let mut residual = FrameF32::new(fine.w, fine.h, fine.channels);
            for ((r, &f), &u) in residual
                .data
                .iter_mut()
                .zip(fine.data.iter())
                .zip(up.data.iter())
            {
                *r = f - u;
            }
            residuals.push(residual);
            coarser = fine;
        }
        residuals.reverse();
        Self { residuals, base }
    }

    /// Number of Gaussian levels this pyramid was built from.
    pub fn depth(&self) -> usize {
        self.residuals.len() + 1
    }
}

/// Per-level validity masks matching a `depth`-level pyramid: entry k has
/// the dimensions of Gaussian level k, reduced with conservative AND.
pub fn mask_levels(mask: &Mask, depth: usize) -> Vec<Mask> {
    let mut out = Vec::with_capacity(depth);
    out.push(mask.clone());
    for _ in 1..depth {
        let next = out.last().expect("previous mask available").downsample_and();
        out.push(next);
    }
    out
}
