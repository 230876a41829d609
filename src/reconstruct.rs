//! Collapse a fused Laplacian pyramid back into a full-resolution frame.
//!
//! Starting from the base level, each residual is added to the upsampled
//! running image, coarsest first. The upsampling operator is the same one
//! the decomposition subtracted with, so a pyramid built from a single
//! frame collapses back to that frame up to f32 rounding. No clamping
//! happens here; values outside [0, 255] survive until export quantizes
//! them.

use crate::fuse::FusedPyramid;
use crate::image::FrameF32;
use crate::pyramid::upsample;

/// Reconstruct the composite frame from a fused pyramid.
pub fn collapse(pyramid: FusedPyramid) -> FrameF32 {
    let mut current = pyramid.base;
    for residual in pyramid.residuals.into_iter().rev() {
        let mut up = upsample(&current, residual.w, residual.h);
        for (u, r) in up.data.iter_mut().zip(residual.data.iter()) {
            *u += r;
        }
        current = up;
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuse::FusionAccumulator;
    use crate::pyramid::{depth_for, LaplacianPyramid};

    #[test]
    fn single_frame_round_trips() {
        let mut frame = FrameF32::new(97, 61, 3);
        let mut state = 0x6c078965u32;
        for v in frame.data.iter_mut() {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            *v = (state >> 16) as f32 % 256.0;
        }
        let depth = depth_for(frame.w, frame.h, 8);
        let mut acc = FusionAccumulator::new();
        acc.accumulate(LaplacianPyramid::build(frame.clone(), depth), None);
        let out = collapse(acc.finish());

        assert_eq!(out.w, frame.w);
        assert_eq!(out.h, frame.h);
        for (a, b) in out.data.iter().zip(frame.data.iter()) {
            assert!((a - b).abs() < 1e-3, "round trip drifted: {a} vs {b}");
        }
    }
}
