//! Sharpness-weighted fusion of per-frame Laplacian pyramids.
//!
//! Frames are folded into the accumulator one at a time, in input order, so
//! only the accumulator and one candidate pyramid are ever resident. Per
//! level, per pixel:
//!
//! - the sharpness score is the channel-mean absolute Laplacian coefficient,
//!   smoothed with the 5-tap binomial kernel (a local-energy measure that
//!   suppresses single-pixel selection speckle);
//! - selection is winner-take-all with a strictly-greater comparison, so
//!   score ties resolve to the lowest frame index and reruns are
//!   byte-identical;
//! - pixels invalidated by the warp border policy never enter the
//!   comparison;
//! - the coarsest level is averaged over the frames valid at each pixel
//!   (inter-frame differences are negligible there and averaging improves
//!   noise).
//!
//! Pyramid shapes must agree level-for-level; a mismatch is a programming
//! contract violation, not a runtime condition.

use crate::image::{FrameF32, ImageF32, Mask};
use crate::pyramid::filters::{apply, GAUSSIAN_5TAP};
use crate::pyramid::LaplacianPyramid;

/// The fused pyramid produced by the accumulator, ready for reconstruction.
#[derive(Clone, Debug)]
pub struct FusedPyramid {
    pub residuals: Vec<FrameF32>,
    pub base: FrameF32,
}

/// Smoothed local sharpness energy of a Laplacian level.
pub fn sharpness_energy(residual: &FrameF32) -> ImageF32 {
    let mut energy = ImageF32::new(residual.w, residual.h);
    let c = residual.channels;
    for (dst, px) in energy.data.iter_mut().zip(residual.data.chunks_exact(c)) {
        *dst = px.iter().map(|v| v.abs()).sum::<f32>() / c as f32;
    }
    apply(&GAUSSIAN_5TAP, &energy)
}

/// Streaming winner-take-all fusion accumulator.
pub struct FusionAccumulator {
    residuals: Vec<FrameF32>,
    energies: Vec<ImageF32>,
    base_sum: FrameF32,
    base_weight: ImageF32,
    frames: usize,
}

impl FusionAccumulator {
    /// Start a fusion run; the accumulator shapes itself from the first
    /// frame it sees.
    pub fn new() -> Self {
        Self {
            residuals: Vec::new(),
            energies: Vec::new(),
            base_sum: FrameF32::new(0, 0, 1),
            base_weight: ImageF32::new(0, 0),
            frames: 0,
        }
    }

    /// Number of frames folded in so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Fold one frame's pyramid into the accumulator, consuming it.
    /// `masks`, when present, holds one validity mask per Gaussian level
    /// (finest first, the last entry matching the base).
    pub fn accumulate(&mut self, lap: LaplacianPyramid, masks: Option<&[Mask]>) {
        if let Some(masks) = masks {
            assert_eq!(masks.len(), lap.depth(), "mask levels must match pyramid depth");
        }
        if self.frames == 0 {
            self.init_from_first(lap, masks);
        } else {
            self.fold(lap, masks);
        }
        self.frames += 1;
    }

    fn init_from_first(&mut self, lap: LaplacianPyramid, masks: Option<&[Mask]>) {
        self.energies = lap
            .residuals
            .iter()
            .enumerate()
            .map(|(level, residual)| {
                let mut energy = sharpness_energy(residual);
                if let Some(mask) = masks.map(|m| &m[level]) {
                    // Invalid pixels must lose to any later valid frame.
                    for (e, &valid) in energy.data.iter_mut().zip(mask.data.iter()) {
                        if !valid {
                            *e = f32::NEG_INFINITY;
                        }
                    }
                }
                energy
            })
            .collect();
        self.residuals = lap.residuals;

        let base_mask = masks.map(|m| &m[self.residuals.len()]);
        self.base_weight = ImageF32::new(lap.base.w, lap.base.h);
        for (i, w) in self.base_weight.data.iter_mut().enumerate() {
            *w = match base_mask {
                Some(mask) if !mask.data[i] => 0.0,
                _ => 1.0,
            };
        }
        let mut base_sum = lap.base;
        if let Some(mask) = base_mask {
            for (px, &valid) in base_sum.data.chunks_exact_mut(base_sum.channels).zip(mask.data.iter())
            {
                if !valid {
                    px.fill(0.0);
                }
            }
        }
        self.base_sum = base_sum;
    }

    fn fold(&mut self, lap: LaplacianPyramid, masks: Option<&[Mask]>) {
        assert_eq!(
            lap.residuals.len(),
            self.residuals.len(),
            "pyramid depth mismatch across frames"
        );
        for (level, residual) in lap.residuals.iter().enumerate() {
            let fused = &mut self.residuals[level];
            assert!(fused.same_shape(residual), "pyramid level shape mismatch");
            let energy = sharpness_energy(residual);
            let best = &mut self.energies[level];
            let mask = masks.map(|m| &m[level]);
            let c = fused.channels;

            for i in 0..energy.data.len() {
                if let Some(mask) = mask {
                    if !mask.data[i] {
                        continue;
                    }
                }
                // Strictly greater: ties keep the earlier frame.
                if energy.data[i] > best.data[i] {
                    best.data[i] = energy.data[i];
                    let s = i * c;
                    fused.data[s..s + c].copy_from_slice(&residual.data[s..s + c]);
                }
            }
        }

        // Base level: running masked average.
        let base_mask = masks.map(|m| &m[self.residuals.len()]);
        assert!(self.base_sum.same_shape(&lap.base), "base level shape mismatch");
        let c = self.base_sum.channels;
        for i in 0..self.base_weight.data.len() {
            if let Some(mask) = base_mask {
                if !mask.data[i] {
                    continue;
                }
            }
            self.base_weight.data[i] += 1.0;
            let s = i * c;
            for ch in 0..c {
                self.base_sum.data[s + ch] += lap.base.data[s + ch];
            }
        }
    }

    /// Finish the run and hand back the fused pyramid.
    pub fn finish(mut self) -> FusedPyramid {
        assert!(self.frames > 0, "fusion requires at least one frame");
        let c = self.base_sum.channels;
        for (i, &w) in self.base_weight.data.iter().enumerate() {
            // Weight 0 cannot happen when the reference frame is fully
            // valid, but stay defined instead of dividing by zero.
            let inv = if w > 0.0 { 1.0 / w } else { 0.0 };
            let s = i * c;
            for ch in 0..c {
                self.base_sum.data[s + ch] *= inv;
            }
        }
        FusedPyramid {
            residuals: self.residuals,
            base: self.base_sum,
        }
    }
}

impl Default for FusionAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pyramid::depth_for;

    fn frame_with_band(w: usize, h: usize, sharp_from: usize, sharp_to: usize) -> FrameF32 {
        // High-frequency texture inside the band, flat outside.
        let mut f = FrameF32::new(w, h, 1);
        for y in 0..h {
            for x in 0..w {
                let v = if x >= sharp_from && x < sharp_to {
                    if (x + y) % 2 == 0 {
                        40.0
                    } else {
                        210.0
                    }
                } else {
                    128.0
                };
                f.pixel_mut(x, y)[0] = v;
            }
        }
        f
    }

    fn fuse_pair(a: FrameF32, b: FrameF32) -> FusedPyramid {
        let depth = depth_for(a.w, a.h, 4);
        let mut acc = FusionAccumulator::new();
        acc.accumulate(LaplacianPyramid::build(a, depth), None);
        acc.accumulate(LaplacianPyramid::build(b, depth), None);
        acc.finish()
    }

    #[test]
    fn sharper_frame_wins_its_region() {
        let a = frame_with_band(64, 32, 0, 32);
        let b = frame_with_band(64, 32, 32, 64);
        let fused = fuse_pair(a.clone(), b.clone());

        let depth = depth_for(64, 32, 4);
        let lap_a = LaplacianPyramid::build(a, depth);
        let lap_b = LaplacianPyramid::build(b, depth);
        // Deep interior of each half should carry that half's coefficients.
        let r = &fused.residuals[0];
        assert!((r.pixel(10, 16)[0] - lap_a.residuals[0].pixel(10, 16)[0]).abs() < 1e-6);
        assert!((r.pixel(54, 16)[0] - lap_b.residuals[0].pixel(54, 16)[0]).abs() < 1e-6);
    }

    #[test]
    fn ties_resolve_to_first_frame() {
        let a = frame_with_band(32, 32, 0, 32);
        let mut b = frame_with_band(32, 32, 0, 32);
        // Identical content, inverted contrast polarity: same |energy|.
        for v in b.data.iter_mut() {
            *v = 255.0 - *v;
        }
        let depth = depth_for(32, 32, 3);
        let lap_a = LaplacianPyramid::build(a.clone(), depth);

        let mut acc = FusionAccumulator::new();
        acc.accumulate(LaplacianPyramid::build(a, depth), None);
        acc.accumulate(LaplacianPyramid::build(b, depth), None);
        let fused = acc.finish();
        for (f, e) in fused.residuals[0]
            .data
            .iter()
            .zip(lap_a.residuals[0].data.iter())
        {
            assert_eq!(f, e, "tie must keep the first frame's coefficient");
        }
    }

    #[test]
    fn fusion_is_deterministic() {
        let run = || {
            let a = frame_with_band(48, 48, 0, 24);
            let b = frame_with_band(48, 48, 24, 48);
            fuse_pair(a, b)
        };
        let x = run();
        let y = run();
        for (rx, ry) in x.residuals.iter().zip(y.residuals.iter()) {
            assert_eq!(rx.data, ry.data);
        }
        assert_eq!(x.base.data, y.base.data);
    }

    #[test]
    fn invalid_pixels_never_win() {
        let a = frame_with_band(32, 32, 0, 32); // reference, fully valid
        let b = frame_with_band(32, 32, 0, 32);
        let depth = depth_for(32, 32, 3);

        // Candidate is sharper nowhere it is valid: mask out everything.
        let mask = Mask {
            w: 32,
            h: 32,
            data: vec![false; 32 * 32],
        };
        let mask_levels = crate::pyramid::mask_levels(&mask, depth);

        let lap_a = LaplacianPyramid::build(a.clone(), depth);
        let mut acc = FusionAccumulator::new();
        acc.accumulate(LaplacianPyramid::build(a, depth), None);
        acc.accumulate(LaplacianPyramid::build(b, depth), Some(&mask_levels));
        let fused = acc.finish();

        for (f, e) in fused.residuals[0]
            .data
            .iter()
            .zip(lap_a.residuals[0].data.iter())
        {
            assert_eq!(f, e, "masked candidate must not contribute");
        }
        assert_eq!(fused.base.data, lap_a.base.data);
    }

    #[test]
    fn base_level_is_averaged() {
        let mut a = FrameF32::new(16, 16, 1);
        let mut b = FrameF32::new(16, 16, 1);
        a.data.fill(100.0);
        b.data.fill(200.0);
        let fused = fuse_pair(a, b);
        for &v in &fused.base.data {
            assert!((v - 150.0).abs() < 1e-3);
        }
    }
}
