//! Separable low-pass filters used for pyramid construction and for
//! smoothing sharpness energy maps.

use crate::image::{FrameF32, ImageF32, ImageView, ImageViewMut};

/// Trait implemented by separable 1D filters.
pub trait SeparableFilter {
    /// Return the 1D taps (in left-to-right order). The kernel is assumed to
    /// be symmetric around its centre, but the implementation does not rely
    /// on it.
    fn taps(&self) -> &[f32];
}

/// Simple wrapper around a static filter kernel.
#[derive(Clone, Copy, Debug)]
pub struct StaticSeparableFilter {
    taps: &'static [f32],
}

impl StaticSeparableFilter {
    pub const fn new(taps: &'static [f32]) -> Self {
        Self { taps }
    }
}

impl SeparableFilter for StaticSeparableFilter {
    #[inline]
    fn taps(&self) -> &[f32] {
        self.taps
    }
}

/// Normalised 5-tap binomial filter `[1, 4, 6, 4, 1] / 16`.
pub const GAUSSIAN_5TAP: StaticSeparableFilter =
    StaticSeparableFilter::new(&[0.0625, 0.25, 0.375, 0.25, 0.0625]);

/// Apply a separable filter to a single-channel image with replicate-border
/// handling (horizontal pass, then vertical).
pub fn apply(filter: &dyn SeparableFilter, inp: &ImageF32) -> ImageF32 {
    let taps = filter.taps();
    let radius = taps.len() / 2;
    let (w, h) = (inp.w, inp.h);

    let mut tmp = ImageF32::new(w, h);
    for y in 0..h {
        let src = inp.row(y);
        let dst = tmp.row_mut(y);
        for (x, out) in dst.iter_mut().enumerate() {
            let mut acc = 0.0;
            for (k, &t) in taps.iter().enumerate() {
                let sx = (x + k).saturating_sub(radius).min(w - 1);
                acc += t * src[sx];
            }
            *out = acc;
        }
    }

    let mut out = ImageF32::new(w, h);
    for y in 0..h {
        let ys: Vec<usize> = (0..taps.len())
            .map(|k| (y + k).saturating_sub(radius).min(h - 1))
            .collect();
        let dst = out.row_mut(y);
        for (x, px) in dst.iter_mut().enumerate() {
            let mut acc = 0.0;
            for (k, &t) in taps.iter().enumerate() {
                acc += t * tmp.get(x, ys[k]);
            }
            *px = acc;
        }
    }
    out
}

/// Apply a separable filter to every channel of an interleaved frame.
pub fn apply_frame(filter: &dyn SeparableFilter, inp: &FrameF32) -> FrameF32 {
    let taps = filter.taps();
    let radius = taps.len() / 2;
    let (w, h, c) = (inp.w, inp.h, inp.channels);

    let mut tmp = FrameF32::new(w, h, c);
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0.0f32; 3];
            for (k, &t) in taps.iter().enumerate() {
                let sx = (x + k).saturating_sub(radius).min(w - 1);
                let px = inp.pixel(sx, y);
                for (a, &s) in acc.iter_mut().zip(px.iter()) {
                    *a += t * s;
                }
            }
            tmp.pixel_mut(x, y).copy_from_slice(&acc[..c]);
        }
    }

    let mut out = FrameF32::new(w, h, c);
    for y in 0..h {
        let ys: Vec<usize> = (0..taps.len())
            .map(|k| (y + k).saturating_sub(radius).min(h - 1))
            .collect();
        for x in 0..w {
            let mut acc = [0.0f32; 3];
            for (k, &t) in taps.iter().enumerate() {
                let px = tmp.pixel(x, ys[k]);
                for (a, &s) in acc.iter_mut().zip(px.iter()) {
                    *a += t * s;
                }
            }
            out.pixel_mut(x, y).copy_from_slice(&acc[..c]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_is_normalised() {
        let sum: f32 = GAUSSIAN_5TAP.taps().iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn constant_image_is_preserved() {
        let mut img = ImageF32::new(7, 5);
        img.data.fill(3.5);
        let blurred = apply(&GAUSSIAN_5TAP, &img);
        for &v in &blurred.data {
            assert!((v - 3.5).abs() < 1e-5);
        }
    }

    #[test]
    fn frame_blur_preserves_constant_channels() {
        let mut frame = FrameF32::new(6, 4, 3);
        for px in frame.data.chunks_exact_mut(3) {
            px.copy_from_slice(&[10.0, 20.0, 30.0]);
        }
        let blurred = apply_frame(&GAUSSIAN_5TAP, &frame);
        for px in blurred.data.chunks_exact(3) {
            assert!((px[0] - 10.0).abs() < 1e-4);
            assert!((px[1] - 20.0).abs() < 1e-4);
            assert!((px[2] - 30.0).abs() < 1e-4);
        }
    }
}
