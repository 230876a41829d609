//! Inverse warping of a frame into the reference coordinate system.
//!
//! For each output pixel the transform's inverse gives the source position
//! in the candidate frame; in-bounds positions are sampled bilinearly,
//! out-of-bounds positions are marked invalid in the mask instead of being
//! extrapolated, so frame borders never contribute invented content to
//! fusion.

use crate::image::{FrameF32, Mask};
use nalgebra::{Matrix3, Vector3};

/// Warp `frame` through `transform` (candidate → reference coordinates) into
/// a `out_w × out_h` raster. Returns `None` when the transform is not
/// invertible; the caller treats that like an alignment fallback.
pub fn warp_frame(
    frame: &FrameF32,
    transform: &Matrix3<f64>,
    out_w: usize,
    out_h: usize,
) -> Option<(FrameF32, Mask)> {
    let inv = transform.try_inverse()?;
    let c = frame.channels;
    let mut out = FrameF32::new(out_w, out_h, c);
    let mut mask = Mask::full(out_w, out_h);

    for y in 0..out_h {
        for x in 0..out_w {
            let p = inv * Vector3::new(x as f64, y as f64, 1.0);
            if p[2].abs() < 1e-12 {
                mask.set(x, y, false);
                continue;
            }
            let sx = p[0] / p[2];
            let sy = p[1] / p[2];

            // The sample position must lie inside the source frame; exact
            // hits on the last row/column need no second tap, so the upper
            // taps clamp instead of invalidating the pixel.
            if sx < 0.0 || sy < 0.0 || sx > (frame.w - 1) as f64 || sy > (frame.h - 1) as f64 {
                mask.set(x, y, false);
                continue;
            }
            let ix = sx.floor() as usize;
            let iy = sy.floor() as usize;
            let x1 = (ix + 1).min(frame.w - 1);
            let y1 = (iy + 1).min(frame.h - 1);
            let fx = (sx - ix as f64) as f32;
            let fy = (sy - iy as f64) as f32;

            let p00 = frame.pixel(ix, iy);
            let p10 = frame.pixel(x1, iy);
            let p01 = frame.pixel(ix, y1);
            let p11 = frame.pixel(x1, y1);
            let dst = out.pixel_mut(x, y);
            for ch in 0..c {
                let top = p00[ch] * (1.0 - fx) + p10[ch] * fx;
                let bot = p01[ch] * (1.0 - fx) + p11[ch] * fx;
                dst[ch] = top * (1.0 - fy) + bot * fy;
            }
        }
    }
    Some((out, mask))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(w: usize, h: usize) -> FrameF32 {
        let mut f = FrameF32::new(w, h, 1);
        for y in 0..h {
            for x in 0..w {
                f.pixel_mut(x, y)[0] = (x + y * w) as f32;
            }
        }
        f
    }

    #[test]
    fn identity_warp_preserves_every_pixel() {
        let frame = gradient_frame(16, 12);
        let (warped, mask) = warp_frame(&frame, &Matrix3::identity(), 16, 12).expect("warp");
        // Exact samples on the last row and column need no interpolation
        // and must stay valid, so the whole mask is full.
        assert!(mask.is_full());
        for y in 0..12 {
            for x in 0..16 {
                assert!((warped.pixel(x, y)[0] - frame.pixel(x, y)[0]).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn translation_marks_uncovered_border_invalid() {
        let frame = gradient_frame(16, 16);
        // Shift content 4 px right in reference space.
        let t = Matrix3::new(1.0, 0.0, 4.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        let (warped, mask) = warp_frame(&frame, &t, 16, 16).expect("warp");
        // Leftmost columns sample from x < 0 in the source: invalid.
        assert!(!mask.get(0, 8));
        assert!(!mask.get(3, 8));
        // Interior shifted content matches the source.
        assert!(mask.get(8, 8));
        assert!((warped.pixel(8, 8)[0] - frame.pixel(4, 8)[0]).abs() < 1e-3);
    }

    #[test]
    fn singular_transform_is_rejected() {
        let frame = gradient_frame(8, 8);
        let singular = Matrix3::zeros();
        assert!(warp_frame(&frame, &singular, 8, 8).is_none());
    }
}
