//! Frame alignment: estimate a projective transform mapping each frame onto
//! the reference frame and produce a warped copy.
//!
//! Pipeline per non-reference frame
//! - grayscale + downscale to a working resolution (alignment does not need
//!   full-resolution pixels; the homography is rescaled back afterwards);
//! - Harris corners on the reference ([`features`]);
//! - ZNCC patch matching into the candidate ([`matching`]);
//! - RANSAC + normalized DLT homography ([`ransac`]);
//! - inverse bilinear warp with border invalidation ([`warp`]).
//!
//! Failure policy: too few corners, too few matches or no RANSAC consensus
//! degrade to the identity transform for that frame. The run continues; the
//! event is logged and counted in the report.

pub mod features;
pub mod grad;
pub mod matching;
pub mod ransac;
pub mod warp;

use crate::image::{FrameF32, ImageF32, Mask};
use crate::pyramid::filters::{apply, GAUSSIAN_5TAP};
use features::{detect_corners, FeatureParams};
use log::{debug, warn};
use matching::{match_corners, MatchParams};
use nalgebra::Matrix3;
use ransac::{fit_homography_ransac, RansacConfig};
use warp::warp_frame;

/// Alignment configuration.
#[derive(Clone, Debug)]
pub struct AlignParams {
    /// Frames are downscaled until their longer side fits this before
    /// feature work; the estimated homography is rescaled to full
    /// resolution afterwards.
    pub working_dimension: usize,
    /// Minimum matched pairs required before attempting a robust fit.
    pub min_matches: usize,
    pub features: FeatureParams,
    pub matching: MatchParams,
    pub ransac: RansacConfig,
}

impl Default for AlignParams {
    fn default() -> Self {
        Self {
            working_dimension: 512,
            min_matches: 12,
            features: FeatureParams::default(),
            matching: MatchParams::default(),
            ransac: RansacConfig::default(),
        }
    }
}

/// Precomputed reference-side state, shared across all candidate frames.
#[derive(Clone, Debug)]
pub struct ReferenceContext {
    luma: ImageF32,
    corners: Vec<[f32; 2]>,
    halvings: usize,
    full_w: usize,
    full_h: usize,
}

/// An aligned frame ready for pyramid decomposition.
#[derive(Clone, Debug)]
pub struct AlignedFrame {
    pub pixels: FrameF32,
    pub mask: Mask,
    /// True when this frame went through the identity-transform fallback.
    pub used_fallback: bool,
}

/// Blur + 2× decimate a grayscale image (replicate borders, `div_ceil`
/// dimensions, matching the frame pyramid convention).
fn downsample_luma(img: &ImageF32) -> ImageF32 {
    let blurred = apply(&GAUSSIAN_5TAP, img);
    let (nw, nh) = (img.w.div_ceil(2), img.h.div_ceil(2));
    let mut down = ImageF32::new(nw, nh);
    for y in 0..nh {
        let sy = (y * 2).min(img.h - 1);
        for x in 0..nw {
            let sx = (x * 2).min(img.w - 1);
            down.set(x, y, blurred.get(sx, sy));
        }
    }
    down
}

fn to_working_resolution(frame: &FrameF32, working_dimension: usize) -> (ImageF32, usize) {
    let mut luma = frame.to_luma();
    let mut halvings = 0;
    while luma.w.max(luma.h) > working_dimension {
        luma = downsample_luma(&luma);
        halvings += 1;
    }
    (luma, halvings)
}

/// Conjugate a homography estimated in a downscaled space into full-image
/// coordinates: `S · H · S⁻¹` with `S = diag(sx, sy, 1)`.
pub fn rescale_homography_image_space(h: &Matrix3<f64>, sx: f64, sy: f64) -> Matrix3<f64> {
    let scale = Matrix3::new(sx, 0.0, 0.0, 0.0, sy, 0.0, 0.0, 0.0, 1.0);
    let scale_inv = Matrix3::new(1.0 / sx, 0.0, 0.0, 0.0, 1.0 / sy, 0.0, 0.0, 0.0, 1.0);
    scale * h * scale_inv
}

/// Detect reference corners once; every candidate frame reuses them.
pub fn prepare_reference(reference: &FrameF32, params: &AlignParams) -> ReferenceContext {
    let (luma, halvings) = to_working_resolution(reference, params.working_dimension);
    let corners = detect_corners(&luma, &params.features);
    debug!(
        "reference: {} corners at working resolution {}x{} ({} halvings)",
        corners.len(),
        luma.w,
        luma.h,
        halvings
    );
    ReferenceContext {
        luma,
        corners,
        halvings,
        full_w: reference.w,
        full_h: reference.h,
    }
}

/// Estimate the candidate → reference homography in full-resolution
/// coordinates. `None` means the frame should use the identity fallback.
pub fn estimate_transform(
    ctx: &ReferenceContext,
    candidate: &FrameF32,
    params: &AlignParams,
) -> Option<Matrix3<f64>> {
    if ctx.corners.len() < 4 {
        debug!("alignment: reference has too few corners ({})", ctx.corners.len());
        return None;
    }
    let mut cand_luma = candidate.to_luma();
    for _ in 0..ctx.halvings {
        cand_luma = downsample_luma(&cand_luma);
    }

    let matches = match_corners(&ctx.luma, &cand_luma, &ctx.corners, &params.matching);
    if matches.len() < params.min_matches.max(4) {
        debug!(
            "alignment: {} matches below minimum {}",
            matches.len(),
            params.min_matches.max(4)
        );
        return None;
    }

    let src: Vec<[f64; 2]> = matches.iter().map(|m| m.candidate).collect();
    let dst: Vec<[f64; 2]> = matches.iter().map(|m| m.reference).collect();
    let h_small = fit_homography_ransac(&src, &dst, &params.ransac)?;

    let sx = ctx.full_w as f64 / ctx.luma.w as f64;
    let sy = ctx.full_h as f64 / ctx.luma.h as f64;
    Some(rescale_homography_image_space(&h_small, sx, sy))
}

/// Align one frame to the reference, consuming it. Falls back to the
/// identity transform (frame passed through untouched, fully valid mask)
/// when estimation or warping fails.
pub fn align_frame(
    ctx: &ReferenceContext,
    frame: FrameF32,
    frame_label: &str,
    params: &AlignParams,
) -> AlignedFrame {
    match estimate_transform(ctx, &frame, params) {
        Some(h) => match warp_frame(&frame, &h, ctx.full_w, ctx.full_h) {
            Some((pixels, mask)) => AlignedFrame {
                pixels,
                mask,
                used_fallback: false,
            },
            None => {
                warn!("alignment: non-invertible transform for {frame_label}, keeping identity");
                identity_fallback(frame)
            }
        },
        None => {
            warn!("alignment: insufficient correspondences for {frame_label}, keeping identity");
            identity_fallback(frame)
        }
    }
}

fn identity_fallback(frame: FrameF32) -> AlignedFrame {
    let mask = Mask::full(frame.w, frame.h);
    AlignedFrame {
        pixels: frame,
        mask,
        used_fallback: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn textured_frame(w: usize, h: usize) -> FrameF32 {
        let mut f = FrameF32::new(w, h, 1);
        let mut state = 0x9e3779b9u32;
        for v in f.data.iter_mut() {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            *v = (state >> 16) as f32 % 256.0;
        }
        // Low-frequency structure so corners exist beyond pixel noise.
        let smoothed = apply(&GAUSSIAN_5TAP, &ImageF32 {
            w,
            h,
            stride: w,
            data: f.data.clone(),
        });
        f.data = smoothed.data;
        f
    }

    fn translated(frame: &FrameF32, dx: isize, dy: isize) -> FrameF32 {
        let mut out = FrameF32::new(frame.w, frame.h, frame.channels);
        for y in 0..frame.h {
            for x in 0..frame.w {
                let sx = (x as isize - dx).clamp(0, frame.w as isize - 1) as usize;
                let sy = (y as isize - dy).clamp(0, frame.h as isize - 1) as usize;
                let src = frame.pixel(sx, sy);
                out.pixel_mut(x, y).copy_from_slice(src);
            }
        }
        out
    }

    #[test]
    fn recovers_small_translation() {
        let reference = textured_frame(160, 120);
        let candidate = translated(&reference, 5, 3);
        let params = AlignParams::default();
        let ctx = prepare_reference(&reference, &params);
        let h = estimate_transform(&ctx, &candidate, &params).expect("transform");
        // H maps candidate → reference: the candidate content sits 5 px
        // right of where it belongs, so the translation terms undo it.
        assert!((h[(0, 2)] + 5.0).abs() < 1.5, "tx = {}", h[(0, 2)]);
        assert!((h[(1, 2)] + 3.0).abs() < 1.5, "ty = {}", h[(1, 2)]);
    }

    #[test]
    fn featureless_frames_fall_back_to_identity() {
        let mut flat = FrameF32::new(96, 96, 1);
        flat.data.fill(128.0);
        let params = AlignParams::default();
        let ctx = prepare_reference(&flat, &params);
        let aligned = align_frame(&ctx, flat.clone(), "flat", &params);
        assert!(aligned.used_fallback);
        assert!(aligned.mask.is_full());
        assert_eq!(aligned.pixels.data, flat.data);
    }
}
