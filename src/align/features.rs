//! Harris corner detection on grayscale images.
//!
//! Structure tensor from Scharr gradients, smoothed with the shared 5-tap
//! binomial kernel; response `det(M) − k·tr(M)²`; non-maximum suppression
//! plus a greedy minimum-distance pass so corners spread across the frame
//! instead of clustering on the strongest texture patch.

use super::grad::{scharr_gradients, Grad};
use crate::image::ImageF32;
use crate::pyramid::filters::{apply, GAUSSIAN_5TAP};

/// Harris response weight for the squared trace term.
const HARRIS_K: f32 = 0.04;

/// Corner detection knobs.
#[derive(Clone, Copy, Debug)]
pub struct FeatureParams {
    /// Maximum number of corners returned.
    pub max_corners: usize,
    /// Responses below `quality_level * max_response` are discarded.
    pub quality_level: f32,
    /// Minimum spacing between returned corners, in pixels.
    pub min_distance: f32,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            max_corners: 400,
            quality_level: 0.01,
            min_distance: 8.0,
        }
    }
}

/// Detect Harris corners. Returns `(x, y)` positions in image coordinates,
/// strongest first, at most `max_corners` of them.
pub fn detect_corners(img: &ImageF32, params: &FeatureParams) -> Vec<[f32; 2]> {
    if img.w < 8 || img.h < 8 {
        return Vec::new();
    }
    let Grad { gx, gy } = scharr_gradients(img);

    let mut ixx = ImageF32::new(img.w, img.h);
    let mut ixy = ImageF32::new(img.w, img.h);
    let mut iyy = ImageF32::new(img.w, img.h);
    for i in 0..img.data.len() {
        let (x, y) = (gx.data[i], gy.data[i]);
        ixx.data[i] = x * x;
        ixy.data[i] = x * y;
        iyy.data[i] = y * y;
    }
    let ixx = apply(&GAUSSIAN_5TAP, &ixx);
    let ixy = apply(&GAUSSIAN_5TAP, &ixy);
    let iyy = apply(&GAUSSIAN_5TAP, &iyy);

    let mut response = ImageF32::new(img.w, img.h);
    let mut max_response = 0.0f32;
    for i in 0..response.data.len() {
        let (a, b, c) = (ixx.data[i], ixy.data[i], iyy.data[i]);
        let det = a * c - b * b;
        let trace = a + c;
        let r = det - HARRIS_K * trace * trace;
        response.data[i] = r;
        max_response = max_response.max(r);
    }
    if max_response <= 0.0 {
        return Vec::new();
    }
    let threshold = params.quality_level * max_response;

    // 3×3 non-maximum suppression, skipping a 2 px frame border where the
    // clamped gradients are unreliable.
    let mut candidates: Vec<(f32, [f32; 2])> = Vec::new();
    for y in 2..img.h - 2 {
        for x in 2..img.w - 2 {
            let r = response.get(x, y);
            if r < threshold {
                continue;
            }
            let mut is_max = true;
            'nms: for dy in -1isize..=1 {
                for dx in -1isize..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let n = response.get((x as isize + dx) as usize, (y as isize + dy) as usize);
                    if n > r {
                        is_max = false;
                        break 'nms;
                    }
                }
            }
            if is_max {
                candidates.push((r, [x as f32, y as f32]));
            }
        }
    }

    candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let min_dist_sq = params.min_distance * params.min_distance;
    let mut corners: Vec<[f32; 2]> = Vec::with_capacity(params.max_corners);
    for (_, p) in candidates {
        let too_close = corners.iter().any(|q| {
            let dx = p[0] - q[0];
            let dy = p[1] - q[1];
            dx * dx + dy * dy < min_dist_sq
        });
        if !too_close {
            corners.push(p);
            if corners.len() >= params.max_corners {
                break;
            }
        }
    }
    corners
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(w: usize, h: usize, cell: usize) -> ImageF32 {
        let mut img = ImageF32::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let v = if ((x / cell) + (y / cell)) % 2 == 0 { 0.1 } else { 0.9 };
                img.set(x, y, v);
            }
        }
        img
    }

    #[test]
    fn checkerboard_yields_corners() {
        let img = checkerboard(64, 64, 8);
        let corners = detect_corners(&img, &FeatureParams::default());
        assert!(corners.len() >= 20, "expected many corners, got {}", corners.len());
    }

    #[test]
    fn flat_image_yields_no_corners() {
        let mut img = ImageF32::new(64, 64);
        img.data.fill(0.5);
        let corners = detect_corners(&img, &FeatureParams::default());
        assert!(corners.is_empty());
    }

    #[test]
    fn corners_respect_minimum_distance() {
        let img = checkerboard(64, 64, 8);
        let params = FeatureParams {
            min_distance: 6.0,
            ..Default::default()
        };
        let corners = detect_corners(&img, &params);
        for (i, a) in corners.iter().enumerate() {
            for b in corners.iter().skip(i + 1) {
                let d2 = (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2);
                assert!(d2 >= 36.0 - 1e-3);
            }
        }
    }
}
