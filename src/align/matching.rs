//! Zero-mean normalized cross-correlation (ZNCC) patch matching.
//!
//! For each reference corner, the candidate frame is scanned over a square
//! search window at integer offsets; the offset with the highest ZNCC above
//! a floor becomes a correspondence. ZNCC is invariant to local brightness
//! and contrast shifts, which is what inter-frame focus change mostly looks
//! like at patch scale.

use crate::image::ImageF32;

/// Patch matching knobs.
#[derive(Clone, Copy, Debug)]
pub struct MatchParams {
    /// Patch half-size; the correlated window is `(2r+1)²` pixels.
    pub patch_radius: usize,
    /// Search half-size around the corner position in the candidate frame.
    pub search_radius: usize,
    /// Correlations below this are rejected as unreliable.
    pub min_score: f32,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            patch_radius: 7,
            search_radius: 24,
            min_score: 0.6,
        }
    }
}

/// A matched point pair: position in the candidate frame and the
/// corresponding position in the reference frame.
#[derive(Clone, Copy, Debug)]
pub struct Correspondence {
    pub candidate: [f64; 2],
    pub reference: [f64; 2],
}

struct Patch {
    values: Vec<f32>,
    mean: f32,
    norm: f32,
}

fn extract_patch(img: &ImageF32, cx: isize, cy: isize, radius: usize) -> Patch {
    let side = 2 * radius + 1;
    let mut values = Vec::with_capacity(side * side);
    let r = radius as isize;
    for dy in -r..=r {
        for dx in -r..=r {
            values.push(img.get_clamped(cx + dx, cy + dy));
        }
    }
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    let norm = values
        .iter()
        .map(|&v| (v - mean) * (v - mean))
        .sum::<f32>()
        .sqrt();
    Patch { values, mean, norm }
}

/// ZNCC of the reference patch against the candidate patch centred at
/// (cx, cy). Returns `None` when either patch is textureless.
fn zncc_at(reference: &Patch, img: &ImageF32, cx: isize, cy: isize, radius: usize) -> Option<f32> {
    const FLAT_EPS: f32 = 1e-6;
    if reference.norm < FLAT_EPS {
        return None;
    }
    let cand = extract_patch(img, cx, cy, radius);
    if cand.norm < FLAT_EPS {
        return None;
    }
    let mut dot = 0.0;
    for (&a, &b) in reference.values.iter().zip(cand.values.iter()) {
        dot += (a - reference.mean) * (b - cand.mean);
    }
    Some(dot / (reference.norm * cand.norm))
}

/// Match reference corners into the candidate frame.
pub fn match_corners(
    reference: &ImageF32,
    candidate: &ImageF32,
    corners: &[[f32; 2]],
    params: &MatchParams,
) -> Vec<Correspondence> {
    let r = params.search_radius as isize;
    let mut out = Vec::new();
    for corner in corners {
        let cx = corner[0].round() as isize;
        let cy = corner[1].round() as isize;
        let ref_patch = extract_patch(reference, cx, cy, params.patch_radius);

        let mut best_score = params.min_score;
        let mut best: Option<(isize, isize)> = None;
        for dy in -r..=r {
            for dx in -r..=r {
                let (px, py) = (cx + dx, cy + dy);
                if px < 0 || py < 0 || px >= candidate.w as isize || py >= candidate.h as isize {
                    continue;
                }
                if let Some(score) = zncc_at(&ref_patch, candidate, px, py, params.patch_radius) {
                    if score > best_score {
                        best_score = score;
                        best = Some((px, py));
                    }
                }
            }
        }
        if let Some((px, py)) = best {
            out.push(Correspondence {
                candidate: [px as f64, py as f64],
                reference: [corner[0] as f64, corner[1] as f64],
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn textured(w: usize, h: usize) -> ImageF32 {
        let mut img = ImageF32::new(w, h);
        let mut state = 0x2545f491u32;
        for v in img.data.iter_mut() {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            *v = (state >> 8) as f32 / (1u32 << 24) as f32;
        }
        img
    }

    fn shifted(img: &ImageF32, dx: isize, dy: isize) -> ImageF32 {
        let mut out = ImageF32::new(img.w, img.h);
        for y in 0..img.h {
            for x in 0..img.w {
                out.set(x, y, img.get_clamped(x as isize - dx, y as isize - dy));
            }
        }
        out
    }

    #[test]
    fn recovers_known_integer_shift() {
        let reference = textured(80, 80);
        let candidate = shifted(&reference, 3, -2);
        let corners = vec![[40.0, 40.0], [25.0, 30.0], [55.0, 50.0]];
        let matches = match_corners(&reference, &candidate, &corners, &MatchParams::default());
        assert_eq!(matches.len(), 3);
        for m in &matches {
            assert!((m.candidate[0] - m.reference[0] - 3.0).abs() < 1e-6);
            assert!((m.candidate[1] - m.reference[1] + 2.0).abs() < 1e-6);
        }
    }

    #[test]
    fn flat_patches_produce_no_matches() {
        let mut flat = ImageF32::new(64, 64);
        flat.data.fill(0.4);
        let corners = vec![[32.0, 32.0]];
        let matches = match_corners(&flat, &flat, &corners, &MatchParams::default());
        assert!(matches.is_empty());
    }
}
