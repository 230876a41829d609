//! Projective transform estimation: normalized DLT plus a RANSAC wrapper.
//!
//! Estimation runs in f64 with Hartley normalization for conditioning. The
//! RANSAC loop uses a seeded RNG so alignment is reproducible run to run.

use log::debug;
use nalgebra::{DMatrix, Matrix3, Vector3};

/// Project a 2D point through a 3×3 homography: `H · [x, y, 1]ᵀ → [u, v]`.
pub fn project(h: &Matrix3<f64>, x: f64, y: f64) -> [f64; 2] {
    let p = h * Vector3::new(x, y, 1.0);
    if p[2].abs() < 1e-15 {
        return [f64::NAN, f64::NAN];
    }
    [p[0] / p[2], p[1] / p[2]]
}

/// Reprojection error `‖project(H, src) − dst‖`.
fn reprojection_error(h: &Matrix3<f64>, src: &[f64; 2], dst: &[f64; 2]) -> f64 {
    let p = project(h, src[0], src[1]);
    let dx = p[0] - dst[0];
    let dy = p[1] - dst[1];
    (dx * dx + dy * dy).sqrt()
}

/// Normalizing transform: centroid to origin, mean distance √2.
fn normalize_points(pts: &[[f64; 2]]) -> (Matrix3<f64>, Vec<[f64; 2]>) {
    let n = pts.len() as f64;
    let cx: f64 = pts.iter().map(|p| p[0]).sum::<f64>() / n;
    let cy: f64 = pts.iter().map(|p| p[1]).sum::<f64>() / n;

    let mean_dist: f64 = pts
        .iter()
        .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;

    let s = if mean_dist > 1e-15 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized: Vec<[f64; 2]> = pts
        .iter()
        .map(|p| [s * (p[0] - cx), s * (p[1] - cy)])
        .collect();
    (t, normalized)
}

/// Estimate a homography from ≥4 correspondences with the Direct Linear
/// Transform. Returns `None` on degenerate configurations.
pub fn estimate_homography_dlt(src: &[[f64; 2]], dst: &[[f64; 2]]) -> Option<Matrix3<f64>> {
    let n = src.len();
    if n < 4 || dst.len() != n {
        return None;
    }

    let (t_src, src_n) = normalize_points(src);
    let (t_dst, dst_n) = normalize_points(dst);

    let mut a = DMatrix::zeros(2 * n, 9);
    for i in 0..n {
        let (sx, sy) = (src_n[i][0], src_n[i][1]);
        let (dx, dy) = (dst_n[i][0], dst_n[i][1]);

        a[(2 * i, 3)] = -sx;
        a[(2 * i, 4)] = -sy;
        a[(2 * i, 5)] = -1.0;
        a[(2 * i, 6)] = dy * sx;
        a[(2 * i, 7)] = dy * sy;
        a[(2 * i, 8)] = dy;

        a[(2 * i + 1, 0)] = sx;
        a[(2 * i + 1, 1)] = sy;
        a[(2 * i + 1, 2)] = 1.0;
        a[(2 * i + 1, 6)] = -dx * sx;
        a[(2 * i + 1, 7)] = -dx * sy;
        a[(2 * i + 1, 8)] = -dx;
    }

    // The solution is the eigenvector of AᵀA with the smallest eigenvalue;
    // solving the 9×9 symmetric problem avoids thin-SVD dimension issues.
    let ata = a.transpose() * &a;
    let eig = nalgebra::SymmetricEigen::new(ata);

    let mut min_idx = 0;
    let mut min_val = eig.eigenvalues[0].abs();
    for i in 1..9 {
        let v = eig.eigenvalues[i].abs();
        if v < min_val {
            min_val = v;
            min_idx = i;
        }
    }
    let h_vec: Vec<f64> = (0..9).map(|j| eig.eigenvectors[(j, min_idx)]).collect();
    let h_norm = Matrix3::new(
        h_vec[0], h_vec[1], h_vec[2], h_vec[3], h_vec[4], h_vec[5], h_vec[6], h_vec[7], h_vec[8],
    );

    let t_dst_inv = t_dst.try_inverse()?;
    let h = t_dst_inv * h_norm * t_src;

    let scale = h[(2, 2)];
    if scale.abs() < 1e-15 {
        Some(h)
    } else {
        Some(h / scale)
    }
}

/// RANSAC configuration for homography fitting.
#[derive(Clone, Debug)]
pub struct RansacConfig {
    /// Maximum number of RANSAC iterations.
    pub max_iters: usize,
    /// Inlier threshold (reprojection error in pixels).
    pub inlier_threshold: f64,
    /// Minimum number of inliers for a valid model.
    pub min_inliers: usize,
    /// Random seed; fixed so runs are reproducible.
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            max_iters: 1000,
            inlier_threshold: 3.0,
            min_inliers: 8,
            seed: 0,
        }
    }
}

/// Fit a homography with RANSAC, then refit on the consensus set.
/// Returns `None` when no model reaches `min_inliers`.
pub fn fit_homography_ransac(
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
    config: &RansacConfig,
) -> Option<Matrix3<f64>> {
    let n = src.len();
    if n < 4 {
        return None;
    }

    use rand::prelude::*;
    let mut rng = rand::rngs::StdRng::seed_from_u64(config.seed);

    let mut best_inliers = 0usize;
    let mut best_mask: Vec<bool> = vec![false; n];

    for _ in 0..config.max_iters {
        let mut indices = [0usize; 4];
        let mut attempts = 0;
        loop {
            for idx in &mut indices {
                *idx = rng.gen_range(0..n);
            }
            let distinct = (0..4).all(|i| (i + 1..4).all(|j| indices[i] != indices[j]));
            if distinct {
                break;
            }
            attempts += 1;
            if attempts > 100 {
                return None;
            }
        }

        let s4: Vec<[f64; 2]> = indices.iter().map(|&i| src[i]).collect();
        let d4: Vec<[f64; 2]> = indices.iter().map(|&i| dst[i]).collect();
        let Some(h) = estimate_homography_dlt(&s4, &d4) else {
            continue;
        };

        let mut mask = vec![false; n];
        let mut inliers = 0;
        for i in 0..n {
            if reprojection_error(&h, &src[i], &dst[i]) <= config.inlier_threshold {
                mask[i] = true;
                inliers += 1;
            }
        }
        if inliers > best_inliers {
            best_inliers = inliers;
            best_mask = mask;
        }
    }

    if best_inliers < config.min_inliers.max(4) {
        debug!(
            "ransac: best consensus {} below minimum {}",
            best_inliers,
            config.min_inliers.max(4)
        );
        return None;
    }

    let src_in: Vec<[f64; 2]> = (0..n).filter(|&i| best_mask[i]).map(|i| src[i]).collect();
    let dst_in: Vec<[f64; 2]> = (0..n).filter(|&i| best_mask[i]).map(|i| dst[i]).collect();
    estimate_homography_dlt(&src_in, &dst_in)
}
