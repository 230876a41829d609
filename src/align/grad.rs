//! Scharr image gradients with border clamping.
//!
//! Feeds the corner detector's structure tensor. Only `gx`/`gy` are kept;
//! magnitude and orientation are not needed by the alignment stage.

use crate::image::{ImageF32, ImageView, ImageViewMut};

type Kernel3 = [[f32; 3]; 3];

const SCHARR_KERNEL_X: Kernel3 = [[-3.0, 0.0, 3.0], [-10.0, 0.0, 10.0], [-3.0, 0.0, 3.0]];
const SCHARR_KERNEL_Y: Kernel3 = [[-3.0, -10.0, -3.0], [0.0, 0.0, 0.0], [3.0, 10.0, 3.0]];

/// Per-pixel gradient buffers.
#[derive(Clone, Debug)]
pub struct Grad {
    /// Horizontal derivative (convolution with the X kernel)
    pub gx: ImageF32,
    /// Vertical derivative (convolution with the Y kernel)
    pub gy: ImageF32,
}

/// Compute Scharr gradients of a grayscale image with replicate borders.
pub fn scharr_gradients(l: &ImageF32) -> Grad {
    let w = l.w;
    let h = l.h;
    let mut gx = ImageF32::new(w, h);
    let mut gy = ImageF32::new(w, h);

    if w == 0 || h == 0 {
        return Grad { gx, gy };
    }

    for y in 0..h {
        let y_idx = [y.saturating_sub(1), y, (y + 1).min(h - 1)];
        let rows = [l.row(y_idx[0]), l.row(y_idx[1]), l.row(y_idx[2])];
        let out_gx = gx.row_mut(y);
        let out_gy = gy.row_mut(y);
        for x in 0..w {
            let x_idx = [x.saturating_sub(1), x, (x + 1).min(w - 1)];

            let mut sum_x = 0.0;
            let mut sum_y = 0.0;
            for (ky, row) in rows.iter().enumerate() {
                for (kx, &xi) in x_idx.iter().enumerate() {
                    let v = row[xi];
                    sum_x += SCHARR_KERNEL_X[ky][kx] * v;
                    sum_y += SCHARR_KERNEL_Y[ky][kx] * v;
                }
            }
            out_gx[x] = sum_x;
            out_gy[x] = sum_y;
        }
    }

    Grad { gx, gy }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertical_edge_has_horizontal_gradient() {
        let mut img = ImageF32::new(8, 8);
        for y in 0..8 {
            for x in 4..8 {
                img.set(x, y, 1.0);
            }
        }
        let grad = scharr_gradients(&img);
        assert!(grad.gx.get(4, 4).abs() > 0.0, "edge must respond in gx");
        assert!(grad.gy.get(4, 4).abs() < 1e-6, "no vertical structure");
    }

    #[test]
    fn flat_image_has_zero_gradients() {
        let mut img = ImageF32::new(6, 6);
        img.data.fill(0.5);
        let grad = scharr_gradients(&img);
        assert!(grad.gx.data.iter().all(|&v| v.abs() < 1e-6));
        assert!(grad.gy.data.iter().all(|&v| v.abs() < 1e-6));
    }
}
