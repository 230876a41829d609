//! Owned multi-channel float frame and per-pixel validity mask.
//!
//! Samples are interleaved row-major (`y * w * c + x * c + channel`) and kept
//! in floating point for the whole pipeline; the decoded range for 8-bit
//! sources is `[0, 255]` but intermediate values (Laplacian residuals, fused
//! sums) are signed and unclamped until export.

use super::ImageF32;

/// Interleaved multi-channel f32 raster.
#[derive(Clone, Debug)]
pub struct FrameF32 {
    /// Frame width in pixels
    pub w: usize,
    /// Frame height in pixels
    pub h: usize,
    /// Samples per pixel (1 = grayscale, 3 = RGB)
    pub channels: usize,
    /// Backing storage, interleaved row-major
    pub data: Vec<f32>,
}

/// Grayscale weights matching the classic luma transform.
const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

impl FrameF32 {
    /// Construct a zero-initialized frame.
    pub fn new(w: usize, h: usize, channels: usize) -> Self {
        assert!(channels == 1 || channels == 3, "unsupported channel count");
        Self {
            w,
            h,
            channels,
            data: vec![0.0; w * h * channels],
        }
    }

    #[inline]
    /// Linear index of the first sample of pixel (x, y).
    pub fn idx(&self, x: usize, y: usize) -> usize {
        (y * self.w + x) * self.channels
    }

    #[inline]
    /// Borrow the samples of pixel (x, y).
    pub fn pixel(&self, x: usize, y: usize) -> &[f32] {
        let i = self.idx(x, y);
        &self.data[i..i + self.channels]
    }

    #[inline]
    /// Mutably borrow the samples of pixel (x, y).
    pub fn pixel_mut(&mut self, x: usize, y: usize) -> &mut [f32] {
        let i = self.idx(x, y);
        let c = self.channels;
        &mut self.data[i..i + c]
    }

    /// Size of the backing storage in bytes, used for memory accounting.
    pub fn byte_len(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }

    /// True when `other` has identical width, height and channel count.
    pub fn same_shape(&self, other: &FrameF32) -> bool {
        self.w == other.w && self.h == other.h && self.channels == other.channels
    }

    /// Convert to a single-channel luma image normalized to `[0, 1]`
    /// (assuming decoded `[0, 255]` input), for gradient and correlation work.
    pub fn to_luma(&self) -> ImageF32 {
        let mut out = ImageF32::new(self.w, self.h);
        match self.channels {
            1 => {
                for (dst, &src) in out.data.iter_mut().zip(self.data.iter()) {
                    *dst = src / 255.0;
                }
            }
            _ => {
                for (dst, px) in out.data.iter_mut().zip(self.data.chunks_exact(self.channels)) {
                    *dst = (LUMA_R * px[0] + LUMA_G * px[1] + LUMA_B * px[2]) / 255.0;
                }
            }
        }
        out
    }
}

/// Per-pixel validity. Pixels a warp could not source from inside the
/// original frame are invalid and must not contribute to fusion.
#[derive(Clone, Debug)]
pub struct Mask {
    pub w: usize,
    pub h: usize,
    pub data: Vec<bool>,
}

impl Mask {
    /// Fully valid mask.
    pub fn full(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![true; w * h],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[y * self.w + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: bool) {
        self.data[y * self.w + x] = v;
    }

    /// True when every pixel is valid.
    pub fn is_full(&self) -> bool {
        self.data.iter().all(|&v| v)
    }

    /// 2× downsample with conservative AND-reduction: a coarse pixel is valid
    /// only if every fine pixel it covers is valid. Coefficients near invalid
    /// borders are blur-contaminated, so erring on the invalid side is the
    /// safe direction.
    pub fn downsample_and(&self) -> Mask {
        let nw = self.w.div_ceil(2);
        let nh = self.h.div_ceil(2);
        let mut out = Mask::full(nw, nh);
        for y in 0..nh {
            for x in 0..nw {
                let mut v = true;
                for dy in 0..2 {
                    for dx in 0..2 {
                        let sx = (x * 2 + dx).min(self.w - 1);
                        let sy = (y * 2 + dy).min(self.h - 1);
                        v &= self.get(sx, sy);
                    }
                }
                out.set(x, y, v);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luma_of_gray_frame_normalizes() {
        let mut f = FrameF32::new(2, 1, 1);
        f.data = vec![0.0, 255.0];
        let l = f.to_luma();
        assert_eq!(l.get(0, 0), 0.0);
        assert!((l.get(1, 0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn mask_downsample_is_conservative() {
        let mut m = Mask::full(4, 4);
        m.set(1, 1, false);
        let d = m.downsample_and();
        assert_eq!(d.w, 2);
        assert_eq!(d.h, 2);
        assert!(!d.get(0, 0), "any invalid fine pixel invalidates the block");
        assert!(d.get(1, 1));
    }
}
