//! Synthetic focus-bracketed frames for end-to-end tests.
//!
//! The scene is a deterministic high-frequency texture; a "frame" keeps one
//! vertical band of it sharp and box-blurs the rest, mimicking a shallow
//! depth of field swept across the scene.

use image::{Rgb, RgbImage};

/// Grayscale texture value of the scene at (x, y). High-frequency enough
/// that a radius-3 box blur visibly flattens it.
pub fn scene_value(x: usize, y: usize) -> u8 {
    let fx = x as f32;
    let fy = y as f32;
    let wave = 55.0 * (fx * 0.9).sin() * (fy * 0.7).cos();
    let blocks = if (x / 3 + y / 3) % 2 == 0 { 30.0 } else { -30.0 };
    (128.0 + wave + blocks).clamp(0.0, 255.0) as u8
}

/// The fully sharp scene as a grayscale raster.
pub fn sharp_scene(w: usize, h: usize) -> Vec<u8> {
    let mut out = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            out[y * w + x] = scene_value(x, y);
        }
    }
    out
}

/// Box blur with clamped borders.
pub fn box_blur(src: &[u8], w: usize, h: usize, radius: usize) -> Vec<u8> {
    let r = radius as isize;
    let mut out = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0u32;
            let mut count = 0u32;
            for dy in -r..=r {
                for dx in -r..=r {
                    let sx = (x as isize + dx).clamp(0, w as isize - 1) as usize;
                    let sy = (y as isize + dy).clamp(0, h as isize - 1) as usize;
                    sum += src[sy * w + sx] as u32;
                    count += 1;
                }
            }
            out[y * w + x] = (sum / count) as u8;
        }
    }
    out
}

/// A frame of the scene that is sharp in columns `[x0, x1)` and blurred
/// everywhere else.
pub fn frame_sharp_in_band(w: usize, h: usize, x0: usize, x1: usize, radius: usize) -> RgbImage {
    let sharp = sharp_scene(w, h);
    let soft = box_blur(&sharp, w, h, radius);
    RgbImage::from_fn(w as u32, h as u32, |x, y| {
        let (x, y) = (x as usize, y as usize);
        let v = if x >= x0 && x < x1 {
            sharp[y * w + x]
        } else {
            soft[y * w + x]
        };
        Rgb([v, v, v])
    })
}

/// A uniform gray frame with no usable features.
pub fn flat_frame(w: usize, h: usize) -> RgbImage {
    RgbImage::from_pixel(w as u32, h as u32, Rgb([128, 128, 128]))
}
