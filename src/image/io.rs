//! Decode/encode boundary.
//!
//! - [`load_frame`]: read a PNG/JPEG/TIFF/... into an RGB [`FrameF32`] with
//!   samples in `[0, 255]`.
//! - [`save_frame`]: write a float composite to disk, applying the export
//!   contract: JPEG/PNG round, clamp to `[0, 255]` and cast to u8 (JPEG
//!   quality 0–100, PNG compression 0–9 inverted scale); TIFF scales by 2^8,
//!   clamps to `[0, 65535]` and casts to u16, with no quality parameter.
//!
//! Saving never panics on bad values; failures come back as
//! [`StackError::Save`] with diagnostic detail.

use super::FrameF32;
use crate::error::StackError;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::tiff::TiffEncoder;
use image::{DynamicImage, ImageBuffer, Luma, Rgb};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Output filetypes supported by the save routine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Jpg,
    Png,
    Tif,
}

impl OutputFormat {
    /// Parse a user-supplied filetype token (`jpg`, `jpeg`, `png`, `tif`).
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpg),
            "png" => Some(Self::Png),
            "tif" | "tiff" => Some(Self::Tif),
            _ => None,
        }
    }

    /// Canonical file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
            Self::Tif => "tif",
        }
    }

    /// Inclusive valid range for the quality/compression parameter, or
    /// `None` when the format does not accept one.
    pub fn quality_range(&self) -> Option<(u8, u8)> {
        match self {
            Self::Jpg => Some((0, 100)),
            Self::Png => Some((0, 9)),
            Self::Tif => None,
        }
    }
}

/// Round and clamp a float sample to the 8-bit range.
#[inline]
pub fn quantize_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Scale a `[0, 255]`-domain float sample to 16-bit dynamic range, then
/// round and clamp.
#[inline]
pub fn quantize_u16(v: f32) -> u16 {
    (v * 256.0).round().clamp(0.0, 65535.0) as u16
}

/// Decode an image file into an RGB float frame with samples in `[0, 255]`.
pub fn load_frame(path: &Path) -> Result<FrameF32, StackError> {
    let img = image::open(path).map_err(|source| StackError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let rgb = img.to_rgb8();
    let (w, h) = (rgb.width() as usize, rgb.height() as usize);
    let mut frame = FrameF32::new(w, h, 3);
    for (dst, &src) in frame.data.iter_mut().zip(rgb.as_raw().iter()) {
        *dst = src as f32;
    }
    Ok(frame)
}

/// Encode a float composite to disk according to the export contract.
///
/// `quality` must be in the format's [`OutputFormat::quality_range`]; passing
/// one for TIFF is rejected. Defaults when `None`: JPEG 100, PNG 6.
pub fn save_frame(
    frame: &FrameF32,
    path: &Path,
    format: OutputFormat,
    quality: Option<u8>,
) -> Result<(), StackError> {
    let save_err = |detail: String| StackError::Save {
        path: path.to_path_buf(),
        detail,
    };

    if let Some(q) = quality {
        match format.quality_range() {
            Some((lo, hi)) if q < lo || q > hi => {
                return Err(save_err(format!(
                    "quality {q} outside the valid range {lo}..={hi} for {}",
                    format.extension()
                )));
            }
            None => {
                return Err(save_err(format!(
                    "{} output does not accept a quality parameter",
                    format.extension()
                )));
            }
            _ => {}
        }
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| save_err(e.to_string()))?;
        }
    }
    let file = File::create(path).map_err(|e| save_err(e.to_string()))?;
    let writer = BufWriter::new(file);

    match format {
        OutputFormat::Jpg => {
            let encoder = JpegEncoder::new_with_quality(writer, quality.unwrap_or(100));
            dynamic_u8(frame)
                .write_with_encoder(encoder)
                .map_err(|e| save_err(e.to_string()))
        }
        OutputFormat::Png => {
            let encoder = PngEncoder::new_with_quality(
                writer,
                png_compression(quality.unwrap_or(6)),
                FilterType::Adaptive,
            );
            dynamic_u8(frame)
                .write_with_encoder(encoder)
                .map_err(|e| save_err(e.to_string()))
        }
        OutputFormat::Tif => {
            let encoder = TiffEncoder::new(writer);
            dynamic_u16(frame)
                .write_with_encoder(encoder)
                .map_err(|e| save_err(e.to_string()))
        }
    }
}

/// Map the 0–9 compression scale onto the png encoder's tiers. The encoder
/// does not expose raw zlib levels, so the scale collapses to three bands.
fn png_compression(level: u8) -> CompressionType {
    match level {
        0..=2 => CompressionType::Fast,
        3..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

fn dynamic_u8(frame: &FrameF32) -> DynamicImage {
    let (w, h) = (frame.w as u32, frame.h as u32);
    match frame.channels {
        1 => {
            let data: Vec<u8> = frame.data.iter().map(|&v| quantize_u8(v)).collect();
            let buf: ImageBuffer<Luma<u8>, Vec<u8>> =
                ImageBuffer::from_raw(w, h, data).expect("buffer size matches dimensions");
            DynamicImage::ImageLuma8(buf)
        }
        _ => {
            let data: Vec<u8> = frame.data.iter().map(|&v| quantize_u8(v)).collect();
            let buf: ImageBuffer<Rgb<u8>, Vec<u8>> =
                ImageBuffer::from_raw(w, h, data).expect("buffer size matches dimensions");
            DynamicImage::ImageRgb8(buf)
        }
    }
}

fn dynamic_u16(frame: &FrameF32) -> DynamicImage {
    let (w, h) = (frame.w as u32, frame.h as u32);
    match frame.channels {
        1 => {
            let data: Vec<u16> = frame.data.iter().map(|&v| quantize_u16(v)).collect();
            let buf: ImageBuffer<Luma<u16>, Vec<u16>> =
                ImageBuffer::from_raw(w, h, data).expect("buffer size matches dimensions");
            DynamicImage::ImageLuma16(buf)
        }
        _ => {
            let data: Vec<u16> = frame.data.iter().map(|&v| quantize_u16(v)).collect();
            let buf: ImageBuffer<Rgb<u16>, Vec<u16>> =
                ImageBuffer::from_raw(w, h, data).expect("buffer size matches dimensions");
            DynamicImage::ImageRgb16(buf)
        }
    }
}
