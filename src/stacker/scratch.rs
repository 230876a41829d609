//! Scratch spill storage for aligned frames.
//!
//! When the resident set of aligned frames would exceed the memory budget,
//! frames are written to raw little-endian f32 files in a temporary
//! directory and reloaded one at a time during fusion. The directory and
//! its contents are removed when the store is dropped.

use crate::image::{FrameF32, Mask};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::PathBuf;
use tempfile::TempDir;

/// Handle to a frame spilled on disk. Shape metadata stays in memory; only
/// pixel and mask payloads live in the file.
#[derive(Debug)]
pub struct SpilledFrame {
    path: PathBuf,
    w: usize,
    h: usize,
    channels: usize,
}

/// Temporary directory holding spilled frames for one stacking run.
#[derive(Debug)]
pub struct ScratchStore {
    dir: TempDir,
    count: usize,
}

impl ScratchStore {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
            count: 0,
        })
    }

    /// Write one aligned frame out, returning a handle to load it back.
    pub fn store(&mut self, pixels: &FrameF32, mask: &Mask) -> std::io::Result<SpilledFrame> {
        let path = self.dir.path().join(format!("frame-{:04}.raw", self.count));
        self.count += 1;

        let mut out = BufWriter::new(File::create(&path)?);
        for &v in &pixels.data {
            out.write_all(&v.to_le_bytes())?;
        }
        let packed: Vec<u8> = mask.data.iter().map(|&b| b as u8).collect();
        out.write_all(&packed)?;
        out.flush()?;

        Ok(SpilledFrame {
            path,
            w: pixels.w,
            h: pixels.h,
            channels: pixels.channels,
        })
    }

    /// Read a spilled frame back into memory.
    pub fn load(&self, spilled: &SpilledFrame) -> std::io::Result<(FrameF32, Mask)> {
        let mut file = File::open(&spilled.path)?;
        let n = spilled.w * spilled.h;

        let mut raw = vec![0u8; n * spilled.channels * 4];
        file.read_exact(&mut raw)?;
        let mut pixels = FrameF32::new(spilled.w, spilled.h, spilled.channels);
        for (dst, chunk) in pixels.data.iter_mut().zip(raw.chunks_exact(4)) {
            *dst = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }

        let mut packed = vec![0u8; n];
        file.read_exact(&mut packed)?;
        let mask = Mask {
            w: spilled.w,
            h: spilled.h,
            data: packed.into_iter().map(|b| b != 0).collect(),
        };
        Ok((pixels, mask))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_and_load_round_trip() {
        let mut store = ScratchStore::new().expect("scratch dir");
        let mut pixels = FrameF32::new(13, 7, 3);
        for (i, v) in pixels.data.iter_mut().enumerate() {
            *v = i as f32 * 0.5 - 10.0;
        }
        let mut mask = Mask::full(13, 7);
        mask.set(0, 0, false);
        mask.set(12, 6, false);

        let handle = store.store(&pixels, &mask).expect("store");
        let (loaded, loaded_mask) = store.load(&handle).expect("load");
        assert_eq!(loaded.data, pixels.data);
        assert_eq!(loaded_mask.data, mask.data);
    }

    #[test]
    fn dropping_the_store_removes_files() {
        let mut store = ScratchStore::new().expect("scratch dir");
        let pixels = FrameF32::new(4, 4, 1);
        let mask = Mask::full(4, 4);
        let handle = store.store(&pixels, &mask).expect("store");
        let path = handle.path.clone();
        assert!(path.exists());
        drop(store);
        assert!(!path.exists());
    }
}
