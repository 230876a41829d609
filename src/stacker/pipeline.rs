//! The stacking pipeline: load → align → decompose → fuse → reconstruct.
//!
//! Alignment is embarrassingly parallel and runs on the rayon pool; fusion
//! is sequential in input order so winner-take-all ties are deterministic.
//! Aligned frames that would push the resident set past the memory budget
//! are spilled to scratch storage and reloaded one at a time during fusion.
//!
//! The cancel token is polled at frame boundaries in both phases; a
//! cancelled run returns [`StackOutcome::Cancelled`] with no partial output.

use crate::align::{self, AlignedFrame};
use crate::error::StackError;
use crate::fuse::FusionAccumulator;
use crate::image::io::load_frame;
use crate::image::{FrameF32, Mask};
use crate::pyramid::{depth_for, mask_levels, LaplacianPyramid};
use crate::reconstruct::collapse;
use crate::types::{StackOutcome, StackOutput, StackReport};

use super::params::StackParams;
use super::progress::{CancelToken, ProgressSink};
use super::scratch::{ScratchStore, SpilledFrame};

use log::{debug, info};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// An aligned frame awaiting fusion, either in memory or on disk.
enum PreparedFrame {
    Resident {
        pixels: FrameF32,
        mask: Mask,
        used_fallback: bool,
    },
    Spilled {
        handle: SpilledFrame,
        used_fallback: bool,
    },
}

/// The focus stacking engine. One instance is reusable across runs; each
/// run is independent.
pub struct FocusStacker {
    params: StackParams,
}

impl FocusStacker {
    pub fn new(params: StackParams) -> Self {
        Self { params }
    }

    /// Stack `inputs` (already in the caller's intended order; the first
    /// frame is the alignment reference) into a single composite.
    pub fn run(
        &self,
        inputs: &[PathBuf],
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<StackOutcome, StackError> {
        if inputs.is_empty() {
            return Err(StackError::NoInput);
        }
        if cancel.is_cancelled() {
            return Ok(StackOutcome::Cancelled);
        }
        let started = Instant::now();

        progress.report("load", 0.0);
        let reference = load_frame(&inputs[0])?;
        let (full_w, full_h, channels) = (reference.w, reference.h, reference.channels);
        let depth = depth_for(full_w, full_h, self.params.max_pyramid_levels);
        info!(
            "stacking {} frames at {full_w}x{full_h}, pyramid depth {depth}",
            inputs.len()
        );

        let ctx = align::prepare_reference(&reference, &self.params.align);

        // Alignment phase. The budget tracks aligned pixel bytes; the
        // reference stays resident for the whole run and is charged first.
        let resident = AtomicUsize::new(reference.byte_len());
        let scratch: Mutex<Option<ScratchStore>> = Mutex::new(None);
        let spilled = AtomicUsize::new(0);
        let aligned_done = AtomicUsize::new(0);
        let others = &inputs[1..];

        let prepared: Vec<Option<PreparedFrame>> = others
            .par_iter()
            .map(|path| -> Result<Option<PreparedFrame>, StackError> {
                if cancel.is_cancelled() {
                    return Ok(None);
                }
                let frame = load_frame(path)?;
                if frame.w != full_w || frame.h != full_h || frame.channels != channels {
                    return Err(StackError::DimensionMismatch {
                        path: path.clone(),
                        got_w: frame.w,
                        got_h: frame.h,
                        got_c: frame.channels,
                        want_w: full_w,
                        want_h: full_h,
                        want_c: channels,
                    });
                }
                let label = path.display().to_string();
                let AlignedFrame {
                    pixels,
                    mask,
                    used_fallback,
                } = align::align_frame(&ctx, frame, &label, &self.params.align);

                let bytes = pixels.byte_len() + mask.data.len();
                let total = resident.fetch_add(bytes, Ordering::SeqCst) + bytes;
                let prepared = if total > self.params.memory_budget_bytes {
                    let mut guard = scratch.lock().expect("scratch lock");
                    if guard.is_none() {
                        *guard = Some(ScratchStore::new().map_err(|e| {
                            StackError::ResourceExhausted(format!(
                                "memory budget exceeded and scratch directory creation failed: {e}"
                            ))
                        })?);
                    }
                    let handle = guard
                        .as_mut()
                        .expect("scratch store present")
                        .store(&pixels, &mask)?;
                    drop(guard);
                    resident.fetch_sub(bytes, Ordering::SeqCst);
                    spilled.fetch_add(1, Ordering::Relaxed);
                    debug!("spilled aligned frame {label} to scratch");
                    PreparedFrame::Spilled {
                        handle,
                        used_fallback,
                    }
                } else {
                    PreparedFrame::Resident {
                        pixels,
                        mask,
                        used_fallback,
                    }
                };

                let done = aligned_done.fetch_add(1, Ordering::Relaxed) + 1;
                progress.report("align", done as f32 / others.len().max(1) as f32 * 100.0);
                Ok(Some(prepared))
            })
            .collect::<Result<_, _>>()?;

        if cancel.is_cancelled() || prepared.iter().any(|p| p.is_none()) {
            return Ok(StackOutcome::Cancelled);
        }

        // Fusion phase: reference first, then the candidates in input order.
        let frames = inputs.len();
        let mut identity_fallbacks = 0usize;
        let mut acc = FusionAccumulator::new();
        acc.accumulate(LaplacianPyramid::build(reference, depth), None);
        progress.report("fuse", 100.0 / frames as f32);

        let scratch = scratch.into_inner().expect("scratch lock");
        for (i, slot) in prepared.into_iter().enumerate() {
            if cancel.is_cancelled() {
                return Ok(StackOutcome::Cancelled);
            }
            let (pixels, mask, used_fallback) = match slot.expect("checked above") {
                PreparedFrame::Resident {
                    pixels,
                    mask,
                    used_fallback,
                } => (pixels, mask, used_fallback),
                PreparedFrame::Spilled {
                    handle,
                    used_fallback,
                } => {
                    let store = scratch.as_ref().expect("spilled frames imply a store");
                    let (pixels, mask) = store.load(&handle)?;
                    (pixels, mask, used_fallback)
                }
            };
            if used_fallback {
                identity_fallbacks += 1;
            }
            let masks = if mask.is_full() {
                None
            } else {
                Some(mask_levels(&mask, depth))
            };
            acc.accumulate(LaplacianPyramid::build(pixels, depth), masks.as_deref());
            progress.report("fuse", (i + 2) as f32 / frames as f32 * 100.0);
        }

        progress.report("reconstruct", 0.0);
        let composite = collapse(acc.finish());
        progress.report("reconstruct", 100.0);

        let report = StackReport {
            frames,
            identity_fallbacks,
            spilled_frames: spilled.load(Ordering::Relaxed),
            pyramid_depth: depth,
            latency_ms: started.elapsed().as_millis(),
        };
        info!(
            "stacked {} frames in {} ms ({} identity fallbacks, {} spilled)",
            report.frames, report.latency_ms, report.identity_fallbacks, report.spilled_frames
        );
        Ok(StackOutcome::Completed(StackOutput { composite, report }))
    }
}
