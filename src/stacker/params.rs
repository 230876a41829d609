//! Stacking pipeline configuration.

use crate::align::AlignParams;

/// Top-level knobs for a stacking run.
#[derive(Clone, Debug)]
pub struct StackParams {
    /// Upper bound on pyramid depth; the actual depth also stops once the
    /// coarsest level would drop below 8 px on a side.
    pub max_pyramid_levels: usize,
    /// Alignment configuration.
    pub align: AlignParams,
    /// Soft cap on resident aligned-frame bytes. Frames beyond the cap are
    /// spilled to scratch storage and reloaded one at a time for fusion.
    pub memory_budget_bytes: usize,
}

impl Default for StackParams {
    fn default() -> Self {
        Self {
            max_pyramid_levels: 8,
            align: AlignParams::default(),
            memory_budget_bytes: 2 * 1024 * 1024 * 1024,
        }
    }
}
