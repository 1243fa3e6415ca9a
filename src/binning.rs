// Based on the HOG implementation of the Simd Library (http://simd.sourceforge.net).
// See lib.rs for its license.
//! Bilinear spatial binning of quantized gradients.
//!
//! Every interior pixel spreads its magnitude over the four cells surrounding it. Pixels are
//! grouped into windows of 8x8 pixels that are shifted by half a cell against the cell grid, so
//! that all pixels in one window contribute to the same 2x2 block of cells. The four weights
//! of a pixel are stored in four slots:
//!
//! | slot | cell row  | cell column |
//! |------|-----------|-------------|
//! | 0    | upper     | left        |
//! | 1    | upper     | right       |
//! | 2    | lower     | left        |
//! | 3    | lower     | right       |
use crate::{CELL_SIZE, N_BINS_SIGNED};

/// Slots per window and orientation bin.
pub const N_SLOTS: usize = 4;

/// Offset of the window lattice against the cell lattice, half a cell.
const WINDOW_SHIFT: usize = CELL_SIZE / 2;

/// Position of a pixel coordinate in the window lattice: `(window index, offset in window)`.
#[inline]
pub fn window_position(coord: usize) -> (usize, usize) {
    let shifted = coord + WINDOW_SHIFT;
    (shifted / CELL_SIZE, shifted % CELL_SIZE)
}

/// Linear ramp over one cell period. `k0` is the weight of the upper/left cell for a pixel at
/// offset `i` inside its window, `k1 = 1 - k0` that of the lower/right one.
fn ramp(i: usize) -> (f32, f32) {
    let k0 = (15 - 2 * i as i32) as f32 / 16.;
    (k0, 1. - k0)
}

/// Per-slot interpolation weights for every offset inside a window.
#[derive(Debug, Clone)]
pub struct InterpolationWeights {
    /// Horizontal weights laid out per slot: `(k0, k1, k0, k1)`.
    pub kx: [[f32; N_SLOTS]; CELL_SIZE],
    /// Vertical weights laid out per slot: `(k0, k0, k1, k1)`.
    pub ky: [[f32; N_SLOTS]; CELL_SIZE],
}

impl InterpolationWeights {
    pub fn new() -> Self {
        let mut kx = [[0.; N_SLOTS]; CELL_SIZE];
        let mut ky = [[0.; N_SLOTS]; CELL_SIZE];
        for i in 0..CELL_SIZE {
            let (k0, k1) = ramp(i);
            kx[i] = [k0, k1, k0, k1];
            ky[i] = [k0, k0, k1, k1];
        }
        InterpolationWeights { kx, ky }
    }
}

impl Default for InterpolationWeights {
    fn default() -> Self {
        Self::new()
    }
}

/// Adds one pixel's magnitude to the four slots of orientation `bin` in window column
/// `window_col`. `slots` is laid out as `[window column][bin][slot]`.
#[inline(always)]
pub fn bin_pixel(
    slots: &mut [f32],
    window_col: usize,
    bin: usize,
    magnitude: f32,
    ky: &[f32; N_SLOTS],
    kx: &[f32; N_SLOTS],
) {
    debug_assert!(bin < N_BINS_SIGNED);
    let start = (window_col * N_BINS_SIGNED + bin) * N_SLOTS;
    let dst = &mut slots[start..start + N_SLOTS];
    for s in 0..N_SLOTS {
        dst[s] += magnitude * (ky[s] * kx[s]);
    }
}
