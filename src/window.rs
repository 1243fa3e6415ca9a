// Based on the HOG implementation of the Simd Library (http://simd.sourceforge.net).
// See lib.rs for its license.
//! Streaming accumulation of one row window at a time.
use aligned_vec::{avec, AVec, ConstAlign};

use crate::{
    binning::{bin_pixel, window_position, InterpolationWeights, N_SLOTS},
    grid::CellHistograms,
    orientation::GradientKernel,
    GrayView, CELL_SIZE, N_BINS_SIGNED,
};

/// Partial histograms of the window row currently being processed.
///
/// Holds `(cells_x + 1) * 18 * 4` floats: one 18-bin histogram with 4 interpolation slots per
/// window column. Memory use only depends on the image width.
pub struct RowWindow {
    width: usize,
    weights: InterpolationWeights,
    bins: AVec<u32, ConstAlign<32>>,
    magnitudes: AVec<f32, ConstAlign<32>>,
    slots: AVec<f32, ConstAlign<32>>,
}

impl RowWindow {
    pub fn new(width: usize) -> Self {
        assert!(width % CELL_SIZE == 0);
        let cells_x = width / CELL_SIZE;
        RowWindow {
            width,
            weights: InterpolationWeights::default(),
            bins: avec!([32]| 0u32; width),
            magnitudes: avec!([32]| 0f32; width),
            slots: avec!([32]| 0f32; (cells_x + 1) * N_BINS_SIGNED * N_SLOTS),
        }
    }

    /// Quantize interior row `y` of `img` and bin all its interior pixels.
    pub fn add_row<K: GradientKernel>(&mut self, img: &GrayView, y: usize) {
        assert_eq!(img.width(), self.width);
        assert!(y > 0 && y < img.height() - 1);
        K::quantize_row(
            img.row(y - 1),
            img.row(y),
            img.row(y + 1),
            &mut self.bins,
            &mut self.magnitudes,
        );

        let (_, iy) = window_position(y);
        let ky = &self.weights.ky[iy];
        for x in 1..self.width - 1 {
            let (window_col, ix) = window_position(x);
            bin_pixel(
                &mut self.slots,
                window_col,
                self.bins[x] as usize,
                self.magnitudes[x],
                ky,
                &self.weights.kx[ix],
            );
        }
    }

    /// Slots laid out as `[window column][bin][slot]`.
    pub fn slots(&self) -> &[f32] {
        &self.slots
    }

    /// Merge into `grid` as window row `window_row` and start over.
    pub fn flush_into(&mut self, grid: &mut CellHistograms, window_row: usize) {
        grid.merge_window(&self.slots, window_row);
        self.slots.fill(0.);
    }
}
