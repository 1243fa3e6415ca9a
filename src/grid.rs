// Based on the HOG implementation of the Simd Library (http://simd.sourceforge.net).
// See lib.rs for its license.
use ndarray::{Array3, ArrayView3};

use crate::{binning::N_SLOTS, N_BINS_SIGNED};

/// Per-cell 18-bin orientation histograms of a whole image, shape `(cells_y, cells_x, 18)`.
#[derive(Debug, Clone)]
pub struct CellHistograms {
    hist: Array3<f32>,
}

impl CellHistograms {
    pub fn new(cells_x: usize, cells_y: usize) -> Self {
        CellHistograms {
            hist: Array3::zeros((cells_y, cells_x, N_BINS_SIGNED)),
        }
    }

    pub fn histograms(&self) -> ArrayView3<f32> {
        self.hist.view()
    }

    pub fn into_inner(self) -> Array3<f32> {
        self.hist
    }

    /// Adds the slots of window row `window_row` to the two cell rows it straddles.
    ///
    /// Window row `r` covers cell rows `r - 1` (slots 0 and 1) and `r` (slots 2 and 3), window
    /// column `c` covers cell columns `c - 1` (slots 0 and 2) and `c` (slots 1 and 3). The first
    /// and last window row and column only partially overlap the grid, contributions to cells
    /// outside of it are dropped.
    pub fn merge_window(&mut self, slots: &[f32], window_row: usize) {
        let (cells_y, cells_x, _) = self.hist.dim();
        assert!(window_row <= cells_y);
        assert_eq!(slots.len(), (cells_x + 1) * N_BINS_SIGNED * N_SLOTS);

        if window_row == 0 {
            // top edge, nothing above the first cell row
            self.merge_half(slots, 0, 2);
        } else if window_row == cells_y {
            // bottom edge, nothing below the last cell row
            self.merge_half(slots, cells_y - 1, 0);
        } else {
            self.merge_half(slots, window_row - 1, 0);
            self.merge_half(slots, window_row, 2);
        }
    }

    /// Adds slots `first_slot` (left) and `first_slot + 1` (right) of every window column to
    /// cell row `cell_row`.
    fn merge_half(&mut self, slots: &[f32], cell_row: usize, first_slot: usize) {
        let cells_x = self.hist.dim().1;
        let mut row = self.hist.index_axis_mut(ndarray::Axis(0), cell_row);
        for (window_col, col_slots) in slots.chunks_exact(N_BINS_SIGNED * N_SLOTS).enumerate() {
            if window_col > 0 {
                let mut left = row.row_mut(window_col - 1);
                for (h, s) in left.iter_mut().zip(col_slots.chunks_exact(N_SLOTS)) {
                    *h += s[first_slot];
                }
            }
            if window_col < cells_x {
                let mut right = row.row_mut(window_col);
                for (h, s) in right.iter_mut().zip(col_slots.chunks_exact(N_SLOTS)) {
                    *h += s[first_slot + 1];
                }
            }
        }
    }
}
