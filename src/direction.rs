// Based on the HOG implementation of the Simd Library (http://simd.sourceforge.net).
// See lib.rs for its license.
//! Orientation histograms for any cell size and any even number of bins.
//!
//! Unlike [`crate::orientation`], gradients are compared against every direction of a half turn
//! and its opposite, so no sign folding is needed. Every pixel is binned straight into the cell
//! grid, one row at a time.
use itertools::{izip, Itertools};
use ndarray::Array3;

use crate::GrayView;

/// Unit vectors of `quantization / 2` directions spaced evenly over half a turn.
#[derive(Debug, Clone)]
pub struct Sectors {
    cos: Vec<f32>,
    sin: Vec<f32>,
}

impl Sectors {
    /// # Panics
    ///
    /// If `quantization` is zero or odd.
    pub fn new(quantization: usize) -> Self {
        assert!(
            quantization > 0 && quantization % 2 == 0,
            "quantization must be a positive even number, got {quantization}"
        );
        let half = quantization / 2;
        let (cos, sin) = (0..half)
            .map(|i| {
                let angle = i as f64 * std::f64::consts::PI / half as f64;
                (angle.cos() as f32, angle.sin() as f32)
            })
            .unzip();
        Sectors { cos, sin }
    }

    /// Number of bins over a full turn.
    pub fn quantization(&self) -> usize {
        2 * self.cos.len()
    }

    /// Bin in `[0, quantization)` and magnitude of the gradient `(dx, dy)`. Bin `i` points at
    /// `i * 360° / quantization`, a zero gradient lands in bin 0.
    pub fn quantize(&self, dx: f32, dy: f32) -> (usize, f32) {
        let half = self.cos.len();
        let mut best_dot = 0.;
        let mut best = 0;
        for (i, (c, s)) in izip!(&self.cos, &self.sin).enumerate() {
            let dot = dx.mul_add(*c, dy * s);
            if dot > best_dot {
                best_dot = dot;
                best = i;
            }
            if -dot > best_dot {
                best_dot = -dot;
                best = half + i;
            }
        }
        (best, dx.mul_add(dx, dy * dy).sqrt())
    }
}

/// The two cells along one axis a pixel contributes to, with their weights.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Split {
    /// Cell before the pixel's position in cell units, -1 left of the first cell centre.
    lower: isize,
    /// Weights of `lower` and `lower + 1`.
    weights: [f32; 2],
}

impl Split {
    fn new(coord: usize, cell: usize) -> Self {
        // position relative to the first cell centre, in cells
        let pos = (coord as f32 + 0.5) / cell as f32 - 0.5;
        let lower = pos.floor();
        let upper_weight = pos - lower;
        Split {
            lower: lower as isize,
            weights: [1. - upper_weight, upper_weight],
        }
    }

    /// Cells inside `0..n` with their weights.
    fn cells(&self, n: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        [self.lower, self.lower + 1]
            .into_iter()
            .zip(self.weights)
            .filter_map(move |(c, w)| usize::try_from(c).ok().filter(|c| *c < n).map(|c| (c, w)))
    }
}

/// Histograms of shape `(cells_y, cells_x, quantization)` over the cells of `img`.
///
/// Interior pixels are weighted bilinearly between the centres of the four cells around them.
/// Weight that would land outside the grid is dropped.
pub fn direction_histograms(img: &GrayView, sectors: &Sectors) -> Array3<f32> {
    let (width, height) = (img.width(), img.height());
    let (cell_x, cell_y) = img.cell_size();
    let (cells_x, cells_y) = img.cells();
    let mut hist = Array3::zeros((cells_y, cells_x, sectors.quantization()));

    let columns = (0..width).map(|x| Split::new(x, cell_x)).collect_vec();
    let mut bins = vec![0usize; width];
    let mut magnitudes = vec![0f32; width];
    for y in 1..height - 1 {
        let (above, row, below) = (img.row(y - 1), img.row(y), img.row(y + 1));
        for x in 1..width - 1 {
            let dx = row[x + 1] as f32 - row[x - 1] as f32;
            let dy = below[x] as f32 - above[x] as f32;
            (bins[x], magnitudes[x]) = sectors.quantize(dx, dy);
        }

        let split_y = Split::new(y, cell_y);
        for x in 1..width - 1 {
            for (cy, ky) in split_y.cells(cells_y) {
                for (cx, kx) in columns[x].cells(cells_x) {
                    hist[(cy, cx, bins[x])] += magnitudes[x] * (ky * kx);
                }
            }
        }
    }
    hist
}
