// Based on the HOG implementation of the Simd Library (http://simd.sourceforge.net).
// See lib.rs for its license.
//! Block normalization and assembly of the 31-channel descriptor.
//!
//! Each cell histogram is normalized four times, once against the energy of every 2x2 block of
//! cells containing it, and the four clamped results are averaged. The descriptor of a cell is
//!
//! - 18 contrast-sensitive channels,
//! - 9 contrast-insensitive channels (opposite orientations summed),
//! - 4 texture channels, the summed clamped responses per normalization block.
use itertools::izip;
use ndarray::{Array2, ArrayView2, ArrayView3, ArrayViewMut3, Axis, Zip};

use crate::{DESCRIPTOR_SIZE, N_BINS_SIGNED, N_BINS_UNSIGNED};

/// Added to block energies before taking the inverse square root.
pub const NORM_EPSILON: f32 = 1e-4;
/// Upper bound of every normalized histogram value.
pub const CLAMP: f32 = 0.2;
/// Weight of each of the four normalized values in a channel.
const AVERAGE_WEIGHT: f32 = 0.5;
/// Scale of the texture channels.
pub const TEXTURE_SCALE: f32 = 0.2357;

/// How energies of cells outside the grid are treated when normalizing border cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum NormPadding {
    /// Cells outside the grid have zero energy.
    #[default]
    Zero,
    /// Like `Zero`, and additionally treats the first cell row and column as zero energy when
    /// they are reached as the upper/left neighbour of another cell. This is what detectors
    /// trained on the SIMD library's HOG features expect.
    Reference,
}

/// Energy of every cell: squared L2 norm of its contrast-insensitive histogram.
pub fn cell_energy(hist: &ArrayView3<f32>) -> Array2<f32> {
    assert_eq!(hist.dim().2, N_BINS_SIGNED);
    let mut energy = Array2::zeros((hist.dim().0, hist.dim().1));
    Zip::from(&mut energy)
        .and(hist.lanes(Axis(2)))
        .for_each(|e, h| {
            for o in 0..N_BINS_UNSIGNED {
                let v = h[o] + h[o + N_BINS_UNSIGNED];
                *e += v * v;
            }
        });
    energy
}

/// Energy of the cell at `(y + dy, x + dx)` or 0 if the padding policy excludes it.
#[inline]
fn neighbour(
    energy: &ArrayView2<f32>,
    y: usize,
    x: usize,
    dy: isize,
    dx: isize,
    padding: NormPadding,
) -> f32 {
    let (rows, cols) = energy.dim();
    let first = match padding {
        NormPadding::Zero => 0,
        NormPadding::Reference => 1,
    };
    let inside = |c: usize, d: isize, n: usize| match d {
        0 => true,
        -1 => c >= first + 1,
        _ => c + 1 < n,
    };
    if inside(y, dy, rows) && inside(x, dx, cols) {
        energy[(
            (y as isize + dy) as usize,
            (x as isize + dx) as usize,
        )]
    } else {
        0.
    }
}

/// Inverse block norms of the four 2x2 blocks containing cell `(y, x)`: bottom right, top
/// right, bottom left, top left.
fn block_norms(energy: &ArrayView2<f32>, y: usize, x: usize, padding: NormPadding) -> [f32; 4] {
    let e = |dy, dx| neighbour(energy, y, x, dy, dx, padding);
    let inv = |sum: f32| 1. / (sum + NORM_EPSILON).sqrt();
    [
        inv(e(0, 0) + e(0, 1) + e(1, 0) + e(1, 1)),
        inv(e(-1, 0) + e(-1, 1) + e(0, 0) + e(0, 1)),
        inv(e(0, -1) + e(0, 0) + e(1, -1) + e(1, 0)),
        inv(e(-1, -1) + e(-1, 0) + e(0, -1) + e(0, 0)),
    ]
}

/// Clamped responses of `value` to the four block norms.
#[inline(always)]
fn clamped(value: f32, norms: &[f32; 4]) -> [f32; 4] {
    norms.map(|n| (value * n).min(CLAMP))
}

/// Writes the descriptor of every cell into `out`, shape `(cells_y, cells_x, 31)`.
pub fn block_normalize(
    hist: &ArrayView3<f32>,
    energy: &ArrayView2<f32>,
    padding: NormPadding,
    out: &mut ArrayViewMut3<f32>,
) {
    let (cells_y, cells_x, n_bins) = hist.dim();
    assert_eq!(n_bins, N_BINS_SIGNED);
    assert_eq!(energy.dim(), (cells_y, cells_x));
    assert_eq!(out.dim(), (cells_y, cells_x, DESCRIPTOR_SIZE));

    for y in 0..cells_y {
        for x in 0..cells_x {
            let norms = block_norms(energy, y, x, padding);
            let h = hist.slice(ndarray::s![y, x, ..]);
            let mut dst = out.slice_mut(ndarray::s![y, x, ..]);
            let mut texture = [0f32; 4];

            for (o, &value) in h.iter().enumerate() {
                let [h1, h2, h3, h4] = clamped(value, &norms);
                dst[o] = AVERAGE_WEIGHT * (h1 + h2 + h3 + h4);
                for (t, v) in izip!(texture.iter_mut(), [h1, h2, h3, h4]) {
                    *t += v;
                }
            }
            for o in 0..N_BINS_UNSIGNED {
                let [h1, h2, h3, h4] = clamped(h[o] + h[o + N_BINS_UNSIGNED], &norms);
                dst[N_BINS_SIGNED + o] = AVERAGE_WEIGHT * (h1 + h2 + h3 + h4);
            }
            for (k, t) in texture.iter().enumerate() {
                dst[N_BINS_SIGNED + N_BINS_UNSIGNED + k] = TEXTURE_SCALE * t;
            }
        }
    }
}
