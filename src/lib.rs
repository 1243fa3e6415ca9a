// This implementation of HOG features is derived from works by Yermalayeu Ihar (Simd Library).
// It is made available under the terms of the MIT license reproduced below.
//
// Simd Library (http://simd.sourceforge.net).
//
// Copyright (c) 2011-2017 Yermalayeu Ihar.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! This crate computes dense HOG features: the 31-channel variant introduced by Felzenszwalb et
//! al. for deformable part models (often called FHOG or UOCTTI HOG).
//! It aims to be compatible with the HOG features of the SIMD library, so detectors trained on
//! those features can be run on the output of this crate.
//!
//! For every 8x8 pixel cell the descriptor holds 18 contrast-sensitive and 9 contrast-insensitive
//! orientation channels and 4 texture channels, see [`normalize`].
//!
//! Useful resources:
//! - [1]: [Dalal 2005](https://lear.inrialpes.fr/people/triggs/pubs/Dalal-cvpr05.pdf)
//! - [2]: [Felzenszwalb 2010](https://cs.brown.edu/people/pfelzens/papers/lsvm-pami.pdf)
//!
//! The implementation never stores gradients of more than one image row. Pixels are binned into
//! a window of partial histograms that is merged into the cell grid every 8 rows, so memory use
//! apart from the output only depends on the image width.
//!
//! [`direction_histograms`] computes the undescribed orientation histograms for other cell sizes
//! and bin counts.

use image::GrayImage;
use ndarray::{Array3, ArrayViewMut3};
use static_assertions::const_assert_eq;

pub mod binning;
pub mod direction;
mod error;
pub mod grid;
pub mod normalize;
pub mod orientation;
mod view;
pub mod window;

pub use error::HogError;
pub use normalize::NormPadding;
pub use orientation::{AutoKernel, GradientKernel, ScalarKernel};
pub use view::GrayView;

use grid::CellHistograms;
use window::RowWindow;

/// Side length of a cell in pixels.
pub const CELL_SIZE: usize = 8;
/// Smallest supported width and height, a 2x2 block of cells.
pub const MIN_IMAGE_SIZE: usize = 2 * CELL_SIZE;
/// Contrast-insensitive orientation bins covering 180°.
pub const N_BINS_UNSIGNED: usize = 9;
/// Contrast-sensitive orientation bins covering 360°.
pub const N_BINS_SIGNED: usize = 2 * N_BINS_UNSIGNED;
/// Texture channels, one per normalization block.
pub const N_TEXTURE: usize = 4;
/// Channels per cell in the final descriptor.
pub const DESCRIPTOR_SIZE: usize = N_BINS_SIGNED + N_BINS_UNSIGNED + N_TEXTURE;

const_assert_eq!(DESCRIPTOR_SIZE, 31);
const_assert_eq!(CELL_SIZE, orientation::BATCH_WIDTH);

/// Window row whose pixels have all been seen once row `y` was added, if any.
///
/// Window row `r` covers pixel rows `8r - 4 .. 8r + 4`.
#[inline]
fn completed_window_row(y: usize, height: usize) -> Option<usize> {
    if y & (CELL_SIZE - 1) == CELL_SIZE / 2 - 1 || y == height - 2 {
        Some((y + CELL_SIZE / 2) / CELL_SIZE)
    } else {
        None
    }
}

/// Options of the descriptor stage. Serializable with the `serde` feature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct HogOptions {
    /// How cells outside the grid enter the normalization of border cells.
    pub norm_padding: NormPadding,
}

/// Compute HOG features with default options, picking the fastest kernel the CPU supports.
///
/// Returns an array of shape `(height / 8, width / 8, 31)`.
pub fn hog(img: &GrayImage) -> Result<Array3<f32>, HogError> {
    let view = GrayView::try_from(img)?;
    Ok(hog_with_kernel::<AutoKernel>(view, &HogOptions::default()))
}

/// Compute HOG features of raw 8-bit pixels with row stride `stride`.
///
/// # Panics
///
/// If `width` or `height` is not a multiple of 8 or smaller than 16, if `stride < width` or if
/// `src` is too short to hold `height` rows.
pub fn extract_features(src: &[u8], stride: usize, width: usize, height: usize) -> Array3<f32> {
    let view = match GrayView::new(src, stride, width, height) {
        Ok(view) => view,
        Err(err) => panic!("invalid image: {err}"),
    };
    hog_with_kernel::<AutoKernel>(view, &HogOptions::default())
}

/// Compute HOG features using the gradient kernel `K`.
/// For testing and benchmarking, it's useful to pick the kernel explicitly.
///
/// # Panics
///
/// If `img` does not use 8x8 cells.
pub fn hog_with_kernel<K: GradientKernel>(img: GrayView, options: &HogOptions) -> Array3<f32> {
    let (cells_x, cells_y) = img.cells();
    let mut out = Array3::zeros((cells_y, cells_x, DESCRIPTOR_SIZE));
    describe::<K>(img, options, out.view_mut());
    out
}

/// Like [`hog_with_kernel`], writing into a caller-owned row-major buffer.
///
/// # Panics
///
/// If `img` does not use 8x8 cells or `out.len()` is not exactly `cells_y * cells_x * 31`.
pub fn hog_into<K: GradientKernel>(img: GrayView, options: &HogOptions, out: &mut [f32]) {
    assert_descriptor_cells(&img);
    let (cells_x, cells_y) = img.cells();
    let required = cells_y * cells_x * DESCRIPTOR_SIZE;
    assert_eq!(
        out.len(),
        required,
        "output buffer holds {} floats, {required} are required",
        out.len()
    );
    match ArrayViewMut3::from_shape((cells_y, cells_x, DESCRIPTOR_SIZE), out) {
        Ok(out) => describe::<K>(img, options, out),
        Err(err) => panic!("output buffer does not match the cell grid: {err}"),
    }
}

/// Per-cell orientation histograms before normalization, shape `(height / 8, width / 8, 18)`.
///
/// # Panics
///
/// If `img` does not use 8x8 cells.
pub fn cell_histograms<K: GradientKernel>(img: GrayView) -> Array3<f32> {
    accumulate::<K>(img).into_inner()
}

/// Orientation histograms with `quantization` contrast-sensitive bins over the cells of `img`,
/// see [`GrayView::with_cell_size`]. Returns an array of shape `(cells_y, cells_x, quantization)`.
///
/// 8x8 cells with 18 bins are computed like [`cell_histograms`]. Any other combination takes a
/// scalar path that bins every pixel straight into the grid, see [`direction`].
pub fn direction_histograms(img: GrayView, quantization: usize) -> Result<Array3<f32>, HogError> {
    if quantization == 0 || quantization % 2 != 0 {
        return Err(HogError::InvalidQuantization(quantization));
    }
    if img.cell_size() == (CELL_SIZE, CELL_SIZE) && quantization == N_BINS_SIGNED {
        return Ok(cell_histograms::<AutoKernel>(img));
    }
    let (cell_x, cell_y) = img.cell_size();
    log::debug!(
        "Computing {} bin direction histograms of {}x{} image, {}x{} cells",
        quantization,
        img.width(),
        img.height(),
        cell_x,
        cell_y
    );
    let sectors = direction::Sectors::new(quantization);
    Ok(direction::direction_histograms(&img, &sectors))
}

fn assert_descriptor_cells(img: &GrayView) {
    assert_eq!(
        img.cell_size(),
        (CELL_SIZE, CELL_SIZE),
        "HOG descriptors are computed over 8x8 cells"
    );
}

fn describe<K: GradientKernel>(img: GrayView, options: &HogOptions, mut out: ArrayViewMut3<f32>) {
    let (cells_x, cells_y) = img.cells();
    log::debug!(
        "Extracting HOG features of {}x{} image, {}x{} cells, {} kernel",
        img.width(),
        img.height(),
        cells_x,
        cells_y,
        K::NAME
    );
    let grid = accumulate::<K>(img);
    let hist = grid.histograms();
    let energy = normalize::cell_energy(&hist);
    normalize::block_normalize(&hist, &energy.view(), options.norm_padding, &mut out);
}

fn accumulate<K: GradientKernel>(img: GrayView) -> CellHistograms {
    assert_descriptor_cells(&img);
    log::trace!("Quantizing gradients with {}", K::code_path());
    let (cells_x, cells_y) = img.cells();
    let height = img.height();
    let mut grid = CellHistograms::new(cells_x, cells_y);
    let mut window = RowWindow::new(img.width());
    for y in 1..height - 1 {
        window.add_row::<K>(&img, y);
        if let Some(window_row) = completed_window_row(y, height) {
            window.flush_into(&mut grid, window_row);
        }
    }
    grid
}
