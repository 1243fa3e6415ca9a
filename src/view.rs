use image::GrayImage;
use ndarray::ArrayView2;
use nshare::AsNdarray2;

use crate::{HogError, CELL_SIZE};

/// Borrowed 8-bit grayscale image with an arbitrary row stride, split into cells.
///
/// A `GrayView` can only be constructed for images histograms can be computed on: width and
/// height are multiples of the cell size, span at least 2x2 cells and the buffer covers every
/// row. [`GrayView::new`] uses the 8x8 cells of the HOG descriptor.
#[derive(Debug, Clone, Copy)]
pub struct GrayView<'a> {
    data: &'a [u8],
    stride: usize,
    width: usize,
    height: usize,
    cell_x: usize,
    cell_y: usize,
}

impl<'a> GrayView<'a> {
    pub fn new(
        data: &'a [u8],
        stride: usize,
        width: usize,
        height: usize,
    ) -> Result<Self, HogError> {
        Self::with_cell_size(data, stride, width, height, CELL_SIZE, CELL_SIZE)
    }

    /// Like [`GrayView::new`] with cells of `cell_x` by `cell_y` pixels.
    pub fn with_cell_size(
        data: &'a [u8],
        stride: usize,
        width: usize,
        height: usize,
        cell_x: usize,
        cell_y: usize,
    ) -> Result<Self, HogError> {
        if cell_x == 0 || cell_y == 0 {
            return Err(HogError::EmptyCell { cell_x, cell_y });
        }
        if width % cell_x != 0 || height % cell_y != 0 {
            return Err(HogError::NotCellAligned {
                width,
                height,
                cell_x,
                cell_y,
            });
        }
        if width < 2 * cell_x || height < 2 * cell_y {
            return Err(HogError::TooSmall {
                width,
                height,
                min_width: 2 * cell_x,
                min_height: 2 * cell_y,
            });
        }
        if stride < width {
            return Err(HogError::StrideTooSmall { stride, width });
        }
        // The last row does not need to be padded out to the full stride.
        let required = stride * (height - 1) + width;
        if data.len() < required {
            return Err(HogError::BufferTooShort {
                len: data.len(),
                required,
            });
        }
        Ok(GrayView {
            data,
            stride,
            width,
            height,
            cell_x,
            cell_y,
        })
    }

    /// View over a 2D array of shape `(height, width)` in standard layout, with 8x8 cells.
    pub fn from_ndarray(arr: ArrayView2<'a, u8>) -> Result<Self, HogError> {
        let (height, width) = arr.dim();
        let data = arr.to_slice().ok_or(HogError::NonContiguousRows)?;
        Self::new(data, width, width, height)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Cell width and height in pixels.
    pub fn cell_size(&self) -> (usize, usize) {
        (self.cell_x, self.cell_y)
    }

    /// Number of cells along x and y.
    pub fn cells(&self) -> (usize, usize) {
        (self.width / self.cell_x, self.height / self.cell_y)
    }

    #[inline]
    pub fn row(&self, y: usize) -> &'a [u8] {
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }
}

impl<'a> TryFrom<&'a GrayImage> for GrayView<'a> {
    type Error = HogError;

    fn try_from(img: &'a GrayImage) -> Result<Self, Self::Error> {
        GrayView::from_ndarray(img.as_ndarray2())
    }
}
