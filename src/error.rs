/// Reasons an image can not be used for HOG extraction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HogError {
    #[error("image dimensions {width}x{height} are not multiples of the {cell_x}x{cell_y} cell size")]
    NotCellAligned {
        width: usize,
        height: usize,
        cell_x: usize,
        cell_y: usize,
    },

    #[error("image dimensions {width}x{height} are smaller than {min_width}x{min_height}")]
    TooSmall {
        width: usize,
        height: usize,
        min_width: usize,
        min_height: usize,
    },

    #[error("cell size {cell_x}x{cell_y} is empty")]
    EmptyCell { cell_x: usize, cell_y: usize },

    #[error("quantization {0} is not a positive even number of bins")]
    InvalidQuantization(usize),

    #[error("row stride {stride} is smaller than image width {width}")]
    StrideTooSmall { stride: usize, width: usize },

    #[error("pixel buffer holds {len} bytes but {required} are required")]
    BufferTooShort { len: usize, required: usize },

    #[error("image rows are not contiguous in memory")]
    NonContiguousRows,
}
