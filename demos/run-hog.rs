//! Compute HOG features of an image and print a summary.
//! The image is cropped to a multiple of 8 pixels in both directions.

use hog_features::{GrayView, HogOptions, NormPadding, DESCRIPTOR_SIZE};
use image::{imageops, GrayImage};

fn crop_to_cells(img: &GrayImage) -> GrayImage {
    let cell = hog_features::CELL_SIZE as u32;
    let (w, h) = (img.width() / cell * cell, img.height() / cell * cell);
    imageops::crop_imm(img, 0, 0, w, h).to_image()
}

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();
    let Some(path) = args.get(1) else {
        eprintln!("Usage: run-hog IMAGE [reference]");
        return;
    };
    let norm_padding = match args.get(2).map(String::as_str) {
        Some("reference") => NormPadding::Reference,
        _ => NormPadding::Zero,
    };
    let img = match image::open(path) {
        Ok(img) => crop_to_cells(&img.to_luma8()),
        Err(err) => {
            eprintln!("Error opening image '{path}': {err}");
            return;
        }
    };
    let view = match GrayView::try_from(&img) {
        Ok(view) => view,
        Err(err) => {
            eprintln!("Can not compute features: {err}");
            return;
        }
    };

    let features = hog_features::hog_with_kernel::<hog_features::AutoKernel>(
        view,
        &HogOptions { norm_padding },
    );
    let (cells_y, cells_x, _) = features.dim();
    println!("{}x{} cells", cells_x, cells_y);
    let per_cell = match features.into_shape_with_order((cells_y * cells_x, DESCRIPTOR_SIZE)) {
        Ok(per_cell) => per_cell,
        Err(err) => {
            eprintln!("Error: {err}");
            return;
        }
    };
    let Some(means) = per_cell.mean_axis(ndarray::Axis(0)) else {
        return;
    };
    for (c, mean) in means.iter().enumerate() {
        let kind = match c {
            0..=17 => "oriented",
            18..=26 => "unoriented",
            _ => "texture",
        };
        println!("{c:2} {kind:10} {mean:.5}");
    }
}
