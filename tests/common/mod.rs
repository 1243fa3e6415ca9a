//! Straightforward HOG implementation that quantizes the whole image up front and then bins
//! every pixel directly into the cell grid. Slow, but easy to check against the definitions.
#![allow(dead_code)]

use hog_features::{
    orientation::quantize, NormPadding, CELL_SIZE, DESCRIPTOR_SIZE, N_BINS_SIGNED,
    N_BINS_UNSIGNED,
};
use image::GrayImage;
use ndarray::{Array2, Array3};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Deterministic pseudo-random pixels.
pub fn noise(width: u32, height: u32, seed: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let mut h = x.wrapping_mul(0x9e37_79b9) ^ y.wrapping_mul(0x85eb_ca6b) ^ seed;
        h ^= h >> 15;
        h = h.wrapping_mul(0x2c1b_3c6d);
        h ^= h >> 12;
        image::Luma([(h & 0xff) as u8])
    })
}

/// Orientation bins and magnitudes of every pixel, zero on the border.
pub fn gradients(img: &GrayImage) -> (Array2<usize>, Array2<f32>) {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let px = |x: usize, y: usize| img.get_pixel(x as u32, y as u32).0[0] as f32;
    let mut bins = Array2::zeros((h, w));
    let mut mags = Array2::zeros((h, w));
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let (bin, mag) = quantize(px(x + 1, y) - px(x - 1, y), px(x, y + 1) - px(x, y - 1));
            bins[(y, x)] = bin;
            mags[(y, x)] = mag;
        }
    }
    (bins, mags)
}

/// Cell index below and weight of it for a pixel coordinate. The cell above gets `1 - weight`.
fn split(coord: usize) -> (isize, f32) {
    // distance to the centre of the cell to the left/above, in pixels
    let pos = coord as f32 + 0.5 - CELL_SIZE as f32 / 2.;
    let cell = (pos / CELL_SIZE as f32).floor();
    let frac = pos / CELL_SIZE as f32 - cell;
    (cell as isize, 1. - frac)
}

pub fn cell_histograms(img: &GrayImage) -> Array3<f32> {
    let (bins, mags) = gradients(img);
    let (h, w) = mags.dim();
    let (cells_y, cells_x) = ((h / CELL_SIZE) as isize, (w / CELL_SIZE) as isize);
    let mut hist = Array3::zeros((cells_y as usize, cells_x as usize, N_BINS_SIGNED));
    for y in 1..h - 1 {
        let (cy, wy) = split(y);
        for x in 1..w - 1 {
            let (cx, wx) = split(x);
            for (dy, ky) in [(0, wy), (1, 1. - wy)] {
                for (dx, kx) in [(0, wx), (1, 1. - wx)] {
                    let (r, c) = (cy + dy, cx + dx);
                    if (0..cells_y).contains(&r) && (0..cells_x).contains(&c) {
                        hist[(r as usize, c as usize, bins[(y, x)])] += mags[(y, x)] * ky * kx;
                    }
                }
            }
        }
    }
    hist
}

pub fn descriptor(hist: &Array3<f32>, padding: NormPadding) -> Array3<f32> {
    let (cells_y, cells_x, _) = hist.dim();
    let energy = Array2::from_shape_fn((cells_y, cells_x), |(y, x)| {
        (0..N_BINS_UNSIGNED)
            .map(|o| (hist[(y, x, o)] + hist[(y, x, o + N_BINS_UNSIGNED)]).powi(2))
            .sum::<f32>()
    });
    let first = match padding {
        NormPadding::Zero => 0,
        NormPadding::Reference => 1,
    };
    let e = |y: usize, x: usize, dy: isize, dx: isize| {
        let (ny, nx) = (y as isize + dy, x as isize + dx);
        let valid = |n: isize, d: isize, len: usize| match d {
            0 => true,
            d if d < 0 => n >= first,
            _ => n < len as isize,
        };
        if valid(ny, dy, cells_y) && valid(nx, dx, cells_x) {
            energy[(ny as usize, nx as usize)]
        } else {
            0.
        }
    };

    let mut out = Array3::zeros((cells_y, cells_x, DESCRIPTOR_SIZE));
    for y in 0..cells_y {
        for x in 0..cells_x {
            let block = |dy: isize, dx: isize| {
                let sum = e(y, x, dy, dx) + e(y, x, dy, dx + 1) + e(y, x, dy + 1, dx)
                    + e(y, x, dy + 1, dx + 1);
                1. / (sum + 1e-4).sqrt()
            };
            let norms = [block(0, 0), block(-1, 0), block(0, -1), block(-1, -1)];
            let respond = |v: f32| norms.map(|n| (v * n).min(0.2));
            for o in 0..N_BINS_SIGNED {
                let r = respond(hist[(y, x, o)]);
                out[(y, x, o)] = 0.5 * r.iter().sum::<f32>();
                for k in 0..4 {
                    out[(y, x, 27 + k)] += 0.2357 * r[k];
                }
            }
            for o in 0..N_BINS_UNSIGNED {
                let r = respond(hist[(y, x, o)] + hist[(y, x, o + N_BINS_UNSIGNED)]);
                out[(y, x, N_BINS_SIGNED + o)] = 0.5 * r.iter().sum::<f32>();
            }
        }
    }
    out
}

pub fn max_abs_diff(a: &Array3<f32>, b: &Array3<f32>) -> f32 {
    assert_eq!(a.dim(), b.dim());
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0., f32::max)
}
