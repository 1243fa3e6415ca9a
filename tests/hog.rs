mod common;

use common::{init_logging, max_abs_diff, noise};
use hog_features::{
    cell_histograms, extract_features, hog, hog_with_kernel, orientation::quantize, AutoKernel,
    GrayView, HogOptions, NormPadding, ScalarKernel, DESCRIPTOR_SIZE, N_BINS_SIGNED,
    N_BINS_UNSIGNED,
};
use image::{GrayImage, Luma};
use imageproc::{drawing::draw_filled_rect_mut, rect::Rect};
use ndarray::{s, Axis};

fn view(img: &GrayImage) -> GrayView {
    GrayView::try_from(img).unwrap()
}

/// Sum of gradient magnitudes over all interior pixels.
fn interior_magnitude(img: &GrayImage) -> f32 {
    let (_, mags) = common::gradients(img);
    mags.sum()
}

#[test]
fn flat_image_has_zero_descriptor() {
    init_logging();
    let buf = vec![128u8; 16 * 16];
    let features = extract_features(&buf, 16, 16, 16);
    assert_eq!(features.dim(), (2, 2, DESCRIPTOR_SIZE));
    assert!(features.iter().all(|v| *v == 0.));
}

#[test]
fn bright_centre_column() {
    init_logging();
    let img = GrayImage::from_fn(24, 24, |x, _| Luma([if x == 12 { 255 } else { 0 }]));
    let hist = cell_histograms::<ScalarKernel>(view(&img));
    assert_eq!(hist.dim(), (3, 3, N_BINS_SIGNED));

    for ((_, _, bin), v) in hist.indexed_iter() {
        if bin != 0 && bin != N_BINS_UNSIGNED {
            assert_eq!(*v, 0., "bin {bin}");
        }
    }

    // Rows 1..=3 and 20..=22 lose part of their weight to cells outside the grid.
    let rows: f32 = 22. - 2. * (5. + 3. + 1.) / 16.;
    let per_column = |bin: usize| {
        hist.slice(s![.., .., bin])
            .sum_axis(Axis(0))
            .to_vec()
    };
    let close = |a: f32, b: f32| (a - b).abs() < 1e-2;

    // x = 11 sees the rising edge, 1/16 of it lands in cell column 0
    let rising = per_column(0);
    assert!(close(rising[0], 255. * rows / 16.), "{rising:?}");
    assert!(close(rising[1], 255. * rows * 15. / 16.), "{rising:?}");
    assert_eq!(rising[2], 0.);

    // x = 13 sees the falling edge
    let falling = per_column(N_BINS_UNSIGNED);
    assert_eq!(falling[0], 0.);
    assert!(close(falling[1], 255. * rows * 13. / 16.), "{falling:?}");
    assert!(close(falling[2], 255. * rows * 3. / 16.), "{falling:?}");

    let features = hog(&img).unwrap();
    for cell in features.lanes(Axis(2)) {
        for (c, v) in cell.iter().enumerate() {
            let expected_zero = c < N_BINS_SIGNED + N_BINS_UNSIGNED
                && c != 0
                && c != N_BINS_UNSIGNED
                && c != N_BINS_SIGNED;
            if expected_zero {
                assert_eq!(*v, 0., "channel {c}");
            }
        }
    }
    assert!(features[(1, 1, 0)] > 0.);
    assert!(features[(1, 1, N_BINS_UNSIGNED)] > 0.);
}

#[test]
fn deterministic() {
    init_logging();
    let img = noise(64, 48, 7);
    let a = hog(&img).unwrap();
    let b = hog(&img).unwrap();
    assert_eq!(a, b);
}

#[test]
fn stride_does_not_matter() {
    init_logging();
    let img = noise(40, 32, 3);
    let (w, h) = (40, 32);
    let stride = w + 13;
    let mut padded = vec![0xa5u8; stride * h];
    for (y, row) in img.rows().enumerate() {
        for (x, px) in row.enumerate() {
            padded[y * stride + x] = px.0[0];
        }
    }
    let strided = GrayView::new(&padded, stride, w, h).unwrap();
    assert_eq!(strided.stride(), stride);
    assert_eq!(
        extract_features(&padded, stride, w, h),
        hog(&img).unwrap()
    );
    assert_eq!(
        cell_histograms::<ScalarKernel>(strided),
        cell_histograms::<ScalarKernel>(view(&img))
    );
}

#[test]
fn kernels_agree() {
    init_logging();
    for (w, h, seed) in [(16, 16, 1), (24, 40, 2), (72, 24, 3), (640, 48, 4)] {
        let img = noise(w, h, seed);
        let v = view(&img);
        assert_eq!(
            cell_histograms::<ScalarKernel>(v),
            cell_histograms::<AutoKernel>(v)
        );
        for norm_padding in [NormPadding::Zero, NormPadding::Reference] {
            let options = HogOptions { norm_padding };
            assert_eq!(
                hog_with_kernel::<ScalarKernel>(v, &options),
                hog_with_kernel::<AutoKernel>(v, &options)
            );
        }
    }
}

#[test]
fn mass_is_conserved_away_from_the_border() {
    init_logging();
    let mut img = GrayImage::from_pixel(32, 32, Luma([30]));
    draw_filled_rect_mut(&mut img, Rect::at(12, 12).of_size(8, 8), Luma([200]));
    let mass = interior_magnitude(&img);
    assert!(mass > 0.);
    let hist = cell_histograms::<AutoKernel>(view(&img));
    assert!(
        (hist.sum() - mass).abs() <= mass * 1e-5,
        "{} != {mass}",
        hist.sum()
    );
}

#[test]
fn mass_is_bounded_near_the_border() {
    init_logging();
    let img = noise(48, 32, 11);
    let mass = interior_magnitude(&img);
    let hist = cell_histograms::<AutoKernel>(view(&img));
    assert!(hist.iter().all(|v| *v >= 0.));
    assert!(hist.sum() < mass);
}

#[test]
fn channels_are_bounded() {
    init_logging();
    let img = noise(96, 64, 5);
    for norm_padding in [NormPadding::Zero, NormPadding::Reference] {
        let features = hog_with_kernel::<AutoKernel>(view(&img), &HogOptions { norm_padding });
        for cell in features.lanes(Axis(2)) {
            let (hist, texture) = cell
                .as_slice()
                .unwrap()
                .split_at(N_BINS_SIGNED + N_BINS_UNSIGNED);
            assert!(hist.iter().all(|v| v.is_finite() && (0. ..=0.4).contains(v)));
            assert!(texture
                .iter()
                .all(|v| v.is_finite() && (0. ..=0.2357 * 18. * 0.2).contains(v)));
        }
    }
}

#[test]
fn opposite_gradients_are_nine_bins_apart() {
    let pairs = [(5., 0.), (0., 5.), (3., 4.), (-7., 2.), (1., -9.)];
    for (dx, dy) in pairs {
        let (a, _) = quantize(dx, dy);
        let (b, _) = quantize(-dx, -dy);
        assert_eq!((a + N_BINS_UNSIGNED) % N_BINS_SIGNED, b);
    }
}

#[test]
fn matches_buffered_reference() {
    init_logging();
    let mut shapes = noise(64, 56, 21);
    draw_filled_rect_mut(&mut shapes, Rect::at(5, 9).of_size(30, 17), Luma([255]));
    draw_filled_rect_mut(&mut shapes, Rect::at(40, 30).of_size(9, 20), Luma([0]));
    let diagonal = GrayImage::from_fn(16, 16, |x, y| Luma([if x > y { 200 } else { 20 }]));
    for img in [noise(48, 40, 9), noise(16, 32, 10), shapes, diagonal] {
        let v = view(&img);
        let expected_hist = common::cell_histograms(&img);
        let hist = cell_histograms::<AutoKernel>(v);
        let scale = expected_hist.iter().fold(1f32, |m, v| m.max(*v));
        assert!(
            max_abs_diff(&hist, &expected_hist) <= scale * 1e-5,
            "histograms differ by {}",
            max_abs_diff(&hist, &expected_hist)
        );

        for norm_padding in [NormPadding::Zero, NormPadding::Reference] {
            let expected = common::descriptor(&expected_hist, norm_padding);
            let features = hog_with_kernel::<AutoKernel>(v, &HogOptions { norm_padding });
            let diff = max_abs_diff(&features, &expected);
            assert!(diff <= 1e-4, "{norm_padding:?}: descriptors differ by {diff}");
        }
    }
}

#[test]
fn padding_policies_differ_only_away_from_the_origin() {
    init_logging();
    let img = noise(40, 40, 13);
    let v = view(&img);
    let zero = hog_with_kernel::<ScalarKernel>(v, &HogOptions::default());
    let reference = hog_with_kernel::<ScalarKernel>(
        v,
        &HogOptions {
            norm_padding: NormPadding::Reference,
        },
    );
    // Cell (0, 0) never reaches row or column 0 through a -1 offset.
    assert_eq!(zero.slice(s![0usize, 0usize, ..]), reference.slice(s![0usize, 0usize, ..]));
    // Cells two rows and columns away from the origin do not either.
    assert_eq!(
        zero.slice(s![2usize.., 2usize.., ..]),
        reference.slice(s![2usize.., 2usize.., ..])
    );
    assert_ne!(zero, reference);
}

#[test]
fn rejects_unsupported_images() {
    assert!(hog(&GrayImage::new(30, 16)).is_err());
    assert!(hog(&GrayImage::new(8, 8)).is_err());
    assert!(hog(&GrayImage::new(16, 16)).is_ok());
}
