// Based on the HOG implementation of the Simd Library (http://simd.sourceforge.net).
// See lib.rs for its license.
//! Gradient orientation quantization.
//!
//! Gradients are assigned to one of [`N_BINS_SIGNED`] contrast-sensitive orientation bins, each
//! spanning 20°. The search only runs over the first quadrant using absolute gradient components
//! and the signs of `dx` and `dy` are folded back in afterwards.
use crate::{N_BINS_SIGNED, N_BINS_UNSIGNED};

/// Number of directions searched in the first quadrant: 0°, 20°, 40°, 60° and 80°.
const N_DIRECTIONS: usize = 5;

/// Lanes per batch in the AVX2 kernel.
pub const BATCH_WIDTH: usize = 8;

/// Unit vectors of the searched directions, rounded from f64.
#[derive(Debug, Clone, Copy)]
struct Directions {
    cos: [f32; N_DIRECTIONS],
    sin: [f32; N_DIRECTIONS],
}

impl Directions {
    fn new() -> Self {
        let mut cos = [0.; N_DIRECTIONS];
        let mut sin = [0.; N_DIRECTIONS];
        for i in 0..N_DIRECTIONS {
            let angle = i as f64 * std::f64::consts::PI / N_BINS_UNSIGNED as f64;
            cos[i] = angle.cos() as f32;
            sin[i] = angle.sin() as f32;
        }
        Directions { cos, sin }
    }
}

/// Quantize the gradient `(dx, dy)` into a contrast-sensitive bin in `[0, 18)` and return it
/// together with the gradient magnitude.
///
/// A zero gradient has magnitude 0 and lands in bin 0.
pub fn quantize(dx: f32, dy: f32) -> (usize, f32) {
    quantize_with(&Directions::new(), dx, dy)
}

#[inline(always)]
fn quantize_with(dirs: &Directions, dx: f32, dy: f32) -> (usize, f32) {
    let adx = dx.abs();
    let ady = dy.abs();
    let mut best_dot = 0.;
    let mut best = 0;
    for i in 0..N_DIRECTIONS {
        // mul_add matches the fused multiply-add of the batched kernel bit for bit
        let dot = adx.mul_add(dirs.cos[i], ady * dirs.sin[i]);
        if dot > best_dot {
            best_dot = dot;
            best = i;
        }
    }
    if dx < 0. {
        best = N_BINS_UNSIGNED - best;
    }
    if dy < 0. {
        // A vertical gradient ties between 80° and 100°, the sign of dy decides.
        let correction = usize::from(adx == 0.);
        best = N_BINS_SIGNED - (best + correction);
    }
    if best == N_BINS_SIGNED {
        best = 0;
    }
    (best, adx.mul_add(adx, ady * ady).sqrt())
}

/// Computes orientation bins and gradient magnitudes of one image row.
///
/// Implementations must agree bit for bit; they only differ in speed. For testing and
/// benchmarking it is useful to pick one explicitly.
pub trait GradientKernel {
    const NAME: &'static str;

    /// Code path rows will actually be processed with.
    fn code_path() -> &'static str {
        Self::NAME
    }

    /// Fills `bins[1..width - 1]` and `magnitudes[1..width - 1]` for the row `row` whose
    /// neighbours are `above` and `below`. `width` is `row.len()`, all slices are at least that
    /// long and `width >= BATCH_WIDTH + 2`. Entries 0 and `width - 1` are left untouched.
    fn quantize_row(
        above: &[u8],
        row: &[u8],
        below: &[u8],
        bins: &mut [u32],
        magnitudes: &mut [f32],
    );
}

/// One pixel at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarKernel;

impl GradientKernel for ScalarKernel {
    const NAME: &'static str = "scalar";

    fn quantize_row(
        above: &[u8],
        row: &[u8],
        below: &[u8],
        bins: &mut [u32],
        magnitudes: &mut [f32],
    ) {
        let width = row.len();
        let dirs = Directions::new();
        for x in 1..width - 1 {
            let dx = row[x + 1] as f32 - row[x - 1] as f32;
            let dy = below[x] as f32 - above[x] as f32;
            let (bin, mag) = quantize_with(&dirs, dx, dy);
            bins[x] = bin as u32;
            magnitudes[x] = mag;
        }
    }
}

/// Uses the AVX2 kernel when the CPU supports it and falls back to [`ScalarKernel`] otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoKernel;

impl AutoKernel {
    /// Whether rows will be processed in batches of [`BATCH_WIDTH`].
    pub fn is_batched() -> bool {
        #[cfg(target_arch = "x86_64")]
        {
            is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma")
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            false
        }
    }
}

impl GradientKernel for AutoKernel {
    const NAME: &'static str = "auto";

    fn code_path() -> &'static str {
        if Self::is_batched() {
            "avx2+fma"
        } else {
            ScalarKernel::NAME
        }
    }

    fn quantize_row(
        above: &[u8],
        row: &[u8],
        below: &[u8],
        bins: &mut [u32],
        magnitudes: &mut [f32],
    ) {
        #[cfg(target_arch = "x86_64")]
        {
            if Self::is_batched() {
                // SAFETY: avx2 and fma were detected
                unsafe { quantize_row_avx2(above, row, below, bins, magnitudes) };
                return;
            }
        }
        ScalarKernel::quantize_row(above, row, below, bins, magnitudes)
    }
}

/// SAFETY: requires avx2 and fma.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2,fma")]
unsafe fn quantize_row_avx2(
    above: &[u8],
    row: &[u8],
    below: &[u8],
    bins: &mut [u32],
    magnitudes: &mut [f32],
) {
    use std::arch::x86_64::*;
    let width = row.len();
    assert!(width >= BATCH_WIDTH + 2);
    assert!(above.len() >= width && below.len() >= width);
    assert!(bins.len() >= width && magnitudes.len() >= width);

    let dirs = Directions::new();
    let mut cos = [_mm256_setzero_ps(); N_DIRECTIONS];
    let mut sin = [_mm256_setzero_ps(); N_DIRECTIONS];
    let mut pos = [_mm256_setzero_si256(); N_DIRECTIONS];
    for i in 0..N_DIRECTIONS {
        cos[i] = _mm256_set1_ps(dirs.cos[i]);
        sin[i] = _mm256_set1_ps(dirs.sin[i]);
        pos[i] = _mm256_set1_epi32(i as i32);
    }
    let zero = _mm256_setzero_ps();
    let sign_bit = _mm256_set1_ps(-0.0);
    let one = _mm256_set1_epi32(1);
    let n_unsigned = _mm256_set1_epi32(N_BINS_UNSIGNED as i32);
    let n_signed = _mm256_set1_epi32(N_BINS_SIGNED as i32);

    // The last batch overlaps the previous one so that it ends exactly at column width - 2.
    let last = width - 1 - BATCH_WIDTH;
    let mut x = 1;
    loop {
        let x0 = x.min(last);
        let left = _mm_loadl_epi64(row[x0 - 1..x0 + 7].as_ptr() as *const __m128i);
        let right = _mm_loadl_epi64(row[x0 + 1..x0 + 9].as_ptr() as *const __m128i);
        let top = _mm_loadl_epi64(above[x0..x0 + 8].as_ptr() as *const __m128i);
        let bottom = _mm_loadl_epi64(below[x0..x0 + 8].as_ptr() as *const __m128i);
        let dx = _mm256_cvtepi32_ps(_mm256_sub_epi32(
            _mm256_cvtepu8_epi32(right),
            _mm256_cvtepu8_epi32(left),
        ));
        let dy = _mm256_cvtepi32_ps(_mm256_sub_epi32(
            _mm256_cvtepu8_epi32(bottom),
            _mm256_cvtepu8_epi32(top),
        ));

        let adx = _mm256_andnot_ps(sign_bit, dx);
        let ady = _mm256_andnot_ps(sign_bit, dy);
        let mut best_dot = zero;
        let mut best = _mm256_setzero_si256();
        for i in 0..N_DIRECTIONS {
            let dot = _mm256_fmadd_ps(adx, cos[i], _mm256_mul_ps(ady, sin[i]));
            let better = _mm256_cmp_ps::<_CMP_GT_OS>(dot, best_dot);
            best_dot = _mm256_max_ps(dot, best_dot);
            best = _mm256_blendv_epi8(best, pos[i], _mm256_castps_si256(better));
        }
        let dx_neg = _mm256_castps_si256(_mm256_cmp_ps::<_CMP_LT_OS>(dx, zero));
        best = _mm256_blendv_epi8(best, _mm256_sub_epi32(n_unsigned, best), dx_neg);

        let dy_neg = _mm256_castps_si256(_mm256_cmp_ps::<_CMP_LT_OS>(dy, zero));
        let correction = _mm256_and_si256(
            _mm256_castps_si256(_mm256_cmp_ps::<_CMP_EQ_OS>(adx, zero)),
            one,
        );
        best = _mm256_blendv_epi8(
            best,
            _mm256_sub_epi32(n_signed, _mm256_add_epi32(best, correction)),
            dy_neg,
        );
        // 18 wraps to 0
        best = _mm256_andnot_si256(_mm256_cmpeq_epi32(best, n_signed), best);

        let mag = _mm256_sqrt_ps(_mm256_fmadd_ps(adx, adx, _mm256_mul_ps(ady, ady)));
        _mm256_storeu_si256(
            bins[x0..x0 + BATCH_WIDTH].as_mut_ptr() as *mut __m256i,
            best,
        );
        _mm256_storeu_ps(magnitudes[x0..x0 + BATCH_WIDTH].as_mut_ptr(), mag);

        if x0 == last {
            break;
        }
        x += BATCH_WIDTH;
    }
}
