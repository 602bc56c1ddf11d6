//! Odd-width box filtering for rendered frames and textures.
//!
//! The window is truncated at the image border and the sum renormalized by
//! the number of in-bounds taps, so border pixels keep full brightness. A
//! size of 1 is the identity.

use nalgebra::Vector3;
use rayon::prelude::*;

/// Inclusive in-bounds tap range along one axis for a window centered at
/// `center` with the given radius.
#[inline]
pub(crate) fn tap_span(center: usize, radius: usize, len: usize) -> (usize, usize) {
    let lo = center.saturating_sub(radius);
    let hi = (center + radius).min(len - 1);
    (lo, hi)
}

/// Number of in-bounds taps of the 2D window centered at (x, y).
#[inline]
pub(crate) fn window_count(x: usize, y: usize, radius: usize, width: usize, height: usize) -> f32 {
    let (x_lo, x_hi) = tap_span(x, radius, width);
    let (y_lo, y_hi) = tap_span(y, radius, height);
    ((x_hi - x_lo + 1) * (y_hi - y_lo + 1)) as f32
}

/// Box-filter `src` (`height * width`, row-major) with an odd window width.
///
/// Size 1 returns the input unchanged.
pub fn box_filter(src: &[Vector3<f32>], width: usize, height: usize, size: usize) -> Vec<Vector3<f32>> {
    debug_assert_eq!(src.len(), width * height);
    debug_assert!(size % 2 == 1 && size >= 1);
    if size <= 1 {
        return src.to_vec();
    }
    let radius = size / 2;

    let mut dst = vec![Vector3::zeros(); src.len()];
    dst.par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, dst_row)| {
            let (y_lo, y_hi) = tap_span(y, radius, height);
            for (x, out) in dst_row.iter_mut().enumerate() {
                let (x_lo, x_hi) = tap_span(x, radius, width);
                let mut sum = Vector3::zeros();
                for sy in y_lo..=y_hi {
                    for sx in x_lo..=x_hi {
                        sum += src[sy * width + sx];
                    }
                }
                *out = sum / window_count(x, y, radius, width, height);
            }
        });
    dst
}
