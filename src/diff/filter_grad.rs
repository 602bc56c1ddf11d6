//! Adjoint of the truncated box filter.
//!
//! Forward (in `render::filter`):
//!   dst[q] = sum_{p in W(q)} src[p] / count(q)
//! with W(q) the window clipped to the image and count(q) its tap count.
//!
//! The filter is linear, so the backward pass is the transpose: each source
//! pixel collects the upstream gradient of every destination pixel whose
//! window contains it, divided by that destination's own count. The window
//! is symmetric, so "q's window contains p" is "p's window contains q", and
//! the gather loops look just like the forward ones with the normalization
//! moved inside.

use crate::render::{tap_span, window_count};
use nalgebra::Vector3;
use rayon::prelude::*;

/// Transpose of `render::box_filter` applied to an upstream gradient image.
pub fn box_filter_adjoint(
    d_dst: &[Vector3<f32>],
    width: usize,
    height: usize,
    size: usize,
) -> Vec<Vector3<f32>> {
    debug_assert_eq!(d_dst.len(), width * height);
    debug_assert!(size % 2 == 1 && size >= 1);
    if size <= 1 {
        return d_dst.to_vec();
    }
    let radius = size / 2;

    let mut d_src = vec![Vector3::zeros(); d_dst.len()];
    d_src
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let (y_lo, y_hi) = tap_span(y, radius, height);
            for (x, out) in row.iter_mut().enumerate() {
                let (x_lo, x_hi) = tap_span(x, radius, width);
                let mut sum = Vector3::zeros();
                for qy in y_lo..=y_hi {
                    for qx in x_lo..=x_hi {
                        sum += d_dst[qy * width + qx] / window_count(qx, qy, radius, width, height);
                    }
                }
                *out = sum;
            }
        });
    d_src
}
