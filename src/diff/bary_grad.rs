//! Gradients of normalized barycentric weights w.r.t. screen corners.
//!
//! Forward (in `render::raster`):
//!   w0 = e(b, c, p), w1 = e(c, a, p), w2 = e(a, b, p)
//!   A  = e(a, b, c) = w0 + w1 + w2
//!   li = wi / A
//! with `e` the edge function and p the fixed pixel center.
//!
//! The quotient rule gives d(li)/dX = (d(wi)/dX * A - wi * d(A)/dX) / A^2
//! for X any corner coordinate. Partials of e(u, v, q):
//!   de/du = (q.y - v.y, v.x - q.x)
//!   de/dv = (u.y - q.y, q.x - u.x)
//!   de/dq = (v.y - u.y, u.x - v.x)
//!
//! Pixels exactly on an edge have one-sided coverage, but the weights
//! themselves are smooth in the corners wherever the covering face does not
//! change, which is the regime these gradients describe.

use crate::core::edge_function;
use nalgebra::Vector2;

/// Barycentric weights of one pixel plus their Jacobian w.r.t. the three
/// screen-space corners.
#[derive(Clone, Copy, Debug)]
pub struct BaryGrads {
    /// Normalized weights (l0, l1, l2), summing to 1.
    pub lambda: [f32; 3],
    /// `d_corners[i][k]` = d(lambda_i) / d(corner_k screen position).
    pub d_corners: [[Vector2<f32>; 3]; 3],
}

/// Weights and gradients for pixel center `p` inside triangle `(a, b, c)`.
///
/// The caller guarantees the triangle is non-degenerate (the rasterizer
/// skipped zero-area faces before any pixel could reference them).
pub fn barycentric_with_grads(
    a: &Vector2<f32>,
    b: &Vector2<f32>,
    c: &Vector2<f32>,
    p: &Vector2<f32>,
) -> BaryGrads {
    let w0 = edge_function(b, c, p);
    let w1 = edge_function(c, a, p);
    let w2 = edge_function(a, b, p);
    let area = edge_function(a, b, c);
    let inv_area = 1.0 / area;

    let lambda = [w0 * inv_area, w1 * inv_area, w2 * inv_area];

    // Raw edge-value partials per corner. Corner order: a, b, c.
    let zero = Vector2::zeros();
    let d_w0 = [
        zero,
        Vector2::new(p.y - c.y, c.x - p.x),
        Vector2::new(b.y - p.y, p.x - b.x),
    ];
    let d_w1 = [
        Vector2::new(c.y - p.y, p.x - c.x),
        zero,
        Vector2::new(p.y - a.y, a.x - p.x),
    ];
    let d_w2 = [
        Vector2::new(p.y - b.y, b.x - p.x),
        Vector2::new(a.y - p.y, p.x - a.x),
        zero,
    ];
    // A = w0 + w1 + w2, so dA is the columnwise sum.
    let d_area = [
        d_w1[0] + d_w2[0],
        d_w0[1] + d_w2[1],
        d_w0[2] + d_w1[2],
    ];

    let inv_area_sq = inv_area * inv_area;
    let quotient = |d_w: &[Vector2<f32>; 3], w: f32| {
        [
            (d_w[0] * area - d_area[0] * w) * inv_area_sq,
            (d_w[1] * area - d_area[1] * w) * inv_area_sq,
            (d_w[2] * area - d_area[2] * w) * inv_area_sq,
        ]
    };

    BaryGrads {
        lambda,
        d_corners: [
            quotient(&d_w0, w0),
            quotient(&d_w1, w1),
            quotient(&d_w2, w2),
        ],
    }
}
