//! Shared math helpers: edge functions, safe normalization, projection Jacobian.

use nalgebra::{Matrix2x3, Vector2, Vector3};

/// Edge function: the 2D cross product (b - a) × (p - a).
///
/// ```text
/// E(p) = (p.x - a.x) * (b.y - a.y) - (p.y - a.y) * (b.x - a.x)
/// ```
///
/// Positive when `p` lies to the left of the directed edge a→b, negative to
/// the right, zero on the edge. `edge_function(a, b, c)` is twice the signed
/// area of triangle (a, b, c).
#[inline]
pub fn edge_function(a: &Vector2<f32>, b: &Vector2<f32>, p: &Vector2<f32>) -> f32 {
    (p.x - a.x) * (b.y - a.y) - (p.y - a.y) * (b.x - a.x)
}

/// Normalize a vector, returning zero for (near-)zero input instead of NaN.
///
/// Degenerate face normals take this path; the SH basis of the zero vector is
/// still well defined, so shading stays finite.
#[inline]
pub fn normalize_or_zero(v: &Vector3<f32>) -> Vector3<f32> {
    let norm_sq = v.norm_squared();
    if norm_sq > 1e-24 {
        v / norm_sq.sqrt()
    } else {
        Vector3::zeros()
    }
}

/// Jacobian of the pinhole projection with respect to the camera-space point.
///
/// With `u = fx * x / z + cx` and `v = fy * y / z + cy`:
///
/// ```text
/// d(u,v)/d(x,y,z) = | fx/z   0      -fx*x/z^2 |
///                   | 0      fy/z   -fy*y/z^2 |
/// ```
///
/// Its transpose carries pixel-space gradients back onto camera-space points.
pub fn perspective_jacobian(point_camera: &Vector3<f32>, fx: f32, fy: f32) -> Matrix2x3<f32> {
    let inv_z = 1.0 / point_camera.z;
    let scale = -inv_z * inv_z;
    Matrix2x3::new(
        fx * inv_z,
        0.0,
        fx * point_camera.x * scale,
        0.0,
        fy * inv_z,
        fy * point_camera.y * scale,
    )
}
