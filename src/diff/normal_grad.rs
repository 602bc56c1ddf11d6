//! Gradients for the camera-space face normal.
//!
//! Forward (in `render::geometry::face_normal`):
//!   e1 = p1 - p0, e2 = p2 - p0
//!   m  = e1 x e2
//!   n  = m / |m|   (zero vector when |m| ~ 0)
//!
//! Backward:
//! - normalization: d_m = (d_n - n * dot(n, d_n)) / |m|, the projection of
//!   the upstream onto the plane orthogonal to n scaled by 1/|m|.
//! - cross product c = a x b: dL/da = b x g, dL/db = g x a for g = dL/dc.
//! - edges to corners: d_p0 = -(d_e1 + d_e2), d_p1 = d_e1, d_p2 = d_e2.
//!
//! Degenerate faces (|m|^2 below the forward threshold) return zero
//! gradients, matching the forward zero normal.

use nalgebra::Vector3;

/// Same squared-norm cutoff as `core::normalize_or_zero`.
const MIN_NORM_SQ: f32 = 1e-24;

/// Gradients of the unit face normal w.r.t. the three camera-space corners.
#[derive(Clone, Copy, Debug, Default)]
pub struct FaceNormalGrads {
    pub d_p0: Vector3<f32>,
    pub d_p1: Vector3<f32>,
    pub d_p2: Vector3<f32>,
}

/// Push dL/d(normal) back to the corner positions.
pub fn face_normal_grad_corners(
    p0: &Vector3<f32>,
    p1: &Vector3<f32>,
    p2: &Vector3<f32>,
    d_normal: &Vector3<f32>,
) -> FaceNormalGrads {
    let e1 = p1 - p0;
    let e2 = p2 - p0;
    let m = e1.cross(&e2);
    let norm_sq = m.norm_squared();
    if norm_sq <= MIN_NORM_SQ {
        return FaceNormalGrads::default();
    }
    let norm = norm_sq.sqrt();
    let n = m / norm;

    let d_m = (d_normal - n * n.dot(d_normal)) / norm;
    let d_e1 = e2.cross(&d_m);
    let d_e2 = d_m.cross(&e1);

    FaceNormalGrads {
        d_p0: -(d_e1 + d_e2),
        d_p1: d_e1,
        d_p2: d_e2,
    }
}
