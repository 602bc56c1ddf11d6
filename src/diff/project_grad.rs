//! Gradients for the camera transform and pinhole projection.
//!
//! Forward (in `core::Camera` / `render::geometry`):
//!   p_cam = R * p_world + t
//!   u = fx * x/z + cx, v = fy * y/z + cy
//!
//! We keep these functions small so they can be composed in tests.

use crate::core::{perspective_jacobian, Camera};
use nalgebra::{Vector2, Vector3};

/// Gradient of the pinhole projection w.r.t. the camera-space point, given
/// upstream dL/d(screen): the projection Jacobian transposed onto `d_screen`.
///
/// Assumes `z > 0` (the rasterizer only references visible vertices).
pub fn screen_grad_camera_point(
    point_cam: &Vector3<f32>,
    fx: f32,
    fy: f32,
    d_screen: &Vector2<f32>,
) -> Vector3<f32> {
    perspective_jacobian(point_cam, fx, fy).transpose() * d_screen
}

/// Gradient of the world-to-camera transform w.r.t. the world point:
/// p_cam = R * p + t, so dL/dp = R^T * dL/d(p_cam).
pub fn camera_point_grad_world(camera: &Camera, d_point_cam: &Vector3<f32>) -> Vector3<f32> {
    camera.rotation.transpose() * d_point_cam
}
