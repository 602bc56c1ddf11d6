//! Pinhole camera: world-to-camera transform and perspective projection.
//!
//! A camera carries the extrinsic pose (rotation + translation mapping world
//! points into camera space) and the four pinhole intrinsics. It transforms
//! vertices into camera space, projects them to pixel coordinates, and its
//! rotation carries face normals into camera space for per-camera shading.
//!
//! Image resolution is renderer configuration, not camera state: every camera
//! of a scene renders at the same configured width × height.

use nalgebra::{Matrix3, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// A pinhole camera with intrinsic and extrinsic parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Camera {
    /// Focal lengths in pixels.
    pub fx: f32,
    pub fy: f32,

    /// Principal point in pixels.
    pub cx: f32,
    pub cy: f32,

    /// World-to-camera rotation.
    pub rotation: Matrix3<f32>,

    /// World-to-camera translation.
    pub translation: Vector3<f32>,
}

impl Camera {
    pub fn new(
        fx: f32,
        fy: f32,
        cx: f32,
        cy: f32,
        rotation: Matrix3<f32>,
        translation: Vector3<f32>,
    ) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            rotation,
            translation,
        }
    }

    /// Build a camera from row-major calibration buffers: a 3×4 extrinsic
    /// `[R | t]` (12 floats) and a 3×3 intrinsic `K` (9 floats).
    ///
    /// `K = | fx  s  cx |` — the skew entry `s` is ignored.
    /// `    |  0 fy  cy |`
    /// `    |  0  0   1 |`
    pub fn from_row_major(extrinsic: &[f32; 12], intrinsic: &[f32; 9]) -> Self {
        let rotation = Matrix3::new(
            extrinsic[0],
            extrinsic[1],
            extrinsic[2],
            extrinsic[4],
            extrinsic[5],
            extrinsic[6],
            extrinsic[8],
            extrinsic[9],
            extrinsic[10],
        );
        let translation = Vector3::new(extrinsic[3], extrinsic[7], extrinsic[11]);

        Self {
            fx: intrinsic[0],
            fy: intrinsic[4],
            cx: intrinsic[2],
            cy: intrinsic[5],
            rotation,
            translation,
        }
    }

    /// Map a world-space point into camera space: `R * p + t`.
    pub fn world_to_camera(&self, point_world: &Vector3<f32>) -> Vector3<f32> {
        self.rotation * point_world + self.translation
    }

    /// Project a camera-space point to pixel coordinates,
    /// `(fx * x/z + cx, fy * y/z + cy)`.
    ///
    /// `None` for points at or behind the image plane (`z <= 0`).
    pub fn project(&self, point_camera: &Vector3<f32>) -> Option<Vector2<f32>> {
        if point_camera.z <= 0.0 {
            return None;
        }
        let inv_z = 1.0 / point_camera.z;
        Some(Vector2::new(
            self.fx * point_camera.x * inv_z + self.cx,
            self.fy * point_camera.y * inv_z + self.cy,
        ))
    }
}
