//! Vertex transform stage: world space to camera space to pixel coordinates.

use crate::core::{normalize_or_zero, Camera};
use nalgebra::{Vector2, Vector3};
use rayon::prelude::*;

/// A vertex transformed for one camera.
#[derive(Clone, Copy, Debug)]
pub struct ProjectedVertex {
    /// Position in camera space; `camera_space.z` is the depth used for
    /// visibility resolution.
    pub camera_space: Vector3<f32>,
    /// Pixel coordinates. Only meaningful when `visible` is true.
    pub screen: Vector2<f32>,
    /// False when the vertex sits at or behind the camera plane, or when its
    /// coordinates are not finite. Faces touching such a vertex are skipped
    /// entirely.
    pub visible: bool,
}

/// Transform and project every vertex for one camera.
pub fn project_vertices(camera: &Camera, vertices: &[Vector3<f32>]) -> Vec<ProjectedVertex> {
    let projected: Vec<ProjectedVertex> = vertices
        .par_iter()
        .map(|v| {
            let camera_space = camera.world_to_camera(v);
            match camera.project(&camera_space) {
                Some(screen)
                    if screen.x.is_finite()
                        && screen.y.is_finite()
                        && camera_space.z.is_finite() =>
                {
                    ProjectedVertex {
                        camera_space,
                        screen,
                        visible: true,
                    }
                }
                _ => ProjectedVertex {
                    camera_space,
                    screen: Vector2::zeros(),
                    visible: false,
                },
            }
        })
        .collect();

    let non_finite = projected
        .iter()
        .filter(|p| {
            !(p.camera_space.x.is_finite()
                && p.camera_space.y.is_finite()
                && p.camera_space.z.is_finite())
        })
        .count();
    if non_finite > 0 {
        log::warn!("{non_finite} vertices with non-finite coordinates treated as invisible");
    }

    projected
}

/// Unit face normal from three camera-space corner positions.
///
/// The zero vector is returned for degenerate faces, which keeps shading
/// finite (the SH basis of the zero vector is well defined).
pub fn face_normal(p0: &Vector3<f32>, p1: &Vector3<f32>, p2: &Vector3<f32>) -> Vector3<f32> {
    let e1 = p1 - p0;
    let e2 = p2 - p0;
    normalize_or_zero(&e1.cross(&e2))
}
