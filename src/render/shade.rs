//! Per-pixel shading from coverage: attribute interpolation, albedo lookup,
//! optional SH irradiance.

use super::buffers::CoverageView;
use super::geometry::{face_normal, ProjectedVertex};
use super::settings::ShadingMode;
use crate::core::{evaluate_irradiance, MeshTopology, ShCoefficients, Texture, UvPolicy};
use nalgebra::Vector3;
use rayon::prelude::*;

/// Albedo input for one batch element.
#[derive(Clone, Copy)]
pub(crate) enum AlbedoSource<'a> {
    Texture(&'a Texture),
    VertexColors(&'a [Vector3<f32>]),
}

/// Camera-space unit normals for every face, zero for degenerate ones.
pub(crate) fn face_normals(
    faces: &[[u32; 3]],
    projected: &[ProjectedVertex],
) -> Vec<Vector3<f32>> {
    faces
        .iter()
        .map(|&[i0, i1, i2]| {
            face_normal(
                &projected[i0 as usize].camera_space,
                &projected[i1 as usize].camera_space,
                &projected[i2 as usize].camera_space,
            )
        })
        .collect()
}

/// Shade one view's coverage into `out` (`height * width` pixels).
///
/// Uncovered pixels get the background color. Covered pixels interpolate
/// attributes with the stored barycentrics, fetch albedo, and in shaded mode
/// multiply per channel by the SH irradiance at the face normal.
#[allow(clippy::too_many_arguments)]
pub(crate) fn shade_view(
    topology: &MeshTopology,
    projected: &[ProjectedVertex],
    albedo: AlbedoSource<'_>,
    shading: ShadingMode,
    sh: &ShCoefficients,
    uv_policy: UvPolicy,
    background: Vector3<f32>,
    coverage: CoverageView<'_>,
    out: &mut [Vector3<f32>],
) {
    let normals = match shading {
        ShadingMode::Shaded => Some(face_normals(topology.faces(), projected)),
        ShadingMode::Shadeless => None,
    };

    out.par_iter_mut().enumerate().for_each(|(i, pixel)| {
        let face = coverage.face_ids[i];
        if face < 0 {
            *pixel = background;
            return;
        }
        let face = face as usize;

        let [w0, w1] = coverage.bary[i];
        let w2 = 1.0 - w0 - w1;
        let [i0, i1, i2] = topology.faces()[face];

        let base = match albedo {
            AlbedoSource::Texture(texture) => {
                let [uv0, uv1, uv2] = topology.face_uvs()[face];
                let uv = uv0 * w0 + uv1 * w1 + uv2 * w2;
                texture.sample_bilinear(uv, uv_policy)
            }
            AlbedoSource::VertexColors(colors) => {
                colors[i0 as usize] * w0 + colors[i1 as usize] * w1 + colors[i2 as usize] * w2
            }
        };

        *pixel = match &normals {
            Some(normals) => base.component_mul(&evaluate_irradiance(sh, &normals[face])),
            None => base,
        };
    });
}
