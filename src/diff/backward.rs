//! Backward pass over rendered views.
//!
//! Runs the forward pipeline in reverse per (batch, camera) view:
//!
//! 1. adjoint of the image box filter on the upstream gradient,
//! 2. per covered pixel, shading gradients (albedo and irradiance factors)
//!    pushed to texels or vertex colors and to the SH coefficients,
//! 3. barycentric weights back to the screen corners, and the face-normal
//!    path back to camera-space corners in shaded mode,
//! 4. projection and rigid-transform adjoints down to world-space vertices,
//! 5. adjoint of the texture box filter on the accumulated texel gradients.
//!
//! Coverage is treated as fixed: which face a pixel shows, and the depth
//! ordering that decided it, are not differentiated. Gradients describe how
//! the image changes while the coverage map stays put, so background pixels
//! contribute nothing.
//!
//! Pixels are processed in parallel with thread-local accumulators that are
//! merged once per view, so no locks are taken on the hot path.

use super::bary_grad::barycentric_with_grads;
use super::filter_grad::box_filter_adjoint;
use super::normal_grad::face_normal_grad_corners;
use super::project_grad::{camera_point_grad_world, screen_grad_camera_point};
use super::sample_grad::sample_bilinear_with_grads;
use super::sh_grad::{irradiance_grad_coeffs, irradiance_grad_normal};
use crate::core::{evaluate_irradiance, sh_basis, Camera, ShCoefficients, Texture, SH_COEFF_COUNT};
use crate::render::{
    face_normals, project_vertices, AlbedoMode, AlbedoSource, ForwardPass, FrameInputs,
    RenderBuffer, Renderer, ShadingMode, BACKGROUND_FACE,
};
use nalgebra::{Vector2, Vector3};
use rayon::prelude::*;

/// Gradients for every differentiable input, shaped like the inputs they
/// correspond to. Inputs the active configuration does not consume keep
/// zero gradients of matching shape (or stay empty if they were empty).
pub struct InputGrads {
    /// `d_vertices[batch][vertex]`, world space.
    pub d_vertices: Vec<Vec<Vector3<f32>>>,
    /// `d_vertex_colors[batch][vertex]`.
    pub d_vertex_colors: Vec<Vec<Vector3<f32>>>,
    /// One gradient image per input texture.
    pub d_textures: Vec<Texture>,
    /// `d_sh_coefficients[batch][camera]`.
    pub d_sh_coefficients: Vec<Vec<ShCoefficients>>,
}

// Per-thread accumulators for one view's pixel fold. Vertex positions
// accumulate in camera space and are rotated back to world once per view.
struct ViewGrads {
    d_cam_positions: Vec<Vector3<f32>>,
    d_colors: Vec<Vector3<f32>>,
    d_texels: Vec<Vector3<f32>>,
    d_sh: ShCoefficients,
}

impl ViewGrads {
    fn new(num_vertices: usize, num_colors: usize, num_texels: usize) -> Self {
        Self {
            d_cam_positions: vec![Vector3::zeros(); num_vertices],
            d_colors: vec![Vector3::zeros(); num_colors],
            d_texels: vec![Vector3::zeros(); num_texels],
            d_sh: [[0.0; 3]; SH_COEFF_COUNT],
        }
    }

    fn merge(&mut self, other: &ViewGrads) {
        for (a, b) in self.d_cam_positions.iter_mut().zip(&other.d_cam_positions) {
            *a += *b;
        }
        for (a, b) in self.d_colors.iter_mut().zip(&other.d_colors) {
            *a += *b;
        }
        for (a, b) in self.d_texels.iter_mut().zip(&other.d_texels) {
            *a += *b;
        }
        for (a, b) in self.d_sh.iter_mut().zip(other.d_sh.iter()) {
            a[0] += b[0];
            a[1] += b[1];
            a[2] += b[2];
        }
    }
}

/// Push `d_render` back through the pipeline recorded in `pass`.
///
/// Inputs were already validated by [`Renderer::backward`], so shapes are
/// trusted here.
pub(crate) fn backward_pass(
    renderer: &Renderer,
    cameras: &[Camera],
    inputs: &FrameInputs<'_>,
    pass: &ForwardPass,
    d_render: &RenderBuffer,
) -> InputGrads {
    let s = renderer.settings();
    let topology = renderer.topology();
    let (width, height) = (s.width, s.height);
    let batches = inputs.vertices.len();
    let num_vertices = topology.num_vertices();

    let textured = s.albedo_mode == AlbedoMode::Textured;
    let shaded = s.shading_mode == ShadingMode::Shaded;

    let mut grads = InputGrads {
        d_vertices: vec![vec![Vector3::zeros(); num_vertices]; batches],
        d_vertex_colors: inputs
            .vertex_colors
            .iter()
            .map(|c| vec![Vector3::zeros(); c.len()])
            .collect(),
        d_textures: Vec::new(),
        d_sh_coefficients: inputs
            .sh_coefficients
            .iter()
            .map(|per_camera| vec![[[0.0; 3]; SH_COEFF_COUNT]; per_camera.len()])
            .collect(),
    };

    // Texel gradients accumulate against the texture shading actually
    // sampled; if that was the filtered copy, the filter adjoint maps them
    // back to the input texture at the end.
    let mut d_sampled_texels: Vec<Vec<Vector3<f32>>> = if textured {
        inputs
            .textures
            .iter()
            .map(|t| vec![Vector3::zeros(); t.texels().len()])
            .collect()
    } else {
        Vec::new()
    };

    for batch in 0..batches {
        let albedo_src = match s.albedo_mode {
            AlbedoMode::Textured => AlbedoSource::Texture(match &pass.filtered_textures {
                Some(filtered) => &filtered[batch],
                None => &inputs.textures[batch],
            }),
            AlbedoMode::VertexColor => AlbedoSource::VertexColors(&inputs.vertex_colors[batch]),
        };
        let num_texels = match albedo_src {
            AlbedoSource::Texture(t) => t.texels().len(),
            AlbedoSource::VertexColors(_) => 0,
        };
        let num_colors = match albedo_src {
            AlbedoSource::Texture(_) => 0,
            AlbedoSource::VertexColors(_) => num_vertices,
        };

        for (cam, camera) in cameras.iter().enumerate() {
            let projected = project_vertices(camera, &inputs.vertices[batch]);
            let normals = shaded.then(|| face_normals(topology.faces(), &projected));
            let sh = shaded.then(|| &inputs.sh_coefficients[batch][cam]);
            let coverage = pass.coverage.view(batch, cam);

            let filtered_upstream: Vec<Vector3<f32>>;
            let upstream: &[Vector3<f32>] = if s.image_filter_size > 1 {
                filtered_upstream = box_filter_adjoint(
                    d_render.view(batch, cam),
                    width,
                    height,
                    s.image_filter_size,
                );
                &filtered_upstream
            } else {
                d_render.view(batch, cam)
            };

            let thread_grads: Vec<ViewGrads> = (0..width * height)
                .into_par_iter()
                .fold(
                    || ViewGrads::new(num_vertices, num_colors, num_texels),
                    |mut local, i| {
                        let face = coverage.face_ids[i];
                        if face == BACKGROUND_FACE {
                            return local;
                        }
                        let g = upstream[i];
                        if g == Vector3::zeros() {
                            return local;
                        }

                        let face = face as usize;
                        let [i0, i1, i2] = topology.faces()[face];
                        let (v0, v1, v2) = (i0 as usize, i1 as usize, i2 as usize);
                        let [w0, w1] = coverage.bary[i];
                        let w2 = 1.0 - w0 - w1;

                        let irradiance = match (&normals, sh) {
                            (Some(normals), Some(sh)) => evaluate_irradiance(sh, &normals[face]),
                            _ => Vector3::new(1.0, 1.0, 1.0),
                        };
                        // pixel = albedo (.) irradiance
                        let d_albedo = g.component_mul(&irradiance);

                        let mut d_lambda = [0.0f32; 3];
                        let albedo = match albedo_src {
                            AlbedoSource::Texture(texture) => {
                                let [uv0, uv1, uv2] = topology.face_uvs()[face];
                                let uv = uv0 * w0 + uv1 * w1 + uv2 * w2;
                                let smp = sample_bilinear_with_grads(texture, uv, s.uv_policy);
                                for tap in &smp.taps {
                                    local.d_texels[tap.y * texture.width() + tap.x] +=
                                        d_albedo * tap.weight;
                                }
                                let d_uv =
                                    Vector2::new(d_albedo.dot(&smp.d_u), d_albedo.dot(&smp.d_v));
                                d_lambda = [d_uv.dot(&uv0), d_uv.dot(&uv1), d_uv.dot(&uv2)];
                                smp.value
                            }
                            AlbedoSource::VertexColors(colors) => {
                                let (c0, c1, c2) = (colors[v0], colors[v1], colors[v2]);
                                local.d_colors[v0] += d_albedo * w0;
                                local.d_colors[v1] += d_albedo * w1;
                                local.d_colors[v2] += d_albedo * w2;
                                d_lambda =
                                    [d_albedo.dot(&c0), d_albedo.dot(&c1), d_albedo.dot(&c2)];
                                c0 * w0 + c1 * w1 + c2 * w2
                            }
                        };

                        if let (Some(normals), Some(sh)) = (&normals, sh) {
                            let n = normals[face];
                            let d_irradiance = g.component_mul(&albedo);
                            let d_sh = irradiance_grad_coeffs(&sh_basis(&n), &d_irradiance);
                            for (acc, add) in local.d_sh.iter_mut().zip(d_sh.iter()) {
                                acc[0] += add[0];
                                acc[1] += add[1];
                                acc[2] += add[2];
                            }
                            let d_normal = irradiance_grad_normal(sh, &n, &d_irradiance);
                            let ng = face_normal_grad_corners(
                                &projected[v0].camera_space,
                                &projected[v1].camera_space,
                                &projected[v2].camera_space,
                                &d_normal,
                            );
                            local.d_cam_positions[v0] += ng.d_p0;
                            local.d_cam_positions[v1] += ng.d_p1;
                            local.d_cam_positions[v2] += ng.d_p2;
                        }

                        // Attribute interpolation is linear in the weights, so
                        // every albedo path meets the corners through d_lambda.
                        let p = Vector2::new(
                            (i % width) as f32 + 0.5,
                            (i / width) as f32 + 0.5,
                        );
                        let bary = barycentric_with_grads(
                            &projected[v0].screen,
                            &projected[v1].screen,
                            &projected[v2].screen,
                            &p,
                        );
                        for (k, &v) in [v0, v1, v2].iter().enumerate() {
                            let d_screen = bary.d_corners[0][k] * d_lambda[0]
                                + bary.d_corners[1][k] * d_lambda[1]
                                + bary.d_corners[2][k] * d_lambda[2];
                            local.d_cam_positions[v] += screen_grad_camera_point(
                                &projected[v].camera_space,
                                camera.fx,
                                camera.fy,
                                &d_screen,
                            );
                        }

                        local
                    },
                )
                .collect();

            let mut view = ViewGrads::new(num_vertices, num_colors, num_texels);
            for tg in &thread_grads {
                view.merge(tg);
            }

            let d_vertices = &mut grads.d_vertices[batch];
            for (d_world, d_cam) in d_vertices.iter_mut().zip(&view.d_cam_positions) {
                *d_world += camera_point_grad_world(camera, d_cam);
            }
            if let AlbedoSource::VertexColors(_) = albedo_src {
                for (dst, src) in grads.d_vertex_colors[batch].iter_mut().zip(&view.d_colors) {
                    *dst += *src;
                }
            }
            if textured {
                for (dst, src) in d_sampled_texels[batch].iter_mut().zip(&view.d_texels) {
                    *dst += *src;
                }
            }
            if shaded {
                let d_sh = &mut grads.d_sh_coefficients[batch][cam];
                for (acc, add) in d_sh.iter_mut().zip(view.d_sh.iter()) {
                    acc[0] += add[0];
                    acc[1] += add[1];
                    acc[2] += add[2];
                }
            }
        }
    }

    if textured {
        grads.d_textures = inputs
            .textures
            .iter()
            .zip(d_sampled_texels)
            .map(|(texture, d_texels)| {
                let d_texels = if pass.filtered_textures.is_some() {
                    box_filter_adjoint(
                        &d_texels,
                        texture.width(),
                        texture.height(),
                        s.texture_filter_size,
                    )
                } else {
                    d_texels
                };
                texture.with_texels(d_texels)
            })
            .collect();
    }

    grads
}
