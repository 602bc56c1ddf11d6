//! Forward rendering entry point: validation, per-view pipeline, filtering.

use super::buffers::{CoverageBuffer, ForwardPass, RenderBuffer};
use super::filter::box_filter;
use super::geometry::project_vertices;
use super::raster::rasterize_view;
use super::settings::{AlbedoMode, ConfigError, RenderSettings, ShadingMode};
use super::shade::{shade_view, AlbedoSource};
use crate::core::{neutral_coefficients, Camera, MeshTopology, ShCoefficients, Texture};
use nalgebra::Vector3;
use thiserror::Error;

/// Runtime shape errors. All of these are caught before any pixel work
/// starts; a forward or backward call either validates fully or does
/// nothing.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("expected {expected} cameras, got {got}")]
    CameraCountMismatch { expected: usize, got: usize },

    #[error("input batch is empty")]
    EmptyBatch,

    #[error("batch {batch}: expected {expected} vertices, got {got}")]
    VertexCountMismatch {
        batch: usize,
        expected: usize,
        got: usize,
    },

    #[error("expected one texture per batch element ({expected}), got {got}")]
    TextureCountMismatch { expected: usize, got: usize },

    #[error("expected vertex colors for {expected} batch elements, got {got}")]
    VertexColorBatchMismatch { expected: usize, got: usize },

    #[error("batch {batch}: expected {expected} vertex colors, got {got}")]
    VertexColorCountMismatch {
        batch: usize,
        expected: usize,
        got: usize,
    },

    #[error("expected SH coefficients for {expected} batch elements, got {got}")]
    ShBatchMismatch { expected: usize, got: usize },

    #[error("batch {batch}: expected SH coefficients for {expected} cameras, got {got}")]
    ShCameraMismatch {
        batch: usize,
        expected: usize,
        got: usize,
    },

    #[error("upstream gradient shape {got} does not match forward output {expected}")]
    UpstreamShapeMismatch { expected: String, got: String },
}

/// Per-invocation inputs for a batched multi-camera render.
///
/// Shapes: `vertices[batch][vertex]`, `vertex_colors[batch][vertex]`,
/// `textures[batch]`, `sh_coefficients[batch][camera]`. Inputs a mode does
/// not consume may be left empty: vertex-color rendering needs no textures,
/// textured rendering needs no vertex colors, and shadeless rendering needs
/// no SH coefficients.
#[derive(Clone, Copy)]
pub struct FrameInputs<'a> {
    pub vertices: &'a [Vec<Vector3<f32>>],
    pub vertex_colors: &'a [Vec<Vector3<f32>>],
    pub textures: &'a [Texture],
    pub sh_coefficients: &'a [Vec<ShCoefficients>],
}

impl Default for FrameInputs<'_> {
    fn default() -> Self {
        Self {
            vertices: &[],
            vertex_colors: &[],
            textures: &[],
            sh_coefficients: &[],
        }
    }
}

/// Differentiable mesh renderer for a fixed topology and configuration.
pub struct Renderer {
    topology: MeshTopology,
    settings: RenderSettings,
}

impl Renderer {
    pub fn new(topology: MeshTopology, settings: RenderSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self { topology, settings })
    }

    pub fn topology(&self) -> &MeshTopology {
        &self.topology
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Check every input shape against the topology and settings.
    ///
    /// Returns the batch size on success.
    pub(crate) fn validate_inputs(
        &self,
        cameras: &[Camera],
        inputs: &FrameInputs<'_>,
    ) -> Result<usize, RenderError> {
        let s = &self.settings;
        if cameras.len() != s.num_cameras {
            return Err(RenderError::CameraCountMismatch {
                expected: s.num_cameras,
                got: cameras.len(),
            });
        }

        let batches = inputs.vertices.len();
        if batches == 0 {
            return Err(RenderError::EmptyBatch);
        }
        let num_vertices = self.topology.num_vertices();
        for (batch, verts) in inputs.vertices.iter().enumerate() {
            if verts.len() != num_vertices {
                return Err(RenderError::VertexCountMismatch {
                    batch,
                    expected: num_vertices,
                    got: verts.len(),
                });
            }
        }

        match s.albedo_mode {
            AlbedoMode::Textured => {
                if inputs.textures.len() != batches {
                    return Err(RenderError::TextureCountMismatch {
                        expected: batches,
                        got: inputs.textures.len(),
                    });
                }
            }
            AlbedoMode::VertexColor => {
                if inputs.vertex_colors.len() != batches {
                    return Err(RenderError::VertexColorBatchMismatch {
                        expected: batches,
                        got: inputs.vertex_colors.len(),
                    });
                }
                for (batch, colors) in inputs.vertex_colors.iter().enumerate() {
                    if colors.len() != num_vertices {
                        return Err(RenderError::VertexColorCountMismatch {
                            batch,
                            expected: num_vertices,
                            got: colors.len(),
                        });
                    }
                }
            }
        }

        if s.shading_mode == ShadingMode::Shaded {
            if inputs.sh_coefficients.len() != batches {
                return Err(RenderError::ShBatchMismatch {
                    expected: batches,
                    got: inputs.sh_coefficients.len(),
                });
            }
            for (batch, per_camera) in inputs.sh_coefficients.iter().enumerate() {
                if per_camera.len() != cameras.len() {
                    return Err(RenderError::ShCameraMismatch {
                        batch,
                        expected: cameras.len(),
                        got: per_camera.len(),
                    });
                }
            }
        }

        Ok(batches)
    }

    /// Render every (batch, camera) view.
    ///
    /// The returned [`ForwardPass`] carries the filtered frames plus the
    /// coverage buffers and filtered textures the backward pass needs.
    pub fn forward(
        &self,
        cameras: &[Camera],
        inputs: &FrameInputs<'_>,
    ) -> Result<ForwardPass, RenderError> {
        let batches = self.validate_inputs(cameras, inputs)?;
        let s = &self.settings;
        let (width, height) = (s.width, s.height);
        log::debug!(
            "forward: {} batch(es) x {} camera(s) at {}x{}",
            batches,
            cameras.len(),
            width,
            height
        );

        let filtered_textures = if s.albedo_mode == AlbedoMode::Textured
            && s.texture_filter_size > 1
        {
            Some(
                inputs
                    .textures
                    .iter()
                    .map(|t| {
                        t.with_texels(box_filter(
                            t.texels(),
                            t.width(),
                            t.height(),
                            s.texture_filter_size,
                        ))
                    })
                    .collect::<Vec<_>>(),
            )
        } else {
            None
        };

        let mut render = RenderBuffer::zeros(batches, cameras.len(), width, height);
        let mut coverage = CoverageBuffer::new(batches, cameras.len(), width, height);
        let neutral = neutral_coefficients();

        for batch in 0..batches {
            for (cam, camera) in cameras.iter().enumerate() {
                let projected = project_vertices(camera, &inputs.vertices[batch]);
                rasterize_view(
                    self.topology.faces(),
                    &projected,
                    width,
                    height,
                    coverage.view_mut(batch, cam),
                );

                let albedo = match s.albedo_mode {
                    AlbedoMode::Textured => AlbedoSource::Texture(match &filtered_textures {
                        Some(filtered) => &filtered[batch],
                        None => &inputs.textures[batch],
                    }),
                    AlbedoMode::VertexColor => {
                        AlbedoSource::VertexColors(&inputs.vertex_colors[batch])
                    }
                };
                let sh = match s.shading_mode {
                    ShadingMode::Shaded => &inputs.sh_coefficients[batch][cam],
                    ShadingMode::Shadeless => &neutral,
                };

                shade_view(
                    &self.topology,
                    &projected,
                    albedo,
                    s.shading_mode,
                    sh,
                    s.uv_policy,
                    s.background,
                    coverage.view(batch, cam),
                    render.view_mut(batch, cam),
                );
            }
        }

        let render = if s.image_filter_size > 1 {
            let mut filtered = RenderBuffer::zeros(batches, cameras.len(), width, height);
            for batch in 0..batches {
                for cam in 0..cameras.len() {
                    let blurred =
                        box_filter(render.view(batch, cam), width, height, s.image_filter_size);
                    filtered.view_mut(batch, cam).copy_from_slice(&blurred);
                }
            }
            filtered
        } else {
            render
        };

        Ok(ForwardPass {
            render,
            coverage,
            filtered_textures,
        })
    }

    /// Propagate an upstream per-pixel gradient back to every input.
    pub fn backward(
        &self,
        cameras: &[Camera],
        inputs: &FrameInputs<'_>,
        pass: &ForwardPass,
        d_render: &RenderBuffer,
    ) -> Result<crate::diff::InputGrads, RenderError> {
        let batches = self.validate_inputs(cameras, inputs)?;
        let s = &self.settings;
        let expected = (batches, cameras.len(), s.width, s.height);
        let got = (
            d_render.batches(),
            d_render.cameras(),
            d_render.width(),
            d_render.height(),
        );
        if expected != got {
            return Err(RenderError::UpstreamShapeMismatch {
                expected: format!(
                    "{}x{}x{}x{}",
                    expected.0, expected.1, expected.3, expected.2
                ),
                got: format!("{}x{}x{}x{}", got.0, got.1, got.3, got.2),
            });
        }
        log::debug!(
            "backward: {} batch(es) x {} camera(s) at {}x{}",
            batches,
            cameras.len(),
            s.width,
            s.height
        );
        Ok(crate::diff::backward_pass(self, cameras, inputs, pass, d_render))
    }
}
