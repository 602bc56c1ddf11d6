//! Renderer configuration.
//!
//! Settings are fixed for the lifetime of a renderer, like the mesh topology.
//! Anything that varies per forward call (vertex positions, colors, textures,
//! SH coefficients, cameras) travels in `FrameInputs` instead.

use crate::core::UvPolicy;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Construction-time configuration errors. Nothing here is clamped or
/// defaulted; a bad value fails renderer construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("render resolution must be non-zero, got {width}x{height}")]
    ZeroResolution { width: usize, height: usize },

    #[error("{which} filter size must be odd and positive, got {size}")]
    BadFilterSize { which: &'static str, size: usize },

    #[error("camera count must be non-zero")]
    NoCameras,
}

/// Where per-pixel albedo comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlbedoMode {
    /// Bilinear texture sample at the interpolated UV.
    Textured,
    /// Barycentric blend of the three corner vertex colors.
    VertexColor,
}

impl FromStr for AlbedoMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "textured" => Ok(Self::Textured),
            "vertex_color" | "vertexColor" => Ok(Self::VertexColor),
            other => Err(format!(
                "unknown albedo mode '{other}' (expected 'textured' or 'vertex_color')"
            )),
        }
    }
}

/// Whether albedo is modulated by SH irradiance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadingMode {
    /// Albedo passes through unmodified.
    Shadeless,
    /// Albedo is multiplied per channel by SH irradiance at the face normal.
    Shaded,
}

impl FromStr for ShadingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shadeless" => Ok(Self::Shadeless),
            "shaded" => Ok(Self::Shaded),
            other => Err(format!(
                "unknown shading mode '{other}' (expected 'shadeless' or 'shaded')"
            )),
        }
    }
}

/// Fixed renderer configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RenderSettings {
    pub width: usize,
    pub height: usize,
    /// Number of cameras every forward call must supply.
    pub num_cameras: usize,
    pub albedo_mode: AlbedoMode,
    pub shading_mode: ShadingMode,
    /// How UVs map to texels at and beyond the [0, 1] boundary.
    pub uv_policy: UvPolicy,
    /// Odd box-filter width applied to the rendered image. 1 disables it.
    pub image_filter_size: usize,
    /// Odd box-filter width applied to each texture before sampling.
    /// 1 disables it.
    pub texture_filter_size: usize,
    /// Color written to pixels no face covers. Receives no gradient.
    pub background: Vector3<f32>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            num_cameras: 1,
            albedo_mode: AlbedoMode::Textured,
            shading_mode: ShadingMode::Shaded,
            uv_policy: UvPolicy::Clamp,
            image_filter_size: 1,
            texture_filter_size: 1,
            background: Vector3::zeros(),
        }
    }
}

impl RenderSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::ZeroResolution {
                width: self.width,
                height: self.height,
            });
        }
        if self.num_cameras == 0 {
            return Err(ConfigError::NoCameras);
        }
        for (which, size) in [
            ("image", self.image_filter_size),
            ("texture", self.texture_filter_size),
        ] {
            if size == 0 || size % 2 == 0 {
                return Err(ConfigError::BadFilterSize { which, size });
            }
        }
        Ok(())
    }

    pub fn pixels_per_view(&self) -> usize {
        self.width * self.height
    }
}
