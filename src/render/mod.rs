//! Forward rendering pipeline (CPU implementation).
//!
//! This module implements the forward pass of mesh rasterization:
//! - Project vertices per camera
//! - Edge-function rasterization into coverage buffers
//! - Shading (albedo lookup, optional SH irradiance)
//! - Optional box filtering of textures and frames
//!
//! No gradients computed here - see `diff` module for backward passes.

pub mod buffers;
mod filter;
mod geometry;
mod raster;
mod renderer;
mod settings;
mod shade;

// Re-export
pub use buffers::{CoverageBuffer, CoverageView, ForwardPass, RenderBuffer, BACKGROUND_FACE};
pub use filter::box_filter;
pub use geometry::{face_normal, project_vertices, ProjectedVertex};
pub use renderer::{FrameInputs, RenderError, Renderer};
pub use settings::{AlbedoMode, ConfigError, RenderSettings, ShadingMode};

pub(crate) use buffers::CoverageViewMut;
pub(crate) use filter::{tap_span, window_count};
pub(crate) use shade::{face_normals, AlbedoSource};
