//! # rastgrad: differentiable mesh rasterization on the CPU
//!
//! Renders a fixed-topology triangle mesh into batched multi-camera RGB
//! frames and computes analytic gradients of any scalar image loss with
//! respect to vertex positions, vertex colors, texture texels, and
//! per-camera spherical-harmonics lighting.
//!
//! ## Architecture
//!
//! - `core`: mesh topology, cameras, textures, SH lighting, math utilities
//! - `io`: OBJ meshes and multi-camera calibration files
//! - `render`: forward pipeline (project, rasterize, shade, filter)
//! - `diff`: per-operation adjoints and the assembled backward pass
//! - `optim`: image losses, the isometry regularizer, SGD/Adam updates
//!
//! The forward pass records per-pixel coverage (winning face, barycentric
//! weights, depth); the backward pass replays shading at covered pixels and
//! pushes gradients through sampling, lighting, barycentrics, and projection.
//! Coverage itself is treated as locally constant, so gradients are exact
//! wherever the visible-face assignment does not change.

pub mod core;
pub mod diff;
pub mod io;
pub mod optim;
pub mod render;

// Re-export commonly used types at crate root for convenience
pub use core::{Camera, MeshTopology, ShCoefficients, Texture};
pub use render::{FrameInputs, RenderBuffer, RenderSettings, Renderer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
