//! Core data structures and mathematical operations.
//!
//! This module contains the fundamental types used throughout the system:
//! - `MeshTopology`: triangle faces, per-face UVs, edge adjacency
//! - `Camera`: camera intrinsics and extrinsics
//! - `Texture`: float RGB images and bilinear sampling
//! - SH irradiance for diffuse shading
//!
//! All types here are "pure data" - no rendering logic.

mod camera;
mod math;
mod mesh;
mod sh;
mod texture;

// Re-export public types
pub use camera::Camera;
pub use math::{edge_function, normalize_or_zero, perspective_jacobian};
pub use mesh::{MeshEdge, MeshError, MeshTopology};
pub use sh::{evaluate_irradiance, neutral_coefficients, sh_basis, ShCoefficients, SH_COEFF_COUNT};
pub use texture::{Texture, TextureError, UvPolicy};

pub(crate) use texture::{axis_taps, AxisTaps};
