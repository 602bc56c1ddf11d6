//! Gradient building blocks and the backward pass.
//!
//! Each `*_grad` submodule is the adjoint of one forward operation and is
//! testable against central differences on its own; `backward` chains them
//! over a recorded forward pass.

mod backward;
pub mod bary_grad;
pub mod filter_grad;
pub mod normal_grad;
pub mod project_grad;
pub mod sample_grad;
pub mod sh_grad;

pub use backward::InputGrads;
pub(crate) use backward::backward_pass;
pub use bary_grad::{barycentric_with_grads, BaryGrads};
pub use filter_grad::box_filter_adjoint;
pub use normal_grad::{face_normal_grad_corners, FaceNormalGrads};
pub use project_grad::{camera_point_grad_world, screen_grad_camera_point};
pub use sample_grad::{sample_bilinear_with_grads, SampleGrads, TexelTap};
pub use sh_grad::{irradiance_grad_coeffs, irradiance_grad_normal};
