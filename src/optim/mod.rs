//! Optimization components: losses and first-order parameter updates.

pub mod adam;
pub mod isometry;
pub mod loss;

pub use adam::{AdamSh, AdamVec3, SgdVec3};
pub use isometry::IsometryLoss;
pub use loss::{l2_image_loss_and_grad, l2_render_loss_and_grad};
