//! Image losses with analytic gradients.

use crate::render::RenderBuffer;
use nalgebra::Vector3;

/// Mean squared error over one image, returning `(loss, d_rendered)`.
///
/// `rendered` and `target` are linear RGB in [0,1]. The loss sums squared
/// error over channels and averages over pixels.
pub fn l2_image_loss_and_grad(
    rendered: &[Vector3<f32>],
    target: &[Vector3<f32>],
) -> (f32, Vec<Vector3<f32>>) {
    assert_eq!(rendered.len(), target.len());
    let n = rendered.len().max(1) as f32;
    let scale = 2.0 / n;

    let mut loss = 0.0f32;
    let d = rendered
        .iter()
        .zip(target)
        .map(|(r, t)| {
            let diff = r - t;
            loss += diff.norm_squared();
            diff * scale
        })
        .collect();

    (loss / n, d)
}

/// Mean squared error over every view of a batched render, returning the
/// loss and its gradient as an upstream buffer for [`Renderer::backward`].
///
/// [`Renderer::backward`]: crate::render::Renderer::backward
pub fn l2_render_loss_and_grad(rendered: &RenderBuffer, target: &RenderBuffer) -> (f32, RenderBuffer) {
    assert_eq!(rendered.pixels().len(), target.pixels().len());
    let n = rendered.pixels().len() as f32;

    let mut d = RenderBuffer::zeros(
        rendered.batches(),
        rendered.cameras(),
        rendered.width(),
        rendered.height(),
    );
    let mut loss = 0.0f32;
    for (i, (r, t)) in rendered.pixels().iter().zip(target.pixels()).enumerate() {
        let diff = r - t;
        loss += diff.norm_squared();
        d.pixels_mut()[i] = diff * (2.0 / n);
    }

    (loss / n, d)
}
