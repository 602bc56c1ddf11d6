//! Gradients for bilinear texture sampling.
//!
//! Forward (in `core::Texture::sample_bilinear`):
//!   value = (1-fy) * ((1-fx) * T00 + fx * T10)
//!         +    fy  * ((1-fx) * T01 + fx * T11)
//! where (fx, fy) are the in-cell fractions and Tij the four taps chosen by
//! `axis_taps`.
//!
//! Two gradient paths leave the sample:
//! - w.r.t. the UV coordinate (chained into barycentric and vertex grads):
//!   d(value)/du = ((1-fy) * (T10 - T00) + fy * (T11 - T01)) * dcoord_u
//!   and symmetrically for v. `dcoord` is the axis_taps derivative of the
//!   continuous texel coordinate, zero where clamping is active.
//! - w.r.t. the four tapped texels: the bilinear weights themselves.
//!
//! Both paths reuse `axis_taps`, so they touch exactly the texels the
//! forward pass read.

use crate::core::{axis_taps, Texture, UvPolicy};
use nalgebra::{Vector2, Vector3};

/// One texel tap: position and bilinear weight.
#[derive(Clone, Copy, Debug)]
pub struct TexelTap {
    pub x: usize,
    pub y: usize,
    pub weight: f32,
}

/// Sample value plus everything needed to push gradients backward.
#[derive(Clone, Copy, Debug)]
pub struct SampleGrads {
    pub value: Vector3<f32>,
    /// d(value)/du per channel, already scaled by the UV-to-texel factor.
    pub d_u: Vector3<f32>,
    /// d(value)/dv per channel.
    pub d_v: Vector3<f32>,
    /// The four taps with their interpolation weights.
    pub taps: [TexelTap; 4],
}

/// Evaluate a bilinear sample with gradients w.r.t. UV and taps.
pub fn sample_bilinear_with_grads(
    texture: &Texture,
    uv: Vector2<f32>,
    policy: UvPolicy,
) -> SampleGrads {
    let tx = axis_taps(uv.x, texture.width(), policy);
    let ty = axis_taps(uv.y, texture.height(), policy);

    let t00 = texture.texel(tx.lo, ty.lo);
    let t10 = texture.texel(tx.hi, ty.lo);
    let t01 = texture.texel(tx.lo, ty.hi);
    let t11 = texture.texel(tx.hi, ty.hi);

    let (fx, fy) = (tx.frac, ty.frac);
    let top = t00.lerp(&t10, fx);
    let bottom = t01.lerp(&t11, fx);
    let value = top.lerp(&bottom, fy);

    let d_u = ((t10 - t00) * (1.0 - fy) + (t11 - t01) * fy) * tx.dcoord;
    let d_v = (bottom - top) * ty.dcoord;

    let taps = [
        TexelTap {
            x: tx.lo,
            y: ty.lo,
            weight: (1.0 - fx) * (1.0 - fy),
        },
        TexelTap {
            x: tx.hi,
            y: ty.lo,
            weight: fx * (1.0 - fy),
        },
        TexelTap {
            x: tx.lo,
            y: ty.hi,
            weight: (1.0 - fx) * fy,
        },
        TexelTap {
            x: tx.hi,
            y: ty.hi,
            weight: fx * fy,
        },
    ];

    SampleGrads {
        value,
        d_u,
        d_v,
        taps,
    }
}
