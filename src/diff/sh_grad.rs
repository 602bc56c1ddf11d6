//! Gradients for spherical harmonics irradiance.
//!
//! Forward op (in `core/sh.rs`):
//! `irradiance = sum_i basis[i] * coeffs[i]` (per-channel), with the basis
//! evaluated at the face normal.
//!
//! Two paths:
//! - w.r.t. the coefficients: a pure linear map, so the derivative is exact
//!   (the basis values themselves).
//! - w.r.t. the normal: the basis polynomials differentiated at the normal,
//!   contracted with the per-basis upstream weight.

use crate::core::{sh_basis, ShCoefficients, SH_COEFF_COUNT};
use nalgebra::Vector3;

/// Gradient of `evaluate_irradiance` w.r.t. the SH coefficients.
///
/// Given the basis at the normal and the upstream gradient dL/d(irradiance),
/// returns dL/d(coeffs) in the same `[i][rgb]` layout as the coefficients.
pub fn irradiance_grad_coeffs(
    basis: &[f32; SH_COEFF_COUNT],
    d_irradiance: &Vector3<f32>,
) -> ShCoefficients {
    let mut d_coeffs = [[0.0f32; 3]; SH_COEFF_COUNT];
    for i in 0..SH_COEFF_COUNT {
        let b = basis[i];
        d_coeffs[i][0] = d_irradiance.x * b;
        d_coeffs[i][1] = d_irradiance.y * b;
        d_coeffs[i][2] = d_irradiance.z * b;
    }
    d_coeffs
}

/// Gradient of `evaluate_irradiance` w.r.t. the (unit) normal.
///
/// Basis ordering `[1, ny, nz, nx, nx*ny, nz*ny, 3nz^2-1, nx*nz, nx^2-ny^2]`
/// differentiates to:
///   d/dnx = [0, 0, 0, 1, ny, 0, 0, nz, 2nx]
///   d/dny = [0, 1, 0, 0, nx, nz, 0, 0, -2ny]
///   d/dnz = [0, 0, 1, 0, 0, ny, 6nz, nx, 0]
/// Each term is weighted by `s_i = dot(coeffs[i], d_irradiance)`.
pub fn irradiance_grad_normal(
    coeffs: &ShCoefficients,
    normal: &Vector3<f32>,
    d_irradiance: &Vector3<f32>,
) -> Vector3<f32> {
    let (nx, ny, nz) = (normal.x, normal.y, normal.z);
    let mut s = [0.0f32; SH_COEFF_COUNT];
    for i in 0..SH_COEFF_COUNT {
        s[i] = coeffs[i][0] * d_irradiance.x
            + coeffs[i][1] * d_irradiance.y
            + coeffs[i][2] * d_irradiance.z;
    }

    Vector3::new(
        s[3] + s[4] * ny + s[7] * nz + s[8] * 2.0 * nx,
        s[1] + s[4] * nx + s[5] * nz - s[8] * 2.0 * ny,
        s[2] + s[5] * ny + s[6] * 6.0 * nz + s[7] * nx,
    )
}
