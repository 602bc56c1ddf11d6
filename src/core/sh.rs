//! Spherical harmonics irradiance for diffuse shading.
//!
//! Each camera carries 9 RGB coefficients of a degree-2 SH expansion of the
//! incoming light. Shading evaluates the basis at the camera-space surface
//! normal and takes a per-channel dot product with the coefficients, then
//! multiplies the albedo by the result.
//!
//! The evaluation is linear in the coefficients and is not clamped here;
//! clamping to displayable range happens only at 8-bit export.

use nalgebra::Vector3;

/// Number of SH basis functions (degree 0 through 2).
pub const SH_COEFF_COUNT: usize = 9;

/// RGB coefficients for the 9 basis functions, `coeffs[i] = [r, g, b]`.
pub type ShCoefficients = [[f32; 3]; SH_COEFF_COUNT];

/// Evaluate the 9 SH basis functions at a direction.
///
/// Ordering (unnormalized polynomial form, degree 0..=2):
/// `[1, ny, nz, nx, nx*ny, nz*ny, 3*nz^2 - 1, nx*nz, nx^2 - ny^2]`.
///
/// The direction is used as given; callers pass a unit normal (or the zero
/// vector for degenerate faces, which still yields a finite basis).
pub fn sh_basis(normal: &Vector3<f32>) -> [f32; SH_COEFF_COUNT] {
    let (nx, ny, nz) = (normal.x, normal.y, normal.z);
    [
        1.0,
        ny,
        nz,
        nx,
        nx * ny,
        nz * ny,
        3.0 * nz * nz - 1.0,
        nx * nz,
        nx * nx - ny * ny,
    ]
}

/// Per-channel irradiance at a normal: `dot(basis, coeffs)` for R, G, B.
pub fn evaluate_irradiance(coeffs: &ShCoefficients, normal: &Vector3<f32>) -> Vector3<f32> {
    let basis = sh_basis(normal);
    let mut irradiance = Vector3::<f32>::zeros();
    for (b, c) in basis.iter().zip(coeffs.iter()) {
        irradiance.x += b * c[0];
        irradiance.y += b * c[1];
        irradiance.z += b * c[2];
    }
    irradiance
}

/// Coefficients that shade every normal with unit white irradiance.
pub fn neutral_coefficients() -> ShCoefficients {
    let mut coeffs = [[0.0f32; 3]; SH_COEFF_COUNT];
    coeffs[0] = [1.0, 1.0, 1.0];
    coeffs
}
