//! Float RGB texture storage and bilinear sampling.
//!
//! Texels are linear-space RGB in [0, 1], stored row-major with texel
//! (0, 0) at the start of the buffer. UV (0, 0) addresses that first texel;
//! there is no vertical flip. The same container doubles as the per-texel
//! gradient buffer in the backward pass.

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised when constructing or loading a [`Texture`].
#[derive(Debug, Error)]
pub enum TextureError {
    #[error("texture dimensions must be non-zero, got {width}x{height}")]
    EmptyDimensions { width: usize, height: usize },

    #[error("texture {width}x{height} needs {expected} texels, got {got}")]
    TexelCountMismatch {
        width: usize,
        height: usize,
        expected: usize,
        got: usize,
    },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// How UV coordinates map onto the texel grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UvPolicy {
    /// u = 0 and u = 1 land exactly on the first and last texel centers;
    /// coordinates outside [0, 1] clamp to the border.
    #[default]
    Clamp,
    /// The texture tiles. u = 0 and u = 1 are the same point, and samples
    /// interpolate across the seam.
    Wrap,
}

/// Bilinear tap positions along one texture axis, plus the local derivative
/// of the continuous texel coordinate with respect to the UV coordinate.
///
/// Shared between forward sampling and the sampling adjoint so both sides
/// agree on tap selection exactly.
#[derive(Clone, Copy, Debug)]
pub(crate) struct AxisTaps {
    pub lo: usize,
    pub hi: usize,
    pub frac: f32,
    pub dcoord: f32,
}

/// Compute the two bilinear taps for `coord` on an axis with `len` texels.
pub(crate) fn axis_taps(coord: f32, len: usize, policy: UvPolicy) -> AxisTaps {
    debug_assert!(len > 0);
    match policy {
        UvPolicy::Clamp => {
            let scale = (len - 1) as f32;
            let x = coord.clamp(0.0, 1.0) * scale;
            let lo = (x.floor() as usize).min(len - 1);
            let hi = (lo + 1).min(len - 1);
            let dcoord = if (0.0..=1.0).contains(&coord) {
                scale
            } else {
                0.0
            };
            AxisTaps {
                lo,
                hi,
                frac: x - lo as f32,
                dcoord,
            }
        }
        UvPolicy::Wrap => {
            // Texel centers sit at (i + 0.5) / len, so shift by half a texel
            // before splitting into base + fraction.
            let x = coord.rem_euclid(1.0) * len as f32 - 0.5;
            let base = x.floor();
            let lo = (base as i64).rem_euclid(len as i64) as usize;
            let hi = (base as i64 + 1).rem_euclid(len as i64) as usize;
            AxisTaps {
                lo,
                hi,
                frac: x - base,
                dcoord: len as f32,
            }
        }
    }
}

/// A row-major float RGB image.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    width: usize,
    height: usize,
    texels: Vec<Vector3<f32>>,
}

impl Texture {
    /// Build a texture from an existing texel buffer (row-major, length
    /// `width * height`).
    pub fn new(
        width: usize,
        height: usize,
        texels: Vec<Vector3<f32>>,
    ) -> Result<Self, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::EmptyDimensions { width, height });
        }
        if texels.len() != width * height {
            return Err(TextureError::TexelCountMismatch {
                width,
                height,
                expected: width * height,
                got: texels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            texels,
        })
    }

    /// All-zero texture, also used as a gradient accumulator.
    pub fn zeros(width: usize, height: usize) -> Result<Self, TextureError> {
        Self::new(width, height, vec![Vector3::zeros(); width * height])
    }

    /// Constant-color texture.
    pub fn filled(width: usize, height: usize, color: Vector3<f32>) -> Result<Self, TextureError> {
        Self::new(width, height, vec![color; width * height])
    }

    /// Same dimensions, replacement texel buffer. For filtered copies and
    /// gradient accumulators mirroring an existing texture.
    pub(crate) fn with_texels(&self, texels: Vec<Vector3<f32>>) -> Self {
        debug_assert_eq!(texels.len(), self.texels.len());
        Self {
            width: self.width,
            height: self.height,
            texels,
        }
    }

    /// Load an RGB image file and normalize 8-bit values to [0, 1].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TextureError> {
        let img = image::open(path)?.to_rgb8();
        let (width, height) = img.dimensions();
        let texels = img
            .pixels()
            .map(|p| {
                let [r, g, b] = p.0;
                Vector3::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
            })
            .collect();
        Self::new(width as usize, height as usize, texels)
    }

    /// Quantize to 8-bit RGB and save. The format follows the file extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), TextureError> {
        let mut img = image::RgbImage::new(self.width as u32, self.height as u32);
        for (i, texel) in self.texels.iter().enumerate() {
            let x = (i % self.width) as u32;
            let y = (i / self.width) as u32;
            let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
            img.put_pixel(x, y, image::Rgb([q(texel.x), q(texel.y), q(texel.z)]));
        }
        img.save(path)?;
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn texels(&self) -> &[Vector3<f32>] {
        &self.texels
    }

    pub fn texels_mut(&mut self) -> &mut [Vector3<f32>] {
        &mut self.texels
    }

    #[inline]
    pub fn texel(&self, x: usize, y: usize) -> Vector3<f32> {
        self.texels[y * self.width + x]
    }

    #[inline]
    pub fn add_texel(&mut self, x: usize, y: usize, delta: Vector3<f32>) {
        self.texels[y * self.width + x] += delta;
    }

    /// Sample with bilinear filtering.
    ///
    /// The four taps and interpolation weights come from [`axis_taps`], which
    /// the sampling adjoint reuses, so forward and backward always touch the
    /// same texels.
    pub fn sample_bilinear(&self, uv: Vector2<f32>, policy: UvPolicy) -> Vector3<f32> {
        let tx = axis_taps(uv.x, self.width, policy);
        let ty = axis_taps(uv.y, self.height, policy);
        let t00 = self.texel(tx.lo, ty.lo);
        let t10 = self.texel(tx.hi, ty.lo);
        let t01 = self.texel(tx.lo, ty.hi);
        let t11 = self.texel(tx.hi, ty.hi);
        let top = t00.lerp(&t10, tx.frac);
        let bottom = t01.lerp(&t11, tx.frac);
        top.lerp(&bottom, ty.frac)
    }
}
