//! Output and intermediate buffers for batched multi-camera rendering.
//!
//! All buffers are dense row-major arrays over (batch, camera, y, x). The
//! coverage buffer is the bridge between forward and backward: it records,
//! per pixel, which face won the depth test and where inside it the pixel
//! center landed, so the backward pass never re-rasterizes.

use crate::core::Texture;
use nalgebra::Vector3;

/// Face id stored for pixels no face covers.
pub const BACKGROUND_FACE: i32 = -1;

/// Linear RGB frames for every (batch, camera) pair.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderBuffer {
    batches: usize,
    cameras: usize,
    width: usize,
    height: usize,
    pixels: Vec<Vector3<f32>>,
}

impl RenderBuffer {
    pub fn zeros(batches: usize, cameras: usize, width: usize, height: usize) -> Self {
        Self::filled(batches, cameras, width, height, Vector3::zeros())
    }

    pub fn filled(
        batches: usize,
        cameras: usize,
        width: usize,
        height: usize,
        color: Vector3<f32>,
    ) -> Self {
        Self {
            batches,
            cameras,
            width,
            height,
            pixels: vec![color; batches * cameras * width * height],
        }
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn cameras(&self) -> usize {
        self.cameras
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn view_offset(&self, batch: usize, camera: usize) -> usize {
        (batch * self.cameras + camera) * self.width * self.height
    }

    /// One camera's frame as a flat `height * width` pixel slice.
    pub fn view(&self, batch: usize, camera: usize) -> &[Vector3<f32>] {
        let start = self.view_offset(batch, camera);
        &self.pixels[start..start + self.width * self.height]
    }

    pub fn view_mut(&mut self, batch: usize, camera: usize) -> &mut [Vector3<f32>] {
        let start = self.view_offset(batch, camera);
        let end = start + self.width * self.height;
        &mut self.pixels[start..end]
    }

    #[inline]
    pub fn pixel(&self, batch: usize, camera: usize, x: usize, y: usize) -> Vector3<f32> {
        self.pixels[self.view_offset(batch, camera) + y * self.width + x]
    }

    #[inline]
    pub fn set_pixel(
        &mut self,
        batch: usize,
        camera: usize,
        x: usize,
        y: usize,
        color: Vector3<f32>,
    ) {
        let i = self.view_offset(batch, camera) + y * self.width + x;
        self.pixels[i] = color;
    }

    pub fn pixels(&self) -> &[Vector3<f32>] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Vector3<f32>] {
        &mut self.pixels
    }

    /// Quantize one view to an 8-bit RGB image.
    pub fn frame_rgb8(&self, batch: usize, camera: usize) -> image::RgbImage {
        let mut img = image::RgbImage::new(self.width as u32, self.height as u32);
        for (i, px) in self.view(batch, camera).iter().enumerate() {
            let x = (i % self.width) as u32;
            let y = (i / self.width) as u32;
            let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
            img.put_pixel(x, y, image::Rgb([q(px.x), q(px.y), q(px.z)]));
        }
        img
    }

    /// Quantize one view to raw interleaved BGR bytes, row-major.
    pub fn frame_bgr8(&self, batch: usize, camera: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width * self.height * 3);
        for px in self.view(batch, camera) {
            let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
            out.push(q(px.z));
            out.push(q(px.y));
            out.push(q(px.x));
        }
        out
    }
}

/// Per-pixel rasterization result for one (batch, camera) view.
///
/// `face_ids` holds [`BACKGROUND_FACE`] where nothing was drawn. `bary`
/// stores the first two normalized barycentric weights of the winning face
/// (the third is `1 - w0 - w1`). `depths` is the interpolated camera-space
/// depth, `f32::INFINITY` for background.
#[derive(Clone, Debug)]
pub struct CoverageBuffer {
    batches: usize,
    cameras: usize,
    width: usize,
    height: usize,
    face_ids: Vec<i32>,
    bary: Vec<[f32; 2]>,
    depths: Vec<f32>,
}

/// Mutable per-view window into a [`CoverageBuffer`], handed to the
/// rasterizer so it can fill all three channels for one camera at once.
pub struct CoverageViewMut<'a> {
    pub face_ids: &'a mut [i32],
    pub bary: &'a mut [[f32; 2]],
    pub depths: &'a mut [f32],
}

/// Immutable counterpart of [`CoverageViewMut`] for shading and backward.
#[derive(Clone, Copy)]
pub struct CoverageView<'a> {
    pub face_ids: &'a [i32],
    pub bary: &'a [[f32; 2]],
    pub depths: &'a [f32],
}

impl CoverageBuffer {
    pub fn new(batches: usize, cameras: usize, width: usize, height: usize) -> Self {
        let len = batches * cameras * width * height;
        Self {
            batches,
            cameras,
            width,
            height,
            face_ids: vec![BACKGROUND_FACE; len],
            bary: vec![[0.0, 0.0]; len],
            depths: vec![f32::INFINITY; len],
        }
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn cameras(&self) -> usize {
        self.cameras
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn view_range(&self, batch: usize, camera: usize) -> std::ops::Range<usize> {
        let start = (batch * self.cameras + camera) * self.width * self.height;
        start..start + self.width * self.height
    }

    pub fn view(&self, batch: usize, camera: usize) -> CoverageView<'_> {
        let range = self.view_range(batch, camera);
        CoverageView {
            face_ids: &self.face_ids[range.clone()],
            bary: &self.bary[range.clone()],
            depths: &self.depths[range],
        }
    }

    pub fn view_mut(&mut self, batch: usize, camera: usize) -> CoverageViewMut<'_> {
        let range = self.view_range(batch, camera);
        CoverageViewMut {
            face_ids: &mut self.face_ids[range.clone()],
            bary: &mut self.bary[range.clone()],
            depths: &mut self.depths[range],
        }
    }

    #[inline]
    pub fn face_id(&self, batch: usize, camera: usize, x: usize, y: usize) -> i32 {
        self.face_ids[self.view_range(batch, camera).start + y * self.width + x]
    }

    /// Fraction of pixels covered by any face, over all views.
    pub fn coverage_ratio(&self) -> f32 {
        if self.face_ids.is_empty() {
            return 0.0;
        }
        let covered = self
            .face_ids
            .iter()
            .filter(|&&id| id != BACKGROUND_FACE)
            .count();
        covered as f32 / self.face_ids.len() as f32
    }
}

/// Everything the forward pass produces, bundled so the backward pass can
/// reuse it without recomputation.
#[derive(Debug)]
pub struct ForwardPass {
    /// Final frames, after the optional image box filter.
    pub render: RenderBuffer,
    /// Winning face, barycentrics, and depth per pixel.
    pub coverage: CoverageBuffer,
    /// Per-batch textures after the texture box filter, kept only when the
    /// filter actually ran. Shading sampled these, so the backward pass must
    /// sample and differentiate against the same texels.
    pub filtered_textures: Option<Vec<Texture>>,
}
