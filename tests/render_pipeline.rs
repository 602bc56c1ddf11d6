//! Pipeline-level behavior tests
//!
//! Cross-cutting properties of forward and backward that the per-module unit
//! tests cannot see:
//! - Bitwise determinism of the forward pass
//! - Camera order only permutes views
//! - Backward is linear in the upstream gradient
//! - Degenerate scenes render background and produce zero gradients
//! - Shape mismatches are rejected, not rendered

use approx::assert_relative_eq;
use nalgebra::{Matrix3, Vector2, Vector3};

use rastgrad::core::UvPolicy;
use rastgrad::render::{AlbedoMode, RenderError, ShadingMode};
use rastgrad::{
    Camera, FrameInputs, MeshTopology, RenderBuffer, RenderSettings, Renderer, Texture,
};

fn quad_topology() -> MeshTopology {
    let c = |u, v| Vector2::new(u, v);
    MeshTopology::new(
        4,
        vec![[0, 1, 2], [0, 2, 3]],
        vec![
            [c(0.0, 0.0), c(1.0, 0.0), c(1.0, 1.0)],
            [c(0.0, 0.0), c(1.0, 1.0), c(0.0, 1.0)],
        ],
    )
    .unwrap()
}

fn quad_vertices() -> Vec<Vec<Vector3<f32>>> {
    vec![vec![
        Vector3::new(-0.5, -0.5, 2.0),
        Vector3::new(0.5, -0.5, 2.0),
        Vector3::new(0.5, 0.5, 2.0),
        Vector3::new(-0.5, 0.5, 2.0),
    ]]
}

fn test_settings(albedo: AlbedoMode) -> RenderSettings {
    RenderSettings {
        width: 16,
        height: 16,
        num_cameras: 1,
        albedo_mode: albedo,
        shading_mode: ShadingMode::Shadeless,
        uv_policy: UvPolicy::Clamp,
        image_filter_size: 1,
        texture_filter_size: 1,
        background: Vector3::zeros(),
    }
}

fn front_camera() -> Camera {
    Camera::new(
        16.0,
        16.0,
        8.0,
        8.0,
        Matrix3::identity(),
        Vector3::zeros(),
    )
}

/// Checkerboard-ish texture so neighboring pixels render distinct colors.
fn ramp_texture(width: usize, height: usize) -> Texture {
    let texels = (0..width * height)
        .map(|i| {
            let x = (i % width) as f32 / width as f32;
            let y = (i / width) as f32 / height as f32;
            Vector3::new(x, y, ((i % 2) as f32) * 0.5 + 0.25)
        })
        .collect();
    Texture::new(width, height, texels).unwrap()
}

#[test]
fn test_forward_is_deterministic() {
    let renderer = Renderer::new(quad_topology(), test_settings(AlbedoMode::Textured)).unwrap();
    let cameras = vec![front_camera()];
    let vertices = quad_vertices();
    let textures = vec![ramp_texture(8, 8)];
    let inputs = FrameInputs {
        vertices: &vertices,
        textures: &textures,
        ..Default::default()
    };

    let first = renderer.forward(&cameras, &inputs).unwrap();
    let second = renderer.forward(&cameras, &inputs).unwrap();

    // Bit-for-bit: pixels are written by disjoint parallel rows, so there is
    // no accumulation order to vary between runs.
    assert_eq!(first.render.pixels(), second.render.pixels());
    for y in 0..16 {
        for x in 0..16 {
            assert_eq!(
                first.coverage.face_id(0, 0, x, y),
                second.coverage.face_id(0, 0, x, y)
            );
        }
    }
}

#[test]
fn test_camera_order_only_permutes_views() {
    let mut settings = test_settings(AlbedoMode::Textured);
    settings.num_cameras = 2;
    let renderer = Renderer::new(quad_topology(), settings).unwrap();
    let vertices = quad_vertices();
    let textures = vec![ramp_texture(8, 8)];
    let inputs = FrameInputs {
        vertices: &vertices,
        textures: &textures,
        ..Default::default()
    };

    let offset_camera = Camera::new(
        16.0,
        16.0,
        8.0,
        8.0,
        Matrix3::identity(),
        Vector3::new(-0.25, 0.0, 0.0),
    );

    let order_a = [front_camera(), offset_camera.clone()];
    let order_b = [offset_camera, front_camera()];
    let forward = renderer.forward(&order_a, &inputs).unwrap();
    let swapped = renderer.forward(&order_b, &inputs).unwrap();

    assert_eq!(forward.render.view(0, 0), swapped.render.view(0, 1));
    assert_eq!(forward.render.view(0, 1), swapped.render.view(0, 0));
    // The two cameras see different images, so the swap is observable.
    assert_ne!(forward.render.view(0, 0), forward.render.view(0, 1));

    // Feeding the swapped order the view-permuted upstream must produce the
    // same parameter gradients, up to f32 reduction order.
    let mut upstream = RenderBuffer::zeros(1, 2, 16, 16);
    for (i, px) in upstream.pixels_mut().iter_mut().enumerate() {
        let t = i as f32;
        *px = Vector3::new((0.13 * t).sin(), (0.29 * t).cos(), 0.05 + 0.001 * t);
    }
    let mut permuted = RenderBuffer::zeros(1, 2, 16, 16);
    permuted.view_mut(0, 0).copy_from_slice(upstream.view(0, 1));
    permuted.view_mut(0, 1).copy_from_slice(upstream.view(0, 0));

    let grads = renderer
        .backward(&order_a, &inputs, &forward, &upstream)
        .unwrap();
    let swapped_grads = renderer
        .backward(&order_b, &inputs, &swapped, &permuted)
        .unwrap();

    for vertex in 0..4 {
        assert_relative_eq!(
            grads.d_vertices[0][vertex],
            swapped_grads.d_vertices[0][vertex],
            epsilon = 1e-4,
            max_relative = 1e-4
        );
    }
    let mut texel_norm = 0.0f32;
    for (a, b) in grads.d_textures[0]
        .texels()
        .iter()
        .zip(swapped_grads.d_textures[0].texels())
    {
        assert_relative_eq!(a, b, epsilon = 1e-4, max_relative = 1e-4);
        texel_norm += a.norm();
    }
    assert!(texel_norm > 0.0);
}

#[test]
fn test_backward_is_additive_in_upstream() {
    // backward(u1) + backward(u2) == backward(u1 + u2) up to f32 reduction
    // order. The parallel fold may merge per-pixel terms in a different
    // grouping for different upstreams, so the comparison is approximate.
    let renderer = Renderer::new(quad_topology(), test_settings(AlbedoMode::Textured)).unwrap();
    let cameras = vec![front_camera()];
    let vertices = quad_vertices();
    let textures = vec![ramp_texture(8, 8)];
    let inputs = FrameInputs {
        vertices: &vertices,
        textures: &textures,
        ..Default::default()
    };
    let pass = renderer.forward(&cameras, &inputs).unwrap();

    let mut first = RenderBuffer::zeros(1, 1, 16, 16);
    let mut second = RenderBuffer::zeros(1, 1, 16, 16);
    let mut combined = RenderBuffer::zeros(1, 1, 16, 16);
    for (i, ((a, b), c)) in first
        .pixels_mut()
        .iter_mut()
        .zip(second.pixels_mut())
        .zip(combined.pixels_mut())
        .enumerate()
    {
        let x = (i % 16) as f32;
        let y = (i / 16) as f32;
        *a = Vector3::new((0.3 * x).sin(), (0.7 * y).cos(), 0.1);
        *b = Vector3::new(0.5, (0.2 * x).cos(), (0.4 * y).sin());
        *c = *a + *b;
    }

    let grads_first = renderer.backward(&cameras, &inputs, &pass, &first).unwrap();
    let grads_second = renderer.backward(&cameras, &inputs, &pass, &second).unwrap();
    let grads_combined = renderer
        .backward(&cameras, &inputs, &pass, &combined)
        .unwrap();

    for vertex in 0..4 {
        let sum = grads_first.d_vertices[0][vertex] + grads_second.d_vertices[0][vertex];
        let both = grads_combined.d_vertices[0][vertex];
        for axis in 0..3 {
            assert_relative_eq!(sum[axis], both[axis], epsilon = 1e-4, max_relative = 1e-4);
        }
    }
    for (sum, both) in grads_first
        .d_textures[0]
        .texels()
        .iter()
        .zip(grads_second.d_textures[0].texels())
        .map(|(a, b)| a + b)
        .zip(grads_combined.d_textures[0].texels())
    {
        for channel in 0..3 {
            assert_relative_eq!(
                sum[channel],
                both[channel],
                epsilon = 1e-4,
                max_relative = 1e-4
            );
        }
    }
}

#[test]
fn test_degenerate_scene_renders_background_with_zero_gradients() {
    // One zero-area face plus one face fully behind the camera: nothing is
    // covered, every pixel is background, and the backward pass returns
    // all-zero gradients of the right shapes.
    let c = |u, v| Vector2::new(u, v);
    let topology = MeshTopology::new(
        6,
        vec![[0, 1, 2], [3, 4, 5]],
        vec![
            [c(0.0, 0.0), c(1.0, 0.0), c(0.0, 1.0)],
            [c(0.0, 0.0), c(1.0, 0.0), c(0.0, 1.0)],
        ],
    )
    .unwrap();
    let mut settings = test_settings(AlbedoMode::Textured);
    settings.background = Vector3::new(0.1, 0.2, 0.3);
    let renderer = Renderer::new(topology, settings).unwrap();
    let cameras = vec![front_camera()];

    let vertices = vec![vec![
        // Collinear: zero screen area.
        Vector3::new(-0.5, 0.0, 2.0),
        Vector3::new(0.0, 0.0, 2.0),
        Vector3::new(0.5, 0.0, 2.0),
        // Behind the camera.
        Vector3::new(-0.5, -0.5, -2.0),
        Vector3::new(0.5, -0.5, -2.0),
        Vector3::new(0.0, 0.5, -2.0),
    ]];
    let textures = vec![ramp_texture(4, 4)];
    let inputs = FrameInputs {
        vertices: &vertices,
        textures: &textures,
        ..Default::default()
    };

    let pass = renderer.forward(&cameras, &inputs).unwrap();
    assert_eq!(pass.coverage.coverage_ratio(), 0.0);
    for pixel in pass.render.pixels() {
        assert_eq!(*pixel, Vector3::new(0.1, 0.2, 0.3));
    }

    let mut upstream = RenderBuffer::zeros(1, 1, 16, 16);
    for pixel in upstream.pixels_mut() {
        *pixel = Vector3::new(1.0, 1.0, 1.0);
    }
    let grads = renderer.backward(&cameras, &inputs, &pass, &upstream).unwrap();

    assert_eq!(grads.d_vertices[0].len(), 6);
    for d in &grads.d_vertices[0] {
        assert_eq!(*d, Vector3::zeros());
    }
    assert_eq!(grads.d_textures[0].texels().len(), 16);
    for d in grads.d_textures[0].texels() {
        assert_eq!(*d, Vector3::zeros());
    }
}

#[test]
fn test_single_texel_texture_renders_flat() {
    // A 1x1 texture bilinearly sampled anywhere is that texel, under either
    // UV policy. With all-ones upstream its gradient is the covered count.
    for policy in [UvPolicy::Clamp, UvPolicy::Wrap] {
        let mut settings = test_settings(AlbedoMode::Textured);
        settings.uv_policy = policy;
        let renderer = Renderer::new(quad_topology(), settings).unwrap();
        let cameras = vec![front_camera()];
        let vertices = quad_vertices();
        let texel = Vector3::new(0.2, 0.4, 0.8);
        let textures = vec![Texture::new(1, 1, vec![texel]).unwrap()];
        let inputs = FrameInputs {
            vertices: &vertices,
            textures: &textures,
            ..Default::default()
        };

        let pass = renderer.forward(&cameras, &inputs).unwrap();
        let mut covered = 0usize;
        for y in 0..16 {
            for x in 0..16 {
                if pass.coverage.face_id(0, 0, x, y) >= 0 {
                    covered += 1;
                    assert_eq!(pass.render.pixel(0, 0, x, y), texel, "policy {policy:?}");
                }
            }
        }
        assert!(covered > 0);

        let mut upstream = RenderBuffer::zeros(1, 1, 16, 16);
        for pixel in upstream.pixels_mut() {
            *pixel = Vector3::new(1.0, 1.0, 1.0);
        }
        let grads = renderer.backward(&cameras, &inputs, &pass, &upstream).unwrap();
        let d = grads.d_textures[0].texels()[0];
        for channel in 0..3 {
            assert_relative_eq!(d[channel], covered as f32, epsilon = 1e-3);
        }
    }
}

#[test]
fn test_upstream_shape_mismatch_rejected() {
    let renderer = Renderer::new(quad_topology(), test_settings(AlbedoMode::Textured)).unwrap();
    let cameras = vec![front_camera()];
    let vertices = quad_vertices();
    let textures = vec![ramp_texture(4, 4)];
    let inputs = FrameInputs {
        vertices: &vertices,
        textures: &textures,
        ..Default::default()
    };

    let pass = renderer.forward(&cameras, &inputs).unwrap();
    let wrong = RenderBuffer::zeros(1, 1, 8, 8);
    let result = renderer.backward(&cameras, &inputs, &pass, &wrong);
    assert!(matches!(
        result,
        Err(RenderError::UpstreamShapeMismatch { .. })
    ));
}
