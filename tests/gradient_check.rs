//! End-to-end gradient checks - THE MOST IMPORTANT TESTS
//!
//! Every gradient the backward pass produces is compared against numerical
//! gradients of a scalar probe loss computed via finite differences:
//! - Probe: loss = sum over pixels of dot(render, upstream), so the upstream
//!   gradient of the rendered image is exactly `upstream`
//! - Numerical: (loss(x+ε) - loss(x-ε)) / 2ε, accumulated in f64
//! - Analytical: one backward() call
//!
//! Coverage is locally constant, so probes for vertex positions only weight
//! pixels whose whole neighborhood stays covered under ±ε. Texture, color,
//! and SH probes move no geometry and may weight every pixel.

#[cfg(test)]
mod tests {
    use nalgebra::{Matrix3, Vector2, Vector3};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use rastgrad::core::{neutral_coefficients, UvPolicy, SH_COEFF_COUNT};
    use rastgrad::render::{AlbedoMode, ForwardPass, ShadingMode, BACKGROUND_FACE};
    use rastgrad::{
        Camera, FrameInputs, MeshTopology, RenderBuffer, RenderSettings, Renderer, Texture,
    };

    // These tests are NON-NEGOTIABLE - bugs in gradients cause silent failures.
    fn rel_err(a: f32, b: f32) -> f32 {
        let denom = a.abs().max(b.abs()).max(1e-6);
        (a - b).abs() / denom
    }

    /// Unit-square quad split into two triangles along the 0-2 diagonal.
    /// UVs agree at shared corners, so sampling is continuous across it.
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

    /// Quad corners over [-0.5, 0.5]^2 on the plane
    /// `z = 2 + tilt.x * x + tilt.y * y`. A zero tilt gives normal (0, 0, 1),
    /// which kills most SH basis terms; a tilted plane exercises all nine
    /// while both faces still share one normal.
    fn quad_vertices(tilt: Vector2<f32>) -> Vec<Vector3<f32>> {
        let z = |x: f32, y: f32| 2.0 + tilt.x * x + tilt.y * y;
        vec![
            Vector3::new(-0.5, -0.5, z(-0.5, -0.5)),
            Vector3::new(0.5, -0.5, z(0.5, -0.5)),
            Vector3::new(0.5, 0.5, z(0.5, 0.5)),
            Vector3::new(-0.5, 0.5, z(-0.5, 0.5)),
        ]
    }

    fn quad_settings(side: usize, albedo: AlbedoMode, shading: ShadingMode) -> RenderSettings {
        RenderSettings {
            width: side,
            height: side,
            num_cameras: 1,
            albedo_mode: albedo,
            shading_mode: shading,
            uv_policy: UvPolicy::Clamp,
            image_filter_size: 1,
            texture_filter_size: 1,
            background: Vector3::zeros(),
        }
    }

    /// Identity-pose camera that puts the z=2 quad in the middle of a
    /// `side` x `side` frame, covering roughly half of it.
    fn front_camera(side: f32) -> Camera {
        Camera::new(
            side,
            side,
            side / 2.0,
            side / 2.0,
            Matrix3::identity(),
            Vector3::zeros(),
        )
    }

    fn random_texture(rng: &mut StdRng, width: usize, height: usize) -> Texture {
        let texels = (0..width * height)
            .map(|_| {
                Vector3::new(
                    rng.gen_range(0.1..0.9),
                    rng.gen_range(0.1..0.9),
                    rng.gen_range(0.1..0.9),
                )
            })
            .collect();
        Texture::new(width, height, texels).unwrap()
    }

    fn random_upstream(
        rng: &mut StdRng,
        batches: usize,
        cameras: usize,
        width: usize,
        height: usize,
    ) -> RenderBuffer {
        let mut upstream = RenderBuffer::zeros(batches, cameras, width, height);
        for pixel in upstream.pixels_mut() {
            *pixel = Vector3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
        }
        upstream
    }

    /// Random upstream weights on one view, restricted to pixels whose whole
    /// `margin`-Chebyshev neighborhood is covered. Position probes use this:
    /// near the silhouette a ±ε vertex move can change which pixels are
    /// covered at all, and that jump is not differentiable.
    fn interior_upstream(
        rng: &mut StdRng,
        pass: &ForwardPass,
        batch: usize,
        camera: usize,
        margin: usize,
    ) -> (RenderBuffer, usize) {
        let (width, height) = (pass.render.width(), pass.render.height());
        let mut upstream =
            RenderBuffer::zeros(pass.render.batches(), pass.render.cameras(), width, height);
        let m = margin as isize;
        let mut kept = 0;
        for y in 0..height {
            for x in 0..width {
                let mut interior = true;
                'window: for dy in -m..=m {
                    for dx in -m..=m {
                        let nx = x as isize + dx;
                        let ny = y as isize + dy;
                        if nx < 0
                            || ny < 0
                            || nx >= width as isize
                            || ny >= height as isize
                            || pass.coverage.face_id(batch, camera, nx as usize, ny as usize)
                                == BACKGROUND_FACE
                        {
                            interior = false;
                            break 'window;
                        }
                    }
                }
                if interior {
                    let weight = Vector3::new(
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-1.0..1.0),
                    );
                    upstream.set_pixel(batch, camera, x, y, weight);
                    kept += 1;
                }
            }
        }
        (upstream, kept)
    }

    /// `sum_i dot(render_i, upstream_i)` in f64, over every view.
    fn probe_loss(render: &RenderBuffer, upstream: &RenderBuffer) -> f64 {
        render
            .pixels()
            .iter()
            .zip(upstream.pixels())
            .map(|(r, u)| {
                r.x as f64 * u.x as f64 + r.y as f64 * u.y as f64 + r.z as f64 * u.z as f64
            })
            .sum()
    }

    fn forward_loss(
        renderer: &Renderer,
        cameras: &[Camera],
        inputs: &FrameInputs<'_>,
        upstream: &RenderBuffer,
    ) -> f64 {
        let pass = renderer.forward(cameras, inputs).unwrap();
        probe_loss(&pass.render, upstream)
    }

    #[test]
    fn test_texture_gradients() {
        // Texel gradients through bilinear sampling, under both UV policies.
        for policy in [UvPolicy::Clamp, UvPolicy::Wrap] {
            let mut rng = StdRng::seed_from_u64(0x7E_C5E1_u64);
            let mut settings = quad_settings(16, AlbedoMode::Textured, ShadingMode::Shadeless);
            settings.uv_policy = policy;
            let renderer = Renderer::new(quad_topology(), settings).unwrap();
            let cameras = vec![front_camera(16.0)];

            let vertices = vec![quad_vertices(Vector2::zeros())];
            let textures = vec![random_texture(&mut rng, 4, 4)];
            let inputs = FrameInputs {
                vertices: &vertices,
                textures: &textures,
                ..Default::default()
            };

            let upstream = random_upstream(&mut rng, 1, 1, 16, 16);
            let pass = renderer.forward(&cameras, &inputs).unwrap();
            let grads = renderer.backward(&cameras, &inputs, &pass, &upstream).unwrap();

            let eps = 1e-2f32;
            for texel in 0..textures[0].texels().len() {
                for channel in 0..3 {
                    let mut plus = textures[0].clone();
                    plus.texels_mut()[texel][channel] += eps;
                    let mut minus = textures[0].clone();
                    minus.texels_mut()[texel][channel] -= eps;
                    let plus = vec![plus];
                    let minus = vec![minus];

                    let loss_plus = forward_loss(
                        &renderer,
                        &cameras,
                        &FrameInputs {
                            textures: &plus,
                            ..inputs
                        },
                        &upstream,
                    );
                    let loss_minus = forward_loss(
                        &renderer,
                        &cameras,
                        &FrameInputs {
                            textures: &minus,
                            ..inputs
                        },
                        &upstream,
                    );
                    let num = ((loss_plus - loss_minus) / (2.0 * eps as f64)) as f32;
                    let ana = grads.d_textures[0].texels()[texel][channel];

                    let abs_err = (num - ana).abs();
                    assert!(
                        rel_err(num, ana) < 1e-3 || abs_err < 1e-5,
                        "texel grad mismatch ({policy:?}, texel {texel}, ch {channel}): \
                         num={num} ana={ana} abs_err={abs_err} rel_err={}",
                        rel_err(num, ana)
                    );
                }
            }
        }
    }

    #[test]
    fn test_texture_gradients_with_filters() {
        // Same probe with both box filters on: the adjoint has to smear the
        // upstream across the image window and the texel gradient across the
        // texture window.
        let mut rng = StdRng::seed_from_u64(0xF1_17E2_u64);
        let mut settings = quad_settings(16, AlbedoMode::Textured, ShadingMode::Shadeless);
        settings.image_filter_size = 3;
        settings.texture_filter_size = 3;
        let renderer = Renderer::new(quad_topology(), settings).unwrap();
        let cameras = vec![front_camera(16.0)];

        let vertices = vec![quad_vertices(Vector2::zeros())];
        let textures = vec![random_texture(&mut rng, 4, 4)];
        let inputs = FrameInputs {
            vertices: &vertices,
            textures: &textures,
            ..Default::default()
        };

        let upstream = random_upstream(&mut rng, 1, 1, 16, 16);
        let pass = renderer.forward(&cameras, &inputs).unwrap();
        let grads = renderer.backward(&cameras, &inputs, &pass, &upstream).unwrap();

        let eps = 1e-2f32;
        for texel in 0..textures[0].texels().len() {
            for channel in 0..3 {
                let mut plus = textures[0].clone();
                plus.texels_mut()[texel][channel] += eps;
                let mut minus = textures[0].clone();
                minus.texels_mut()[texel][channel] -= eps;
                let plus = vec![plus];
                let minus = vec![minus];

                let loss_plus = forward_loss(
                    &renderer,
                    &cameras,
                    &FrameInputs {
                        textures: &plus,
                        ..inputs
                    },
                    &upstream,
                );
                let loss_minus = forward_loss(
                    &renderer,
                    &cameras,
                    &FrameInputs {
                        textures: &minus,
                        ..inputs
                    },
                    &upstream,
                );
                let num = ((loss_plus - loss_minus) / (2.0 * eps as f64)) as f32;
                let ana = grads.d_textures[0].texels()[texel][channel];

                let abs_err = (num - ana).abs();
                assert!(
                    rel_err(num, ana) < 1e-3 || abs_err < 1e-5,
                    "filtered texel grad mismatch (texel {texel}, ch {channel}): \
                     num={num} ana={ana} abs_err={abs_err} rel_err={}",
                    rel_err(num, ana)
                );
            }
        }
    }

    #[test]
    fn test_vertex_color_gradients() {
        let mut rng = StdRng::seed_from_u64(0xC0_1025_u64);
        let settings = quad_settings(16, AlbedoMode::VertexColor, ShadingMode::Shadeless);
        let renderer = Renderer::new(quad_topology(), settings).unwrap();
        let cameras = vec![front_camera(16.0)];

        let vertices = vec![quad_vertices(Vector2::zeros())];
        let colors = vec![(0..4)
            .map(|_| {
                Vector3::new(
                    rng.gen_range(0.1..0.9),
                    rng.gen_range(0.1..0.9),
                    rng.gen_range(0.1..0.9),
                )
            })
            .collect::<Vec<_>>()];
        let inputs = FrameInputs {
            vertices: &vertices,
            vertex_colors: &colors,
            ..Default::default()
        };

        let upstream = random_upstream(&mut rng, 1, 1, 16, 16);
        let pass = renderer.forward(&cameras, &inputs).unwrap();
        let grads = renderer.backward(&cameras, &inputs, &pass, &upstream).unwrap();

        let eps = 1e-2f32;
        for vertex in 0..4 {
            for channel in 0..3 {
                let mut plus = colors.clone();
                plus[0][vertex][channel] += eps;
                let mut minus = colors.clone();
                minus[0][vertex][channel] -= eps;

                let loss_plus = forward_loss(
                    &renderer,
                    &cameras,
                    &FrameInputs {
                        vertex_colors: &plus,
                        ..inputs
                    },
                    &upstream,
                );
                let loss_minus = forward_loss(
                    &renderer,
                    &cameras,
                    &FrameInputs {
                        vertex_colors: &minus,
                        ..inputs
                    },
                    &upstream,
                );
                let num = ((loss_plus - loss_minus) / (2.0 * eps as f64)) as f32;
                let ana = grads.d_vertex_colors[0][vertex][channel];

                let abs_err = (num - ana).abs();
                assert!(
                    rel_err(num, ana) < 1e-3 || abs_err < 1e-5,
                    "vertex color grad mismatch (vertex {vertex}, ch {channel}): \
                     num={num} ana={ana} abs_err={abs_err} rel_err={}",
                    rel_err(num, ana)
                );
            }
        }
    }

    #[test]
    fn test_sh_gradients() {
        // SH coefficient gradients through diffuse shading. The tilted plane
        // makes nx, ny, nz all nonzero so every basis term carries signal.
        // SH moves no geometry, so every pixel can be weighted.
        let mut rng = StdRng::seed_from_u64(0x5_AD0_u64);
        let settings = quad_settings(16, AlbedoMode::VertexColor, ShadingMode::Shaded);
        let renderer = Renderer::new(quad_topology(), settings).unwrap();
        let cameras = vec![front_camera(16.0)];

        let vertices = vec![quad_vertices(Vector2::new(0.3, -0.2))];
        let colors = vec![vec![Vector3::new(0.6, 0.6, 0.6); 4]];
        let mut coefficients = neutral_coefficients();
        for term in coefficients.iter_mut() {
            for channel in term.iter_mut() {
                *channel += rng.gen_range(-0.1..0.1);
            }
        }
        let sh = vec![vec![coefficients]];
        let inputs = FrameInputs {
            vertices: &vertices,
            vertex_colors: &colors,
            sh_coefficients: &sh,
            ..Default::default()
        };

        let upstream = random_upstream(&mut rng, 1, 1, 16, 16);
        let pass = renderer.forward(&cameras, &inputs).unwrap();
        let grads = renderer.backward(&cameras, &inputs, &pass, &upstream).unwrap();

        let eps = 1e-2f32;
        for term in 0..SH_COEFF_COUNT {
            for channel in 0..3 {
                let mut plus = sh.clone();
                plus[0][0][term][channel] += eps;
                let mut minus = sh.clone();
                minus[0][0][term][channel] -= eps;

                let loss_plus = forward_loss(
                    &renderer,
                    &cameras,
                    &FrameInputs {
                        sh_coefficients: &plus,
                        ..inputs
                    },
                    &upstream,
                );
                let loss_minus = forward_loss(
                    &renderer,
                    &cameras,
                    &FrameInputs {
                        sh_coefficients: &minus,
                        ..inputs
                    },
                    &upstream,
                );
                let num = ((loss_plus - loss_minus) / (2.0 * eps as f64)) as f32;
                let ana = grads.d_sh_coefficients[0][0][term][channel];

                let abs_err = (num - ana).abs();
                assert!(
                    rel_err(num, ana) < 1e-3 || abs_err < 1e-5,
                    "SH grad mismatch (term {term}, ch {channel}): \
                     num={num} ana={ana} abs_err={abs_err} rel_err={}",
                    rel_err(num, ana)
                );
            }
        }
    }

    #[test]
    fn test_vertex_position_gradients() {
        // Position gradients through barycentric interpolation of UVs and
        // the perspective projection, with coverage held fixed. A ±1e-3 move
        // shifts the silhouette by ~0.012 px, far inside the 2 px margin.
        let mut rng = StdRng::seed_from_u64(0xB0_0057_u64);
        let c = |u, v| Vector2::new(u, v);
        // Fifth vertex referenced by no face: its gradient must stay zero.
        let topology = MeshTopology::new(
            5,
            vec![[0, 1, 2], [0, 2, 3]],
            vec![
                [c(0.0, 0.0), c(1.0, 0.0), c(1.0, 1.0)],
                [c(0.0, 0.0), c(1.0, 1.0), c(0.0, 1.0)],
            ],
        )
        .unwrap();
        let settings = quad_settings(24, AlbedoMode::Textured, ShadingMode::Shadeless);
        let renderer = Renderer::new(topology, settings).unwrap();
        let cameras = vec![front_camera(24.0)];

        let mut corners = quad_vertices(Vector2::zeros());
        corners.push(Vector3::new(0.0, 0.0, 5.0));
        let vertices = vec![corners];
        let textures = vec![random_texture(&mut rng, 4, 4)];
        let inputs = FrameInputs {
            vertices: &vertices,
            textures: &textures,
            ..Default::default()
        };

        let pass = renderer.forward(&cameras, &inputs).unwrap();
        let (upstream, kept) = interior_upstream(&mut rng, &pass, 0, 0, 2);
        assert!(kept > 20, "interior probe too small: {kept} pixels");

        let grads = renderer.backward(&cameras, &inputs, &pass, &upstream).unwrap();

        let eps = 1e-3f32;
        for vertex in 0..5 {
            for axis in 0..3 {
                let mut plus = vertices.clone();
                plus[0][vertex][axis] += eps;
                let mut minus = vertices.clone();
                minus[0][vertex][axis] -= eps;

                let loss_plus = forward_loss(
                    &renderer,
                    &cameras,
                    &FrameInputs {
                        vertices: &plus,
                        ..inputs
                    },
                    &upstream,
                );
                let loss_minus = forward_loss(
                    &renderer,
                    &cameras,
                    &FrameInputs {
                        vertices: &minus,
                        ..inputs
                    },
                    &upstream,
                );
                let num = ((loss_plus - loss_minus) / (2.0 * eps as f64)) as f32;
                let ana = grads.d_vertices[0][vertex][axis];

                // Looser than for the linear parameters: the chain runs
                // through 1/z, 1/area, and bilinear taps, all in f32.
                let abs_err = (num - ana).abs();
                assert!(
                    rel_err(num, ana) < 5e-3 || abs_err < 1e-4,
                    "position grad mismatch (vertex {vertex}, axis {axis}): \
                     num={num} ana={ana} abs_err={abs_err} rel_err={}",
                    rel_err(num, ana)
                );
            }
        }
        assert_eq!(grads.d_vertices[0][4], Vector3::zeros());
    }

    #[test]
    fn test_vertex_position_gradients_shaded() {
        // Positions also feed the face normal, and through it the SH
        // irradiance. Neutral coefficients would make irradiance constant in
        // the normal, so the probe perturbs them first.
        let mut rng = StdRng::seed_from_u64(0xB0_005E_u64);
        let settings = quad_settings(24, AlbedoMode::VertexColor, ShadingMode::Shaded);
        let renderer = Renderer::new(quad_topology(), settings).unwrap();
        let cameras = vec![front_camera(24.0)];

        let vertices = vec![quad_vertices(Vector2::new(0.3, -0.2))];
        let colors = vec![(0..4)
            .map(|_| {
                Vector3::new(
                    rng.gen_range(0.3..0.9),
                    rng.gen_range(0.3..0.9),
                    rng.gen_range(0.3..0.9),
                )
            })
            .collect::<Vec<_>>()];
        let mut coefficients = neutral_coefficients();
        for term in coefficients.iter_mut() {
            for channel in term.iter_mut() {
                *channel += rng.gen_range(-0.15..0.15);
            }
        }
        let sh = vec![vec![coefficients]];
        let inputs = FrameInputs {
            vertices: &vertices,
            vertex_colors: &colors,
            sh_coefficients: &sh,
            ..Default::default()
        };

        let pass = renderer.forward(&cameras, &inputs).unwrap();
        let (upstream, kept) = interior_upstream(&mut rng, &pass, 0, 0, 2);
        assert!(kept > 20, "interior probe too small: {kept} pixels");

        let grads = renderer.backward(&cameras, &inputs, &pass, &upstream).unwrap();

        let eps = 1e-3f32;
        for vertex in 0..4 {
            for axis in 0..3 {
                let mut plus = vertices.clone();
                plus[0][vertex][axis] += eps;
                let mut minus = vertices.clone();
                minus[0][vertex][axis] -= eps;

                let loss_plus = forward_loss(
                    &renderer,
                    &cameras,
                    &FrameInputs {
                        vertices: &plus,
                        ..inputs
                    },
                    &upstream,
                );
                let loss_minus = forward_loss(
                    &renderer,
                    &cameras,
                    &FrameInputs {
                        vertices: &minus,
                        ..inputs
                    },
                    &upstream,
                );
                let num = ((loss_plus - loss_minus) / (2.0 * eps as f64)) as f32;
                let ana = grads.d_vertices[0][vertex][axis];

                let abs_err = (num - ana).abs();
                assert!(
                    rel_err(num, ana) < 5e-3 || abs_err < 1e-4,
                    "shaded position grad mismatch (vertex {vertex}, axis {axis}): \
                     num={num} ana={ana} abs_err={abs_err} rel_err={}",
                    rel_err(num, ana)
                );
            }
        }
    }

    #[test]
    fn test_vertex_position_gradients_with_image_filter() {
        // The image filter widens each pixel's support by its radius, so the
        // probe margin grows to keep every weighted window fully covered.
        let mut rng = StdRng::seed_from_u64(0xB0_F117_u64);
        let mut settings = quad_settings(32, AlbedoMode::Textured, ShadingMode::Shadeless);
        settings.image_filter_size = 3;
        let renderer = Renderer::new(quad_topology(), settings).unwrap();
        let cameras = vec![front_camera(32.0)];

        let vertices = vec![quad_vertices(Vector2::zeros())];
        let textures = vec![random_texture(&mut rng, 4, 4)];
        let inputs = FrameInputs {
            vertices: &vertices,
            textures: &textures,
            ..Default::default()
        };

        let pass = renderer.forward(&cameras, &inputs).unwrap();
        let (upstream, kept) = interior_upstream(&mut rng, &pass, 0, 0, 4);
        assert!(kept > 30, "interior probe too small: {kept} pixels");

        let grads = renderer.backward(&cameras, &inputs, &pass, &upstream).unwrap();

        let eps = 1e-3f32;
        for vertex in 0..4 {
            for axis in 0..3 {
                let mut plus = vertices.clone();
                plus[0][vertex][axis] += eps;
                let mut minus = vertices.clone();
                minus[0][vertex][axis] -= eps;

                let loss_plus = forward_loss(
                    &renderer,
                    &cameras,
                    &FrameInputs {
                        vertices: &plus,
                        ..inputs
                    },
                    &upstream,
                );
                let loss_minus = forward_loss(
                    &renderer,
                    &cameras,
                    &FrameInputs {
                        vertices: &minus,
                        ..inputs
                    },
                    &upstream,
                );
                let num = ((loss_plus - loss_minus) / (2.0 * eps as f64)) as f32;
                let ana = grads.d_vertices[0][vertex][axis];

                let abs_err = (num - ana).abs();
                assert!(
                    rel_err(num, ana) < 5e-3 || abs_err < 1e-4,
                    "filtered position grad mismatch (vertex {vertex}, axis {axis}): \
                     num={num} ana={ana} abs_err={abs_err} rel_err={}",
                    rel_err(num, ana)
                );
            }
        }
    }

    #[test]
    fn test_multi_view_gradients_stay_in_their_batch() {
        // Two batches, two cameras, upstream weights only on view (1, 1):
        // batch 0 inputs must receive exactly zero gradient, and the batch 1
        // texture gradient must match finite differences.
        let mut rng = StdRng::seed_from_u64(0x2B_2C_u64);
        let mut settings = quad_settings(16, AlbedoMode::Textured, ShadingMode::Shadeless);
        settings.num_cameras = 2;
        let renderer = Renderer::new(quad_topology(), settings).unwrap();
        let cameras = vec![
            front_camera(16.0),
            Camera::new(
                16.0,
                16.0,
                8.0,
                8.0,
                Matrix3::identity(),
                Vector3::new(-0.2, 0.0, 0.0),
            ),
        ];

        let mut shifted = quad_vertices(Vector2::zeros());
        for corner in shifted.iter_mut() {
            corner.x += 0.1;
        }
        let vertices = vec![quad_vertices(Vector2::zeros()), shifted];
        let textures = vec![
            random_texture(&mut rng, 4, 4),
            random_texture(&mut rng, 4, 4),
        ];
        let inputs = FrameInputs {
            vertices: &vertices,
            textures: &textures,
            ..Default::default()
        };

        let mut upstream = RenderBuffer::zeros(2, 2, 16, 16);
        for pixel in upstream.view_mut(1, 1) {
            *pixel = Vector3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
        }

        let pass = renderer.forward(&cameras, &inputs).unwrap();
        let grads = renderer.backward(&cameras, &inputs, &pass, &upstream).unwrap();

        for vertex in 0..4 {
            assert_eq!(grads.d_vertices[0][vertex], Vector3::zeros());
        }
        for texel in grads.d_textures[0].texels() {
            assert_eq!(*texel, Vector3::zeros());
        }
        assert!(
            grads.d_textures[1]
                .texels()
                .iter()
                .any(|t| *t != Vector3::zeros()),
            "weighted view produced no texture gradient"
        );
        assert!(grads.d_vertex_colors.iter().all(|batch| batch.is_empty()));
        assert!(grads.d_sh_coefficients.iter().all(|batch| batch.is_empty()));

        let eps = 1e-2f32;
        for texel in 0..textures[1].texels().len() {
            for channel in 0..3 {
                let mut plus = textures[1].clone();
                plus.texels_mut()[texel][channel] += eps;
                let mut minus = textures[1].clone();
                minus.texels_mut()[texel][channel] -= eps;
                let plus = vec![textures[0].clone(), plus];
                let minus = vec![textures[0].clone(), minus];

                let loss_plus = forward_loss(
                    &renderer,
                    &cameras,
                    &FrameInputs {
                        textures: &plus,
                        ..inputs
                    },
                    &upstream,
                );
                let loss_minus = forward_loss(
                    &renderer,
                    &cameras,
                    &FrameInputs {
                        textures: &minus,
                        ..inputs
                    },
                    &upstream,
                );
                let num = ((loss_plus - loss_minus) / (2.0 * eps as f64)) as f32;
                let ana = grads.d_textures[1].texels()[texel][channel];

                let abs_err = (num - ana).abs();
                assert!(
                    rel_err(num, ana) < 1e-3 || abs_err < 1e-5,
                    "batch 1 texel grad mismatch (texel {texel}, ch {channel}): \
                     num={num} ana={ana} abs_err={abs_err} rel_err={}",
                    rel_err(num, ana)
                );
            }
        }
    }
}
