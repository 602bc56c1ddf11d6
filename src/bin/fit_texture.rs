//! fit-texture: recover a texture by inverse rendering
//!
//! Renders a target from a ground-truth texture, then optimizes a fresh
//! texture (initialized to white) until its renders match the target across
//! all cameras. A sanity check for the whole forward/backward stack that
//! doubles as a texture-baking tool.
//!
//! Usage:
//!   fit-texture --mesh mesh.obj --calibration cams.calibration --texture gt.png
//!       [--width 512] [--height 512] [--iters 3000] [--lr 100]
//!       [--optimizer sgd|adam] [--shading shadeless|shaded]
//!       [--uv-policy clamp|wrap] [--image-filter N] [--texture-filter N]
//!       [--settings render.json] [--out-dir fit_out] [--log-interval 100]

use rastgrad::core::{neutral_coefficients, Texture};
use rastgrad::optim::{l2_render_loss_and_grad, AdamVec3, SgdVec3};
use rastgrad::render::{AlbedoMode, FrameInputs, RenderSettings, Renderer, ShadingMode};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct FitSummary {
    iterations: usize,
    optimizer: String,
    lr: f32,
    cameras: usize,
    initial_loss: f32,
    final_loss: f32,
}

enum Optimizer {
    Sgd(SgdVec3),
    Adam(AdamVec3),
}

impl Optimizer {
    fn step(&mut self, params: &mut [nalgebra::Vector3<f32>], grads: &[nalgebra::Vector3<f32>]) {
        match self {
            Optimizer::Sgd(opt) => opt.step(params, grads),
            Optimizer::Adam(opt) => opt.step(params, grads),
        }
    }
}

fn main() {
    env_logger::init();
    println!("fit-texture v{}", rastgrad::VERSION);

    let mut args = std::env::args().skip(1);
    let mut mesh_path: Option<PathBuf> = None;
    let mut calibration_path: Option<PathBuf> = None;
    let mut texture_path: Option<PathBuf> = None;
    let mut settings = RenderSettings::default();
    let mut iters: usize = 3000;
    let mut lr: f32 = 100.0;
    let mut lr_explicit = false;
    let mut optimizer_name = String::from("sgd");
    let mut out_dir = PathBuf::from("fit_out");
    let mut log_interval: usize = 100;

    settings.albedo_mode = AlbedoMode::Textured;
    settings.shading_mode = ShadingMode::Shadeless;

    while let Some(a) = args.next() {
        match a.as_str() {
            "--mesh" => mesh_path = args.next().map(PathBuf::from),
            "--calibration" => calibration_path = args.next().map(PathBuf::from),
            "--texture" => texture_path = args.next().map(PathBuf::from),
            "--settings" => {
                let path = args.next().unwrap();
                let file = std::fs::File::open(&path)
                    .unwrap_or_else(|e| panic!("cannot open --settings {path}: {e}"));
                settings = serde_json::from_reader(file)
                    .unwrap_or_else(|e| panic!("bad settings file {path}: {e}"));
                // The loop below fits a texture regardless of what the file says.
                settings.albedo_mode = AlbedoMode::Textured;
            }
            "--width" => settings.width = args.next().unwrap().parse().unwrap(),
            "--height" => settings.height = args.next().unwrap().parse().unwrap(),
            "--shading" => settings.shading_mode = args.next().unwrap().parse().unwrap(),
            "--uv-policy" => {
                let v = args.next().unwrap();
                settings.uv_policy = match v.as_str() {
                    "clamp" => rastgrad::core::UvPolicy::Clamp,
                    "wrap" => rastgrad::core::UvPolicy::Wrap,
                    other => {
                        eprintln!("Unknown --uv-policy {other} (expected: clamp | wrap)");
                        return;
                    }
                };
            }
            "--image-filter" => settings.image_filter_size = args.next().unwrap().parse().unwrap(),
            "--texture-filter" => {
                settings.texture_filter_size = args.next().unwrap().parse().unwrap()
            }
            "--iters" => iters = args.next().unwrap().parse().unwrap(),
            "--lr" => {
                lr = args.next().unwrap().parse().unwrap();
                lr_explicit = true;
            }
            "--optimizer" => optimizer_name = args.next().unwrap(),
            "--out-dir" => out_dir = args.next().unwrap().into(),
            "--log-interval" => log_interval = args.next().unwrap().parse().unwrap(),
            "--help" | "-h" => {
                eprintln!("Usage:");
                eprintln!(
                    "  fit-texture --mesh <mesh.obj> --calibration <cams.calibration> --texture <gt.png>"
                );
                eprintln!(
                    "      [--width N] [--height N] [--iters N] [--lr F] [--optimizer sgd|adam]"
                );
                eprintln!(
                    "      [--shading shadeless|shaded] [--uv-policy clamp|wrap] [--image-filter N]"
                );
                eprintln!(
                    "      [--texture-filter N] [--settings render.json] [--out-dir DIR] [--log-interval N]"
                );
                return;
            }
            other => {
                eprintln!("Unknown arg: {other}");
                return;
            }
        }
    }

    let mesh_path = mesh_path.expect("Missing --mesh <mesh.obj>");
    let calibration_path = calibration_path.expect("Missing --calibration <cams.calibration>");
    let texture_path = texture_path.expect("Missing --texture <gt.png>");

    let mesh = rastgrad::io::load_obj(&mesh_path).expect("failed to load mesh");
    let cameras = rastgrad::io::load_calibration(&calibration_path).expect("failed to load cameras");
    let gt_texture = Texture::open(&texture_path).expect("failed to load texture");
    settings.num_cameras = cameras.len();

    println!(
        "mesh: {} vertices, {} faces | {} camera(s) at {}x{} | texture {}x{}",
        mesh.topology.num_vertices(),
        mesh.topology.num_faces(),
        cameras.len(),
        settings.width,
        settings.height,
        gt_texture.width(),
        gt_texture.height()
    );

    // SGD wants a large step for mean-normalized image losses; Adam does not.
    if !lr_explicit && optimizer_name == "adam" {
        lr = 0.05;
    }
    let mut optimizer = match optimizer_name.as_str() {
        "sgd" => Optimizer::Sgd(SgdVec3::new(lr)),
        "adam" => Optimizer::Adam(AdamVec3::new(lr, 0.9, 0.999, 1e-8)),
        other => {
            eprintln!("Unknown --optimizer {other} (expected: sgd | adam)");
            return;
        }
    };

    let renderer =
        Renderer::new(mesh.topology.clone(), settings.clone()).expect("invalid render settings");

    let vertices = vec![mesh.positions.clone()];
    let vertex_colors = vec![mesh.colors.clone()];
    let sh = vec![vec![neutral_coefficients(); cameras.len()]];

    let target_textures = vec![gt_texture];
    let target_inputs = FrameInputs {
        vertices: &vertices,
        vertex_colors: &vertex_colors,
        textures: &target_textures,
        sh_coefficients: &sh,
    };
    let target = renderer
        .forward(&cameras, &target_inputs)
        .expect("target render failed");

    let mut fitted = vec![
        Texture::filled(
            target_textures[0].width(),
            target_textures[0].height(),
            nalgebra::Vector3::new(1.0, 1.0, 1.0),
        )
        .expect("bad texture dimensions"),
    ];

    let mut initial_loss = 0.0f32;
    let mut final_loss = 0.0f32;
    for i in 0..iters {
        let inputs = FrameInputs {
            vertices: &vertices,
            vertex_colors: &vertex_colors,
            textures: &fitted,
            sh_coefficients: &sh,
        };
        let pass = renderer.forward(&cameras, &inputs).expect("render failed");
        let (loss, d_render) = l2_render_loss_and_grad(&pass.render, &target.render);
        let grads = renderer
            .backward(&cameras, &inputs, &pass, &d_render)
            .expect("backward failed");

        optimizer.step(fitted[0].texels_mut(), grads.d_textures[0].texels());

        if i == 0 {
            initial_loss = loss;
        }
        final_loss = loss;
        if i % log_interval == 0 || i + 1 == iters {
            println!("iter {i:5}  loss {loss:.6}");
        }
    }

    std::fs::create_dir_all(&out_dir).expect("cannot create --out-dir");
    fitted[0]
        .save(out_dir.join("texture.png"))
        .expect("failed to save fitted texture");
    target
        .render
        .frame_rgb8(0, 0)
        .save(out_dir.join("target.png"))
        .expect("failed to save target frame");

    let inputs = FrameInputs {
        vertices: &vertices,
        vertex_colors: &vertex_colors,
        textures: &fitted,
        sh_coefficients: &sh,
    };
    let fitted_pass = renderer
        .forward(&cameras, &inputs)
        .expect("final render failed");
    fitted_pass
        .render
        .frame_rgb8(0, 0)
        .save(out_dir.join("render.png"))
        .expect("failed to save final frame");

    let summary = FitSummary {
        iterations: iters,
        optimizer: optimizer_name,
        lr,
        cameras: cameras.len(),
        initial_loss,
        final_loss,
    };
    let file = std::fs::File::create(out_dir.join("fit_summary.json"))
        .expect("cannot write fit summary");
    serde_json::to_writer_pretty(file, &summary).expect("cannot serialize fit summary");

    println!(
        "done: loss {initial_loss:.6} -> {final_loss:.6}, outputs in {}",
        out_dir.display()
    );
}
