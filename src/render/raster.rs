//! Edge-function rasterizer producing per-pixel coverage.
//!
//! One call covers one (batch, camera) view. Faces are prepared once
//! (visibility, signed area, pixel-center bounding box), binned by the rows
//! they touch, and rows are rasterized in parallel. A pixel belongs to a
//! face when its three edge values share the sign of the face area, so both
//! windings draw and boundary pixels count for every face whose edge passes
//! through them; the depth test then picks a single winner.

use super::buffers::CoverageViewMut;
use super::geometry::ProjectedVertex;
use crate::core::edge_function;
use nalgebra::Vector2;
use rayon::prelude::*;

/// Faces whose |signed area| falls below this are degenerate and skipped.
const MIN_FACE_AREA: f32 = 1e-12;

struct ScreenFace {
    id: i32,
    a: Vector2<f32>,
    b: Vector2<f32>,
    c: Vector2<f32>,
    corner_depths: [f32; 3],
    area: f32,
    sign: f32,
    min_x: usize,
    max_x: usize,
    min_y: usize,
    max_y: usize,
}

/// Pixel indices whose centers fall inside [min, max], clamped to the
/// viewport axis. Pixel `i` has its center at `i + 0.5`.
fn pixel_span(min: f32, max: f32, len: usize) -> Option<(usize, usize)> {
    let start = (min - 0.5).ceil().max(0.0) as i64;
    let end = ((max - 0.5).floor() as i64).min(len as i64 - 1);
    if start > end {
        return None;
    }
    Some((start as usize, end as usize))
}

fn prepare_faces(
    faces: &[[u32; 3]],
    projected: &[ProjectedVertex],
    width: usize,
    height: usize,
) -> Vec<ScreenFace> {
    faces
        .iter()
        .enumerate()
        .filter_map(|(id, &[i0, i1, i2])| {
            let v0 = &projected[i0 as usize];
            let v1 = &projected[i1 as usize];
            let v2 = &projected[i2 as usize];
            if !(v0.visible && v1.visible && v2.visible) {
                return None;
            }

            let area = edge_function(&v0.screen, &v1.screen, &v2.screen);
            if area.abs() < MIN_FACE_AREA {
                return None;
            }

            let min = |f: fn(&Vector2<f32>) -> f32| f(&v0.screen).min(f(&v1.screen)).min(f(&v2.screen));
            let max = |f: fn(&Vector2<f32>) -> f32| f(&v0.screen).max(f(&v1.screen)).max(f(&v2.screen));
            let (min_x, max_x) = pixel_span(min(|s| s.x), max(|s| s.x), width)?;
            let (min_y, max_y) = pixel_span(min(|s| s.y), max(|s| s.y), height)?;

            Some(ScreenFace {
                id: id as i32,
                a: v0.screen,
                b: v1.screen,
                c: v2.screen,
                corner_depths: [v0.camera_space.z, v1.camera_space.z, v2.camera_space.z],
                area,
                sign: if area > 0.0 { 1.0 } else { -1.0 },
                min_x,
                max_x,
                min_y,
                max_y,
            })
        })
        .collect()
}

/// Rasterize every face into one view's coverage window.
///
/// The winner per pixel is the covering face with the smallest interpolated
/// camera-space depth; on an exact depth tie the lowest face id wins, which
/// the strict `<` test guarantees because faces are visited in index order.
pub(crate) fn rasterize_view(
    faces: &[[u32; 3]],
    projected: &[ProjectedVertex],
    width: usize,
    height: usize,
    out: CoverageViewMut<'_>,
) {
    let prepared = prepare_faces(faces, projected, width, height);

    // Bin candidate faces per row, preserving ascending face order.
    let mut row_bins: Vec<Vec<u32>> = vec![Vec::new(); height];
    for (i, face) in prepared.iter().enumerate() {
        for bin in &mut row_bins[face.min_y..=face.max_y] {
            bin.push(i as u32);
        }
    }

    out.face_ids
        .par_chunks_mut(width)
        .zip(out.bary.par_chunks_mut(width))
        .zip(out.depths.par_chunks_mut(width))
        .zip(row_bins.par_iter())
        .enumerate()
        .for_each(|(py, (((ids_row, bary_row), depth_row), bin))| {
            let pixel_y = py as f32 + 0.5;
            for &fi in bin {
                let face = &prepared[fi as usize];
                for px in face.min_x..=face.max_x {
                    let p = Vector2::new(px as f32 + 0.5, pixel_y);
                    let w0 = edge_function(&face.b, &face.c, &p);
                    let w1 = edge_function(&face.c, &face.a, &p);
                    let w2 = edge_function(&face.a, &face.b, &p);
                    if w0 * face.sign < 0.0 || w1 * face.sign < 0.0 || w2 * face.sign < 0.0 {
                        continue;
                    }

                    let l0 = w0 / face.area;
                    let l1 = w1 / face.area;
                    let l2 = 1.0 - l0 - l1;
                    let depth = l0 * face.corner_depths[0]
                        + l1 * face.corner_depths[1]
                        + l2 * face.corner_depths[2];

                    if depth < depth_row[px] {
                        depth_row[px] = depth;
                        ids_row[px] = face.id;
                        bary_row[px] = [l0, l1];
                    }
                }
            }
        });
}
