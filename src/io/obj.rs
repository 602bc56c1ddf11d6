//! Wavefront OBJ mesh loader.
//!
//! Supports the subset the renderer consumes:
//! - `v x y z` vertex positions, optionally extended with `r g b` vertex
//!   colors (the common non-standard 6-float form),
//! - `vt u v` texture coordinates,
//! - `f` triangles referencing positions and texture coordinates
//!   (`v`, `v/vt` or `v/vt/vn` corners).
//!
//! Normals in the file are ignored: shading uses flat face normals derived
//! from the projected positions, so stored normals would go stale the moment
//! vertices move.

use crate::core::{MeshError, MeshTopology};
use nalgebra::{Vector2, Vector3};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Errors from the text-format loaders.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// A loaded mesh: shared topology plus the rest-pose attributes.
#[derive(Clone, Debug)]
pub struct ObjMesh {
    pub topology: MeshTopology,
    pub positions: Vec<Vector3<f32>>,
    /// Per-vertex colors; white where the file carries none.
    pub colors: Vec<Vector3<f32>>,
}

fn parse_f32(token: &str, line_no: usize) -> Result<f32, LoadError> {
    token.parse().map_err(|_| {
        LoadError::InvalidFormat(format!("line {}: bad number '{}'", line_no + 1, token))
    })
}

/// Parse one face corner `v`, `v/vt` or `v/vt/vn` into zero-based position
/// and optional texture-coordinate indices.
fn parse_corner(token: &str, line_no: usize) -> Result<(u32, Option<usize>), LoadError> {
    let mut fields = token.split('/');
    let pos = fields.next().unwrap_or("");
    let pos: i64 = pos.parse().map_err(|_| {
        LoadError::InvalidFormat(format!("line {}: bad face index '{}'", line_no + 1, token))
    })?;
    if pos < 1 {
        return Err(LoadError::InvalidFormat(format!(
            "line {}: face index {} (only positive 1-based indices are supported)",
            line_no + 1,
            pos
        )));
    }
    let uv = match fields.next() {
        Some("") | None => None,
        Some(t) => {
            let t: i64 = t.parse().map_err(|_| {
                LoadError::InvalidFormat(format!(
                    "line {}: bad texture index '{}'",
                    line_no + 1,
                    token
                ))
            })?;
            if t < 1 {
                return Err(LoadError::InvalidFormat(format!(
                    "line {}: texture index {} (only positive 1-based indices are supported)",
                    line_no + 1,
                    t
                )));
            }
            Some((t - 1) as usize)
        }
    };
    Ok(((pos - 1) as u32, uv))
}

/// Load a triangle mesh from an OBJ file.
pub fn load_obj(path: &Path) -> Result<ObjMesh, LoadError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut positions: Vec<Vector3<f32>> = Vec::new();
    let mut colors: Vec<Vector3<f32>> = Vec::new();
    let mut uvs: Vec<Vector2<f32>> = Vec::new();
    let mut faces: Vec<[u32; 3]> = Vec::new();
    let mut face_uvs: Vec<[Vector2<f32>; 3]> = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let tag = match parts.next() {
            Some(tag) => tag,
            None => continue,
        };

        match tag {
            "v" => {
                let values: Vec<f32> = parts
                    .map(|t| parse_f32(t, line_no))
                    .collect::<Result<_, _>>()?;
                if values.len() != 3 && values.len() != 6 {
                    return Err(LoadError::InvalidFormat(format!(
                        "line {}: vertex needs 3 or 6 numbers, got {}",
                        line_no + 1,
                        values.len()
                    )));
                }
                positions.push(Vector3::new(values[0], values[1], values[2]));
                colors.push(if values.len() == 6 {
                    Vector3::new(values[3], values[4], values[5])
                } else {
                    Vector3::new(1.0, 1.0, 1.0)
                });
            }
            "vt" => {
                let u = parse_f32(parts.next().unwrap_or(""), line_no)?;
                let v = parse_f32(parts.next().unwrap_or(""), line_no)?;
                uvs.push(Vector2::new(u, v));
            }
            "f" => {
                let corners: Vec<(u32, Option<usize>)> = parts
                    .map(|t| parse_corner(t, line_no))
                    .collect::<Result<_, _>>()?;
                if corners.len() != 3 {
                    return Err(LoadError::InvalidFormat(format!(
                        "line {}: face has {} corners, only triangles are supported",
                        line_no + 1,
                        corners.len()
                    )));
                }
                let mut corner_uvs = [Vector2::zeros(); 3];
                for (k, &(_, uv)) in corners.iter().enumerate() {
                    if let Some(uv_index) = uv {
                        corner_uvs[k] = *uvs.get(uv_index).ok_or_else(|| {
                            LoadError::InvalidFormat(format!(
                                "line {}: texture index {} out of range ({} coordinates)",
                                line_no + 1,
                                uv_index + 1,
                                uvs.len()
                            ))
                        })?;
                    }
                }
                faces.push([corners[0].0, corners[1].0, corners[2].0]);
                face_uvs.push(corner_uvs);
            }
            // vn, mtllib, usemtl, o, g, s
            _ => {}
        }
    }

    let topology = MeshTopology::new(positions.len(), faces, face_uvs)?;
    log::debug!(
        "loaded {}: {} vertices, {} faces, {} edges",
        path.display(),
        topology.num_vertices(),
        topology.num_faces(),
        topology.edges().len()
    );
    Ok(ObjMesh {
        topology,
        positions,
        colors,
    })
}
