//! Mesh topology: triangle faces, per-face texture coordinates, edge adjacency.
//!
//! The topology is fixed when a renderer is built. Per-invocation data
//! (vertex positions, vertex colors) stays with the caller, so one topology
//! can render many poses and batches.
//!
//! The edge adjacency (unique vertex pairs with a per-edge weight) is not
//! consumed by the renderer itself; it feeds the isometry regularizer in
//! `optim`.

use nalgebra::Vector2;
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors raised when building a [`MeshTopology`].
///
/// These are construction-time failures; nothing is clamped silently.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("mesh has no vertices")]
    NoVertices,

    #[error("mesh has no faces")]
    NoFaces,

    #[error("face {face} references vertex {index}, but the mesh has {num_vertices} vertices")]
    FaceIndexOutOfRange {
        face: usize,
        index: u32,
        num_vertices: usize,
    },

    #[error("expected one UV triple per face ({faces} faces), got {uvs}")]
    UvCountMismatch { faces: usize, uvs: usize },

    #[error("face {face} corner {corner} has UV ({u}, {v}) outside [0, 1]")]
    UvOutOfRange {
        face: usize,
        corner: usize,
        u: f32,
        v: f32,
    },
}

/// An undirected mesh edge (`a < b`) with its regularizer weight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshEdge {
    pub a: u32,
    pub b: u32,
    pub weight: f32,
}

/// Triangle mesh topology shared by every frame a renderer draws.
///
/// Texture coordinates are stored per face corner (three UV pairs per face),
/// not per vertex, so seams need no vertex duplication.
#[derive(Clone, Debug)]
pub struct MeshTopology {
    num_vertices: usize,
    faces: Vec<[u32; 3]>,
    face_uvs: Vec<[Vector2<f32>; 3]>,
    edges: Vec<MeshEdge>,
}

impl MeshTopology {
    /// Validate and build a topology.
    ///
    /// Fails fast on out-of-range face indices, a UV list whose length does
    /// not match the face list, or UVs outside [0, 1].
    pub fn new(
        num_vertices: usize,
        faces: Vec<[u32; 3]>,
        face_uvs: Vec<[Vector2<f32>; 3]>,
    ) -> Result<Self, MeshError> {
        if num_vertices == 0 {
            return Err(MeshError::NoVertices);
        }
        if faces.is_empty() {
            return Err(MeshError::NoFaces);
        }
        if faces.len() != face_uvs.len() {
            return Err(MeshError::UvCountMismatch {
                faces: faces.len(),
                uvs: face_uvs.len(),
            });
        }

        for (face, indices) in faces.iter().enumerate() {
            for &index in indices {
                if index as usize >= num_vertices {
                    return Err(MeshError::FaceIndexOutOfRange {
                        face,
                        index,
                        num_vertices,
                    });
                }
            }
        }

        for (face, corners) in face_uvs.iter().enumerate() {
            for (corner, uv) in corners.iter().enumerate() {
                let in_range = |t: f32| (0.0..=1.0).contains(&t);
                if !(in_range(uv.x) && in_range(uv.y)) {
                    return Err(MeshError::UvOutOfRange {
                        face,
                        corner,
                        u: uv.x,
                        v: uv.y,
                    });
                }
            }
        }

        let edges = build_edges(&faces);

        Ok(Self {
            num_vertices,
            faces,
            face_uvs,
            edges,
        })
    }

    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    pub fn face_uvs(&self) -> &[[Vector2<f32>; 3]] {
        &self.face_uvs
    }

    /// Unique undirected edges, ordered by (a, b).
    pub fn edges(&self) -> &[MeshEdge] {
        &self.edges
    }
}

/// Collect the unique undirected edges of the face list.
///
/// Shared edges appear once. Weights are uniform; the isometry loss keeps
/// them as a per-edge multiplier.
fn build_edges(faces: &[[u32; 3]]) -> Vec<MeshEdge> {
    let mut pairs = BTreeSet::new();
    for &[i0, i1, i2] in faces {
        for (a, b) in [(i0, i1), (i1, i2), (i2, i0)] {
            pairs.insert((a.min(b), a.max(b)));
        }
    }
    pairs
        .into_iter()
        .map(|(a, b)| MeshEdge { a, b, weight: 1.0 })
        .collect()
}
