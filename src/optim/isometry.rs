//! Edge-length preservation (isometry) regularizer.
//!
//! Penalizes deviation of every mesh edge from its rest length:
//!
//!   L = sum_b sum_e w_e * (rest_e - len_e(b))^2 / (B * E)
//!
//! This keeps an optimized mesh locally rigid without pinning absolute
//! positions, which is the usual companion term when vertex positions are
//! driven by a photometric loss alone.

use crate::core::{MeshEdge, MeshTopology};
use nalgebra::Vector3;

pub struct IsometryLoss {
    edges: Vec<MeshEdge>,
    rest_lengths: Vec<f32>,
}

fn edge_lengths(edges: &[MeshEdge], positions: &[Vector3<f32>]) -> Vec<f32> {
    edges
        .iter()
        .map(|e| (positions[e.a as usize] - positions[e.b as usize]).norm())
        .collect()
}

impl IsometryLoss {
    /// Capture rest edge lengths from the reference pose.
    pub fn new(topology: &MeshTopology, rest_positions: &[Vector3<f32>]) -> Self {
        let edges = topology.edges().to_vec();
        let rest_lengths = edge_lengths(&edges, rest_positions);
        Self {
            edges,
            rest_lengths,
        }
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Loss and per-vertex gradient over a batch of poses.
    pub fn loss_and_grad(
        &self,
        vertices: &[Vec<Vector3<f32>>],
    ) -> (f32, Vec<Vec<Vector3<f32>>>) {
        let batches = vertices.len();
        let denom = (batches.max(1) * self.edges.len().max(1)) as f32;

        let mut loss = 0.0f32;
        let mut grads: Vec<Vec<Vector3<f32>>> = vertices
            .iter()
            .map(|positions| vec![Vector3::zeros(); positions.len()])
            .collect();

        for (positions, grad) in vertices.iter().zip(grads.iter_mut()) {
            for (edge, &rest) in self.edges.iter().zip(&self.rest_lengths) {
                let (ia, ib) = (edge.a as usize, edge.b as usize);
                let delta = positions[ia] - positions[ib];
                let len = delta.norm();
                let diff = rest - len;
                loss += edge.weight * diff * diff;
                if len <= 1e-12 {
                    continue;
                }
                // d/d(p_a) of (rest - |p_a - p_b|)^2
                let d_a = delta * (-2.0 * edge.weight * diff / (len * denom));
                grad[ia] += d_a;
                grad[ib] -= d_a;
            }
        }

        (loss / denom, grads)
    }
}
