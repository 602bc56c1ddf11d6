//! First-order optimizers for render parameters.
//!
//! Small, focused CPU updates for the parameter shapes the renderer
//! differentiates: per-vertex or per-texel RGB vectors and per-camera SH
//! coefficient blocks.

use crate::core::{ShCoefficients, SH_COEFF_COUNT};
use nalgebra::Vector3;

/// Adam bias corrections `1 - beta^t` for both moments at timestep `t`.
#[inline]
fn bias_corrections(beta1: f32, beta2: f32, t: u32) -> (f32, f32) {
    let t = t as f32;
    (1.0 - beta1.powf(t), 1.0 - beta2.powf(t))
}

/// Plain gradient descent over `Vector3` parameters.
pub struct SgdVec3 {
    pub lr: f32,
}

impl SgdVec3 {
    pub fn new(lr: f32) -> Self {
        Self { lr }
    }

    pub fn step(&self, params: &mut [Vector3<f32>], grads: &[Vector3<f32>]) {
        assert_eq!(params.len(), grads.len());
        for (p, g) in params.iter_mut().zip(grads) {
            *p -= g * self.lr;
        }
    }
}

pub struct AdamVec3 {
    pub lr: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub eps: f32,
    t: u32,
    m: Vec<Vector3<f32>>,
    v: Vec<Vector3<f32>>,
}

impl AdamVec3 {
    pub fn new(lr: f32, beta1: f32, beta2: f32, eps: f32) -> Self {
        Self {
            lr,
            beta1,
            beta2,
            eps,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    pub fn ensure_len(&mut self, len: usize) {
        if self.m.len() != len {
            // New parameters start with zero momentum; the timestep is kept
            // so bias correction stays consistent for existing ones.
            self.m.resize(len, Vector3::zeros());
            self.v.resize(len, Vector3::zeros());
        }
    }

    pub fn step(&mut self, params: &mut [Vector3<f32>], grads: &[Vector3<f32>]) {
        assert_eq!(params.len(), grads.len());
        self.ensure_len(params.len());

        self.t += 1;
        let (lr, b1, b2, eps) = (self.lr, self.beta1, self.beta2, self.eps);
        let (bias1, bias2) = bias_corrections(b1, b2, self.t);

        let moments = self.m.iter_mut().zip(self.v.iter_mut());
        for ((p, g), (m, v)) in params.iter_mut().zip(grads).zip(moments) {
            *m = *m * b1 + g * (1.0 - b1);
            *v = *v * b2 + g.component_mul(g) * (1.0 - b2);
            let m_hat = *m / bias1;
            let v_hat = *v / bias2;
            *p -= m_hat.zip_map(&v_hat, |mh, vh| lr * mh / (vh.sqrt() + eps));
        }
    }
}

/// Adam over per-view SH coefficient blocks.
pub struct AdamSh {
    pub lr: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub eps: f32,
    t: u32,
    m: Vec<ShCoefficients>,
    v: Vec<ShCoefficients>,
}

impl AdamSh {
    pub fn new(lr: f32, beta1: f32, beta2: f32, eps: f32) -> Self {
        Self {
            lr,
            beta1,
            beta2,
            eps,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    pub fn ensure_len(&mut self, len: usize) {
        if self.m.len() != len {
            self.m.resize(len, [[0.0; 3]; SH_COEFF_COUNT]);
            self.v.resize(len, [[0.0; 3]; SH_COEFF_COUNT]);
        }
    }

    pub fn step(&mut self, params: &mut [ShCoefficients], grads: &[ShCoefficients]) {
        assert_eq!(params.len(), grads.len());
        self.ensure_len(params.len());

        self.t += 1;
        let (lr, b1, b2, eps) = (self.lr, self.beta1, self.beta2, self.eps);
        let (bias1, bias2) = bias_corrections(b1, b2, self.t);

        let moments = self.m.iter_mut().zip(self.v.iter_mut());
        for ((block, g_block), (m_block, v_block)) in params.iter_mut().zip(grads).zip(moments) {
            for k in 0..SH_COEFF_COUNT {
                for ch in 0..3 {
                    let g = g_block[k][ch];
                    let m = &mut m_block[k][ch];
                    let v = &mut v_block[k][ch];
                    *m = *m * b1 + g * (1.0 - b1);
                    *v = *v * b2 + g * g * (1.0 - b2);
                    block[k][ch] -= lr * (*m / bias1) / ((*v / bias2).sqrt() + eps);
                }
            }
        }
    }
}
