//! Adam optimizer

use ndarray::Array1;

use super::optimizer::{state_mismatch, Optimizer, OptimizerState};
use crate::error::Result;
use crate::tensor::Tensor;

/// Adam with bias correction and coupled L2 weight decay (decay added to the
/// gradient, matching the reference training runs).
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    weight_decay: f32,
    t: u64,
    m: Vec<Array1<f32>>,
    v: Vec<Array1<f32>>,
}

impl Adam {
    /// Create a new Adam optimizer.
    pub fn new(lr: f32, beta1: f32, beta2: f32, epsilon: f32, weight_decay: f32) -> Self {
        Self {
            lr,
            beta1,
            beta2,
            epsilon,
            weight_decay,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    /// Adam with the standard β/ε defaults.
    pub fn default_params(lr: f32, weight_decay: f32) -> Self {
        Self::new(lr, 0.9, 0.999, 1e-8, weight_decay)
    }

    fn ensure_moments(&mut self, params: &[&mut Tensor]) {
        if self.m.is_empty() {
            self.m = params.iter().map(|p| Array1::zeros(p.len())).collect();
            self.v = params.iter().map(|p| Array1::zeros(p.len())).collect();
        }
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut [&mut Tensor]) {
        self.ensure_moments(params);
        self.t += 1;

        // Bias correction folded into the step size.
        let lr_t = self.lr
            * ((1.0 - self.beta2.powi(self.t as i32)).sqrt()
                / (1.0 - self.beta1.powi(self.t as i32)));

        for (i, param) in params.iter_mut().enumerate() {
            let Some(grad) = param.grad() else { continue };
            let mut grad = grad.clone();
            if self.weight_decay > 0.0 {
                grad.scaled_add(self.weight_decay, param.data());
            }

            let m = &mut self.m[i];
            let v = &mut self.v[i];
            let data = param.data_mut();
            for j in 0..grad.len() {
                let g = grad[j];
                m[j] = self.beta1 * m[j] + (1.0 - self.beta1) * g;
                v[j] = self.beta2 * v[j] + (1.0 - self.beta2) * g * g;
                data[j] -= lr_t * m[j] / (v[j].sqrt() + self.epsilon);
            }
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }

    fn state(&self) -> OptimizerState {
        OptimizerState::Adam {
            lr: self.lr,
            step: self.t,
            first_moment: self.m.iter().map(|m| m.to_vec()).collect(),
            second_moment: self.v.iter().map(|v| v.to_vec()).collect(),
        }
    }

    fn load_state(&mut self, state: &OptimizerState) -> Result<()> {
        match state {
            OptimizerState::Adam {
                lr,
                step,
                first_moment,
                second_moment,
            } => {
                self.lr = *lr;
                self.t = *step;
                self.m = first_moment.iter().cloned().map(Array1::from_vec).collect();
                self.v = second_moment.iter().cloned().map(Array1::from_vec).collect();
                Ok(())
            }
            other => Err(state_mismatch("adam", other)),
        }
    }
}
