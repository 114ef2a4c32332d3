//! Stochastic Gradient Descent optimizer

use ndarray::Array1;

use super::optimizer::{state_mismatch, Optimizer, OptimizerState};
use crate::error::Result;
use crate::tensor::Tensor;

/// SGD with momentum and coupled L2 weight decay.
pub struct SGD {
    lr: f32,
    momentum: f32,
    weight_decay: f32,
    velocities: Vec<Array1<f32>>,
}

impl SGD {
    /// Create a new SGD optimizer.
    pub fn new(lr: f32, momentum: f32, weight_decay: f32) -> Self {
        Self {
            lr,
            momentum,
            weight_decay,
            velocities: Vec::new(),
        }
    }

    fn ensure_velocities(&mut self, params: &[&mut Tensor]) {
        if self.velocities.is_empty() {
            self.velocities = params.iter().map(|p| Array1::zeros(p.len())).collect();
        }
    }
}

impl Optimizer for SGD {
    fn step(&mut self, params: &mut [&mut Tensor]) {
        self.ensure_velocities(params);

        for (i, param) in params.iter_mut().enumerate() {
            let Some(grad) = param.grad() else { continue };
            let mut grad = grad.clone();
            if self.weight_decay > 0.0 {
                grad.scaled_add(self.weight_decay, param.data());
            }

            if self.momentum > 0.0 {
                // v = momentum * v - lr * grad; param += v
                let momentum = self.momentum;
                let velocity = &mut self.velocities[i];
                velocity.mapv_inplace(|v| v * momentum);
                velocity.scaled_add(-self.lr, &grad);
                *param.data_mut() += &*velocity;
            } else {
                param.data_mut().scaled_add(-self.lr, &grad);
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
        OptimizerState::Sgd {
            lr: self.lr,
            velocities: self.velocities.iter().map(|v| v.to_vec()).collect(),
        }
    }

    fn load_state(&mut self, state: &OptimizerState) -> Result<()> {
        match state {
            OptimizerState::Sgd { lr, velocities } => {
                self.lr = *lr;
                self.velocities = velocities.iter().cloned().map(Array1::from_vec).collect();
                Ok(())
            }
            other => Err(state_mismatch("sgd", other)),
        }
    }
}
