use std::{cell::RefCell, rc::Rc};

use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;

use super::{BatchNorm, Conv2d, Dense, MaxPool2d, Mode, ReLU, Sigmoid};
use crate::{
    Result,
    initialization::{ConstParamGen, ParamGen, RandParamGen},
};

pub enum Layer {
    Dense(Dense),
    BatchNorm(BatchNorm),
    ReLU(ReLU),
    Sigmoid(Sigmoid),
    Conv2d(Conv2d),
    MaxPool2d(MaxPool2d),
}
use Layer::*;

impl Layer {
    pub fn dense(dim: (usize, usize)) -> Self {
        Dense(super::Dense::new(dim))
    }

    pub fn batch_norm(dim: usize) -> Self {
        BatchNorm(super::BatchNorm::new(dim))
    }

    pub fn relu(dim: usize) -> Self {
        ReLU(super::ReLU::new(dim))
    }

    pub fn sigmoid(dim: usize, amp: f32) -> Self {
        Sigmoid(super::Sigmoid::new(dim, amp))
    }

    pub fn conv2d(input: (usize, usize, usize), kernel: (usize, usize), filters: usize) -> Self {
        Conv2d(super::Conv2d::new(input, kernel, filters))
    }

    pub fn max_pool2d(input: (usize, usize, usize), pool: usize) -> Self {
        MaxPool2d(super::MaxPool2d::new(input, pool))
    }

    /// The prefix of this layer's parameter identifier, `None` for parameter-free layers.
    pub fn kind(&self) -> Option<&'static str> {
        match self {
            Dense(_) => Some("dense"),
            BatchNorm(_) => Some("batch_norm"),
            Conv2d(_) => Some("conv2d"),
            ReLU(_) | Sigmoid(_) | MaxPool2d(_) => None,
        }
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        match self {
            Dense(l) => l.size(),
            BatchNorm(l) => l.size(),
            Conv2d(l) => l.size(),
            ReLU(_) | Sigmoid(_) | MaxPool2d(_) => 0,
        }
    }

    /// The shapes of this layer's parameter tensors, in the order they are laid out.
    pub fn shapes(&self) -> Vec<Vec<usize>> {
        match self {
            Dense(l) => l.shapes(),
            BatchNorm(l) => l.shapes(),
            Conv2d(l) => l.shapes(),
            ReLU(_) | Sigmoid(_) | MaxPool2d(_) => Vec::new(),
        }
    }

    pub fn input_size(&self) -> usize {
        match self {
            Dense(l) => l.dim().0,
            BatchNorm(l) => l.dim(),
            ReLU(l) => l.dim(),
            Sigmoid(l) => l.dim(),
            Conv2d(l) => l.input_size(),
            MaxPool2d(l) => l.input_size(),
        }
    }

    pub fn output_size(&self) -> usize {
        match self {
            Dense(l) => l.dim().1,
            BatchNorm(l) => l.dim(),
            ReLU(l) => l.dim(),
            Sigmoid(l) => l.dim(),
            Conv2d(l) => l.output_size(),
            MaxPool2d(l) => l.output_size(),
        }
    }

    /// Builds the generators of this layer's initial parameters.
    ///
    /// # Arguments
    /// * `rng` - The model's shared random number generator.
    ///
    /// # Returns
    /// One generator per parameter tensor.
    pub fn param_gens(&self, rng: &Rc<RefCell<StdRng>>) -> Result<Vec<Box<dyn ParamGen>>> {
        let gens: Vec<Box<dyn ParamGen>> = match self {
            Dense(l) => {
                let (fan_in, fan_out) = l.dim();
                vec![
                    Box::new(RandParamGen::kaiming(rng.clone(), fan_in * fan_out, fan_in)?),
                    Box::new(ConstParamGen::new(0., fan_out)),
                ]
            }
            BatchNorm(l) => {
                let n = l.dim();
                vec![
                    Box::new(ConstParamGen::new(1., n)),
                    Box::new(ConstParamGen::new(0., n)),
                    Box::new(ConstParamGen::new(0., n)),
                    Box::new(ConstParamGen::new(1., n)),
                ]
            }
            Conv2d(l) => {
                let fan_in = l.fan_in();
                let filters = l.output_shape().2;
                vec![
                    Box::new(RandParamGen::kaiming(rng.clone(), fan_in * filters, fan_in)?),
                    Box::new(ConstParamGen::new(0., filters)),
                ]
            }
            ReLU(_) | Sigmoid(_) | MaxPool2d(_) => Vec::new(),
        };

        Ok(gens)
    }

    pub fn forward(
        &mut self,
        params: &[f32],
        x: ArrayView2<f32>,
        mode: Mode,
    ) -> Result<Array2<f32>> {
        match self {
            Dense(l) => l.forward(params, x),
            BatchNorm(l) => l.forward(params, x, mode),
            ReLU(l) => Ok(l.forward(x)),
            Sigmoid(l) => Ok(l.forward(x)),
            Conv2d(l) => l.forward(params, x),
            MaxPool2d(l) => Ok(l.forward(x)),
        }
    }

    /// Applies the state a successful training step leaves behind, only batch norm has any.
    pub fn commit(&mut self, params: &mut [f32]) -> Result<()> {
        match self {
            BatchNorm(l) => l.update_running(params),
            _ => Ok(()),
        }
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        match self {
            Dense(l) => l.backward(params, grad, d),
            BatchNorm(l) => l.backward(params, grad, d),
            ReLU(l) => l.backward(d),
            Sigmoid(l) => l.backward(d),
            Conv2d(l) => l.backward(params, grad, d),
            MaxPool2d(l) => l.backward(d),
        }
    }
}
