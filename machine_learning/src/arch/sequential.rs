use std::{cell::RefCell, collections::HashMap, ops::Range, rc::Rc};

use log::debug;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis, s};
use rand::{SeedableRng, rngs::StdRng};
use tensor::Tensor;

use super::{
    LayerInfo, Model,
    layers::{Layer, Mode},
    loss::LossFn,
};
use crate::{
    BatchStats, Evaluation, MlErr, Result,
    initialization::{ChainedParamGen, ParamGen},
    optimization::Optimizer,
};

const EVAL_CHUNK: usize = 100;

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
///
/// All the parameters and their gradient live in two flat buffers, each layer works over its
/// own slice of them.
pub struct Sequential<L, O> {
    layers: Vec<Layer>,
    offsets: Vec<Range<usize>>,
    params: Vec<f32>,
    grad: Vec<f32>,
    loss_fn: L,
    optimizer: O,
}

impl<L: LossFn, O: Optimizer> Sequential<L, O> {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    /// * `loss_fn` - The loss minimized on every training step.
    /// * `optimizer` - The optimizer applying each step's gradient.
    /// * `seed` - The seed of the parameter initialization.
    ///
    /// # Returns
    /// A new `Sequential` instance or an error if the layers don't chain.
    pub fn new<I>(layers: I, loss_fn: L, optimizer: O, seed: u64) -> Result<Self>
    where
        I: IntoIterator<Item = Layer>,
    {
        let layers: Vec<Layer> = layers.into_iter().collect();

        let Some(first) = layers.first() else {
            return Err(MlErr::SizeMismatch {
                what: "layers",
                got: 0,
                expected: 1,
            });
        };

        if first.input_size() == 0 {
            return Err(MlErr::SizeMismatch {
                what: "input features",
                got: 0,
                expected: 1,
            });
        }

        for pair in layers.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);

            if prev.output_size() != next.input_size() || prev.output_size() == 0 {
                return Err(MlErr::SizeMismatch {
                    what: "chained layer dimensions",
                    got: next.input_size(),
                    expected: prev.output_size(),
                });
            }
        }

        let mut offsets = Vec::with_capacity(layers.len());
        let mut end = 0;
        for layer in &layers {
            offsets.push(end..end + layer.size());
            end += layer.size();
        }

        let rng = Rc::new(RefCell::new(StdRng::seed_from_u64(seed)));
        let mut gens = Vec::new();
        for layer in &layers {
            gens.extend(layer.param_gens(&rng)?);
        }

        let params = ChainedParamGen::new(gens).sample(end).unwrap_or_default();
        if params.len() != end {
            return Err(MlErr::SizeMismatch {
                what: "initial parameters",
                got: params.len(),
                expected: end,
            });
        }

        debug!(layers = layers.len(), params = end; "built sequential model");

        Ok(Self {
            layers,
            offsets,
            grad: vec![0.; end],
            params,
            loss_fn,
            optimizer,
        })
    }

    /// Makes a forward pass through the network.
    ///
    /// # Arguments
    /// * `x` - The input data, one sample per row.
    /// * `mode` - Whether the pass belongs to a training step.
    ///
    /// # Returns
    /// The raw output of the last layer.
    pub fn forward(&mut self, x: ArrayView2<f32>, mode: Mode) -> Result<Array2<f32>> {
        if x.nrows() == 0 {
            return Err(MlErr::EmptyBatch);
        }

        if x.ncols() != self.input_size() {
            return Err(MlErr::SizeMismatch {
                what: "input features",
                got: x.ncols(),
                expected: self.input_size(),
            });
        }

        let mut a = x.to_owned();
        for (layer, range) in self.layers.iter_mut().zip(&self.offsets) {
            a = layer.forward(&self.params[range.clone()], a.view(), mode)?;
        }

        Ok(a)
    }

    fn check_targets(&self, x: &ArrayView2<f32>, y: &ArrayView2<f32>) -> Result<()> {
        if y.nrows() != x.nrows() {
            return Err(MlErr::SizeMismatch {
                what: "target rows",
                got: y.nrows(),
                expected: x.nrows(),
            });
        }

        if y.ncols() != self.output_size() {
            return Err(MlErr::SizeMismatch {
                what: "target classes",
                got: y.ncols(),
                expected: self.output_size(),
            });
        }

        Ok(())
    }
}

impl<L: LossFn, O: Optimizer> Model for Sequential<L, O> {
    fn input_size(&self) -> usize {
        self.layers.first().map(Layer::input_size).unwrap_or_default()
    }

    fn output_size(&self) -> usize {
        self.layers.last().map(Layer::output_size).unwrap_or_default()
    }

    fn predict(&mut self, x: &Tensor) -> Result<Tensor> {
        let rows = x.rows(self.input_size())?;
        let out = self.forward(rows, Mode::Eval)?;
        let out = self.loss_fn.activate(out);

        let shape = [out.nrows(), out.ncols()];
        Ok(Tensor::from_vec(&shape, out.iter().copied().collect())?)
    }

    fn train_step(&mut self, x: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<BatchStats> {
        self.check_targets(&x, &y)?;
        self.grad.fill(0.);

        let y_pred = self.forward(x, Mode::Train)?;
        let loss = self.loss_fn.loss(y_pred.view(), y);

        if !loss.is_finite() {
            return Err(MlErr::NonFinite { what: "loss" });
        }

        let mut d = self.loss_fn.loss_prime(y_pred.view(), y);
        for (layer, range) in self.layers.iter_mut().zip(&self.offsets).rev() {
            let range = range.clone();
            d = layer.backward(&self.params[range.clone()], &mut self.grad[range], d)?;
        }

        if self.grad.iter().any(|g| !g.is_finite()) {
            return Err(MlErr::NonFinite { what: "gradient" });
        }

        for (layer, range) in self.layers.iter_mut().zip(&self.offsets) {
            layer.commit(&mut self.params[range.clone()])?;
        }

        self.optimizer.update_params(&mut self.params, &self.grad)?;

        Ok(BatchStats {
            loss,
            correct: count_correct(y_pred.view(), y),
            samples: x.nrows(),
        })
    }

    fn evaluate(&mut self, x: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<Evaluation> {
        self.check_targets(&x, &y)?;

        let samples = x.nrows();
        if samples == 0 {
            return Err(MlErr::EmptyBatch);
        }

        let mut loss_sum = 0.;
        let mut correct = 0;

        for start in (0..samples).step_by(EVAL_CHUNK) {
            let end = (start + EVAL_CHUNK).min(samples);
            let (xb, yb) = (x.slice(s![start..end, ..]), y.slice(s![start..end, ..]));

            let y_pred = self.forward(xb, Mode::Eval)?;
            loss_sum += self.loss_fn.loss(y_pred.view(), yb) * (end - start) as f32;
            correct += count_correct(y_pred.view(), yb);
        }

        Ok(Evaluation {
            accuracy: correct as f32 / samples as f32,
            loss: loss_sum / samples as f32,
        })
    }

    fn layers(&self) -> Vec<LayerInfo> {
        let mut counts: HashMap<&str, usize> = HashMap::new();

        self.layers
            .iter()
            .filter_map(|layer| {
                let kind = layer.kind()?;
                let n = counts.entry(kind).or_default();
                let id = format!("{kind}_{n}");
                *n += 1;

                Some(LayerInfo {
                    id,
                    shapes: layer.shapes(),
                })
            })
            .collect()
    }

    fn params(&self) -> &[f32] {
        &self.params
    }

    fn swap_params(&mut self, params: Vec<f32>) -> Result<Vec<f32>> {
        if params.len() != self.params.len() {
            return Err(MlErr::SizeMismatch {
                what: "parameters",
                got: params.len(),
                expected: self.params.len(),
            });
        }

        Ok(std::mem::replace(&mut self.params, params))
    }
}

/// Index of the largest value of a row, the first one on ties.
pub fn argmax(row: ArrayView1<f32>) -> usize {
    row.iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, max), (i, &v)| {
            if v > max { (i, v) } else { (best, max) }
        })
        .0
}

fn count_correct(y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> usize {
    y_pred
        .axis_iter(Axis(0))
        .zip(y.axis_iter(Axis(0)))
        .filter(|(p, t)| argmax(p.view()) == argmax(t.view()))
        .count()
}
