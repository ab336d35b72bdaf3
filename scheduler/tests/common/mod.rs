#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use machine_learning::{BatchStats, Dataset, Evaluation, LayerInfo, MlErr, Model, Result};
use ndarray::{Array2, ArrayView2};
use tensor::Tensor;
use tokio_util::sync::CancellationToken;

/// What the model saw, shared with the test after the model moves into a `SharedModel`.
#[derive(Default)]
pub struct Calls {
    pub steps: Cell<usize>,
    pub evaluations: Cell<usize>,
    /// The inputs of every training step, in order.
    pub batches: RefCell<Vec<Vec<f32>>>,
}

/// One feature, two classes. A sample is "correct" when its feature is above 0.5 and every
/// batch reports a loss of `8 / rows`, so weighted and unweighted means differ on uneven batches.
pub struct MockModel {
    params: Vec<f32>,
    calls: Rc<Calls>,
    fail_at: Option<usize>,
    cancel_at: Option<(usize, CancellationToken)>,
}

impl MockModel {
    pub fn new() -> (Self, Rc<Calls>) {
        let calls = Rc::new(Calls::default());
        let model = Self {
            params: vec![0.; 4],
            calls: Rc::clone(&calls),
            fail_at: None,
            cancel_at: None,
        };

        (model, calls)
    }

    /// Diverges on the `step`-th training step, counting from 1.
    pub fn failing_at(mut self, step: usize) -> Self {
        self.fail_at = Some(step);
        self
    }

    /// Cancels `token` from inside the `step`-th training step.
    pub fn cancelling_at(mut self, step: usize, token: CancellationToken) -> Self {
        self.cancel_at = Some((step, token));
        self
    }
}

impl Model for MockModel {
    fn input_size(&self) -> usize {
        1
    }

    fn output_size(&self) -> usize {
        2
    }

    fn predict(&mut self, x: &Tensor) -> Result<Tensor> {
        let data = x.as_slice().iter().flat_map(|&v| [1. - v, v]).collect();
        Ok(Tensor::from_vec(&[x.len(), 2], data)?)
    }

    fn train_step(&mut self, x: ArrayView2<f32>, _y: ArrayView2<f32>) -> Result<BatchStats> {
        let step = self.calls.steps.get() + 1;
        self.calls.steps.set(step);

        if let Some((at, token)) = &self.cancel_at
            && *at == step
        {
            token.cancel();
        }

        if self.fail_at == Some(step) {
            return Err(MlErr::NonFinite { what: "loss" });
        }

        self.calls.batches.borrow_mut().push(x.iter().copied().collect());

        Ok(BatchStats {
            loss: 8. / x.nrows() as f32,
            correct: x.iter().filter(|&&v| v > 0.5).count(),
            samples: x.nrows(),
        })
    }

    fn evaluate(&mut self, x: ArrayView2<f32>, _y: ArrayView2<f32>) -> Result<Evaluation> {
        self.calls.evaluations.set(self.calls.evaluations.get() + 1);
        let correct = x.iter().filter(|&&v| v > 0.5).count();

        Ok(Evaluation {
            accuracy: correct as f32 / x.nrows() as f32,
            loss: 0.5,
        })
    }

    fn layers(&self) -> Vec<LayerInfo> {
        vec![LayerInfo {
            id: "dense_0".into(),
            shapes: vec![vec![1, 2], vec![2]],
        }]
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

/// A one feature dataset, every label is class 1.
pub fn dataset(xs: &[f32]) -> Dataset {
    let x = Array2::from_shape_vec((xs.len(), 1), xs.to_vec()).unwrap();
    let y = Array2::from_shape_fn((xs.len(), 2), |(_, j)| j as f32);
    Dataset::new(x, y).unwrap()
}

/// `N = 10` samples, 6 of them correct.
pub const UNEVEN: [f32; 10] = [1., 0., 0., 0., 1., 1., 1., 0., 1., 1.];

/// Two samples with `features` zeroed features each.
pub fn wide_dataset(features: usize) -> Dataset {
    let x = Array2::zeros((2, features));
    let y = Array2::from_shape_fn((2, 2), |(_, j)| j as f32);
    Dataset::new(x, y).unwrap()
}
