use ndarray::ArrayView2;
use tensor::Tensor;

use crate::{BatchStats, Evaluation, Result};

/// The identifier and parameter tensor shapes of a layer that owns parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
    pub id: String,
    pub shapes: Vec<Vec<usize>>,
}

impl LayerInfo {
    /// The amount of parameters the layer holds across all its tensors.
    pub fn size(&self) -> usize {
        self.shapes
            .iter()
            .map(|shape| shape.iter().product::<usize>())
            .sum()
    }
}

/// A trainable classifier.
///
/// Its parameters live in a single flat buffer: the concatenation, in `layers()` order, of every
/// layer's tensors, each one in row-major order.
pub trait Model {
    /// The amount of features of a single sample.
    fn input_size(&self) -> usize;

    /// The amount of outputs of a single sample.
    fn output_size(&self) -> usize;

    /// Runs inference over one or more samples.
    ///
    /// # Arguments
    /// * `x` - A tensor whose element count is a multiple of `input_size`.
    ///
    /// # Returns
    /// A `(samples, output_size)` tensor.
    fn predict(&mut self, x: &Tensor) -> Result<Tensor>;

    /// Makes one forward/backward/optimizer pass over a batch.
    ///
    /// # Arguments
    /// * `x` - The batch inputs, one sample per row.
    /// * `y` - The one-hot targets, one per row.
    ///
    /// # Returns
    /// The batch loss and the amount of correct top-1 predictions. If the loss or the gradient
    /// is not finite it fails with `MlErr::NonFinite` without updating the parameters.
    fn train_step(&mut self, x: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<BatchStats>;

    /// Computes the accuracy and mean loss over a dataset without training.
    fn evaluate(&mut self, x: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<Evaluation>;

    /// The layers that own parameters, in declaration order.
    fn layers(&self) -> Vec<LayerInfo>;

    fn params(&self) -> &[f32];

    /// Replaces the whole parameter buffer at once.
    ///
    /// # Returns
    /// The previous parameters, or an error leaving them in place if `params` has the wrong
    /// length.
    fn swap_params(&mut self, params: Vec<f32>) -> Result<Vec<f32>>;
}
