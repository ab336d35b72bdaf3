//! The two fixed digit classifiers.

use super::{Sequential, layers::Layer, loss::SoftmaxCrossEntropy};
use crate::{Result, optimization::Adam};

/// The `(height, width, channels)` of an input digit.
pub const INPUT_SHAPE: [usize; 3] = [28, 28, 1];
pub const INPUT_SIZE: usize = 28 * 28;
pub const CLASSES: usize = 10;

const HIDDEN: usize = 64;
const LEARNING_RATE: f32 = 0.001;
const BETA1: f32 = 0.9;
const BETA2: f32 = 0.999;
const EPSILON: f32 = 1e-7;

pub type Classifier = Sequential<SoftmaxCrossEntropy, Adam>;

fn adam(layers: &[Layer]) -> Adam {
    let size = layers.iter().map(Layer::size).sum();
    Adam::new(size, LEARNING_RATE, BETA1, BETA2, EPSILON)
}

/// Builds the multilayer perceptron trained in place: three blocks of
/// `Dense(64) -> BatchNorm -> ReLU` followed by a `Dense(10)` over softmax.
///
/// # Arguments
/// * `seed` - The seed of the parameter initialization.
pub fn mlp(seed: u64) -> Result<Classifier> {
    let mut layers = Vec::new();
    let mut fan_in = INPUT_SIZE;

    for _ in 0..3 {
        layers.push(Layer::dense((fan_in, HIDDEN)));
        layers.push(Layer::batch_norm(HIDDEN));
        layers.push(Layer::relu(HIDDEN));
        fan_in = HIDDEN;
    }

    layers.push(Layer::dense((HIDDEN, CLASSES)));

    let optimizer = adam(&layers);
    Sequential::new(layers, SoftmaxCrossEntropy, optimizer, seed)
}

/// Builds the convolutional network usually loaded from a pretrained blob:
/// `Conv2d(3x3, 8) -> ReLU -> MaxPool(2) -> Dense(10)`.
///
/// # Arguments
/// * `seed` - The seed of the parameter initialization.
pub fn conv_net(seed: u64) -> Result<Classifier> {
    const FILTERS: usize = 8;

    let [h, w, c] = INPUT_SHAPE;
    let conv = (h - 2, w - 2, FILTERS);
    let pooled = (conv.0 / 2) * (conv.1 / 2) * FILTERS;

    let layers = vec![
        Layer::conv2d((h, w, c), (3, 3), FILTERS),
        Layer::relu(conv.0 * conv.1 * FILTERS),
        Layer::max_pool2d(conv, 2),
        Layer::dense((pooled, CLASSES)),
    ];

    let optimizer = adam(&layers);
    Sequential::new(layers, SoftmaxCrossEntropy, optimizer, seed)
}
