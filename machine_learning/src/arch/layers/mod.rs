mod batch_norm;
mod conv2d;
mod dense;
mod layer;
mod max_pool;
mod relu;
mod sigmoid;

pub use batch_norm::BatchNorm;
pub use conv2d::Conv2d;
pub use dense::Dense;
pub use layer::Layer;
pub use max_pool::MaxPool2d;
pub use relu::ReLU;
pub use sigmoid::Sigmoid;

/// Whether a forward pass is part of a training step or an inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Eval,
}
