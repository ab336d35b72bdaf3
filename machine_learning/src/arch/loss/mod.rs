mod loss_fn;
mod mse;
mod softmax_cross_entropy;

pub use loss_fn::LossFn;
pub use mse::Mse;
pub use softmax_cross_entropy::SoftmaxCrossEntropy;
