use ndarray::{Array2, ArrayView2};

pub trait LossFn {
    /// The mean loss of a batch of raw model outputs against their targets.
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32;

    /// The gradient of `loss` with respect to `y_pred`.
    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32>;

    /// Maps raw model outputs to what a prediction should return.
    fn activate(&self, y_pred: Array2<f32>) -> Array2<f32> {
        y_pred
    }
}
