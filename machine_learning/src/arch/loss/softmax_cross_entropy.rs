use ndarray::{Array2, ArrayView2, Axis};

use super::LossFn;

const EPSILON: f32 = 1e-7;

/// Softmax followed by categorical cross entropy, the model outputs logits and predictions
/// return class probabilities.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftmaxCrossEntropy;

impl SoftmaxCrossEntropy {
    pub fn new() -> Self {
        Self
    }

    /// Row-wise softmax, shifted by each row's maximum to keep `exp` bounded.
    pub fn softmax(logits: ArrayView2<f32>) -> Array2<f32> {
        let mut out = logits.to_owned();

        for mut row in out.rows_mut() {
            let max = row.fold(f32::NEG_INFINITY, |acc, &v| acc.max(v));
            row.mapv_inplace(|v| (v - max).exp());
            let sum = row.sum();
            row /= sum;
        }

        out
    }
}

impl LossFn for SoftmaxCrossEntropy {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        let rows = y_pred.nrows().max(1) as f32;
        let p = Self::softmax(y_pred);

        -(p.mapv(|p| (p + EPSILON).ln()) * &y).sum() / rows
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let rows = y_pred.len_of(Axis(0)).max(1) as f32;
        (Self::softmax(y_pred) - &y) / rows
    }

    fn activate(&self, y_pred: Array2<f32>) -> Array2<f32> {
        Self::softmax(y_pred.view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn softmax_rows_sum_to_one() {
        let p = SoftmaxCrossEntropy::softmax(array![[1.0, 2.0, 3.0], [1000.0, 0.0, 0.0]].view());

        for row in p.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-6);
        }
        assert!((p[[1, 0]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn uniform_logits_lose_ln_classes() {
        let loss = SoftmaxCrossEntropy.loss(
            array![[0.0, 0.0], [0.0, 0.0]].view(),
            array![[1.0, 0.0], [0.0, 1.0]].view(),
        );

        assert!((loss - 2f32.ln()).abs() < 1e-5);
    }

    #[test]
    fn gradient_is_averaged_over_rows() {
        let d = SoftmaxCrossEntropy.loss_prime(
            array![[0.0, 0.0], [0.0, 0.0]].view(),
            array![[1.0, 0.0], [0.0, 1.0]].view(),
        );

        assert_eq!(d, array![[-0.25, 0.25], [0.25, -0.25]]);
    }
}
