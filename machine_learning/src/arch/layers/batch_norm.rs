use ndarray::prelude::*;

use super::Mode;
use crate::{MlErr, Result};

const MOMENTUM: f32 = 0.9;
const EPSILON: f32 = 1e-7;

struct Cache {
    xc: Array2<f32>,
    xn: Array2<f32>,
    std: Array1<f32>,
}

/// Batch normalization over the feature axis.
///
/// Its parameters are `[gamma, beta, running_mean, running_var]`, each of length `dim`. The
/// running statistics are not trained: a forward pass in `Mode::Train` stages the batch
/// statistics and `update_running` folds them in once the step is known to be finite. Their
/// gradient is always zero.
pub struct BatchNorm {
    dim: usize,
    cache: Option<Cache>,
    batch_stats: Option<(Array1<f32>, Array1<f32>)>,
}

impl BatchNorm {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            cache: None,
            batch_stats: None,
        }
    }

    pub fn size(&self) -> usize {
        self.dim * 4
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn shapes(&self) -> Vec<Vec<usize>> {
        vec![vec![self.dim]; 4]
    }

    pub fn forward(
        &mut self,
        params: &[f32],
        x: ArrayView2<f32>,
        mode: Mode,
    ) -> Result<Array2<f32>> {
        let n = self.dim;
        let gamma = ArrayView1::from_shape(n, &params[..n])?;
        let beta = ArrayView1::from_shape(n, &params[n..2 * n])?;

        let xn = match mode {
            Mode::Train => {
                let mean = x.mean_axis(Axis(0)).ok_or(MlErr::EmptyBatch)?;
                let xc = &x - &mean;
                let var = xc.mapv(|v| v * v).mean_axis(Axis(0)).ok_or(MlErr::EmptyBatch)?;
                let std = var.mapv(|v| (v + EPSILON).sqrt());
                let xn = &xc / &std;

                self.batch_stats = Some((mean, var));
                self.cache = Some(Cache {
                    xc,
                    xn: xn.clone(),
                    std,
                });

                xn
            }
            Mode::Eval => {
                let running_mean = ArrayView1::from_shape(n, &params[2 * n..3 * n])?;
                let running_var = ArrayView1::from_shape(n, &params[3 * n..])?;
                let std = running_var.mapv(|v| (v + EPSILON).sqrt());
                (&x - &running_mean) / &std
            }
        };

        Ok(xn * &gamma + &beta)
    }

    /// Folds the statistics of the last training forward pass into the running statistics.
    /// Does nothing if there's no pending training pass.
    pub fn update_running(&mut self, params: &mut [f32]) -> Result<()> {
        let Some((mean, var)) = self.batch_stats.take() else {
            return Ok(());
        };

        let n = self.dim;
        let (running_mean, running_var) = params[2 * n..].split_at_mut(n);
        let mut running_mean = ArrayViewMut1::from_shape(n, running_mean)?;
        let mut running_var = ArrayViewMut1::from_shape(n, running_var)?;

        running_mean.zip_mut_with(&mean, |r, &m| *r = MOMENTUM * *r + (1. - MOMENTUM) * m);
        running_var.zip_mut_with(&var, |r, &v| *r = MOMENTUM * *r + (1. - MOMENTUM) * v);

        Ok(())
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        let Cache { xc, xn, std } = self.cache.take().ok_or(MlErr::MissingForward {
            layer: "batch_norm",
        })?;

        let n = self.dim;
        let rows = d.nrows() as f32;
        let gamma = ArrayView1::from_shape(n, &params[..n])?;

        let (dgamma, rest) = grad.split_at_mut(n);
        let mut dgamma = ArrayViewMut1::from_shape(n, dgamma)?;
        let mut dbeta = ArrayViewMut1::from_shape(n, &mut rest[..n])?;
        dgamma.assign(&(&xn * &d).sum_axis(Axis(0)));
        dbeta.assign(&d.sum_axis(Axis(0)));

        let dxn = d * &gamma;
        let mut dxc = &dxn / &std;
        let dstd = -(&dxn * &xc / (&std * &std)).sum_axis(Axis(0));
        let dvar = 0.5 * dstd / &std;
        dxc += &(&xc * &dvar * (2.0 / rows));
        let dmean = dxc.sum_axis(Axis(0));

        Ok(dxc - &(dmean / rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_params(n: usize) -> Vec<f32> {
        [vec![1.0; n], vec![0.0; n], vec![0.0; n], vec![1.0; n]].concat()
    }

    #[test]
    fn train_normalizes_each_feature() {
        let mut bn = BatchNorm::new(2);
        let mut params = identity_params(2);
        let x = array![[1.0, 10.0], [3.0, 30.0]];

        let y = bn.forward(&params, x.view(), Mode::Train).unwrap();

        for col in y.columns() {
            assert!(col.sum().abs() < 1e-5);
            assert!((col[0] + 1.0).abs() < 1e-3);
        }

        assert_eq!(params, identity_params(2));
        bn.update_running(&mut params).unwrap();

        // running_mean moved 10% towards the batch mean
        assert!((params[4] - 0.2).abs() < 1e-6);
        assert!((params[5] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn eval_uses_running_statistics() {
        let mut bn = BatchNorm::new(1);
        let mut params = vec![2.0, 1.0, 4.0, 9.0];

        let y = bn
            .forward(&params, array![[10.0]].view(), Mode::Eval)
            .unwrap();
        bn.update_running(&mut params).unwrap();

        assert!((y[[0, 0]] - 5.0).abs() < 1e-4);
        assert_eq!(params, [2.0, 1.0, 4.0, 9.0]);
    }

    #[test]
    fn backward_leaves_running_statistics_without_gradient() {
        let mut bn = BatchNorm::new(1);
        let params = identity_params(1);
        let x = array![[1.0], [2.0], [4.0]];

        bn.forward(&params, x.view(), Mode::Train).unwrap();

        let mut grad = [0.0; 4];
        let dx = bn
            .backward(&params, &mut grad, array![[1.0], [1.0], [1.0]])
            .unwrap();

        assert!(grad[0].abs() < 1e-5);
        assert_eq!(grad[1], 3.0);
        assert_eq!(&grad[2..], &[0.0, 0.0]);
        assert!(dx.iter().all(|v| v.abs() < 1e-4));
    }
}
