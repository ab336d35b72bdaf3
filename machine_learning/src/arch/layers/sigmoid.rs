use ndarray::{Array2, ArrayView2};

use crate::{MlErr, Result};

/// A sigmoid activation scaled to the `(0, amp)` range.
#[derive(Debug, Default, Clone)]
pub struct Sigmoid {
    dim: usize,
    amp: f32,
    a: Option<Array2<f32>>,
}

impl Sigmoid {
    pub fn new(dim: usize, amp: f32) -> Self {
        Self {
            dim,
            amp,
            ..Default::default()
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    fn sigmoid(&self, z: f32) -> f32 {
        self.amp / (1. + (-z).exp())
    }

    pub fn forward(&mut self, z: ArrayView2<f32>) -> Array2<f32> {
        let a = z.mapv(|z| self.sigmoid(z));
        self.a = Some(a.clone());
        a
    }

    pub fn backward(&mut self, mut d: Array2<f32>) -> Result<Array2<f32>> {
        let a = self
            .a
            .take()
            .ok_or(MlErr::MissingForward { layer: "sigmoid" })?;

        d.zip_mut_with(&a, |d, &a| {
            *d *= (a * (self.amp - a)) / self.amp;
        });

        Ok(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn derivative_at_zero() {
        let mut sigmoid = Sigmoid::new(1, 2.0);

        let a = sigmoid.forward(array![[0.0]].view());
        assert_eq!(a, array![[1.0]]);

        let d = sigmoid.backward(array![[1.0]]).unwrap();
        assert_eq!(d, array![[0.5]]);
    }
}
