use ndarray::{Array2, ArrayView2};

use crate::{MlErr, Result};

#[derive(Debug, Clone)]
pub struct ReLU {
    dim: usize,
    mask: Option<Array2<bool>>,
}

impl ReLU {
    pub fn new(dim: usize) -> Self {
        Self { dim, mask: None }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn forward(&mut self, x: ArrayView2<f32>) -> Array2<f32> {
        self.mask = Some(x.mapv(|x| x > 0.));
        x.mapv(|x| x.max(0.))
    }

    pub fn backward(&mut self, mut d: Array2<f32>) -> Result<Array2<f32>> {
        let mask = self
            .mask
            .take()
            .ok_or(MlErr::MissingForward { layer: "relu" })?;

        d.zip_mut_with(&mask, |d, &active| {
            if !active {
                *d = 0.;
            }
        });

        Ok(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn passes_only_positive_inputs() {
        let mut relu = ReLU::new(3);

        let a = relu.forward(array![[-1.0, 0.0, 2.0]].view());
        assert_eq!(a, array![[0.0, 0.0, 2.0]]);

        let d = relu.backward(array![[5.0, 5.0, 5.0]]).unwrap();
        assert_eq!(d, array![[0.0, 0.0, 5.0]]);
    }
}
