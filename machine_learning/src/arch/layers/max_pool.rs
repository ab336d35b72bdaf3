use ndarray::{Array2, ArrayView2};

use crate::{MlErr, Result};

/// Non overlapping max pooling over HWC samples, trailing rows and columns that don't fill a
/// window are dropped.
#[derive(Debug, Clone)]
pub struct MaxPool2d {
    input: (usize, usize, usize),
    pool: usize,
    argmax: Option<Vec<usize>>,
}

impl MaxPool2d {
    pub fn new(input: (usize, usize, usize), pool: usize) -> Self {
        Self {
            input,
            pool,
            argmax: None,
        }
    }

    pub fn output_shape(&self) -> (usize, usize, usize) {
        let (h, w, c) = self.input;
        (h / self.pool, w / self.pool, c)
    }

    pub fn input_size(&self) -> usize {
        self.input.0 * self.input.1 * self.input.2
    }

    pub fn output_size(&self) -> usize {
        let (oh, ow, c) = self.output_shape();
        oh * ow * c
    }

    pub fn forward(&mut self, x: ArrayView2<f32>) -> Array2<f32> {
        let (_, w, c) = self.input;
        let (oh, ow, _) = self.output_shape();
        let p = self.pool;

        let mut out = Array2::zeros((x.nrows(), self.output_size()));
        let mut argmax = Vec::with_capacity(out.len());

        for (sample, mut pooled) in x.outer_iter().zip(out.outer_iter_mut()) {
            for i in 0..oh {
                for j in 0..ow {
                    for ch in 0..c {
                        let mut best = ((i * p * w + j * p) * c) + ch;

                        for pi in 0..p {
                            for pj in 0..p {
                                let idx = ((i * p + pi) * w + (j * p + pj)) * c + ch;
                                if sample[idx] > sample[best] {
                                    best = idx;
                                }
                            }
                        }

                        pooled[(i * ow + j) * c + ch] = sample[best];
                        argmax.push(best);
                    }
                }
            }
        }

        self.argmax = Some(argmax);
        out
    }

    pub fn backward(&mut self, d: Array2<f32>) -> Result<Array2<f32>> {
        let argmax = self
            .argmax
            .take()
            .ok_or(MlErr::MissingForward { layer: "max_pool2d" })?;

        let out_size = self.output_size();
        if argmax.len() != d.len() || d.ncols() != out_size {
            return Err(MlErr::SizeMismatch {
                what: "max_pool2d delta",
                got: d.len(),
                expected: argmax.len(),
            });
        }

        let mut dx = Array2::zeros((d.nrows(), self.input_size()));

        for ((delta, mut row), winners) in d
            .outer_iter()
            .zip(dx.outer_iter_mut())
            .zip(argmax.chunks_exact(out_size))
        {
            for (&idx, &g) in winners.iter().zip(delta.iter()) {
                row[idx] += g;
            }
        }

        Ok(dx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn routes_the_gradient_to_the_maximum() {
        let mut pool = MaxPool2d::new((2, 2, 2), 2);
        // two channels interleaved: channel 0 = [1, 4, 3, 2], channel 1 = [8, 5, 6, 7]
        let x = array![[1.0, 8.0, 4.0, 5.0, 3.0, 6.0, 2.0, 7.0]];

        let y = pool.forward(x.view());
        assert_eq!(y, array![[4.0, 8.0]]);

        let dx = pool.backward(array![[1.0, 2.0]]).unwrap();
        assert_eq!(dx, array![[0.0, 2.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]]);
    }
}
