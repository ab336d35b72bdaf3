use ndarray::{linalg, prelude::*};

use crate::{MlErr, Result};

/// A 2D convolution with valid padding and stride 1 over HWC samples.
///
/// Each input row is a flattened `(height, width, channels)` image and each output row a
/// flattened `(height - kh + 1, width - kw + 1, filters)` one. The parameters are the kernel
/// `(kh, kw, channels, filters)` followed by the biases `(filters)`.
#[derive(Debug, Clone)]
pub struct Conv2d {
    input: (usize, usize, usize),
    kernel: (usize, usize),
    filters: usize,

    // Forward metadata, the im2col matrix of the last batch.
    cols: Option<Array2<f32>>,
}

impl Conv2d {
    /// Creates a new `Conv2d` layer.
    ///
    /// # Arguments
    /// * `input` - The `(height, width, channels)` of each sample.
    /// * `kernel` - The `(height, width)` of the kernel, at most the input's.
    /// * `filters` - The amount of output channels.
    pub fn new(input: (usize, usize, usize), kernel: (usize, usize), filters: usize) -> Self {
        Self {
            input,
            kernel,
            filters,
            cols: None,
        }
    }

    fn patch_len(&self) -> usize {
        self.kernel.0 * self.kernel.1 * self.input.2
    }

    pub fn output_shape(&self) -> (usize, usize, usize) {
        let (h, w, _) = self.input;
        let (kh, kw) = self.kernel;
        (
            (h + 1).saturating_sub(kh),
            (w + 1).saturating_sub(kw),
            self.filters,
        )
    }

    pub fn input_size(&self) -> usize {
        self.input.0 * self.input.1 * self.input.2
    }

    pub fn output_size(&self) -> usize {
        let (oh, ow, f) = self.output_shape();
        oh * ow * f
    }

    pub fn size(&self) -> usize {
        (self.patch_len() + 1) * self.filters
    }

    pub fn shapes(&self) -> Vec<Vec<usize>> {
        let (kh, kw) = self.kernel;
        vec![vec![kh, kw, self.input.2, self.filters], vec![self.filters]]
    }

    /// Fan in of each output unit, used for the kernel's initialization.
    pub fn fan_in(&self) -> usize {
        self.patch_len()
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let (w, b) = self.view_params(params)?;
        let cols = self.im2col(x);

        let mut z = Array2::zeros((cols.nrows(), self.filters));
        linalg::general_mat_mul(1.0, &cols, &w, 0.0, &mut z);
        z += &b;

        self.cols = Some(cols);
        Ok(z.into_shape_with_order((x.nrows(), self.output_size()))?)
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        let cols = self
            .cols
            .take()
            .ok_or(MlErr::MissingForward { layer: "conv2d" })?;

        let samples = d.nrows();
        let d = d
            .as_standard_layout()
            .into_owned()
            .into_shape_with_order((cols.nrows(), self.filters))?;

        let w_size = self.patch_len() * self.filters;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size);
        let mut dw = ArrayViewMut2::from_shape((self.patch_len(), self.filters), dw_raw)?;
        let mut db = ArrayViewMut1::from_shape(self.filters, db_raw)?;
        linalg::general_mat_mul(1.0, &cols.t(), &d, 0.0, &mut dw);
        db.assign(&d.sum_axis(Axis(0)));

        let (w, _) = self.view_params(params)?;
        let mut dcols = Array2::zeros(cols.raw_dim());
        linalg::general_mat_mul(1.0, &d, &w.t(), 0.0, &mut dcols);

        Ok(self.col2im(dcols.view(), samples))
    }

    /// Unrolls every kernel-sized patch of the batch into a row.
    fn im2col(&self, x: ArrayView2<f32>) -> Array2<f32> {
        let (h, w, c) = self.input;
        let (kh, kw) = self.kernel;
        let (oh, ow, _) = self.output_shape();
        debug_assert_eq!(x.ncols(), h * w * c);

        let mut cols = Array2::zeros((x.nrows() * oh * ow, self.patch_len()));

        for (s, sample) in x.outer_iter().enumerate() {
            for i in 0..oh {
                for j in 0..ow {
                    let mut row = cols.row_mut((s * oh + i) * ow + j);
                    for ki in 0..kh {
                        for kj in 0..kw {
                            let src = ((i + ki) * w + (j + kj)) * c;
                            let dst = (ki * kw + kj) * c;
                            for ch in 0..c {
                                row[dst + ch] = sample[src + ch];
                            }
                        }
                    }
                }
            }
        }

        cols
    }

    /// Accumulates the patch rows back into their image positions, the inverse of `im2col`.
    fn col2im(&self, dcols: ArrayView2<f32>, samples: usize) -> Array2<f32> {
        let (_, w, c) = self.input;
        let (kh, kw) = self.kernel;
        let (oh, ow, _) = self.output_shape();
        let mut dx = Array2::zeros((samples, self.input_size()));

        for (s, mut sample) in dx.outer_iter_mut().enumerate() {
            for i in 0..oh {
                for j in 0..ow {
                    let row = dcols.row((s * oh + i) * ow + j);
                    for ki in 0..kh {
                        for kj in 0..kw {
                            let dst = ((i + ki) * w + (j + kj)) * c;
                            let src = (ki * kw + kj) * c;
                            for ch in 0..c {
                                sample[dst + ch] += row[src + ch];
                            }
                        }
                    }
                }
            }
        }

        dx
    }

    fn view_params<'a>(
        &self,
        params: &'a [f32],
    ) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        let w_size = self.patch_len() * self.filters;
        let (w_raw, b_raw) = params.split_at(w_size);
        let w = ArrayView2::from_shape((self.patch_len(), self.filters), w_raw)?;
        let b = ArrayView1::from_shape(self.filters, b_raw)?;
        Ok((w, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_shape_is_valid_padding() {
        let conv = Conv2d::new((28, 28, 1), (3, 3), 8);

        assert_eq!(conv.output_shape(), (26, 26, 8));
        assert_eq!(conv.size(), 3 * 3 * 8 + 8);
        assert_eq!(conv.shapes(), vec![vec![3, 3, 1, 8], vec![8]]);
    }

    #[test]
    fn sums_each_window() {
        // 3x3 single channel image, 2x2 kernel of ones, bias 1
        let mut conv = Conv2d::new((3, 3, 1), (2, 2), 1);
        let params = [1.0, 1.0, 1.0, 1.0, 1.0];
        let x = Array2::from_shape_vec((1, 9), (1..=9).map(|v| v as f32).collect()).unwrap();

        let z = conv.forward(&params, x.view()).unwrap();
        assert_eq!(z, array![[13.0, 17.0, 25.0, 29.0]]);

        let mut grad = [0.0; 5];
        let dx = conv
            .backward(&params, &mut grad, array![[1.0, 1.0, 1.0, 1.0]])
            .unwrap();

        assert_eq!(grad, [12.0, 16.0, 24.0, 28.0, 4.0]);
        assert_eq!(
            dx,
            array![[1.0, 2.0, 1.0, 2.0, 4.0, 2.0, 1.0, 2.0, 1.0]]
        );
    }
}
