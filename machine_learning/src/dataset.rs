use std::ops::Range;

use ndarray::{Array2, ArrayView2, Axis, s};
use tensor::TensorSource;

use crate::{MlErr, Result};

const PIXEL_SCALE: f32 = 1. / 255.;

/// Inputs and one-hot labels, one sample per row.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    x: Array2<f32>,
    y: Array2<f32>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `x` - The inputs, one sample per row.
    /// * `y` - The labels, one row per sample.
    ///
    /// # Returns
    /// A new `Dataset` or an error if the amount of rows differ.
    pub fn new(x: Array2<f32>, y: Array2<f32>) -> Result<Self> {
        if x.nrows() != y.nrows() {
            return Err(MlErr::SizeMismatch {
                what: "dataset labels",
                got: y.nrows(),
                expected: x.nrows(),
            });
        }

        Ok(Self { x, y })
    }

    /// Builds a dataset out of raw pixel and label bytes, scaling every pixel by `1 / 255`.
    ///
    /// # Arguments
    /// * `pixels` - `features` bytes per sample, samples back to back.
    /// * `labels` - One class index per sample.
    /// * `features` - The amount of pixels of each sample.
    /// * `classes` - The width of the one-hot labels.
    pub fn from_raw(pixels: &[u8], labels: &[u8], features: usize, classes: usize) -> Result<Self> {
        let samples = labels.len();
        let x = TensorSource::new(pixels).to_tensor_u8(&[samples, features], PIXEL_SCALE)?;
        let x = Array2::from_shape_vec((samples, features), x.into_vec())?;

        Self::new(x, to_categorical(labels, classes)?)
    }

    /// Parses the `label,p0,p1,...` csv layout of the digit datasets, a header line is skipped
    /// when its first field is not a number.
    ///
    /// # Arguments
    /// * `text` - The csv content.
    /// * `classes` - The width of the one-hot labels.
    pub fn from_csv(text: &str, classes: usize) -> Result<Self> {
        let mut labels = Vec::new();
        let mut pixels = Vec::new();
        let mut features = None;

        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut fields = line.split(',').map(str::trim);
            let Some(Ok(label)) = fields.next().map(str::parse::<u8>) else {
                if i == 0 {
                    continue;
                }

                return Err(MlErr::Csv {
                    line: i + 1,
                    msg: "invalid label".into(),
                });
            };

            let before = pixels.len();
            for field in fields {
                let pixel = field.parse::<u8>().map_err(|e| MlErr::Csv {
                    line: i + 1,
                    msg: format!("invalid pixel {field:?}: {e}"),
                })?;
                pixels.push(pixel);
            }

            let count = pixels.len() - before;
            match features {
                None => features = Some(count),
                Some(expected) if expected != count => {
                    return Err(MlErr::Csv {
                        line: i + 1,
                        msg: format!("expected {expected} pixels, got {count}"),
                    });
                }
                Some(_) => {}
            }

            labels.push(label);
        }

        let features = features.ok_or_else(|| MlErr::Csv {
            line: 0,
            msg: "no samples".into(),
        })?;

        Self::from_raw(&pixels, &labels, features, classes)
    }

    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn features(&self) -> usize {
        self.x.ncols()
    }

    pub fn classes(&self) -> usize {
        self.y.ncols()
    }

    pub fn inputs(&self) -> ArrayView2<'_, f32> {
        self.x.view()
    }

    pub fn labels(&self) -> ArrayView2<'_, f32> {
        self.y.view()
    }

    /// Borrows the samples in `range`, clamped to the dataset's length.
    pub fn batch(&self, range: Range<usize>) -> (ArrayView2<'_, f32>, ArrayView2<'_, f32>) {
        let end = range.end.min(self.len());
        let start = range.start.min(end);

        (
            self.x.slice(s![start..end, ..]),
            self.y.slice(s![start..end, ..]),
        )
    }

    /// Copies the samples at `indices`, in that order.
    pub fn gather(&self, indices: &[usize]) -> Self {
        Self {
            x: self.x.select(Axis(0), indices),
            y: self.y.select(Axis(0), indices),
        }
    }
}

/// One-hot encodes class indices.
///
/// # Returns
/// A `(labels.len(), classes)` matrix or an error if a label is not below `classes`.
pub fn to_categorical(labels: &[u8], classes: usize) -> Result<Array2<f32>> {
    let mut y = Array2::zeros((labels.len(), classes));

    for (mut row, &label) in y.outer_iter_mut().zip(labels) {
        let label = label as usize;
        if label >= classes {
            return Err(MlErr::InvalidLabel { label, classes });
        }

        row[label] = 1.;
    }

    Ok(y)
}
