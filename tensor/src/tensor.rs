use ndarray::{ArrayView2, ArrayViewD, IxDyn};

use crate::{Result, ShapeError};

/// Computes the amount of elements a shape describes.
///
/// # Arguments
/// * `shape` - The dimensions, every one of them must be positive.
///
/// # Returns
/// The product of the dimensions or an error if the shape is invalid.
pub fn element_count(shape: &[usize]) -> Result<usize> {
    if shape.is_empty() || shape.contains(&0) {
        return Err(ShapeError::InvalidShape(shape.to_vec()));
    }

    shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(|| ShapeError::InvalidShape(shape.to_vec()))
}

/// An n-dimensional array of `f32` with an immutable shape.
///
/// The data is always kept contiguous in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Box<[usize]>,
    data: Vec<f32>,
}

impl Tensor {
    /// Creates a new `Tensor`.
    ///
    /// # Arguments
    /// * `shape` - The dimensions of the tensor.
    /// * `data` - The row-major elements.
    ///
    /// # Returns
    /// A new `Tensor` or an error if `data` doesn't have exactly the elements `shape` describes.
    pub fn from_vec(shape: &[usize], data: Vec<f32>) -> Result<Self> {
        let expected = element_count(shape)?;

        if data.len() != expected {
            return Err(ShapeError::CountMismatch {
                what: "tensor data",
                got: data.len(),
                expected,
            });
        }

        Ok(Self {
            shape: shape.into(),
            data,
        })
    }

    /// Creates a new `Tensor` filled with zeros.
    pub fn zeros(shape: &[usize]) -> Result<Self> {
        let len = element_count(shape)?;
        Self::from_vec(shape, vec![0.0; len])
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Gives the same elements a new shape without copying them.
    ///
    /// # Arguments
    /// * `shape` - The new dimensions.
    ///
    /// # Returns
    /// The reshaped tensor or an error if the element counts differ.
    pub fn reshape(self, shape: &[usize]) -> Result<Self> {
        let expected = element_count(shape)?;

        if self.data.len() != expected {
            return Err(ShapeError::CountMismatch {
                what: "reshape",
                got: self.data.len(),
                expected,
            });
        }

        Ok(Self {
            shape: shape.into(),
            data: self.data,
        })
    }

    /// Views the elements as a matrix of `features` columns.
    ///
    /// # Arguments
    /// * `features` - The amount of columns of each row.
    ///
    /// # Returns
    /// A `(len / features, features)` view or an error if the data can't be split evenly.
    pub fn rows(&self, features: usize) -> Result<ArrayView2<'_, f32>> {
        let len = self.data.len();

        if features == 0 || len % features != 0 {
            return Err(ShapeError::Rows { len, features });
        }

        ArrayView2::from_shape((len / features, features), &self.data)
            .map_err(|_| ShapeError::Rows { len, features })
    }

    /// Views the tensor as an `ndarray` dynamic-dimension array.
    pub fn view(&self) -> Result<ArrayViewD<'_, f32>> {
        ArrayViewD::from_shape(IxDyn(&self.shape), &self.data)
            .map_err(|_| ShapeError::InvalidShape(self.shape.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_count_rejects_zero_and_empty_shapes() {
        assert_eq!(element_count(&[2, 3, 4]), Ok(24));
        assert!(matches!(element_count(&[]), Err(ShapeError::InvalidShape(_))));
        assert!(matches!(
            element_count(&[3, 0]),
            Err(ShapeError::InvalidShape(_))
        ));
        assert!(matches!(
            element_count(&[usize::MAX, 2]),
            Err(ShapeError::InvalidShape(_))
        ));
    }

    #[test]
    fn from_vec_checks_the_element_count() {
        assert!(Tensor::from_vec(&[2, 2], vec![1.0; 4]).is_ok());

        let err = Tensor::from_vec(&[2, 2], vec![1.0; 3]).unwrap_err();
        assert_eq!(
            err,
            ShapeError::CountMismatch {
                what: "tensor data",
                got: 3,
                expected: 4
            }
        );
    }

    #[test]
    fn reshape_keeps_the_data_and_fails_on_count_mismatch() {
        let t = Tensor::from_vec(&[2, 3], (0..6).map(|i| i as f32).collect()).unwrap();

        let t = t.reshape(&[3, 2, 1]).unwrap();
        assert_eq!(t.shape(), &[3, 2, 1]);
        assert_eq!(t.as_slice(), &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);

        assert!(matches!(
            t.reshape(&[4, 2]),
            Err(ShapeError::CountMismatch { got: 6, expected: 8, .. })
        ));
    }

    #[test]
    fn rows_splits_evenly_or_fails() {
        let t = Tensor::from_vec(&[2, 2, 1], vec![1.0, 2.0, 3.0, 4.0]).unwrap();

        let rows = t.rows(2).unwrap();
        assert_eq!(rows.dim(), (2, 2));
        assert_eq!(rows[[1, 0]], 3.0);

        assert!(t.rows(4).is_ok());
        assert_eq!(t.rows(3), Err(ShapeError::Rows { len: 4, features: 3 }));
    }

    #[test]
    fn view_matches_shape() {
        let t = Tensor::zeros(&[2, 3, 1]).unwrap();
        assert_eq!(t.view().unwrap().shape(), &[2, 3, 1]);

        let flat = t.reshape(&[6]).unwrap();
        assert_eq!(flat.view().unwrap().shape(), &[6]);
    }
}
