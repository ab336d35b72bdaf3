use std::{
    error::Error,
    fmt::{self, Display},
};

use tensor::ShapeError;

use crate::initialization::RandErr;

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    Shape(ShapeError),
    Array(ndarray::ShapeError),
    /// A loss or gradient stopped being a finite number.
    NonFinite {
        what: &'static str,
    },
    EmptyBatch,
    /// A layer was asked for its backward pass without a cached forward pass.
    MissingForward {
        layer: &'static str,
    },
    InvalidLabel {
        label: usize,
        classes: usize,
    },
    Csv {
        line: usize,
        msg: String,
    },
    Init(RandErr),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch in {what}, got {got} and expected {expected}"
            ),
            MlErr::Shape(e) => write!(f, "{e}"),
            MlErr::Array(e) => write!(f, "array shape error: {e}"),
            MlErr::NonFinite { what } => write!(f, "the {what} diverged to a non finite value"),
            MlErr::EmptyBatch => write!(f, "can't compute over an empty batch"),
            MlErr::MissingForward { layer } => {
                write!(f, "the {layer} layer has no forward pass to differentiate")
            }
            MlErr::InvalidLabel { label, classes } => {
                write!(f, "label {label} is out of range for {classes} classes")
            }
            MlErr::Csv { line, msg } => write!(f, "invalid csv at line {line}: {msg}"),
            MlErr::Init(e) => write!(f, "failed to initialize parameters: {e}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Shape(e) => Some(e),
            MlErr::Array(e) => Some(e),
            MlErr::Init(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShapeError> for MlErr {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}

impl From<ndarray::ShapeError> for MlErr {
    fn from(value: ndarray::ShapeError) -> Self {
        Self::Array(value)
    }
}

impl From<RandErr> for MlErr {
    fn from(value: RandErr) -> Self {
        Self::Init(value)
    }
}
