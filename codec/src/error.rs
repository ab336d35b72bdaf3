use std::{
    error::Error,
    fmt::{self, Display},
};

use machine_learning::MlErr;
use tensor::ShapeError;

/// The result type of decoding and encoding parameter blobs.
pub type Result<T> = std::result::Result<T, CodecError>;

/// A malformed parameter record stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The stream ended in the middle of a record.
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    EmptyLayerId {
        offset: usize,
    },
    /// The layer identifier is not valid UTF-8.
    InvalidLayerId {
        offset: usize,
    },
    /// A tensor shape is empty, has a zero dimension or overflows.
    InvalidShape {
        layer: String,
        shape: Vec<usize>,
    },
    /// The declared payload length disagrees with the tensor shape.
    PayloadLength {
        layer: String,
        expected: usize,
        got: usize,
    },
    DuplicateLayer(String),
    /// A length doesn't fit the stream's 32-bit fields.
    Oversized {
        what: &'static str,
        value: usize,
    },
    Shape(ShapeError),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Truncated {
                offset,
                needed,
                available,
            } => write!(
                f,
                "truncated blob at byte {offset}: needed {needed} bytes but only {available} remain"
            ),
            CodecError::EmptyLayerId { offset } => {
                write!(f, "empty layer identifier at byte {offset}")
            }
            CodecError::InvalidLayerId { offset } => {
                write!(f, "layer identifier at byte {offset} is not valid utf-8")
            }
            CodecError::InvalidShape { layer, shape } => {
                write!(f, "layer {layer} has an invalid tensor shape {shape:?}")
            }
            CodecError::PayloadLength {
                layer,
                expected,
                got,
            } => write!(
                f,
                "layer {layer} declares a {got} byte payload, its shape needs {expected}"
            ),
            CodecError::DuplicateLayer(layer) => write!(f, "layer {layer} appears twice"),
            CodecError::Oversized { what, value } => {
                write!(f, "the {what} {value} doesn't fit in 32 bits")
            }
            CodecError::Shape(e) => write!(f, "{e}"),
        }
    }
}

impl Error for CodecError {}

impl From<ShapeError> for CodecError {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}

/// A blob that can't be bound onto a model.
#[derive(Debug)]
pub enum BindError {
    ShapeMismatch {
        layer: String,
        expected: Vec<Vec<usize>>,
        actual: Vec<Vec<usize>>,
    },
    MissingParameter {
        layer: String,
    },
    Model(MlErr),
}

impl Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::ShapeMismatch {
                layer,
                expected,
                actual,
            } => write!(
                f,
                "shape mismatch in layer {layer}: expected {expected:?}, got {actual:?}"
            ),
            BindError::MissingParameter { layer } => {
                write!(f, "the blob has no parameters for layer {layer}")
            }
            BindError::Model(e) => write!(f, "{e}"),
        }
    }
}

impl Error for BindError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BindError::Model(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MlErr> for BindError {
    fn from(value: MlErr) -> Self {
        Self::Model(value)
    }
}
