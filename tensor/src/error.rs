use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire tensor module.
pub type Result<T> = std::result::Result<T, ShapeError>;

/// The tensor module's error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// The element count implied by a shape or a buffer doesn't match the expected one.
    CountMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// The shape is empty, has a zero sized dimension or its product overflows.
    InvalidShape(Vec<usize>),
    /// A byte buffer's length is not a multiple of the element width.
    ByteLength { len: usize, width: usize },
    /// The data can't be split into rows of the requested width.
    Rows { len: usize, features: usize },
}

impl Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeError::CountMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "element count mismatch for {what}: got {got}, expected {expected}"
            ),
            ShapeError::InvalidShape(shape) => write!(f, "invalid shape {shape:?}"),
            ShapeError::ByteLength { len, width } => write!(
                f,
                "a buffer of {len} bytes can't hold a whole number of {width} byte elements"
            ),
            ShapeError::Rows { len, features } => write!(
                f,
                "{len} elements can't be split into rows of {features} features"
            ),
        }
    }
}

impl Error for ShapeError {}
