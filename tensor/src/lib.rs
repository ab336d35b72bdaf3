mod error;
mod source;
mod tensor;

pub use error::{Result, ShapeError};
pub use source::TensorSource;
pub use tensor::{Tensor, element_count};
