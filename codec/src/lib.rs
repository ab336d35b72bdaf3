mod blob;
mod codec;
mod error;
mod reader;

pub use blob::{LayerParameters, ParameterBlob};
pub use codec::ParameterCodec;
pub use error::{BindError, CodecError, Result};
