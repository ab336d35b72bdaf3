pub mod builder;
pub mod layers;
pub mod loss;
mod model;
mod sequential;

pub use model::{LayerInfo, Model};
pub use sequential::{Sequential, argmax};
