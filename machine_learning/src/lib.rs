pub mod arch;
pub mod dataset;
pub mod error;
pub mod initialization;
pub mod optimization;
pub mod preprocessing;
mod stats;

pub use arch::{LayerInfo, Model};
pub use dataset::Dataset;
pub use error::{MlErr, Result};
pub use stats::{BatchStats, Evaluation};
