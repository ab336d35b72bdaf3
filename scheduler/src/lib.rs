mod config;
pub mod driver;
mod error;
mod session;
mod shared;
mod sink;

pub use config::TrainingConfig;
pub use driver::{RunSummary, drive};
pub use error::{Result, SchedulerErr};
pub use session::{
    EpochMetrics, Progress, SessionState, StepResult, TrainingScheduler, TrainingSession,
};
pub use shared::SharedModel;
pub use sink::{Console, LogForward, LogSink};
