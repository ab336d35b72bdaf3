use std::{error::Error, fmt};

use codec::{BindError, CodecError};
use machine_learning::MlErr;

/// The scheduler module's result type.
pub type Result<T> = std::result::Result<T, SchedulerErr>;

/// Training session and model ownership failures.
#[derive(Debug)]
pub enum SchedulerErr {
    /// Invalid caller supplied training parameters.
    Config(String),
    /// The operation is not valid in the current state, e.g. stepping a finished session or
    /// binding a model that is being trained.
    State(String),
    /// The model failed inside a training step, the session is over.
    Training(MlErr),
    Bind(BindError),
    Codec(CodecError),
    Ml(MlErr),
}

impl fmt::Display for SchedulerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerErr::Config(msg) => write!(f, "invalid training configuration: {msg}"),
            SchedulerErr::State(msg) => write!(f, "invalid state: {msg}"),
            SchedulerErr::Training(e) => write!(f, "training step failed: {e}"),
            SchedulerErr::Bind(e) => write!(f, "failed to bind parameters: {e}"),
            SchedulerErr::Codec(e) => write!(f, "{e}"),
            SchedulerErr::Ml(e) => write!(f, "{e}"),
        }
    }
}

impl Error for SchedulerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SchedulerErr::Training(e) | SchedulerErr::Ml(e) => Some(e),
            SchedulerErr::Bind(e) => Some(e),
            SchedulerErr::Codec(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BindError> for SchedulerErr {
    fn from(value: BindError) -> Self {
        Self::Bind(value)
    }
}

impl From<CodecError> for SchedulerErr {
    fn from(value: CodecError) -> Self {
        Self::Codec(value)
    }
}

impl From<MlErr> for SchedulerErr {
    fn from(value: MlErr) -> Self {
        Self::Ml(value)
    }
}
