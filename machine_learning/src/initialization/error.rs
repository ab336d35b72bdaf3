use std::{
    error::Error,
    fmt::{self, Display},
};

use rand_distr::NormalError;

/// Error returned by the `RandParamGen` constructors when the distribution can't be built from
/// the given arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandErr(String);

impl From<NormalError> for RandErr {
    fn from(value: NormalError) -> Self {
        Self(value.to_string())
    }
}

impl Display for RandErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for RandErr {}
