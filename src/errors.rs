use std::fmt::{
    self,
    Display,
};

/// Errors raised by the TD3 core.
///
/// They travel inside [`anyhow::Error`], so callers that need to tell them
/// apart use `err.downcast_ref::<TD3Error>()`.
#[derive(Debug, Clone, PartialEq)]
pub enum TD3Error {
    /// A hyperparameter or space definition is invalid. Raised at construction.
    Configuration(String),
    /// The replay buffer holds fewer transitions than were requested.
    InsufficientData {
        available: usize,
        requested: usize,
    },
    /// A loss or gradient became NaN or infinite.
    NumericalInstability(String),
}

impl Display for TD3Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "invalid configuration: {msg}"),
            Self::InsufficientData { available, requested } => write!(
                f,
                "insufficient data: requested {requested} transitions but only {available} are stored",
            ),
            Self::NumericalInstability(msg) => write!(f, "numerical instability: {msg}"),
        }
    }
}

impl std::error::Error for TD3Error {}

/// Shorthand for failing with a [`TD3Error::Configuration`].
pub(crate) fn config_error(msg: impl Into<String>) -> anyhow::Error {
    TD3Error::Configuration(msg.into()).into()
}

/// Fail with [`TD3Error::NumericalInstability`] if `value` is NaN or infinite.
pub(crate) fn ensure_finite(
    name: &str,
    value: f64,
) -> anyhow::Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TD3Error::NumericalInstability(format!("{name} is {value}")).into())
    }
}
