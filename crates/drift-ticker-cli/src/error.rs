//! Error types for tickctl

use drift_ticker::TickerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Ticker error: {0}")]
    TickerError(#[from] TickerError),

    #[error("Runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::InvalidConfiguration(_)
            | CliError::JsonError(_)
            | CliError::TickerError(
                TickerError::InvalidPeriod(_)
                | TickerError::InvalidErrorThreshold(_)
                | TickerError::InvalidStatsCapacity(_),
            ) => 4,
            CliError::TickerError(_) | CliError::RuntimeUnavailable(_) => 5,
            CliError::IoError(_) => 1,
        }
    }
}
