use switchyard_bus::HandlerError;
use thiserror::Error;

/// Errors raised while processing an event.
#[derive(Debug, Error)]
pub enum Error {
    /// The logger service could not be reached.
    #[error("failed to reach logger service")]
    Request(#[from] reqwest::Error),

    /// The logger service answered with an unexpected status.
    #[error("logger service responded with {0}")]
    LoggerStatus(reqwest::StatusCode),
}

impl HandlerError for Error {}
