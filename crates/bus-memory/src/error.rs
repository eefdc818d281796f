use switchyard_bus::BusError;
use thiserror::Error;

/// Errors raised by the in-memory broker.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The broker refused the dial.
    #[error("broker at {0} is unreachable")]
    Unreachable(String),

    /// The connection was closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// The channel was closed.
    #[error("channel closed")]
    ChannelClosed,

    /// No exchange with this name has been declared.
    #[error("no exchange '{0}'")]
    ExchangeNotFound(String),

    /// The exchange exists with different parameters.
    #[error("exchange '{0}' already declared with different parameters")]
    PreconditionFailed(String),

    /// No queue with this name exists.
    #[error("no queue '{0}'")]
    QueueNotFound(String),

    /// The queue is exclusive to another connection.
    #[error("queue '{0}' is exclusive to another connection")]
    ResourceLocked(String),

    /// The queue already has a consumer.
    #[error("queue '{0}' already has a consumer")]
    AlreadyConsumed(String),
}

impl BusError for Error {}
