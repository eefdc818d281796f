use switchyard_bus::BusError;
use thiserror::Error;

/// Errors that can occur talking to an AMQP broker.
#[derive(Debug, Error)]
pub enum Error {
    /// The address is not a valid URL.
    #[error("invalid broker address")]
    InvalidUrl(#[from] url::ParseError),

    /// The address does not use the `amqp` or `amqps` scheme.
    #[error("unsupported scheme '{0}', expected amqp or amqps")]
    UnsupportedScheme(String),

    /// Protocol or I/O failure reported by the client library.
    #[error(transparent)]
    Lapin(#[from] lapin::Error),

    /// The broker refused a confirmed publish.
    #[error("broker rejected publish to '{exchange}' with key '{routing_key}'")]
    Nacked {
        /// Target exchange.
        exchange: String,

        /// Routing key of the message.
        routing_key: String,
    },
}

impl BusError for Error {}
