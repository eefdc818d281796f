use crate::transport::BusError;

use thiserror::Error;

/// Errors from the emitter.
#[derive(Debug, Error)]
pub enum Error<E>
where
    E: BusError,
{
    /// Declaring the exchange failed during setup.
    #[error(transparent)]
    Topology(#[from] crate::topology::Error<E>),

    /// No channel could be opened for the publish.
    #[error("failed to open channel to publish `{routing_key}`")]
    Channel {
        /// Routing key of the event.
        routing_key: String,

        /// Transport failure.
        #[source]
        source: E,
    },

    /// The publish itself failed.
    #[error("failed to publish `{routing_key}` to exchange `{exchange}`")]
    Publish {
        /// Target exchange.
        exchange: String,

        /// Routing key of the event.
        routing_key: String,

        /// Transport failure.
        #[source]
        source: E,
    },
}
