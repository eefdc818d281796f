use crate::topology::ExchangeKind;
use crate::transport::BusError;

use thiserror::Error;

/// Errors from declaring the exchange.
#[derive(Debug, Error)]
pub enum Error<E>
where
    E: BusError,
{
    /// No channel could be opened for the declaration.
    #[error("failed to open channel to declare exchange `{exchange}`")]
    Channel {
        /// Exchange being declared.
        exchange: String,

        /// Transport failure.
        #[source]
        source: E,
    },

    /// The broker rejected the declaration.
    #[error("failed to declare {kind} exchange `{exchange}`")]
    Declare {
        /// Exchange being declared.
        exchange: String,

        /// Requested exchange type.
        kind: ExchangeKind,

        /// Transport failure.
        #[source]
        source: E,
    },
}
