use crate::transport::BusError;

use thiserror::Error;

/// Errors from establishing a bus connection.
#[derive(Debug, Error)]
pub enum Error<E>
where
    E: BusError,
{
    /// Every allowed attempt failed.
    #[error("failed to connect to {address} after {attempts} attempts")]
    Exhausted {
        /// Address that was dialed.
        address: String,

        /// Number of dials made.
        attempts: u32,

        /// The last dial failure.
        #[source]
        source: E,
    },

    /// The caller cancelled the attempt.
    #[error("connection to {address} cancelled")]
    Cancelled {
        /// Address that was dialed.
        address: String,
    },
}
