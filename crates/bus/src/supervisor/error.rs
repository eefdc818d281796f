use crate::transport::BusError;

use thiserror::Error;

/// Errors from the supervised listener.
#[derive(Debug, Error)]
pub enum Error<E>
where
    E: BusError,
{
    /// The connection bootstrap gave up.
    #[error(transparent)]
    Connect(#[from] crate::connection::Error<E>),

    /// The consumer failed in a way a restart cannot fix.
    #[error("listener cannot start")]
    Startup(#[source] crate::consumer::Error<E>),

    /// The consumer kept failing after connecting.
    #[error("listener stopped after {restarts} restarts")]
    RestartsExhausted {
        /// Restarts made before giving up.
        restarts: u32,

        /// The last consumer failure.
        #[source]
        source: crate::consumer::Error<E>,
    },
}
