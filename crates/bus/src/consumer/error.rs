use crate::transport::BusError;

use thiserror::Error;

/// Errors from the consumer.
#[derive(Debug, Error)]
pub enum Error<E>
where
    E: BusError,
{
    /// Declaring the exchange failed during setup.
    #[error(transparent)]
    Topology(#[from] crate::topology::Error<E>),

    /// No channel could be opened for the consumer.
    #[error("failed to open consumer channel")]
    Channel(#[source] E),

    /// The exclusive queue could not be declared.
    #[error("failed to declare exclusive queue")]
    DeclareQueue(#[source] E),

    /// `listen` was called without any patterns.
    #[error("no binding patterns supplied")]
    NoBindings,

    /// A binding was rejected.
    #[error("failed to bind queue `{queue}` to `{exchange}` with `{pattern}`")]
    Bind {
        /// The consumer's queue.
        queue: String,

        /// Exchange bound to.
        exchange: String,

        /// Rejected pattern.
        pattern: String,

        /// Transport failure.
        #[source]
        source: E,
    },

    /// The broker refused to start the delivery stream.
    #[error("failed to consume from queue `{queue}`")]
    Consume {
        /// The consumer's queue.
        queue: String,

        /// Transport failure.
        #[source]
        source: E,
    },

    /// The delivery stream reported a failure.
    #[error("delivery stream failed")]
    Delivery(#[source] E),

    /// The delivery stream ended without a shutdown request.
    #[error("delivery stream for queue `{queue}` closed")]
    StreamClosed {
        /// The consumer's queue.
        queue: String,
    },
}

impl<E> Error<E>
where
    E: BusError,
{
    /// Whether retrying on a fresh connection cannot help.
    ///
    /// An exchange that exists with different parameters, or an empty
    /// binding set, fails the same way every time.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Topology(crate::topology::Error::Declare { .. }) | Self::NoBindings
        )
    }

    /// Whether the failure ended a consumer that had been receiving.
    pub const fn was_consuming(&self) -> bool {
        matches!(self, Self::Delivery(_) | Self::StreamClosed { .. })
    }
}
