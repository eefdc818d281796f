mod error;

pub use error::Error;

use crate::connection::{self, ConnectionManager};
use crate::consumer::Consumer;
use crate::handler::EventHandler;
use crate::routing::{BindingPattern, default_log_bindings};
use crate::topology::ExchangeSpec;
use crate::transport::{Connection, DialError, Dialer};

use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Options for the supervised listener.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SupervisorOptions {
    /// Exchange to consume from.
    pub exchange: ExchangeSpec,

    /// Patterns the queue is bound with.
    pub bindings: Vec<BindingPattern>,

    /// Consecutive reconnects allowed before the listener gives up.
    pub max_restarts: u32,

    /// Pause before each reconnect.
    pub restart_delay: Duration,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            exchange: ExchangeSpec::default(),
            bindings: default_log_bindings(),
            max_restarts: 3,
            restart_delay: Duration::from_secs(1),
        }
    }
}

/// Runs a consumer and reconnects it when the connection drops.
///
/// Each run goes through the connection bootstrap first, so a restart also
/// gets the full backoff schedule. Every reconnect declares a fresh exclusive
/// queue; events published in between are lost.
#[derive(Debug)]
pub struct ResilientListener<D>
where
    D: Dialer,
{
    manager: ConnectionManager<D>,
    options: SupervisorOptions,
}

impl<D> ResilientListener<D>
where
    D: Dialer,
{
    /// Creates a new supervised listener.
    pub const fn new(manager: ConnectionManager<D>, options: SupervisorOptions) -> Self {
        Self { manager, options }
    }

    /// The connection manager.
    pub const fn manager(&self) -> &ConnectionManager<D> {
        &self.manager
    }

    /// The supervisor options.
    pub const fn options(&self) -> &SupervisorOptions {
        &self.options
    }

    /// Consumes until `shutdown` is cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the bootstrap gives up, the consumer hits a
    /// failure a restart cannot fix, or `max_restarts` is exceeded.
    pub async fn run<H>(
        &self,
        handler: &H,
        shutdown: &CancellationToken,
    ) -> Result<(), Error<DialError<D>>>
    where
        H: EventHandler,
    {
        let mut restarts = 0;

        loop {
            let connection = match self.manager.connect_until_cancelled(shutdown).await {
                Ok(connection) => connection,
                Err(connection::Error::Cancelled { .. }) => return Ok(()),
                Err(error) => return Err(error.into()),
            };

            let result = match Consumer::new(connection.clone(), self.options.exchange.clone())
                .await
            {
                Ok(consumer) => {
                    consumer
                        .listen(&self.options.bindings, handler, shutdown)
                        .await
                }
                Err(error) => Err(error),
            };

            let source = match result {
                Ok(()) => return Ok(()),
                Err(source) => source,
            };

            if let Err(error) = connection.close().await {
                debug!(%error, "failed to close broken connection");
            }

            if shutdown.is_cancelled() {
                return Ok(());
            }

            if source.is_fatal() {
                return Err(Error::Startup(source));
            }

            // The budget covers consecutive failures to get a consumer running.
            if source.was_consuming() {
                restarts = 0;
            }

            restarts += 1;

            if restarts > self.options.max_restarts {
                return Err(Error::RestartsExhausted {
                    restarts: restarts - 1,
                    source,
                });
            }

            warn!(
                restart = restarts,
                max_restarts = self.options.max_restarts,
                error = %source,
                "listener lost its connection, reconnecting"
            );

            tokio::select! {
                () = shutdown.cancelled() => return Ok(()),
                () = sleep(self.options.restart_delay) => {}
            }

            info!(restart = restarts, "restarting listener");
        }
    }
}
