mod error;

pub use error::Error;

use crate::handler::EventHandler;
use crate::routing::BindingPattern;
use crate::topology::{ExchangeSpec, declare_topology};
use crate::transport::{Channel, Connection};

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Receives events matching a set of binding patterns.
///
/// Each consumer owns one exclusive, server-named queue. The queue disappears
/// with the connection, so events published while no consumer is connected
/// are not seen by it.
#[derive(Debug)]
pub struct Consumer<C>
where
    C: Connection,
{
    connection: C,
    channel: C::Channel,
    exchange: ExchangeSpec,
    queue: String,
}

impl<C> Consumer<C>
where
    C: Connection,
{
    /// Declares the exchange and an exclusive queue on `connection`.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange or the queue cannot be declared.
    pub async fn new(connection: C, exchange: ExchangeSpec) -> Result<Self, Error<C::Error>> {
        declare_topology(&connection, &exchange).await?;

        let channel = connection.open_channel().await.map_err(Error::Channel)?;

        let queue = match channel.declare_exclusive_queue().await {
            Ok(queue) => queue,
            Err(source) => {
                if let Err(error) = channel.close().await {
                    debug!(%error, "failed to release consumer channel");
                }
                return Err(Error::DeclareQueue(source));
            }
        };

        debug!(%queue, exchange = %exchange.name, "declared exclusive queue");

        Ok(Self {
            connection,
            channel,
            exchange,
            queue,
        })
    }

    /// Name the broker assigned to this consumer's queue.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// The exchange the queue is bound to.
    pub const fn exchange(&self) -> &ExchangeSpec {
        &self.exchange
    }

    /// The connection the consumer runs on.
    pub const fn connection(&self) -> &C {
        &self.connection
    }

    /// Binds the queue for every pattern, then hands each delivery to
    /// `handler` until `shutdown` is cancelled or the stream fails.
    ///
    /// Deliveries are processed one at a time in arrival order. A handler
    /// error is logged and the next delivery is processed.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoBindings` for an empty pattern list, an error if a
    /// binding or the consume call is rejected, and `Error::StreamClosed` or
    /// `Error::Delivery` if the stream ends while still wanted.
    pub async fn listen<H>(
        &self,
        patterns: &[BindingPattern],
        handler: &H,
        shutdown: &CancellationToken,
    ) -> Result<(), Error<C::Error>>
    where
        H: EventHandler,
    {
        if patterns.is_empty() {
            return Err(Error::NoBindings);
        }

        for pattern in patterns {
            self.channel
                .bind_queue(&self.queue, &self.exchange.name, pattern)
                .await
                .map_err(|source| Error::Bind {
                    queue: self.queue.clone(),
                    exchange: self.exchange.name.clone(),
                    pattern: pattern.to_string(),
                    source,
                })?;

            debug!(queue = %self.queue, %pattern, "queue bound");
        }

        let mut deliveries =
            self.channel
                .consume(&self.queue)
                .await
                .map_err(|source| Error::Consume {
                    queue: self.queue.clone(),
                    source,
                })?;

        info!(
            queue = %self.queue,
            exchange = %self.exchange.name,
            bindings = patterns.len(),
            "waiting for events"
        );

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    info!(queue = %self.queue, "shutting down consumer");
                    if let Err(error) = self.connection.close().await {
                        debug!(%error, "failed to close connection on shutdown");
                    }
                    return Ok(());
                }
                next = deliveries.next() => match next {
                    Some(Ok(delivery)) => {
                        trace!(routing_key = %delivery.routing_key, bytes = delivery.body.len(), "received event");
                        let routing_key = delivery.routing_key.clone();
                        if let Err(error) = handler.handle(delivery).await {
                            warn!(%routing_key, %error, "failed to handle event");
                        }
                    }
                    Some(Err(source)) => return Err(Error::Delivery(source)),
                    None => {
                        return Err(Error::StreamClosed {
                            queue: self.queue.clone(),
                        });
                    }
                },
            }
        }
    }
}
