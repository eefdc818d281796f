mod error;

pub use error::Error;

use crate::event::{Event, Severity};
use crate::routing::{DEFAULT_NAMESPACE, RoutingKey};
use crate::topology::{ExchangeSpec, declare_topology};
use crate::transport::{Channel, Connection, OutboundMessage};

use bytes::Bytes;
use tracing::debug;

/// Content type attached to every published event.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Options for new emitters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmitterOptions {
    /// Exchange events are published to.
    pub exchange: ExchangeSpec,

    /// Prefix joined to the severity to form the routing key.
    pub namespace: String,

    /// Content type metadata for published events.
    pub content_type: String,

    /// Wait for a broker acknowledgement on every publish.
    pub confirm: bool,
}

impl Default for EmitterOptions {
    fn default() -> Self {
        Self {
            exchange: ExchangeSpec::default(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            confirm: false,
        }
    }
}

/// Publishes events onto the shared exchange.
///
/// Each publish opens and releases its own channel, so one emitter can be
/// used from many tasks at once.
#[derive(Clone, Debug)]
pub struct Emitter<C>
where
    C: Connection,
{
    connection: C,
    options: EmitterOptions,
}

impl<C> Emitter<C>
where
    C: Connection,
{
    /// Declares the exchange on `connection` and returns an emitter bound
    /// to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange cannot be declared.
    pub async fn new(connection: C, options: EmitterOptions) -> Result<Self, Error<C::Error>> {
        declare_topology(&connection, &options.exchange).await?;

        Ok(Self {
            connection,
            options,
        })
    }

    /// The connection events are published on.
    pub const fn connection(&self) -> &C {
        &self.connection
    }

    /// The options this emitter was created with.
    pub const fn options(&self) -> &EmitterOptions {
        &self.options
    }

    /// Routing key an event of `severity` is published with.
    pub fn routing_key(&self, severity: &Severity) -> RoutingKey {
        RoutingKey::for_severity(&self.options.namespace, severity)
    }

    /// Publishes `body` under `severity`.
    ///
    /// Fire-and-forget unless confirms are enabled: an event no queue is
    /// bound for is dropped by the broker without an error. Failures are not
    /// retried.
    ///
    /// # Errors
    ///
    /// Returns an error if a channel cannot be opened or the publish fails.
    pub async fn publish(
        &self,
        body: impl Into<Bytes> + Send,
        severity: impl Into<Severity> + Send,
    ) -> Result<(), Error<C::Error>> {
        let severity = severity.into();
        let routing_key = self.routing_key(&severity);
        let exchange = &self.options.exchange.name;

        let channel = self
            .connection
            .open_channel()
            .await
            .map_err(|source| Error::Channel {
                routing_key: routing_key.to_string(),
                source,
            })?;

        let message = OutboundMessage {
            routing_key: routing_key.clone(),
            body: body.into(),
            content_type: self.options.content_type.clone(),
            confirm: self.options.confirm,
        };

        debug!(%exchange, %routing_key, bytes = message.body.len(), "publishing event");

        let published = channel.publish(exchange, message).await;

        if let Err(error) = channel.close().await {
            debug!(%routing_key, %error, "failed to release publish channel");
        }

        published.map_err(|source| Error::Publish {
            exchange: exchange.clone(),
            routing_key: routing_key.into(),
            source,
        })
    }

    /// Publishes an `Event`.
    ///
    /// # Errors
    ///
    /// Same as `publish`.
    pub async fn publish_event(&self, event: &Event) -> Result<(), Error<C::Error>> {
        self.publish(event.body.clone(), event.severity.clone())
            .await
    }
}
