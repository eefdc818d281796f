use crate::event::Delivery;
use crate::routing::{BindingPattern, RoutingKey};
use crate::topology::ExchangeSpec;

use std::error::Error;
use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

/// Marker trait for transport errors
pub trait BusError: Error + Send + Sync + 'static {}

/// Error type produced by the connections a dialer opens.
pub type DialError<D> = <<D as Dialer>::Connection as Connection>::Error;

/// A message ready to be handed to the transport.
///
/// Publishes are always non-mandatory and non-immediate: the broker may drop
/// a message nothing is bound to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Routing key the exchange routes on.
    pub routing_key: RoutingKey,

    /// Uninterpreted payload.
    pub body: Bytes,

    /// Content type metadata.
    pub content_type: String,

    /// Wait for the broker to confirm the publish.
    pub confirm: bool,
}

/// Opens connections to a message bus.
#[async_trait]
pub trait Dialer
where
    Self: Send + Sync + 'static,
{
    /// The connection type produced by a successful dial.
    type Connection: Connection;

    /// Address of the bus, safe to log.
    fn address(&self) -> String;

    /// Attempts a single connection.
    async fn dial(&self) -> Result<Self::Connection, DialError<Self>>;
}

/// A live connection to the bus.
///
/// Clones share the underlying connection. A connection that has failed is
/// never reused; dial a new one instead.
#[async_trait]
pub trait Connection
where
    Self: Clone + Debug + Send + Sync + 'static,
{
    /// The error type for the connection and its channels.
    type Error: BusError;

    /// The channel type opened on this connection.
    type Channel: Channel<Error = Self::Error>;

    /// Opens a new channel. Channels are not shared between concurrent
    /// callers.
    async fn open_channel(&self) -> Result<Self::Channel, Self::Error>;

    /// Closes the connection, ending every channel and consumer on it.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Whether the connection is still usable.
    fn is_open(&self) -> bool;
}

/// A lightweight session multiplexed over a connection.
#[async_trait]
pub trait Channel
where
    Self: Debug + Send + Sync + 'static,
{
    /// The error type for the channel.
    type Error: BusError;

    /// Stream of deliveries produced by `consume`.
    type Deliveries: Stream<Item = Result<Delivery, Self::Error>> + Send + Unpin + 'static;

    /// Declares an exchange. Succeeds without change if an identical
    /// exchange already exists.
    async fn declare_exchange(&self, exchange: &ExchangeSpec) -> Result<(), Self::Error>;

    /// Declares a server-named queue exclusive to this connection and returns
    /// its name.
    async fn declare_exclusive_queue(&self) -> Result<String, Self::Error>;

    /// Binds a queue to an exchange for a routing pattern.
    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        pattern: &BindingPattern,
    ) -> Result<(), Self::Error>;

    /// Publishes a message to an exchange.
    async fn publish(&self, exchange: &str, message: OutboundMessage) -> Result<(), Self::Error>;

    /// Starts an auto-acknowledged consumer on a queue.
    async fn consume(&self, queue: &str) -> Result<Self::Deliveries, Self::Error>;

    /// Releases the channel.
    async fn close(&self) -> Result<(), Self::Error>;
}
