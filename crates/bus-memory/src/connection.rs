use crate::Error;
use crate::broker::{MEMORY_ADDRESS, MemoryBroker};

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use switchyard_bus::{
    BindingPattern, Channel, Connection, Delivery, Dialer, ExchangeSpec, OutboundMessage,
};
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Dials a `MemoryBroker`.
#[derive(Clone, Debug)]
pub struct MemoryDialer {
    broker: MemoryBroker,
}

impl MemoryDialer {
    /// Creates a dialer for `broker`.
    #[must_use]
    pub const fn new(broker: MemoryBroker) -> Self {
        Self { broker }
    }
}

#[async_trait]
impl Dialer for MemoryDialer {
    type Connection = MemoryConnection;

    fn address(&self) -> String {
        MEMORY_ADDRESS.to_string()
    }

    async fn dial(&self) -> Result<MemoryConnection, Error> {
        self.broker.dial()
    }
}

/// A connection to a `MemoryBroker`.
#[derive(Clone, Debug)]
pub struct MemoryConnection {
    id: u64,
    broker: MemoryBroker,
}

impl MemoryConnection {
    pub(crate) const fn new(id: u64, broker: MemoryBroker) -> Self {
        Self { id, broker }
    }

    /// Broker-assigned connection id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    type Error = Error;
    type Channel = MemoryChannel;

    async fn open_channel(&self) -> Result<MemoryChannel, Error> {
        if !self.is_open() {
            return Err(Error::ConnectionClosed);
        }

        Ok(MemoryChannel {
            connection: self.id,
            broker: self.broker.clone(),
            open: AtomicBool::new(true),
        })
    }

    async fn close(&self) -> Result<(), Error> {
        self.broker.close_connection(self.id);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.broker.is_connected(self.id)
    }
}

/// A channel on a `MemoryConnection`.
#[derive(Debug)]
pub struct MemoryChannel {
    connection: u64,
    broker: MemoryBroker,
    open: AtomicBool,
}

impl MemoryChannel {
    fn ensure_open(&self) -> Result<(), Error> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(Error::ChannelClosed)
        }
    }
}

#[async_trait]
impl Channel for MemoryChannel {
    type Error = Error;
    type Deliveries = BoxStream<'static, Result<Delivery, Error>>;

    async fn declare_exchange(&self, exchange: &ExchangeSpec) -> Result<(), Error> {
        self.ensure_open()?;
        self.broker.declare_exchange(self.connection, exchange)
    }

    async fn declare_exclusive_queue(&self) -> Result<String, Error> {
        self.ensure_open()?;
        self.broker.declare_exclusive_queue(self.connection)
    }

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        pattern: &BindingPattern,
    ) -> Result<(), Error> {
        self.ensure_open()?;
        self.broker
            .bind_queue(self.connection, queue, exchange, pattern)
    }

    async fn publish(&self, exchange: &str, message: OutboundMessage) -> Result<(), Error> {
        self.ensure_open()?;

        let delivery = Delivery {
            exchange: exchange.to_string(),
            routing_key: message.routing_key.into(),
            body: message.body,
            content_type: Some(message.content_type),
        };

        self.broker
            .publish(self.connection, exchange, &delivery)
            .map(|_| ())
    }

    async fn consume(&self, queue: &str) -> Result<Self::Deliveries, Error> {
        self.ensure_open()?;
        let receiver = self.broker.take_receiver(self.connection, queue)?;

        Ok(UnboundedReceiverStream::new(receiver).map(Ok).boxed())
    }

    async fn close(&self) -> Result<(), Error> {
        self.open.store(false, Ordering::Release);
        Ok(())
    }
}
