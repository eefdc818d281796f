//! In-memory implementation of the message bus transport.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod broker;
mod connection;
mod error;

pub use broker::{MEMORY_ADDRESS, MemoryBroker};
pub use connection::{MemoryChannel, MemoryConnection, MemoryDialer};
pub use error::Error;

#[cfg(test)]
mod tests {
    use super::*;

    use futures::StreamExt;
    use switchyard_bus::{
        BindingPattern, Channel, Connection, Dialer, ExchangeKind, ExchangeSpec, OutboundMessage,
        RoutingKey,
    };

    fn message(routing_key: &str, body: &'static str) -> OutboundMessage {
        OutboundMessage {
            routing_key: RoutingKey::new(routing_key),
            body: body.into(),
            content_type: "text/plain".to_string(),
            confirm: false,
        }
    }

    #[tokio::test]
    async fn test_redeclare_identical_exchange() {
        let broker = MemoryBroker::new();
        let connection = broker.dialer().dial().await.unwrap();
        let channel = connection.open_channel().await.unwrap();

        let spec = ExchangeSpec::default();
        channel.declare_exchange(&spec).await.unwrap();
        channel.declare_exchange(&spec).await.unwrap();

        assert_eq!(broker.exchange("logs_topic"), Some(spec));
    }

    #[tokio::test]
    async fn test_redeclare_conflicting_exchange() {
        let broker = MemoryBroker::new();
        let connection = broker.dialer().dial().await.unwrap();
        let channel = connection.open_channel().await.unwrap();

        channel
            .declare_exchange(&ExchangeSpec::default())
            .await
            .unwrap();

        let conflicting = ExchangeSpec {
            kind: ExchangeKind::Fanout,
            ..ExchangeSpec::default()
        };

        assert_eq!(
            channel.declare_exchange(&conflicting).await,
            Err(Error::PreconditionFailed("logs_topic".to_string()))
        );
    }

    #[tokio::test]
    async fn test_publish_to_unknown_exchange() {
        let broker = MemoryBroker::new();
        let connection = broker.dialer().dial().await.unwrap();
        let channel = connection.open_channel().await.unwrap();

        assert_eq!(
            channel.publish("missing", message("log.INFO", "x")).await,
            Err(Error::ExchangeNotFound("missing".to_string()))
        );
    }

    #[tokio::test]
    async fn test_one_copy_per_queue() {
        let broker = MemoryBroker::new();
        let connection = broker.dialer().dial().await.unwrap();
        let channel = connection.open_channel().await.unwrap();
        channel
            .declare_exchange(&ExchangeSpec::default())
            .await
            .unwrap();

        let queue = channel.declare_exclusive_queue().await.unwrap();
        for pattern in ["log.ERROR", "log.*", "#"] {
            channel
                .bind_queue(&queue, "logs_topic", &BindingPattern::new(pattern).unwrap())
                .await
                .unwrap();
        }

        let mut deliveries = channel.consume(&queue).await.unwrap();

        channel
            .publish("logs_topic", message("log.ERROR", "first"))
            .await
            .unwrap();
        channel
            .publish("logs_topic", message("log.INFO", "second"))
            .await
            .unwrap();

        let first = deliveries.next().await.unwrap().unwrap();
        assert_eq!(first.body, "first");
        assert_eq!(first.content_type.as_deref(), Some("text/plain"));

        let second = deliveries.next().await.unwrap().unwrap();
        assert_eq!(second.body, "second");
    }

    #[tokio::test]
    async fn test_exclusive_queue_is_locked() {
        let broker = MemoryBroker::new();
        let owner = broker.dialer().dial().await.unwrap();
        let other = broker.dialer().dial().await.unwrap();

        let owner_channel = owner.open_channel().await.unwrap();
        owner_channel
            .declare_exchange(&ExchangeSpec::default())
            .await
            .unwrap();
        let queue = owner_channel.declare_exclusive_queue().await.unwrap();

        let other_channel = other.open_channel().await.unwrap();
        let pattern = BindingPattern::new("log.INFO").unwrap();

        assert_eq!(
            other_channel.bind_queue(&queue, "logs_topic", &pattern).await,
            Err(Error::ResourceLocked(queue.clone()))
        );
    }

    #[tokio::test]
    async fn test_second_consume_rejected() {
        let broker = MemoryBroker::new();
        let connection = broker.dialer().dial().await.unwrap();
        let channel = connection.open_channel().await.unwrap();
        let queue = channel.declare_exclusive_queue().await.unwrap();

        let _deliveries = channel.consume(&queue).await.unwrap();

        assert!(matches!(
            channel.consume(&queue).await,
            Err(Error::AlreadyConsumed(_))
        ));
    }

    #[tokio::test]
    async fn test_close_removes_exclusive_queues() {
        let broker = MemoryBroker::new();
        let connection = broker.dialer().dial().await.unwrap();
        let channel = connection.open_channel().await.unwrap();
        let queue = channel.declare_exclusive_queue().await.unwrap();
        let mut deliveries = channel.consume(&queue).await.unwrap();

        assert_eq!(broker.queue_count(), 1);

        connection.close().await.unwrap();

        assert!(!connection.is_open());
        assert_eq!(broker.queue_count(), 0);
        assert!(deliveries.next().await.is_none());
        assert_eq!(
            connection.open_channel().await.unwrap_err(),
            Error::ConnectionClosed
        );
    }

    #[tokio::test]
    async fn test_closed_channel_rejects_operations() {
        let broker = MemoryBroker::new();
        let connection = broker.dialer().dial().await.unwrap();
        let channel = connection.open_channel().await.unwrap();

        channel.close().await.unwrap();

        assert_eq!(
            channel.declare_exclusive_queue().await,
            Err(Error::ChannelClosed)
        );
        assert!(connection.is_open());
    }

    #[tokio::test]
    async fn test_dial_failures() {
        let broker = MemoryBroker::new();
        broker.fail_next_dials(2);

        let dialer = broker.dialer();
        assert!(dialer.dial().await.is_err());
        assert!(dialer.dial().await.is_err());
        assert!(dialer.dial().await.is_ok());
        assert_eq!(broker.dial_attempts(), 3);

        broker.set_reachable(false);
        assert_eq!(
            dialer.dial().await.unwrap_err(),
            Error::Unreachable(MEMORY_ADDRESS.to_string())
        );
    }
}
