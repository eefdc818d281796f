use crate::Error;
use crate::connection::REPLY_SUCCESS;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use lapin::options::{
    BasicConsumeOptions, BasicPublishOptions, ConfirmSelectOptions, ExchangeDeclareOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::publisher_confirm::Confirmation;
use lapin::types::FieldTable;
use lapin::{BasicProperties, ExchangeKind as LapinExchangeKind};
use switchyard_bus::{
    BindingPattern, Channel, Delivery, ExchangeKind, ExchangeSpec, OutboundMessage,
};
use tracing::trace;
use uuid::Uuid;

/// A channel on an `AmqpConnection`.
#[derive(Debug)]
pub struct AmqpChannel {
    inner: lapin::Channel,
}

impl AmqpChannel {
    pub(crate) const fn new(channel: lapin::Channel) -> Self {
        Self { inner: channel }
    }
}

const fn lapin_kind(kind: ExchangeKind) -> LapinExchangeKind {
    match kind {
        ExchangeKind::Direct => LapinExchangeKind::Direct,
        ExchangeKind::Fanout => LapinExchangeKind::Fanout,
        ExchangeKind::Topic => LapinExchangeKind::Topic,
    }
}

fn into_delivery(delivery: lapin::message::Delivery) -> Delivery {
    Delivery {
        exchange: delivery.exchange.as_str().to_string(),
        routing_key: delivery.routing_key.as_str().to_string(),
        content_type: delivery
            .properties
            .content_type()
            .as_ref()
            .map(|content_type| content_type.as_str().to_string()),
        body: Bytes::from(delivery.data),
    }
}

#[async_trait]
impl Channel for AmqpChannel {
    type Error = Error;
    type Deliveries = BoxStream<'static, Result<Delivery, Error>>;

    async fn declare_exchange(&self, exchange: &ExchangeSpec) -> Result<(), Error> {
        let options = ExchangeDeclareOptions {
            durable: exchange.durable,
            auto_delete: exchange.auto_delete,
            internal: false,
            nowait: false,
            passive: false,
        };

        self.inner
            .exchange_declare(
                &exchange.name,
                lapin_kind(exchange.kind),
                options,
                FieldTable::default(),
            )
            .await?;

        Ok(())
    }

    async fn declare_exclusive_queue(&self) -> Result<String, Error> {
        let options = QueueDeclareOptions {
            exclusive: true,
            ..QueueDeclareOptions::default()
        };

        let queue = self
            .inner
            .queue_declare("", options, FieldTable::default())
            .await?;

        Ok(queue.name().as_str().to_string())
    }

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        pattern: &BindingPattern,
    ) -> Result<(), Error> {
        self.inner
            .queue_bind(
                queue,
                exchange,
                pattern.as_str(),
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;

        Ok(())
    }

    async fn publish(&self, exchange: &str, message: OutboundMessage) -> Result<(), Error> {
        if message.confirm {
            self.inner
                .confirm_select(ConfirmSelectOptions::default())
                .await?;
        }

        let properties =
            BasicProperties::default().with_content_type(message.content_type.as_str().into());

        let confirm = self
            .inner
            .basic_publish(
                exchange,
                message.routing_key.as_str(),
                BasicPublishOptions::default(),
                &message.body,
                properties,
            )
            .await?;

        if !message.confirm {
            return Ok(());
        }

        match confirm.await? {
            Confirmation::Nack(_) => Err(Error::Nacked {
                exchange: exchange.to_string(),
                routing_key: message.routing_key.into(),
            }),
            Confirmation::Ack(_) | Confirmation::NotRequested => {
                trace!(%exchange, routing_key = %message.routing_key, "publish confirmed");
                Ok(())
            }
        }
    }

    async fn consume(&self, queue: &str) -> Result<Self::Deliveries, Error> {
        let options = BasicConsumeOptions {
            no_ack: true,
            ..BasicConsumeOptions::default()
        };
        let tag = format!("switchyard-{}", Uuid::new_v4().simple());

        let consumer = self
            .inner
            .basic_consume(queue, &tag, options, FieldTable::default())
            .await?;

        Ok(consumer
            .map_ok(into_delivery)
            .map_err(Error::from)
            .boxed())
    }

    async fn close(&self) -> Result<(), Error> {
        if self.inner.status().connected() {
            self.inner.close(REPLY_SUCCESS, "OK").await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_kinds() {
        assert_eq!(lapin_kind(ExchangeKind::Topic), LapinExchangeKind::Topic);
        assert_eq!(lapin_kind(ExchangeKind::Direct), LapinExchangeKind::Direct);
        assert_eq!(lapin_kind(ExchangeKind::Fanout), LapinExchangeKind::Fanout);
    }
}
