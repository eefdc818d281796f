#![allow(dead_code)]

use std::time::Duration;

use async_trait::async_trait;
use switchyard_bus::{Delivery, EventHandler, HandlerError};
use switchyard_bus_memory::MemoryBroker;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Error)]
#[error("rejected delivery")]
pub struct RejectedDelivery;

impl HandlerError for RejectedDelivery {}

/// Forwards every delivery to a channel. Bodies equal to `reject` are
/// forwarded and then reported as failures.
#[derive(Clone, Debug)]
pub struct CollectingHandler {
    sender: mpsc::UnboundedSender<Delivery>,
    reject: Option<&'static str>,
}

impl CollectingHandler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Delivery>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender,
                reject: None,
            },
            receiver,
        )
    }

    pub fn rejecting(body: &'static str) -> (Self, mpsc::UnboundedReceiver<Delivery>) {
        let (handler, receiver) = Self::new();
        (
            Self {
                reject: Some(body),
                ..handler
            },
            receiver,
        )
    }
}

#[async_trait]
impl EventHandler for CollectingHandler {
    type Error = RejectedDelivery;

    async fn handle(&self, delivery: Delivery) -> Result<(), Self::Error> {
        let rejected = self.reject.is_some_and(|body| delivery.body == body);
        self.sender.send(delivery).map_err(|_| RejectedDelivery)?;

        if rejected {
            Err(RejectedDelivery)
        } else {
            Ok(())
        }
    }
}

/// Waits until the broker holds exactly `count` bindings.
pub async fn wait_for_bindings(broker: &MemoryBroker, count: usize) {
    timeout(Duration::from_secs(2), async {
        while broker.binding_count() != count {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("bindings were not established in time");
}

pub async fn next_delivery(receiver: &mut mpsc::UnboundedReceiver<Delivery>) -> Delivery {
    timeout(Duration::from_secs(1), receiver.recv())
        .await
        .expect("timed out waiting for delivery")
        .expect("handler channel closed")
}
