use crate::event::Delivery;

use std::error::Error;

use async_trait::async_trait;

/// Marker trait for handler errors
pub trait HandlerError: Error + Send + Sync + 'static {}

/// Processes deliveries for a consumer.
///
/// A failed delivery is logged by the consumer and does not stop it.
#[async_trait]
pub trait EventHandler
where
    Self: Send + Sync + 'static,
{
    /// The error type for the handler.
    type Error: HandlerError;

    /// Handles one delivery.
    async fn handle(&self, delivery: Delivery) -> Result<(), Self::Error>;
}
