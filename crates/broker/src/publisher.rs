use crate::Error;

use switchyard_bus::{Connection, ConnectionManager, Dialer, Emitter, EmitterOptions, Severity};
use tokio::sync::RwLock;
use tracing::{info, warn};

type BusEmitter<D> = Emitter<<D as Dialer>::Connection>;

/// Publishes log entries, re-dialing once the bus connection has gone away.
///
/// A single publish is never retried. The emitter is replaced before the next
/// publish when its connection is no longer open.
#[derive(Debug)]
pub struct LogPublisher<D>
where
    D: Dialer,
{
    manager: ConnectionManager<D>,
    options: EmitterOptions,
    emitter: RwLock<Option<BusEmitter<D>>>,
}

fn live<C>(slot: Option<&Emitter<C>>) -> Option<Emitter<C>>
where
    C: Connection,
{
    slot.filter(|emitter| emitter.connection().is_open()).cloned()
}

impl<D> LogPublisher<D>
where
    D: Dialer,
{
    /// A publisher that dials on its first publish.
    pub fn new(manager: ConnectionManager<D>, options: EmitterOptions) -> Self {
        Self {
            manager,
            options,
            emitter: RwLock::new(None),
        }
    }

    /// A publisher starting from an emitter that is already connected.
    pub fn with_emitter(manager: ConnectionManager<D>, emitter: BusEmitter<D>) -> Self {
        Self {
            manager,
            options: emitter.options().clone(),
            emitter: RwLock::new(Some(emitter)),
        }
    }

    /// Publishes `body` under `severity`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Publish` if the bus cannot be reached or the publish
    /// fails.
    pub async fn publish(&self, body: Vec<u8>, severity: Severity) -> Result<(), Error> {
        let emitter = self.current().await?;

        emitter
            .publish(body, severity)
            .await
            .map_err(|error| Error::Publish(error.to_string()))
    }

    async fn current(&self) -> Result<BusEmitter<D>, Error> {
        if let Some(emitter) = live(self.emitter.read().await.as_ref()) {
            return Ok(emitter);
        }

        let mut slot = self.emitter.write().await;

        // Another request may have reconnected while we waited.
        if let Some(emitter) = live(slot.as_ref()) {
            return Ok(emitter);
        }

        if slot.take().is_some() {
            warn!(address = %self.manager.dialer().address(), "bus connection lost, reconnecting");
        }

        let connection = self
            .manager
            .connect()
            .await
            .map_err(|error| Error::Publish(error.to_string()))?;

        let emitter = match Emitter::new(connection.clone(), self.options.clone()).await {
            Ok(emitter) => emitter,
            Err(error) => {
                let _ = connection.close().await;
                return Err(Error::Publish(error.to_string()));
            }
        };

        info!(exchange = %self.options.exchange.name, "log publisher connected");
        *slot = Some(emitter.clone());

        Ok(emitter)
    }
}
