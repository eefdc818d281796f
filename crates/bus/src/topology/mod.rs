mod error;

pub use error::Error;

use crate::transport::{Channel, Connection};

use std::fmt;

use tracing::{debug, info};

/// Name of the exchange every publisher and subscriber shares.
pub const DEFAULT_EXCHANGE: &str = "logs_topic";

/// Exchange routing algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExchangeKind {
    /// Routes on exact routing key.
    Direct,

    /// Routes to every bound queue.
    Fanout,

    /// Routes on routing key patterns.
    Topic,
}

impl ExchangeKind {
    /// Protocol name of the exchange type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Fanout => "fanout",
            Self::Topic => "topic",
        }
    }
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters an exchange is declared with.
///
/// Redeclaring with identical parameters is a no-op; any difference is
/// rejected by the broker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangeSpec {
    /// Exchange name.
    pub name: String,

    /// Routing algorithm.
    pub kind: ExchangeKind,

    /// Survives broker restarts.
    pub durable: bool,

    /// Removed once the last queue unbinds.
    pub auto_delete: bool,
}

impl ExchangeSpec {
    /// A durable topic exchange.
    pub fn topic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ExchangeKind::Topic,
            durable: true,
            auto_delete: false,
        }
    }
}

impl Default for ExchangeSpec {
    fn default() -> Self {
        Self::topic(DEFAULT_EXCHANGE)
    }
}

/// Declares `exchange` on a transient channel, releasing the channel whether
/// or not the declaration succeeds.
///
/// Must succeed before anything is published or bound on `connection`.
///
/// # Errors
///
/// Returns an error if the channel cannot be opened or the declaration is
/// rejected (for example an existing exchange with different parameters).
pub async fn declare_topology<C>(
    connection: &C,
    exchange: &ExchangeSpec,
) -> Result<(), Error<C::Error>>
where
    C: Connection,
{
    let channel = connection
        .open_channel()
        .await
        .map_err(|source| Error::Channel {
            exchange: exchange.name.clone(),
            source,
        })?;

    let declared = channel.declare_exchange(exchange).await;

    if let Err(error) = channel.close().await {
        debug!(exchange = %exchange.name, %error, "failed to release topology channel");
    }

    declared.map_err(|source| Error::Declare {
        exchange: exchange.name.clone(),
        kind: exchange.kind,
        source,
    })?;

    info!(exchange = %exchange.name, kind = %exchange.kind, "exchange declared");

    Ok(())
}
