use crate::Error;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use switchyard_bus::{Delivery, EventHandler};
use tracing::{debug, info};
use url::Url;

/// Default timeout for a request to the logger service.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds an HTTP client whose requests give up after `timeout`.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

/// JSON body of a log event.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Entry name; selects how the entry is processed.
    pub name: String,

    /// Entry data.
    pub data: String,
}

/// What the processor does with an entry of a given name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Write to the logger service.
    Forward,

    /// Acknowledge without forwarding.
    Skip,
}

impl Route {
    /// Routes `auth` entries to `Skip` and everything else to `Forward`.
    #[must_use]
    pub fn for_name(name: &str) -> Self {
        match name {
            "auth" => Self::Skip,
            _ => Self::Forward,
        }
    }
}

/// Logs every event and optionally writes log entries to the logger service.
#[derive(Clone, Debug)]
pub struct EventProcessor {
    client: Client,
    logger_url: Option<Url>,
}

impl EventProcessor {
    /// A processor that only logs.
    #[must_use]
    pub fn logging_only() -> Self {
        Self {
            client: http_client(REQUEST_TIMEOUT).unwrap_or_else(|_| Client::new()),
            logger_url: None,
        }
    }

    /// A processor that also forwards entries to the logger at `logger_url`.
    #[must_use]
    pub const fn forwarding(client: Client, logger_url: Url) -> Self {
        Self {
            client,
            logger_url: Some(logger_url),
        }
    }

    async fn forward(&self, logger_url: &Url, entry: &LogEntry) -> Result<(), Error> {
        let url = format!("{}/log", logger_url.as_str().trim_end_matches('/'));

        let response = self.client.post(&url).json(entry).send().await?;

        if response.status() != StatusCode::ACCEPTED {
            return Err(Error::LoggerStatus(response.status()));
        }

        debug!(%url, name = %entry.name, "log entry forwarded");

        Ok(())
    }
}

#[async_trait]
impl EventHandler for EventProcessor {
    type Error = Error;

    async fn handle(&self, delivery: Delivery) -> Result<(), Error> {
        info!(
            routing_key = %delivery.routing_key,
            severity = delivery.severity(),
            payload = %String::from_utf8_lossy(&delivery.body),
            "received event"
        );

        let Some(logger_url) = &self.logger_url else {
            return Ok(());
        };

        let entry: LogEntry = match serde_json::from_slice(&delivery.body) {
            Ok(entry) => entry,
            Err(error) => {
                debug!(%error, "event is not a log entry, skipping");
                return Ok(());
            }
        };

        match Route::for_name(&entry.name) {
            Route::Forward => self.forward(logger_url, &entry).await,
            Route::Skip => {
                debug!(name = %entry.name, "not forwarding entry");
                Ok(())
            }
        }
    }
}
