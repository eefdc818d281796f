//! HTTP dispatcher that forwards auth and mail requests to their services and
//! publishes log entries onto the message bus.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod action;
mod error;
mod publisher;
mod response;
mod routes;
mod upstream;

pub use action::{Action, AuthPayload, LogPayload, MailPayload};
pub use error::Error;
pub use publisher::LogPublisher;
pub use response::JsonResponse;
pub use routes::{BrokerState, MAX_BODY_BYTES, router};
pub use upstream::{DEFAULT_AUTH_URL, DEFAULT_MAIL_URL, REQUEST_TIMEOUT, Upstreams, http_client};

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Serves `router` on `listen_addr` until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(
    listen_addr: SocketAddr,
    router: Router,
    shutdown: CancellationToken,
) -> Result<(), Error> {
    let listener = TcpListener::bind(listen_addr).await.map_err(Error::Bind)?;

    info!(%listen_addr, "broker listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(Error::Serve)?;

    info!("broker shut down");

    Ok(())
}
