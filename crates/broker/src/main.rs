//! Runs the HTTP dispatcher against an AMQP bus.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use switchyard_broker::{
    BrokerState, DEFAULT_AUTH_URL, DEFAULT_MAIL_URL, LogPublisher, Upstreams, http_client, router,
    serve,
};
use switchyard_bus::connection::{self, DEFAULT_MAX_FAILURES};
use switchyard_bus::topology::DEFAULT_EXCHANGE;
use switchyard_bus::{BackoffPolicy, ConnectionManager, Emitter, EmitterOptions, ExchangeSpec};
use switchyard_bus_amqp::{AmqpDialer, DEFAULT_AMQP_URL};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

/// CLI-specific error type
#[derive(Debug, thiserror::Error)]
enum Error {
    /// Invalid bus address
    #[error(transparent)]
    Address(switchyard_bus_amqp::Error),

    /// Bus bootstrap failed
    #[error(transparent)]
    Connect(#[from] switchyard_bus::connection::Error<switchyard_bus_amqp::Error>),

    /// Exchange declaration failed
    #[error(transparent)]
    Emitter(#[from] switchyard_bus::emitter::Error<switchyard_bus_amqp::Error>),

    /// HTTP client setup failed
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// HTTP server failure
    #[error(transparent)]
    Broker(#[from] switchyard_broker::Error),
}

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Address the HTTP server listens on
    #[arg(long, default_value = "0.0.0.0:8080", env = "SWITCHYARD_LISTEN_ADDR")]
    listen_addr: SocketAddr,

    /// Message bus URI
    #[arg(long, default_value = DEFAULT_AMQP_URL, env = "SWITCHYARD_BUS_URL")]
    bus_url: String,

    /// Exchange log events are published to
    #[arg(long, default_value = DEFAULT_EXCHANGE, env = "SWITCHYARD_EXCHANGE")]
    exchange: String,

    /// Auth service base URL
    #[arg(long, default_value = DEFAULT_AUTH_URL, env = "SWITCHYARD_AUTH_URL")]
    auth_url: Url,

    /// Mail service base URL
    #[arg(long, default_value = DEFAULT_MAIL_URL, env = "SWITCHYARD_MAIL_URL")]
    mail_url: Url,

    /// Timeout for a request to the auth or mailer service, in milliseconds
    #[arg(long, default_value_t = 10_000, env = "SWITCHYARD_REQUEST_TIMEOUT_MS")]
    request_timeout_ms: u64,

    /// Unit of the quadratic connect backoff, in milliseconds
    #[arg(long, default_value_t = 1000, env = "SWITCHYARD_BACKOFF_UNIT_MS")]
    backoff_unit_ms: u64,
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            match (
                signal(SignalKind::terminate()),
                signal(SignalKind::interrupt()),
            ) {
                (Ok(mut sigterm), Ok(mut sigint)) => {
                    tokio::select! {
                        _ = sigterm.recv() => info!("Received SIGTERM"),
                        _ = sigint.recv() => info!("Received SIGINT"),
                    }
                }
                _ => {
                    warn!("failed to install signal handlers, falling back to ctrl-c");
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received interrupt signal");
        }

        info!("Shutting down");
        shutdown.cancel();
    });
}

async fn run(args: Args, shutdown: CancellationToken) -> Result<(), Error> {
    let dialer = AmqpDialer::new(args.bus_url).map_err(Error::Address)?;
    let policy = BackoffPolicy::new(
        DEFAULT_MAX_FAILURES,
        Duration::from_millis(args.backoff_unit_ms),
    );

    let manager = ConnectionManager::new(dialer, policy);
    let connection = match manager.connect_until_cancelled(&shutdown).await {
        Ok(connection) => connection,
        Err(connection::Error::Cancelled { .. }) => return Ok(()),
        Err(error) => return Err(error.into()),
    };

    let options = EmitterOptions {
        exchange: ExchangeSpec::topic(args.exchange),
        ..EmitterOptions::default()
    };
    let emitter = Emitter::new(connection, options).await?;
    let publisher = LogPublisher::with_emitter(manager, emitter);

    let upstreams = Upstreams::new(
        http_client(Duration::from_millis(args.request_timeout_ms))?,
        args.auth_url,
        args.mail_url,
    );

    serve(
        args.listen_addr,
        router(BrokerState::new(publisher, upstreams)),
        shutdown,
    )
    .await?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    run(args, shutdown).await.inspect_err(|error| {
        error!(%error, "broker exited");
    })
}
