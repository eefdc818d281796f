//! Consumes log events from an AMQP bus.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::time::Duration;

use clap::Parser;
use switchyard_bus::connection::DEFAULT_MAX_FAILURES;
use switchyard_bus::topology::DEFAULT_EXCHANGE;
use switchyard_bus::{
    BackoffPolicy, BindingPattern, ConnectionManager, ExchangeSpec, ResilientListener,
    SupervisorOptions,
};
use switchyard_bus_amqp::{AmqpDialer, DEFAULT_AMQP_URL};
use switchyard_listener::{EventProcessor, http_client};
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

    /// HTTP client setup failed
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// The listener stopped
    #[error(transparent)]
    Listener(#[from] switchyard_bus::supervisor::Error<switchyard_bus_amqp::Error>),
}

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Message bus URI
    #[arg(long, default_value = DEFAULT_AMQP_URL, env = "SWITCHYARD_BUS_URL")]
    bus_url: String,

    /// Exchange to consume from
    #[arg(long, default_value = DEFAULT_EXCHANGE, env = "SWITCHYARD_EXCHANGE")]
    exchange: String,

    /// Binding pattern; repeat or comma separate for several
    #[arg(
        long = "binding",
        env = "SWITCHYARD_BINDINGS",
        value_delimiter = ',',
        default_values = ["log.INFO", "log.WARNING", "log.ERROR"]
    )]
    bindings: Vec<BindingPattern>,

    /// Logger service base URL; events are only logged locally when unset
    #[arg(long, env = "SWITCHYARD_LOGGER_URL")]
    logger_url: Option<Url>,

    /// Reconnects allowed after the consumer loses its connection
    #[arg(long, default_value_t = 3, env = "SWITCHYARD_MAX_RESTARTS")]
    max_restarts: u32,

    /// Timeout for a request to the logger service, in milliseconds
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
    let unit = Duration::from_millis(args.backoff_unit_ms);
    let manager = ConnectionManager::new(dialer, BackoffPolicy::new(DEFAULT_MAX_FAILURES, unit));

    let options = SupervisorOptions {
        exchange: ExchangeSpec::topic(args.exchange),
        bindings: args.bindings,
        max_restarts: args.max_restarts,
        restart_delay: unit,
    };

    let processor = match args.logger_url {
        Some(logger_url) => {
            info!(%logger_url, "forwarding log entries");
            let client = http_client(Duration::from_millis(args.request_timeout_ms))?;
            EventProcessor::forwarding(client, logger_url)
        }
        None => EventProcessor::logging_only(),
    };

    ResilientListener::new(manager, options)
        .run(&processor, &shutdown)
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
        error!(%error, "listener exited");
    })
}
