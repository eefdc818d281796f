mod error;

pub use error::Error;

use crate::transport::{DialError, Dialer};

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Failed dials tolerated before giving up.
pub const DEFAULT_MAX_FAILURES: u32 = 5;

/// Time unit the quadratic backoff is multiplied by.
pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// Retry policy for the connection bootstrap.
///
/// After the n-th consecutive failure the manager sleeps `n² × unit`, so the
/// default policy sleeps 1, 4, 9, 16 and 25 seconds and gives up on the
/// sixth failure. There is no jitter and no cap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Failures tolerated; one more failure aborts.
    pub max_failures: u32,

    /// Multiplier applied to the squared failure count.
    pub unit: Duration,
}

impl BackoffPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(max_failures: u32, unit: Duration) -> Self {
        Self { max_failures, unit }
    }

    /// Delay after `failures` consecutive failures.
    ///
    /// `delay_for(0)` is zero. The manager only asks after at least one
    /// failure, so the first sleep is one unit.
    #[must_use]
    pub fn delay_for(&self, failures: u32) -> Duration {
        self.unit.saturating_mul(failures.saturating_pow(2))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FAILURES, DEFAULT_BACKOFF_UNIT)
    }
}

/// Where the manager is in its bootstrap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// No attempt in progress.
    Disconnected,

    /// Dialing; `attempt` starts at 1.
    Attempting {
        /// The dial currently in flight.
        attempt: u32,
    },

    /// A dial succeeded.
    Connected,

    /// The attempt ceiling was reached.
    Failed,
}

/// Establishes bus connections, retrying with quadratic backoff.
#[derive(Debug)]
pub struct ConnectionManager<D>
where
    D: Dialer,
{
    dialer: D,
    policy: BackoffPolicy,
    state: watch::Sender<ConnectionState>,
}

impl<D> ConnectionManager<D>
where
    D: Dialer,
{
    /// Creates a new manager.
    pub fn new(dialer: D, policy: BackoffPolicy) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            dialer,
            policy,
            state,
        }
    }

    /// The dialer used for each attempt.
    pub const fn dialer(&self) -> &D {
        &self.dialer
    }

    /// The retry policy.
    pub const fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// The current bootstrap state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watches bootstrap state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Dials until a connection succeeds or the policy is exhausted.
    ///
    /// # Errors
    ///
    /// Returns `Error::Exhausted` with the last dial failure once more than
    /// `max_failures` dials have failed.
    pub async fn connect(&self) -> Result<D::Connection, Error<DialError<D>>> {
        self.run(None).await
    }

    /// Like `connect`, but gives up as soon as `token` is cancelled, including
    /// while sleeping between attempts.
    ///
    /// # Errors
    ///
    /// Returns `Error::Cancelled` on cancellation, otherwise as `connect`.
    pub async fn connect_until_cancelled(
        &self,
        token: &CancellationToken,
    ) -> Result<D::Connection, Error<DialError<D>>> {
        self.run(Some(token)).await
    }

    async fn run(
        &self,
        token: Option<&CancellationToken>,
    ) -> Result<D::Connection, Error<DialError<D>>> {
        let address = self.dialer.address();
        let mut failures = 0;

        loop {
            if token.is_some_and(CancellationToken::is_cancelled) {
                self.state.send_replace(ConnectionState::Disconnected);
                return Err(Error::Cancelled { address });
            }

            let attempt = failures + 1;
            self.state
                .send_replace(ConnectionState::Attempting { attempt });

            let source = match self.dialer.dial().await {
                Ok(connection) => {
                    info!(%address, attempt, "connected to message bus");
                    self.state.send_replace(ConnectionState::Connected);
                    return Ok(connection);
                }
                Err(source) => source,
            };

            failures += 1;

            if failures > self.policy.max_failures {
                error!(%address, attempts = failures, error = %source, "giving up on message bus");
                self.state.send_replace(ConnectionState::Failed);
                return Err(Error::Exhausted {
                    address,
                    attempts: failures,
                    source,
                });
            }

            let delay = self.policy.delay_for(failures);
            warn!(
                %address,
                attempt,
                delay_ms = delay.as_millis(),
                error = %source,
                "message bus not ready, backing off"
            );

            match token {
                Some(token) => {
                    tokio::select! {
                        () = token.cancelled() => {
                            self.state.send_replace(ConnectionState::Disconnected);
                            return Err(Error::Cancelled { address });
                        }
                        () = sleep(delay) => {}
                    }
                }
                None => sleep(delay).await,
            }
        }
    }
}
