mod common;

use std::time::Duration;

use switchyard_bus::connection::Error;
use switchyard_bus::{BackoffPolicy, Connection, ConnectionManager, ConnectionState};
use switchyard_bus_memory::MemoryBroker;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

fn squares_up_to(failures: u64) -> Duration {
    Duration::from_secs((1..=failures).map(|n| n * n).sum())
}

#[tokio::test(start_paused = true)]
async fn test_recovers_after_failures() {
    common::init_tracing();

    for failures in 1..=5u32 {
        let broker = MemoryBroker::new();
        broker.fail_next_dials(failures);

        let manager = ConnectionManager::new(broker.dialer(), BackoffPolicy::default());
        let start = Instant::now();

        let connection = manager.connect().await.unwrap();

        assert!(connection.is_open());
        assert_eq!(broker.dial_attempts(), failures + 1);
        assert_eq!(start.elapsed(), squares_up_to(u64::from(failures)));
        assert_eq!(manager.state(), ConnectionState::Connected);
    }
}

#[tokio::test(start_paused = true)]
async fn test_first_dial_succeeds_without_delay() {
    let broker = MemoryBroker::new();
    let manager = ConnectionManager::new(broker.dialer(), BackoffPolicy::default());
    let start = Instant::now();

    manager.connect().await.unwrap();

    assert_eq!(broker.dial_attempts(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_gives_up_after_sixth_failure() {
    common::init_tracing();

    let broker = MemoryBroker::new();
    broker.set_reachable(false);

    let manager = ConnectionManager::new(broker.dialer(), BackoffPolicy::default());
    let start = Instant::now();

    let error = manager.connect().await.unwrap_err();

    assert!(matches!(error, Error::Exhausted { attempts: 6, .. }));
    assert_eq!(broker.dial_attempts(), 6);
    assert_eq!(start.elapsed(), squares_up_to(5));
    assert_eq!(manager.state(), ConnectionState::Failed);

    // No further dials happen once the manager has given up.
    sleep(Duration::from_secs(120)).await;
    assert_eq!(broker.dial_attempts(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_custom_policy() {
    let broker = MemoryBroker::new();
    broker.set_reachable(false);

    let policy = BackoffPolicy::new(2, Duration::from_millis(100));
    let manager = ConnectionManager::new(broker.dialer(), policy);
    let start = Instant::now();

    assert!(manager.connect().await.is_err());
    assert_eq!(broker.dial_attempts(), 3);
    assert_eq!(start.elapsed(), Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_during_backoff() {
    let broker = MemoryBroker::new();
    broker.set_reachable(false);

    let manager = ConnectionManager::new(broker.dialer(), BackoffPolicy::default());
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        sleep(Duration::from_secs(3)).await;
        canceller.cancel();
    });

    let start = Instant::now();
    let error = manager.connect_until_cancelled(&token).await.unwrap_err();

    assert!(matches!(error, Error::Cancelled { .. }));
    assert_eq!(broker.dial_attempts(), 2);
    assert_eq!(start.elapsed(), Duration::from_secs(3));
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_state_transitions() {
    let broker = MemoryBroker::new();
    broker.fail_next_dials(1);

    let manager = ConnectionManager::new(broker.dialer(), BackoffPolicy::default());
    let mut states = manager.watch_state();
    assert_eq!(*states.borrow(), ConnectionState::Disconnected);

    let watcher = tokio::spawn(async move {
        let mut seen = Vec::new();
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            seen.push(state);
            if state == ConnectionState::Connected {
                break;
            }
        }
        seen
    });

    manager.connect().await.unwrap();

    let seen = watcher.await.unwrap();
    assert_eq!(seen.last(), Some(&ConnectionState::Connected));
    assert!(seen.contains(&ConnectionState::Attempting { attempt: 1 }));
}
