use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use bytes::Bytes;
use switchyard_bus::routing::default_log_bindings;
use switchyard_bus::{
    BackoffPolicy, ConnectionManager, Delivery, Dialer, Emitter, EmitterOptions, EventHandler,
    ResilientListener, SupervisorOptions,
};
use switchyard_bus_memory::MemoryBroker;
use switchyard_listener::{Error, EventProcessor, LogEntry, http_client};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;
use url::Url;

#[derive(Clone)]
struct Logger {
    entries: mpsc::UnboundedSender<LogEntry>,
    status: Arc<Mutex<StatusCode>>,
}

async fn write_log(State(logger): State<Logger>, Json(entry): Json<LogEntry>) -> StatusCode {
    let _ = logger.entries.send(entry);
    *logger.status.lock().await
}

async fn spawn_logger() -> (Url, mpsc::UnboundedReceiver<LogEntry>, Arc<Mutex<StatusCode>>) {
    let (entries, received) = mpsc::unbounded_channel();
    let status = Arc::new(Mutex::new(StatusCode::ACCEPTED));

    let app = Router::new().route("/log", post(write_log)).with_state(Logger {
        entries,
        status: status.clone(),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    (
        Url::parse(&format!("http://{addr}")).unwrap(),
        received,
        status,
    )
}

fn delivery(routing_key: &str, body: &'static str) -> Delivery {
    Delivery {
        exchange: "logs_topic".to_string(),
        routing_key: routing_key.to_string(),
        body: Bytes::from_static(body.as_bytes()),
        content_type: Some("text/plain".to_string()),
    }
}

#[traced_test]
#[tokio::test]
async fn test_forwards_log_entries() {
    let (url, mut received, _) = spawn_logger().await;
    let processor = EventProcessor::forwarding(reqwest::Client::new(), url);

    processor
        .handle(delivery(
            "log.INFO",
            r#"{"name":"event","data":"user signed up"}"#,
        ))
        .await
        .unwrap();

    let entry = timeout(Duration::from_secs(1), received.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        entry,
        LogEntry {
            name: "event".to_string(),
            data: "user signed up".to_string(),
        }
    );
}

#[tokio::test]
async fn test_unknown_names_are_forwarded() {
    let (url, mut received, _) = spawn_logger().await;
    let processor = EventProcessor::forwarding(reqwest::Client::new(), url);

    processor
        .handle(delivery("log.WARNING", r#"{"name":"disk","data":"nearly full"}"#))
        .await
        .unwrap();

    let entry = timeout(Duration::from_secs(1), received.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.name, "disk");
}

#[tokio::test]
async fn test_auth_entries_are_not_forwarded() {
    let (url, mut received, _) = spawn_logger().await;
    let processor = EventProcessor::forwarding(reqwest::Client::new(), url);

    processor
        .handle(delivery("log.INFO", r#"{"name":"auth","data":"login"}"#))
        .await
        .unwrap();

    assert!(received.try_recv().is_err());
}

#[tokio::test]
async fn test_plain_text_is_only_logged() {
    let (url, mut received, _) = spawn_logger().await;
    let processor = EventProcessor::forwarding(reqwest::Client::new(), url);

    processor
        .handle(delivery("log.WARNING", "disk nearly full"))
        .await
        .unwrap();

    assert!(received.try_recv().is_err());
}

#[tokio::test]
async fn test_logger_rejection_is_an_error() {
    let (url, _received, status) = spawn_logger().await;
    *status.lock().await = StatusCode::INTERNAL_SERVER_ERROR;
    let processor = EventProcessor::forwarding(reqwest::Client::new(), url);

    let result = processor
        .handle(delivery("log.ERROR", r#"{"name":"log","data":"x"}"#))
        .await;

    assert!(matches!(
        result,
        Err(Error::LoggerStatus(StatusCode::INTERNAL_SERVER_ERROR))
    ));
}

async fn stall() -> StatusCode {
    sleep(Duration::from_secs(30)).await;
    StatusCode::ACCEPTED
}

#[tokio::test]
async fn test_stalled_logger_times_out() {
    let app = Router::new().route("/log", post(stall));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    let client = http_client(Duration::from_millis(100)).unwrap();
    let url = Url::parse(&format!("http://{addr}")).unwrap();
    let processor = EventProcessor::forwarding(client, url);

    let result = timeout(
        Duration::from_secs(5),
        processor.handle(delivery("log.INFO", r#"{"name":"log","data":"x"}"#)),
    )
    .await
    .unwrap();

    assert!(matches!(result, Err(Error::Request(error)) if error.is_timeout()));
}

#[traced_test]
#[tokio::test]
async fn test_logging_only_accepts_everything() {
    let processor = EventProcessor::logging_only();

    processor
        .handle(delivery("log.ERROR", r#"{"name":"log","data":"x"}"#))
        .await
        .unwrap();
    processor
        .handle(delivery("log.INFO", "not json"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_end_to_end_through_bus() {
    let (url, mut received, _) = spawn_logger().await;
    let processor = EventProcessor::forwarding(reqwest::Client::new(), url);

    let bus = MemoryBroker::new();
    let manager = ConnectionManager::new(
        bus.dialer(),
        BackoffPolicy::new(2, Duration::from_millis(5)),
    );
    let options = SupervisorOptions {
        bindings: default_log_bindings(),
        ..SupervisorOptions::default()
    };

    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    let task = tokio::spawn(async move {
        ResilientListener::new(manager, options)
            .run(&processor, &token)
            .await
    });

    timeout(Duration::from_secs(1), async {
        while bus.binding_count() < 3 {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    let connection = bus.dialer().dial().await.unwrap();
    let emitter = Emitter::new(connection, EmitterOptions::default())
        .await
        .unwrap();
    emitter
        .publish(r#"{"name":"log","data":"from the bus"}"#, "ERROR")
        .await
        .unwrap();

    let entry = timeout(Duration::from_secs(2), received.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.data, "from the bus");

    shutdown.cancel();
    timeout(Duration::from_secs(1), task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
