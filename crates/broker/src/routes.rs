use crate::Error;
use crate::action::{Action, AuthPayload, LogPayload, MailPayload};
use crate::publisher::LogPublisher;
use crate::response::JsonResponse;
use crate::upstream::Upstreams;

use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use bytes::Bytes;
use switchyard_bus::{Dialer, Severity};
use tracing::{debug, info, warn};

/// Largest request body accepted.
pub const MAX_BODY_BYTES: usize = 1_048_576;

/// Handles shared by every request.
#[derive(Debug)]
pub struct BrokerState<D>
where
    D: Dialer,
{
    publisher: LogPublisher<D>,
    upstreams: Upstreams,
}

impl<D> BrokerState<D>
where
    D: Dialer,
{
    /// Creates the shared state.
    pub const fn new(publisher: LogPublisher<D>, upstreams: Upstreams) -> Self {
        Self {
            publisher,
            upstreams,
        }
    }
}

/// Builds the dispatcher's routes.
pub fn router<D>(state: BrokerState<D>) -> Router
where
    D: Dialer,
{
    Router::new()
        .route("/", post(hit_broker))
        .route("/handle", post(handle_submission::<D>))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(Arc::new(state))
}

async fn hit_broker() -> Response {
    JsonResponse::ok("Hit the broker").with_status(StatusCode::OK)
}

async fn handle_submission<D>(
    State(state): State<Arc<BrokerState<D>>>,
    body: Result<Bytes, BytesRejection>,
) -> Response
where
    D: Dialer,
{
    let action = body
        .map_err(Error::from)
        .and_then(|body| Action::from_json(&body).map_err(Error::from));

    let result = match action {
        Ok(action) => {
            debug!(action = action.name(), "dispatching request");
            dispatch(&state, action).await
        }
        Err(error) => Err(error),
    };

    match result {
        Ok(response) => response,
        Err(error) => {
            warn!(%error, status = %error.status(), "request failed");
            error.into_response()
        }
    }
}

async fn dispatch<D>(state: &BrokerState<D>, action: Action) -> Result<Response, Error>
where
    D: Dialer,
{
    match action {
        Action::Auth { auth } => authenticate(state, &auth).await,
        Action::Log { log } => log_item(state, &log).await,
        Action::Mail { mail } => send_mail(state, &mail).await,
    }
}

async fn authenticate<D>(state: &BrokerState<D>, auth: &AuthPayload) -> Result<Response, Error>
where
    D: Dialer,
{
    let upstream = state.upstreams.authenticate(auth).await?;

    Ok(JsonResponse::ok("Authenticated!")
        .with_data(upstream.data)
        .with_status(StatusCode::ACCEPTED))
}

async fn log_item<D>(state: &BrokerState<D>, log: &LogPayload) -> Result<Response, Error>
where
    D: Dialer,
{
    let body = serde_json::to_vec(log)?;

    state.publisher.publish(body, Severity::info()).await?;

    info!(name = %log.name, "log event published");

    Ok(JsonResponse::ok("Logged").with_status(StatusCode::ACCEPTED))
}

async fn send_mail<D>(state: &BrokerState<D>, mail: &MailPayload) -> Result<Response, Error>
where
    D: Dialer,
{
    state.upstreams.send_mail(mail).await?;

    Ok(JsonResponse::ok(format!("Email sent to {}", mail.to)).with_status(StatusCode::ACCEPTED))
}
