use crate::response::JsonResponse;

use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors that can occur while dispatching a request.
#[derive(Debug, Error)]
pub enum Error {
    /// The request body could not be read.
    #[error("{0}")]
    Body(#[from] BytesRejection),

    /// The request body is not a valid action.
    #[error("{0}")]
    Decode(#[from] serde_json::Error),

    /// The auth service rejected the credentials.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The auth service accepted the call but reported a failure.
    #[error("{0}")]
    AuthRejected(String),

    /// The auth service answered with an unexpected status.
    #[error("error calling auth service")]
    AuthService,

    /// The mailer service answered with an unexpected status.
    #[error("error calling mailer service")]
    MailService,

    /// An upstream call failed before a response arrived.
    #[error(transparent)]
    Upstream(#[from] reqwest::Error),

    /// A log entry could not be published.
    #[error("failed to publish log event: {0}")]
    Publish(String),

    /// The listen address could not be bound.
    #[error("failed to bind to address: {0}")]
    Bind(#[source] std::io::Error),

    /// The server stopped with an I/O failure.
    #[error("http server failed: {0}")]
    Serve(#[source] std::io::Error),
}

impl Error {
    /// Status code reported to the caller.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Body(rejection) => rejection.status(),
            Self::InvalidCredentials | Self::AuthRejected(_) => StatusCode::UNAUTHORIZED,
            Self::Publish(_) | Self::Bind(_) | Self::Serve(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Decode(_) | Self::AuthService | Self::MailService | Self::Upstream(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        JsonResponse::error(self.to_string()).with_status(self.status())
    }
}
