use crate::Error;
use crate::action::{AuthPayload, MailPayload};
use crate::response::JsonResponse;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

/// Default auth service base URL.
pub const DEFAULT_AUTH_URL: &str = "http://auth-service";

/// Default mail service base URL.
pub const DEFAULT_MAIL_URL: &str = "http://mailer-service";

/// Default timeout for a single upstream request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds an HTTP client whose requests give up after `timeout`.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

/// Synchronous HTTP services the broker forwards to.
#[derive(Clone, Debug)]
pub struct Upstreams {
    client: Client,
    auth_url: Url,
    mail_url: Url,
}

fn endpoint(base: &Url, path: &str) -> String {
    format!("{}/{path}", base.as_str().trim_end_matches('/'))
}

impl Upstreams {
    /// Creates a new set of upstreams sharing one HTTP client.
    #[must_use]
    pub fn new(client: Client, auth_url: Url, mail_url: Url) -> Self {
        Self {
            client,
            auth_url,
            mail_url,
        }
    }

    /// Checks credentials with the auth service and returns its data.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidCredentials` on 401, `Error::AuthService` on
    /// any status other than 202, and `Error::AuthRejected` if the service
    /// reports an error in its body.
    pub async fn authenticate(&self, auth: &AuthPayload) -> Result<JsonResponse, Error> {
        let url = endpoint(&self.auth_url, "authenticate");
        debug!(%url, email = %auth.email, "calling auth service");

        let response = self.client.post(&url).json(auth).send().await?;

        match response.status() {
            StatusCode::ACCEPTED => {}
            StatusCode::UNAUTHORIZED => return Err(Error::InvalidCredentials),
            _ => return Err(Error::AuthService),
        }

        let body: JsonResponse = response.json().await?;

        if body.error {
            return Err(Error::AuthRejected(body.message));
        }

        Ok(body)
    }

    /// Hands an email to the mailer service.
    ///
    /// # Errors
    ///
    /// Returns `Error::MailService` on any status other than 202.
    pub async fn send_mail(&self, mail: &MailPayload) -> Result<(), Error> {
        let url = endpoint(&self.mail_url, "send");
        debug!(%url, to = %mail.to, "calling mailer service");

        let response = self.client.post(&url).json(mail).send().await?;

        if response.status() != StatusCode::ACCEPTED {
            return Err(Error::MailService);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_paths() {
        let base = Url::parse(DEFAULT_AUTH_URL).unwrap();
        assert_eq!(endpoint(&base, "authenticate"), "http://auth-service/authenticate");

        let nested = Url::parse("http://gateway.local/mail/").unwrap();
        assert_eq!(endpoint(&nested, "send"), "http://gateway.local/mail/send");
    }
}
