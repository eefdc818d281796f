use serde::{Deserialize, Serialize};

/// Credentials forwarded to the auth service.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct AuthPayload {
    /// Account email.
    pub email: String,

    /// Account password.
    pub password: String,
}

/// A log entry published to the bus.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct LogPayload {
    /// Entry name.
    pub name: String,

    /// Entry data.
    pub data: String,
}

/// An email forwarded to the mail service.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct MailPayload {
    /// Sender address.
    pub from: String,

    /// Recipient address.
    pub to: String,

    /// Subject line.
    pub subject: String,

    /// Message body.
    pub message: String,
}

/// A request to the dispatcher, tagged by its `action` field.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Action {
    /// Check credentials with the auth service.
    Auth {
        /// The credentials.
        auth: AuthPayload,
    },

    /// Publish a log entry as an `INFO` event.
    Log {
        /// The entry.
        log: LogPayload,
    },

    /// Send an email through the mail service.
    Mail {
        /// The email.
        mail: MailPayload,
    },
}

impl Action {
    /// Parses exactly one JSON value; trailing data is rejected.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed JSON, an unknown action, or a missing
    /// payload.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// The action name as it appears on the wire.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "auth",
            Self::Log { .. } => "log",
            Self::Mail { .. } => "mail",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_action() {
        let action =
            Action::from_json(br#"{"action":"log","log":{"name":"event","data":"hello"}}"#)
                .unwrap();

        assert_eq!(
            action,
            Action::Log {
                log: LogPayload {
                    name: "event".to_string(),
                    data: "hello".to_string(),
                }
            }
        );
        assert_eq!(action.name(), "log");
    }

    #[test]
    fn test_parse_mail_action() {
        let action = Action::from_json(
            br#"{"action":"mail","mail":{"from":"a@example.com","to":"b@example.com","subject":"hi","message":"hello"}}"#,
        )
        .unwrap();

        assert!(matches!(action, Action::Mail { ref mail } if mail.to == "b@example.com"));
    }

    #[test]
    fn test_unknown_action() {
        let error = Action::from_json(br#"{"action":"dance"}"#).unwrap_err();
        assert!(error.to_string().contains("unknown variant"));
    }

    #[test]
    fn test_missing_payload() {
        assert!(Action::from_json(br#"{"action":"auth"}"#).is_err());
    }

    #[test]
    fn test_trailing_data_rejected() {
        let body = br#"{"action":"log","log":{"name":"a","data":"b"}} {"action":"log"}"#;
        assert!(Action::from_json(body).is_err());
    }
}
