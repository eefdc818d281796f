use std::fmt;

use bytes::Bytes;

/// Severity label carried by an event.
///
/// The label is free-form text. `INFO`, `WARNING` and `ERROR` are the labels
/// the listener binds to by default.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Severity(String);

impl Severity {
    /// Label for informational events.
    pub const INFO: &'static str = "INFO";

    /// Label for warnings.
    pub const WARNING: &'static str = "WARNING";

    /// Label for errors.
    pub const ERROR: &'static str = "ERROR";

    /// Creates a severity from an arbitrary label.
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// The `INFO` severity.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Self::INFO)
    }

    /// The `WARNING` severity.
    #[must_use]
    pub fn warning() -> Self {
        Self::new(Self::WARNING)
    }

    /// The `ERROR` severity.
    #[must_use]
    pub fn error() -> Self {
        Self::new(Self::ERROR)
    }

    /// Returns the label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Severity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Severity {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for Severity {
    fn from(label: String) -> Self {
        Self(label)
    }
}

/// An opaque payload plus the severity it is published under.
///
/// The bus never inspects the body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    /// Uninterpreted payload.
    pub body: Bytes,

    /// Severity used to derive the routing key.
    pub severity: Severity,
}

impl Event {
    /// Creates a new event.
    pub fn new(body: impl Into<Bytes>, severity: impl Into<Severity>) -> Self {
        Self {
            body: body.into(),
            severity: severity.into(),
        }
    }
}

/// A message handed to a consumer by the bus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    /// Exchange the message was published to.
    pub exchange: String,

    /// Routing key the message was published with.
    pub routing_key: String,

    /// Uninterpreted payload.
    pub body: Bytes,

    /// Content type attached by the publisher, if any.
    pub content_type: Option<String>,
}

impl Delivery {
    /// Severity portion of the routing key.
    ///
    /// Everything after the first `.` is the severity; a key without a
    /// namespace is returned whole.
    #[must_use]
    pub fn severity(&self) -> &str {
        self.routing_key
            .split_once('.')
            .map_or(self.routing_key.as_str(), |(_, severity)| severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivery(routing_key: &str) -> Delivery {
        Delivery {
            exchange: "logs_topic".to_string(),
            routing_key: routing_key.to_string(),
            body: Bytes::from_static(b"body"),
            content_type: None,
        }
    }

    #[test]
    fn test_known_severities() {
        assert_eq!(Severity::info().as_str(), "INFO");
        assert_eq!(Severity::warning().as_str(), "WARNING");
        assert_eq!(Severity::error().as_str(), "ERROR");
    }

    #[test]
    fn test_free_form_severity() {
        let severity = Severity::from("UNKNOWN");
        assert_eq!(severity.to_string(), "UNKNOWN");
    }

    #[test]
    fn test_delivery_severity() {
        assert_eq!(delivery("log.WARNING").severity(), "WARNING");
        assert_eq!(delivery("audit.login.failed").severity(), "login.failed");
        assert_eq!(delivery("ERROR").severity(), "ERROR");
    }

    #[test]
    fn test_event_keeps_body_verbatim() {
        let event = Event::new("{\"name\":\"x\"}", Severity::info());
        assert_eq!(event.body, Bytes::from_static(b"{\"name\":\"x\"}"));
    }
}
