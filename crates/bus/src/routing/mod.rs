mod error;

pub use error::Error;

use std::fmt;
use std::str::FromStr;

use crate::event::Severity;

/// Namespace prefixed to severities when none is configured.
pub const DEFAULT_NAMESPACE: &str = "log";

/// Longest key or pattern the wire protocol can carry.
pub const MAX_KEY_LEN: usize = 255;

/// Routing key attached to a published message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RoutingKey(String);

impl RoutingKey {
    /// Wraps a raw routing key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Builds `<namespace>.<severity>`, or just the severity when the
    /// namespace is empty.
    #[must_use]
    pub fn for_severity(namespace: &str, severity: &Severity) -> Self {
        if namespace.is_empty() {
            Self(severity.to_string())
        } else {
            Self(format!("{namespace}.{severity}"))
        }
    }

    /// Returns the key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<RoutingKey> for String {
    fn from(key: RoutingKey) -> Self {
        key.0
    }
}

/// Pattern a queue is bound to an exchange with.
///
/// Words are separated by `.`. `*` matches exactly one word and `#` matches
/// zero or more words; any other word must match literally.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BindingPattern(String);

impl BindingPattern {
    /// Validates and wraps a pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is empty, too long, or mixes a
    /// wildcard with literal characters inside one word.
    pub fn new(pattern: impl Into<String>) -> Result<Self, Error> {
        let pattern = pattern.into();

        if pattern.is_empty() {
            return Err(Error::Empty);
        }

        if pattern.len() > MAX_KEY_LEN {
            return Err(Error::TooLong(pattern.len()));
        }

        if let Some(word) = pattern
            .split('.')
            .find(|word| word.len() > 1 && (word.contains('*') || word.contains('#')))
        {
            return Err(Error::InvalidWildcard(word.to_string()));
        }

        Ok(Self(pattern))
    }

    /// A pattern matching exactly one routing key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not a valid pattern.
    pub fn exact(key: &RoutingKey) -> Result<Self, Error> {
        Self::new(key.as_str())
    }

    /// Returns the pattern.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the pattern contains no wildcards.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.0.split('.').all(|word| word != "*" && word != "#")
    }

    /// Whether a routing key is selected by this pattern.
    #[must_use]
    pub fn matches(&self, routing_key: &str) -> bool {
        if self.0 == routing_key {
            return true;
        }

        let pattern: Vec<&str> = self.0.split('.').collect();
        let key: Vec<&str> = routing_key.split('.').collect();

        matches_words(&pattern, &key)
    }
}

fn matches_words(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => (0..=key.len()).any(|skip| matches_words(rest, &key[skip..])),
        Some((&"*", rest)) => !key.is_empty() && matches_words(rest, &key[1..]),
        Some((word, rest)) => key
            .split_first()
            .is_some_and(|(first, remaining)| first == word && matches_words(rest, remaining)),
    }
}

impl fmt::Display for BindingPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BindingPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// The bindings the listener uses when none are configured:
/// `log.INFO`, `log.WARNING` and `log.ERROR`.
#[must_use]
pub fn default_log_bindings() -> Vec<BindingPattern> {
    [Severity::INFO, Severity::WARNING, Severity::ERROR]
        .into_iter()
        .map(|severity| BindingPattern(format!("{DEFAULT_NAMESPACE}.{severity}")))
        .collect()
}
