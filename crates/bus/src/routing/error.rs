use thiserror::Error;

/// Errors produced when validating a binding pattern.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The pattern is empty.
    #[error("binding pattern cannot be empty")]
    Empty,

    /// A wildcard shares a word with literal characters.
    #[error("invalid wildcard usage in word '{0}': '*' and '#' must be whole words")]
    InvalidWildcard(String),

    /// The pattern exceeds the protocol's short-string limit.
    #[error("binding pattern too long: {0} bytes (max 255)")]
    TooLong(usize),
}
