//! Processes events consumed from the message bus.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;
mod processor;

pub use error::Error;
pub use processor::{EventProcessor, LogEntry, REQUEST_TIMEOUT, Route, http_client};
