//! AMQP 0-9-1 implementation of the message bus transport.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod channel;
mod connection;
mod dialer;
mod error;

pub use channel::AmqpChannel;
pub use connection::AmqpConnection;
pub use dialer::{AmqpDialer, DEFAULT_AMQP_URL};
pub use error::Error;
