//! Abstract interface for publishing and consuming events on a topic-based
//! message bus.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

/// Connection bootstrap with bounded retry and backoff.
pub mod connection;

/// Consumers bind an exclusive queue and process deliveries.
pub mod consumer;

/// Emitters publish events onto the shared exchange.
pub mod emitter;

/// Events, severities and deliveries.
pub mod event;

/// Handlers process deliveries for consumers.
pub mod handler;

/// Routing keys and binding patterns.
pub mod routing;

/// Supervisors keep a consumer alive across connection failures.
pub mod supervisor;

/// Exchange declaration.
pub mod topology;

/// Backend traits implemented by concrete message bus transports.
pub mod transport;

pub use connection::{BackoffPolicy, ConnectionManager, ConnectionState};
pub use consumer::Consumer;
pub use emitter::{Emitter, EmitterOptions};
pub use event::{Delivery, Event, Severity};
pub use handler::{EventHandler, HandlerError};
pub use routing::{BindingPattern, RoutingKey};
pub use supervisor::{ResilientListener, SupervisorOptions};
pub use topology::{ExchangeKind, ExchangeSpec, declare_topology};
pub use transport::{BusError, Channel, Connection, Dialer, OutboundMessage};
