use crate::Error;
use crate::connection::{MemoryConnection, MemoryDialer};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use switchyard_bus::{BindingPattern, Delivery, ExchangeSpec};
use tokio::sync::mpsc;
use tracing::{debug, trace};
use uuid::Uuid;

/// Address reported by dialers of the in-memory broker.
pub const MEMORY_ADDRESS: &str = "memory://local";

#[derive(Debug)]
struct QueueState {
    owner: u64,
    bindings: Vec<(String, BindingPattern)>,
    sender: mpsc::UnboundedSender<Delivery>,
    receiver: Option<mpsc::UnboundedReceiver<Delivery>>,
}

#[derive(Debug)]
struct BrokerState {
    exchanges: HashMap<String, ExchangeSpec>,
    queues: HashMap<String, QueueState>,
    connections: HashSet<u64>,
    next_connection: u64,
    dial_attempts: u32,
    pending_dial_failures: u32,
    reachable: bool,
}

impl Default for BrokerState {
    fn default() -> Self {
        Self {
            exchanges: HashMap::new(),
            queues: HashMap::new(),
            connections: HashSet::new(),
            next_connection: 1,
            dial_attempts: 0,
            pending_dial_failures: 0,
            reachable: true,
        }
    }
}

impl BrokerState {
    fn owned_queue(&mut self, connection: u64, queue: &str) -> Result<&mut QueueState, Error> {
        let state = self
            .queues
            .get_mut(queue)
            .ok_or_else(|| Error::QueueNotFound(queue.to_string()))?;

        if state.owner != connection {
            return Err(Error::ResourceLocked(queue.to_string()));
        }

        Ok(state)
    }
}

/// A topic-routing broker living in process memory.
///
/// Clones share the same exchanges, queues and connections. Each broker is
/// independent, so tests can run side by side without interfering.
#[derive(Clone, Debug, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl MemoryBroker {
    /// Creates an empty broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A dialer connecting to this broker.
    #[must_use]
    pub fn dialer(&self) -> MemoryDialer {
        MemoryDialer::new(self.clone())
    }

    /// Makes the next `count` dials fail.
    pub fn fail_next_dials(&self, count: u32) {
        self.state.lock().pending_dial_failures = count;
    }

    /// Makes every dial fail until reset.
    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().reachable = reachable;
    }

    /// Dials attempted so far, failed or not.
    pub fn dial_attempts(&self) -> u32 {
        self.state.lock().dial_attempts
    }

    /// The declared exchange with this name, if any.
    pub fn exchange(&self, name: &str) -> Option<ExchangeSpec> {
        self.state.lock().exchanges.get(name).cloned()
    }

    /// Number of live queues.
    pub fn queue_count(&self) -> usize {
        self.state.lock().queues.len()
    }

    /// Number of bindings across every live queue.
    pub fn binding_count(&self) -> usize {
        self.state
            .lock()
            .queues
            .values()
            .map(|queue| queue.bindings.len())
            .sum()
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.state.lock().connections.len()
    }

    /// Drops every open connection from the broker side, as a broker restart
    /// would.
    pub fn disconnect_all(&self) {
        let mut state = self.state.lock();
        let connections: Vec<u64> = state.connections.drain().collect();
        state
            .queues
            .retain(|_, queue| !connections.contains(&queue.owner));
        drop(state);

        debug!(count = connections.len(), "dropped all connections");
    }

    pub(crate) fn dial(&self) -> Result<MemoryConnection, Error> {
        let mut state = self.state.lock();
        state.dial_attempts += 1;

        if !state.reachable {
            return Err(Error::Unreachable(MEMORY_ADDRESS.to_string()));
        }

        if state.pending_dial_failures > 0 {
            state.pending_dial_failures -= 1;
            return Err(Error::Unreachable(MEMORY_ADDRESS.to_string()));
        }

        let id = state.next_connection;
        state.next_connection += 1;
        state.connections.insert(id);
        drop(state);

        Ok(MemoryConnection::new(id, self.clone()))
    }

    pub(crate) fn is_connected(&self, connection: u64) -> bool {
        self.state.lock().connections.contains(&connection)
    }

    /// Closing a connection deletes its exclusive queues, which ends their
    /// delivery streams.
    pub(crate) fn close_connection(&self, connection: u64) {
        let mut state = self.state.lock();
        state.connections.remove(&connection);
        state.queues.retain(|_, queue| queue.owner != connection);
    }

    fn ensure_connected(state: &BrokerState, connection: u64) -> Result<(), Error> {
        if state.connections.contains(&connection) {
            Ok(())
        } else {
            Err(Error::ConnectionClosed)
        }
    }

    pub(crate) fn declare_exchange(
        &self,
        connection: u64,
        exchange: &ExchangeSpec,
    ) -> Result<(), Error> {
        let mut state = self.state.lock();
        Self::ensure_connected(&state, connection)?;

        match state.exchanges.get(&exchange.name) {
            Some(existing) if existing == exchange => Ok(()),
            Some(_) => Err(Error::PreconditionFailed(exchange.name.clone())),
            None => {
                state
                    .exchanges
                    .insert(exchange.name.clone(), exchange.clone());
                Ok(())
            }
        }
    }

    pub(crate) fn declare_exclusive_queue(&self, connection: u64) -> Result<String, Error> {
        let mut state = self.state.lock();
        Self::ensure_connected(&state, connection)?;

        let name = format!("amq.gen-{}", Uuid::new_v4().simple());
        let (sender, receiver) = mpsc::unbounded_channel();

        state.queues.insert(
            name.clone(),
            QueueState {
                owner: connection,
                bindings: Vec::new(),
                sender,
                receiver: Some(receiver),
            },
        );

        Ok(name)
    }

    pub(crate) fn bind_queue(
        &self,
        connection: u64,
        queue: &str,
        exchange: &str,
        pattern: &BindingPattern,
    ) -> Result<(), Error> {
        let mut state = self.state.lock();
        Self::ensure_connected(&state, connection)?;

        if !state.exchanges.contains_key(exchange) {
            return Err(Error::ExchangeNotFound(exchange.to_string()));
        }

        let queue = state.owned_queue(connection, queue)?;
        let binding = (exchange.to_string(), pattern.clone());

        if !queue.bindings.contains(&binding) {
            queue.bindings.push(binding);
        }

        Ok(())
    }

    pub(crate) fn take_receiver(
        &self,
        connection: u64,
        queue: &str,
    ) -> Result<mpsc::UnboundedReceiver<Delivery>, Error> {
        let mut state = self.state.lock();
        Self::ensure_connected(&state, connection)?;

        state
            .owned_queue(connection, queue)?
            .receiver
            .take()
            .ok_or_else(|| Error::AlreadyConsumed(queue.to_string()))
    }

    /// Routes a message to every queue with at least one matching binding.
    /// Each queue gets one copy however many of its bindings match. An
    /// unroutable message is dropped.
    pub(crate) fn publish(
        &self,
        connection: u64,
        exchange: &str,
        delivery: &Delivery,
    ) -> Result<usize, Error> {
        let state = self.state.lock();
        Self::ensure_connected(&state, connection)?;

        if !state.exchanges.contains_key(exchange) {
            return Err(Error::ExchangeNotFound(exchange.to_string()));
        }

        let mut routed = 0;

        for queue in state.queues.values() {
            let selected = queue
                .bindings
                .iter()
                .any(|(bound, pattern)| bound == exchange && pattern.matches(&delivery.routing_key));

            if selected && queue.sender.send(delivery.clone()).is_ok() {
                routed += 1;
            }
        }

        trace!(%exchange, routing_key = %delivery.routing_key, routed, "routed message");

        Ok(routed)
    }
}
