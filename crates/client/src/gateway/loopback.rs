// In-process gateway: the host pushes server messages and status changes,
// the engine's outbound messages are recorded instead of transmitted.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{bail, Result};
use coiisy_common::protocol::ws::{ClientMessage, EventKind, ServerMessage};
use tracing::debug;

use super::{ConnectionGateway, ConnectionStatus, EventHub, EventSink, GatewayEvent, Subscription};

#[derive(Debug, Default)]
struct LoopbackState {
    status: Mutex<ConnectionStatus>,
    sent: Mutex<Vec<ClientMessage>>,
    connect_requests: AtomicUsize,
    auto_connect: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cloning shares the same connection.
#[derive(Debug, Clone, Default)]
pub struct LoopbackGateway {
    hub: EventHub,
    state: Arc<LoopbackState>,
}

impl LoopbackGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway whose `connect()` reports `connecting` then `connected`.
    pub fn auto_connecting() -> Self {
        Self {
            hub: EventHub::new(),
            state: Arc::new(LoopbackState { auto_connect: true, ..LoopbackState::default() }),
        }
    }

    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    /// Change the connection status and notify subscribers.
    pub fn set_status(&self, status: ConnectionStatus) -> usize {
        *lock(&self.state.status) = status;
        debug!(%status, "loopback status changed");
        self.hub.publish(&GatewayEvent::Status(status))
    }

    /// Push a server message to subscribers. Returns the delivery count.
    pub fn deliver(&self, message: ServerMessage) -> usize {
        self.hub.publish(&GatewayEvent::Server(message))
    }

    pub fn sent(&self) -> Vec<ClientMessage> {
        lock(&self.state.sent).clone()
    }

    pub fn take_sent(&self) -> Vec<ClientMessage> {
        std::mem::take(&mut *lock(&self.state.sent))
    }

    pub fn connect_requests(&self) -> usize {
        self.state.connect_requests.load(Ordering::SeqCst)
    }
}

impl ConnectionGateway for LoopbackGateway {
    fn status(&self) -> ConnectionStatus {
        *lock(&self.state.status)
    }

    fn connect(&self) {
        self.state.connect_requests.fetch_add(1, Ordering::SeqCst);
        self.set_status(ConnectionStatus::Connecting);
        if self.state.auto_connect {
            self.set_status(ConnectionStatus::Connected);
        }
    }

    fn subscribe(&self, kind: EventKind, sink: EventSink) -> Subscription {
        self.hub.subscribe(kind, sink)
    }

    fn send(&self, message: ClientMessage) -> Result<()> {
        let status = self.status();
        if status != ConnectionStatus::Connected {
            bail!("cannot send `{}` message while {status}", message.message_type());
        }
        lock(&self.state.sent).push(message);
        Ok(())
    }
}
