// Typed fan-out of gateway events to per-kind subscriptions.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use coiisy_common::protocol::ws::EventKind;
use tracing::trace;

use super::{EventSink, GatewayEvent};

#[derive(Debug, Default)]
struct HubState {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

#[derive(Debug)]
struct Subscriber {
    id: u64,
    kind: EventKind,
    sink: EventSink,
}

fn lock(state: &Mutex<HubState>) -> MutexGuard<'_, HubState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registry of live subscriptions. Cloning shares the registry.
#[derive(Debug, Clone, Default)]
pub struct EventHub {
    state: Arc<Mutex<HubState>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, kind: EventKind, sink: EventSink) -> Subscription {
        let mut guard = lock(&self.state);
        guard.next_id += 1;
        let id = guard.next_id;
        guard.subscribers.push(Subscriber { id, kind, sink });
        trace!(id, %kind, "subscribed");
        Subscription { id, kind, hub: Arc::downgrade(&self.state) }
    }

    /// Deliver `event` to every live subscriber of its kind, in
    /// subscription order. Subscribers whose receiver is gone are pruned.
    ///
    /// Returns the number of subscribers that accepted the event.
    pub fn publish(&self, event: &GatewayEvent) -> usize {
        let kind = event.kind();
        let mut guard = lock(&self.state);
        let mut delivered = 0;
        guard.subscribers.retain(|subscriber| {
            if subscriber.kind != kind {
                return !subscriber.sink.is_closed();
            }
            match subscriber.sink.send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });
        trace!(%kind, delivered, "published gateway event");
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.state).subscribers.len()
    }
}

/// Guard for one registration. Dropping it unsubscribes, on every exit path.
#[derive(Debug)]
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    kind: EventKind,
    hub: Weak<Mutex<HubState>>,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(state) = self.hub.upgrade() else {
            return;
        };
        lock(&state).subscribers.retain(|subscriber| subscriber.id != self.id);
        trace!(id = self.id, kind = %self.kind, "unsubscribed");
    }
}
