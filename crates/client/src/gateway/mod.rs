// Connection gateway seam: status, typed event subscriptions, outbound sends.
//
// The transport itself lives outside this crate. Everything the engine needs
// from it is expressed by `ConnectionGateway`.

pub mod hub;
pub mod loopback;

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use coiisy_common::protocol::ws::{ClientMessage, EventKind, ServerMessage};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub use hub::{EventHub, Subscription};
pub use loopback::LoopbackGateway;

/// Where a subscription delivers its events.
pub type EventSink = mpsc::UnboundedSender<GatewayEvent>;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnected,
}

impl ConnectionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything a gateway pushes to its subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    Server(ServerMessage),
    Status(ConnectionStatus),
}

impl GatewayEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Server(message) => message.kind(),
            Self::Status(_) => EventKind::ConnectionStatus,
        }
    }
}

/// The persistent connection as seen by the session engine.
pub trait ConnectionGateway {
    fn status(&self) -> ConnectionStatus;

    /// Ask the transport to (re)open the connection. Progress is reported
    /// through `ConnectionStatus` events.
    fn connect(&self);

    /// Register `sink` for events of `kind`. Dropping the returned guard
    /// unsubscribes.
    fn subscribe(&self, kind: EventKind, sink: EventSink) -> Subscription;

    fn send(&self, message: ClientMessage) -> Result<()>;
}

impl<T: ConnectionGateway + ?Sized> ConnectionGateway for Arc<T> {
    fn status(&self) -> ConnectionStatus {
        (**self).status()
    }

    fn connect(&self) {
        (**self).connect()
    }

    fn subscribe(&self, kind: EventKind, sink: EventSink) -> Subscription {
        (**self).subscribe(kind, sink)
    }

    fn send(&self, message: ClientMessage) -> Result<()> {
        (**self).send(message)
    }
}
