// Session sync orchestration: gateway events → reconcilers → snapshot store.
//
// Connection/session state machine:
//   Unbound → BoundDisconnected           (bind_session)
//   BoundDisconnected → Connecting        (connect, unless a join dialog is open)
//   Connecting → ConnectedUnauthenticated (gateway reports connected)
//   ConnectedUnauthenticated → ConnectedAnnounced
//                                         (AUTH sent, then USER_JOINED sent)
//   any bound state → BoundDisconnected   (gateway reports disconnected)
//
// AUTH is always sent before USER_JOINED. Each reconnect repeats both.

use std::future::Future;

use chrono::{DateTime, Utc};
use coiisy_common::protocol::ws::{ClientMessage, EventKind, ServerMessage};
use coiisy_common::session::SessionId;
use coiisy_common::types::{ChatMessage, Participant, SessionIdentity, SessionSnapshot};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::gateway::{ConnectionGateway, ConnectionStatus, GatewayEvent, Subscription};
use crate::identity::IdentityResolver;
use crate::roster::PresenceRoster;
use crate::store::SessionStore;
use crate::timeline::MessageTimeline;

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Unbound,
    BoundDisconnected,
    Connecting,
    ConnectedUnauthenticated,
    ConnectedAnnounced,
}

impl SyncState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unbound => "unbound",
            Self::BoundDisconnected => "bound_disconnected",
            Self::Connecting => "connecting",
            Self::ConnectedUnauthenticated => "connected_unauthenticated",
            Self::ConnectedAnnounced => "connected_announced",
        }
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything presentation renders, republished after every mutation.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SessionView {
    pub session_id: Option<String>,
    pub sync_state: SyncState,
    pub status: ConnectionStatus,
    pub identity: Option<SessionIdentity>,
    pub messages: Vec<ChatMessage>,
    pub roster: Vec<Participant>,
}

/// Subscriptions and inbox for the currently bound session. Dropping it
/// unsubscribes every handler and discards undelivered events.
#[derive(Debug)]
struct Binding {
    session_id: SessionId,
    inbox: mpsc::UnboundedReceiver<GatewayEvent>,
    subscriptions: Vec<Subscription>,
}

pub struct SyncOrchestrator<G, S> {
    gateway: G,
    store: S,
    resolver: Box<dyn IdentityResolver>,
    clock: fn() -> DateTime<Utc>,
    binding: Option<Binding>,
    identity: Option<SessionIdentity>,
    timeline: MessageTimeline,
    roster: PresenceRoster,
    state: SyncState,
    status: ConnectionStatus,
    join_dialog_open: bool,
    view: watch::Sender<SessionView>,
}

impl<G, S> SyncOrchestrator<G, S>
where
    G: ConnectionGateway,
    S: SessionStore,
{
    pub fn new(gateway: G, store: S, resolver: impl IdentityResolver + 'static) -> Self {
        let status = gateway.status();
        let (view, _) = watch::channel(SessionView { status, ..SessionView::default() });
        Self {
            gateway,
            store,
            resolver: Box::new(resolver),
            clock: Utc::now,
            binding: None,
            identity: None,
            timeline: MessageTimeline::new(""),
            roster: PresenceRoster::new(),
            state: SyncState::Unbound,
            status,
            join_dialog_open: false,
            view,
        }
    }

    /// Override the time source used for message and presence timestamps.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    // ── Accessors ──────────────────────────────────────────────────

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.binding.as_ref().map(|binding| &binding.session_id)
    }

    pub fn identity(&self) -> Option<&SessionIdentity> {
        self.identity.as_ref()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.timeline.messages()
    }

    pub fn timeline(&self) -> &MessageTimeline {
        &self.timeline
    }

    pub fn roster(&self) -> &PresenceRoster {
        &self.roster
    }

    /// Roster entries other than the local user.
    pub fn guests(&self) -> Vec<&Participant> {
        self.roster.guests(self.identity.as_ref()).collect()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn subscription_count(&self) -> usize {
        self.binding.as_ref().map_or(0, |binding| binding.subscriptions.len())
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            session_id: self.session_id().map(ToString::to_string),
            sync_state: self.state,
            status: self.status,
            identity: self.identity.clone(),
            messages: self.timeline.messages().to_vec(),
            roster: self.roster.participants().to_vec(),
        }
    }

    /// Receiver that observes a fresh `SessionView` after every mutation.
    pub fn watch(&self) -> watch::Receiver<SessionView> {
        self.view.subscribe()
    }

    // ── Session lifecycle ──────────────────────────────────────────

    /// Bind the view to a session: tear down the previous binding, reset
    /// both reconcilers, hydrate from the snapshot store and subscribe.
    pub fn bind_session(&mut self, session_id: SessionId) {
        if self.session_id() == Some(&session_id) {
            return;
        }
        self.teardown();
        info!(%session_id, "binding session");

        self.timeline = MessageTimeline::new(session_id.as_str());
        self.roster.reset();

        let snapshot = match self.store.read(&session_id) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(%session_id, error = %format!("{error:#}"), "failed to read session snapshot");
                None
            }
        };
        let persisted_identity = match snapshot {
            Some(snapshot) => {
                debug!(%session_id, messages = snapshot.messages.len(), "hydrated timeline");
                self.timeline.hydrate(snapshot.messages);
                snapshot.identity
            }
            None => None,
        };
        self.identity = persisted_identity.or_else(|| self.resolver.resolve(&session_id));

        let (sink, inbox) = mpsc::unbounded_channel();
        let subscriptions =
            EventKind::ALL.iter().map(|kind| self.gateway.subscribe(*kind, sink.clone())).collect();
        self.binding = Some(Binding { session_id, inbox, subscriptions });
        self.state = SyncState::BoundDisconnected;

        // The connection may already be up from a previous view.
        let status = self.gateway.status();
        self.apply_status(status);
        self.publish_view();
    }

    /// Drop the current binding, returning to `Unbound`.
    pub fn unbind(&mut self) {
        if self.binding.is_none() {
            return;
        }
        self.teardown();
        self.publish_view();
    }

    fn teardown(&mut self) {
        if let Some(binding) = self.binding.take() {
            info!(session_id = %binding.session_id, "unbinding session");
        }
        self.identity = None;
        self.timeline.reset();
        self.roster.reset();
        self.state = SyncState::Unbound;
    }

    /// Record whether an external join dialog is open. While it is, connect
    /// requests are ignored.
    pub fn set_join_dialog_open(&mut self, open: bool) {
        self.join_dialog_open = open;
    }

    /// Complete the join flow with an identity for the bound session.
    pub fn set_identity(&mut self, identity: SessionIdentity) {
        if self.binding.is_none() {
            debug!("ignoring identity without a bound session");
            return;
        }
        self.identity = Some(identity);
        self.persist();
        if self.state == SyncState::ConnectedUnauthenticated {
            self.announce();
        }
        self.publish_view();
    }

    // ── Connection ─────────────────────────────────────────────────

    /// Ask the gateway to connect. Returns whether a request was issued.
    pub fn connect(&mut self) -> bool {
        if self.binding.is_none() {
            debug!("ignoring connect without a bound session");
            return false;
        }
        if self.join_dialog_open {
            debug!("ignoring connect while the join dialog is open");
            return false;
        }
        if self.state != SyncState::BoundDisconnected {
            debug!(state = ?self.state, "connect requested while not disconnected");
            return false;
        }

        self.gateway.connect();
        self.state = SyncState::Connecting;
        self.publish_view();
        true
    }

    pub fn reconnect(&mut self) -> bool {
        self.connect()
    }

    fn apply_status(&mut self, status: ConnectionStatus) {
        let previous = self.status;
        self.status = status;
        if self.binding.is_none() {
            return;
        }

        match status {
            ConnectionStatus::Idle => self.state = SyncState::BoundDisconnected,
            ConnectionStatus::Connecting => self.state = SyncState::Connecting,
            ConnectionStatus::Connected => {
                let already_up = previous == ConnectionStatus::Connected
                    && self.state != SyncState::BoundDisconnected;
                if already_up {
                    return;
                }
                self.state = SyncState::ConnectedUnauthenticated;
                self.announce();
            }
            ConnectionStatus::Disconnected => {
                // No stale online users while offline; the timeline stays.
                self.roster.reset();
                self.state = SyncState::BoundDisconnected;
            }
        }
    }

    /// Send AUTH then USER_JOINED. Requires a connected, bound session with
    /// an identity; otherwise waits in `ConnectedUnauthenticated`.
    fn announce(&mut self) {
        let Some(binding) = &self.binding else {
            return;
        };
        let Some(identity) = &self.identity else {
            debug!(session_id = %binding.session_id, "connected without identity; waiting for join");
            return;
        };
        let session_id = binding.session_id.as_str();

        if let Err(error) = self.gateway.send(ClientMessage::auth(session_id, identity)) {
            warn!(%session_id, error = %format!("{error:#}"), "failed to send auth message");
            return;
        }
        if let Err(error) = self.gateway.send(ClientMessage::user_joined(session_id, identity)) {
            warn!(%session_id, error = %format!("{error:#}"), "failed to announce join");
            return;
        }
        info!(%session_id, user_id = %identity.user_id, "announced join");
        self.state = SyncState::ConnectedAnnounced;
    }

    // ── Messages ───────────────────────────────────────────────────

    /// Compose a message: append it optimistically and send it.
    ///
    /// Without a bound session or identity nothing is queued or sent. A
    /// failed send leaves the entry in `sending`.
    pub fn send_message(&mut self, content: &str) -> Option<ChatMessage> {
        if self.binding.is_none() {
            return None;
        }
        let now = (self.clock)();
        let message = self.timeline.append_optimistic(self.identity.as_ref(), content, now)?;

        if let Err(error) = self.gateway.send(ClientMessage::chat(&message)) {
            warn!(
                message_id = %message.message_id,
                error = %format!("{error:#}"),
                "chat message left pending"
            );
        }
        self.publish_view();
        Some(message)
    }

    // ── Event handling ─────────────────────────────────────────────

    /// Route one gateway event to its reconciler and publish the result.
    pub fn handle_event(&mut self, event: GatewayEvent) {
        if self.binding.is_none() {
            debug!(kind = %event.kind(), "dropping event without a bound session");
            return;
        }

        match event {
            GatewayEvent::Status(status) => self.apply_status(status),
            GatewayEvent::Server(ServerMessage::ChatMessage { message }) => {
                self.timeline.merge_confirmed(message);
                self.persist();
            }
            GatewayEvent::Server(ServerMessage::SessionHistory { messages }) => {
                self.timeline.merge_history_replay(messages);
                self.persist();
            }
            GatewayEvent::Server(ServerMessage::UserJoinedSession { participants }) => {
                self.roster.apply_join_batch(participants);
            }
            GatewayEvent::Server(ServerMessage::UserDisconnected { user_id }) => {
                let now = (self.clock)();
                self.roster.apply_disconnect(&user_id, now);
            }
        }
        self.publish_view();
    }

    /// Handle every event already queued for the bound session, in
    /// delivery order. Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.binding.as_mut().and_then(|b| b.inbox.try_recv().ok()) {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Wait for the next event of the bound session. `None` when unbound or
    /// when the gateway has dropped every subscription.
    pub async fn next_event(&mut self) -> Option<GatewayEvent> {
        let binding = self.binding.as_mut()?;
        binding.inbox.recv().await
    }

    /// Handle events until `shutdown` resolves or the event stream ends.
    /// Queued events are handled before `shutdown` is checked.
    pub async fn run_until_shutdown(&mut self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        loop {
            let event = tokio::select! {
                biased;
                event = self.next_event() => event,
                _ = &mut shutdown => None,
            };
            match event {
                Some(event) => self.handle_event(event),
                None => break,
            }
        }
    }

    // ── Persistence / publication ──────────────────────────────────

    fn persist(&self) {
        let Some(binding) = &self.binding else {
            return;
        };
        let snapshot = SessionSnapshot {
            session_id: binding.session_id.to_string(),
            identity: self.identity.clone(),
            messages: self.timeline.messages().to_vec(),
        };
        if let Err(error) = self.store.write(&binding.session_id, &snapshot) {
            warn!(
                session_id = %binding.session_id,
                error = %format!("{error:#}"),
                "failed to persist session snapshot"
            );
        }
    }

    fn publish_view(&self) {
        self.view.send_replace(self.view());
    }
}
