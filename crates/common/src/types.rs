// Core domain types shared across all Coiisy crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Delivery lifecycle of a chat message in the local timeline.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    /// Optimistic entry, not yet confirmed by the server.
    Sending,
    /// Confirmed by the server (or received from another participant).
    #[default]
    Sent,
}

/// A single chat message in a session timeline.
///
/// `message_id` is assigned by the authoring client and is the only
/// deduplication key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub message_id: String,
    pub session_id: String,
    #[serde(rename = "userId")]
    pub author_user_id: String,
    #[serde(rename = "fullName", default)]
    pub author_display_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Absent on the wire for server-originated messages, which are `sent`.
    #[serde(default)]
    pub delivery_state: DeliveryState,
}

impl ChatMessage {
    pub fn is_pending(&self) -> bool {
        self.delivery_state == DeliveryState::Sending
    }

    /// Whether this message was written by the given local identity.
    pub fn is_authored_by(&self, identity: &SessionIdentity) -> bool {
        self.author_user_id == identity.user_id
    }
}

/// A participant of a session, online or previously online.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: String,
    #[serde(rename = "fullName", default)]
    pub display_name: String,
    pub is_online: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active_at: Option<DateTime<Utc>>,
}

impl Participant {
    /// Avatar initials: the first two characters of the display name.
    pub fn initials(&self) -> String {
        self.display_name.chars().take(2).collect()
    }
}

/// The local user's identity within one session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdentity {
    pub user_id: String,
    #[serde(rename = "fullName")]
    pub display_name: String,
}

impl SessionIdentity {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), display_name: display_name.into() }
    }
}

/// Persisted per-session state used to hydrate a view before the network
/// responds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    #[serde(default)]
    pub identity: Option<SessionIdentity>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl SessionSnapshot {
    pub fn empty(session_id: impl Into<String>) -> Self {
        Self { session_id: session_id.into(), identity: None, messages: Vec::new() }
    }
}
