// WebSocket message types for the coiisy chat session protocol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{ChatMessage, Participant, SessionIdentity};

/// Client -> Server messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Authenticate this connection for a session.
    #[serde(rename = "AUTH")]
    Auth { session_id: String, user_id: String },

    /// Announce presence in a session. Must follow `Auth`.
    #[serde(rename = "USER_JOINED")]
    UserJoined { session_id: String, user_id: String, full_name: String },

    /// Publish a chat message.
    #[serde(rename = "CHAT")]
    Chat {
        message_id: String,
        session_id: String,
        user_id: String,
        full_name: String,
        content: String,
        created_at: DateTime<Utc>,
    },
}

impl ClientMessage {
    pub fn auth(session_id: &str, identity: &SessionIdentity) -> Self {
        Self::Auth { session_id: session_id.to_string(), user_id: identity.user_id.clone() }
    }

    pub fn user_joined(session_id: &str, identity: &SessionIdentity) -> Self {
        Self::UserJoined {
            session_id: session_id.to_string(),
            user_id: identity.user_id.clone(),
            full_name: identity.display_name.clone(),
        }
    }

    /// Build the outbound payload for a timeline entry.
    pub fn chat(message: &ChatMessage) -> Self {
        Self::Chat {
            message_id: message.message_id.clone(),
            session_id: message.session_id.clone(),
            user_id: message.author_user_id.clone(),
            full_name: message.author_display_name.clone(),
            content: message.content.clone(),
            created_at: message.created_at,
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            Self::Auth { session_id, .. }
            | Self::UserJoined { session_id, .. }
            | Self::Chat { session_id, .. } => session_id,
        }
    }

    /// Wire value of the `type` tag.
    pub fn message_type(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "AUTH",
            Self::UserJoined { .. } => "USER_JOINED",
            Self::Chat { .. } => "CHAT",
        }
    }
}

/// Server -> Client messages consumed by the session client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// A confirmed chat message (own echo or another participant's).
    ChatMessage { message: ChatMessage },

    /// Historical messages replayed on (re)join.
    SessionHistory { messages: Vec<ChatMessage> },

    /// Snapshot of currently known participants.
    UserJoinedSession { participants: Vec<Participant> },

    /// A participant dropped their connection.
    UserDisconnected { user_id: String },
}

impl ServerMessage {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ChatMessage { .. } => EventKind::ChatMessage,
            Self::SessionHistory { .. } => EventKind::SessionHistory,
            Self::UserJoinedSession { .. } => EventKind::UserJoinedSession,
            Self::UserDisconnected { .. } => EventKind::UserDisconnected,
        }
    }
}

/// Event types a gateway subscriber can register for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ChatMessage,
    SessionHistory,
    UserJoinedSession,
    UserDisconnected,
    ConnectionStatus,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        Self::ChatMessage,
        Self::SessionHistory,
        Self::UserJoinedSession,
        Self::UserDisconnected,
        Self::ConnectionStatus,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChatMessage => "chat_message",
            Self::SessionHistory => "session_history",
            Self::UserJoinedSession => "user_joined_session",
            Self::UserDisconnected => "user_disconnected",
            Self::ConnectionStatus => "connection_status",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeliveryState;
    use chrono::TimeZone;
    use serde_json::json;

    fn alice() -> SessionIdentity {
        SessionIdentity::new("u1", "Alice")
    }

    #[test]
    fn auth_and_join_use_uppercase_type_tags() {
        let auth = serde_json::to_value(ClientMessage::auth("s-1", &alice())).unwrap();
        assert_eq!(auth, json!({"type": "AUTH", "sessionId": "s-1", "userId": "u1"}));

        let joined = serde_json::to_value(ClientMessage::user_joined("s-1", &alice())).unwrap();
        assert_eq!(
            joined,
            json!({"type": "USER_JOINED", "sessionId": "s-1", "userId": "u1", "fullName": "Alice"})
        );
        assert_eq!(ClientMessage::auth("s-1", &alice()).message_type(), auth["type"]);
    }

    #[test]
    fn chat_payload_is_built_from_timeline_entry() {
        let created_at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let message = ChatMessage {
            message_id: "m-1".into(),
            session_id: "s-1".into(),
            author_user_id: "u1".into(),
            author_display_name: "Alice".into(),
            content: "hi".into(),
            created_at,
            delivery_state: DeliveryState::Sending,
        };
        let encoded = serde_json::to_value(ClientMessage::chat(&message)).unwrap();
        assert_eq!(encoded["type"], "CHAT");
        assert_eq!(encoded["messageId"], "m-1");
        assert_eq!(encoded["fullName"], "Alice");
        assert_eq!(encoded["createdAt"], "2024-05-01T10:00:00Z");
        assert!(encoded.get("deliveryState").is_none());
    }

    #[test]
    fn server_messages_parse_from_snake_case_tags() {
        let raw = json!({
            "type": "user_joined_session",
            "participants": [
                {"userId": "u1", "fullName": "Alice", "isOnline": true},
                {"userId": "u2", "fullName": "Bob", "isOnline": false}
            ]
        });
        let message: ServerMessage = serde_json::from_value(raw).unwrap();
        assert_eq!(message.kind(), EventKind::UserJoinedSession);
        match message {
            ServerMessage::UserJoinedSession { participants } => {
                assert_eq!(participants.len(), 2);
                assert!(!participants[1].is_online);
            }
            other => panic!("unexpected message: {other:?}"),
        }

        let left: ServerMessage =
            serde_json::from_value(json!({"type": "user_disconnected", "userId": "u2"})).unwrap();
        assert_eq!(left, ServerMessage::UserDisconnected { user_id: "u2".into() });
    }

    #[test]
    fn unknown_server_type_is_rejected() {
        let result = serde_json::from_value::<ServerMessage>(json!({"type": "typing"}));
        assert!(result.is_err());
    }

    #[test]
    fn event_kind_names_match_serde_names() {
        for kind in EventKind::ALL {
            let encoded = serde_json::to_value(kind).unwrap();
            assert_eq!(encoded, kind.as_str());
        }
    }
}
