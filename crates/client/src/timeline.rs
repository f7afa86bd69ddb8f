// Message timeline reconciliation: optimistic sends, confirmations, history.
//
// Entries flow through two states:
//   sending → sent   (confirmation with the same message id replaces the entry)
//   sent             (inbound message with an unseen id is appended)
//
// Ordering is insertion order. Nothing is ever re-sorted by timestamp.

use chrono::{DateTime, Utc};
use coiisy_common::types::{ChatMessage, DeliveryState, SessionIdentity};
use tracing::{debug, trace};
use uuid::Uuid;

/// Result of merging a server-confirmed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// An entry with the same id existed and was overwritten in place.
    Replaced { index: usize },
    /// No entry had this id; the message was appended.
    Appended,
}

/// The ordered, deduplicated chat timeline of one session.
#[derive(Debug, Clone)]
pub struct MessageTimeline {
    session_id: String,
    messages: Vec<ChatMessage>,
}

impl MessageTimeline {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self { session_id: session_id.into(), messages: Vec::new() }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Entries still waiting for a server confirmation.
    pub fn pending(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(|m| m.is_pending())
    }

    pub fn get(&self, message_id: &str) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.message_id == message_id)
    }

    /// Append a locally-authored message in `sending` state.
    ///
    /// Without an identity this is a no-op and returns `None`.
    pub fn append_optimistic(
        &mut self,
        identity: Option<&SessionIdentity>,
        content: &str,
        now: DateTime<Utc>,
    ) -> Option<ChatMessage> {
        let Some(identity) = identity else {
            debug!(session_id = %self.session_id, "ignoring compose without a session identity");
            return None;
        };

        let message = ChatMessage {
            message_id: Uuid::new_v4().to_string(),
            session_id: self.session_id.clone(),
            author_user_id: identity.user_id.clone(),
            author_display_name: identity.display_name.clone(),
            content: content.to_string(),
            created_at: now,
            delivery_state: DeliveryState::Sending,
        };
        trace!(message_id = %message.message_id, "appending optimistic message");
        self.messages.push(message.clone());
        Some(message)
    }

    /// Merge a server-confirmed message by `message_id`.
    ///
    /// An existing entry is overwritten wholesale; otherwise the message is
    /// appended. The stored record is always `sent`.
    pub fn merge_confirmed(&mut self, mut message: ChatMessage) -> MergeOutcome {
        message.delivery_state = DeliveryState::Sent;
        match self.messages.iter().position(|m| m.message_id == message.message_id) {
            Some(index) => {
                trace!(message_id = %message.message_id, index, "replacing confirmed message");
                self.messages[index] = message;
                MergeOutcome::Replaced { index }
            }
            None => {
                trace!(message_id = %message.message_id, "appending confirmed message");
                self.messages.push(message);
                MergeOutcome::Appended
            }
        }
    }

    /// Append a history replay batch as-is.
    ///
    /// Replayed entries are not checked against existing ids, so repeated
    /// replays accumulate duplicates.
    pub fn merge_history_replay(&mut self, messages: Vec<ChatMessage>) {
        debug!(
            session_id = %self.session_id,
            replayed = messages.len(),
            existing = self.messages.len(),
            "appending history replay"
        );
        self.messages.extend(messages);
    }

    /// Replace the contents with a persisted timeline.
    pub fn hydrate(&mut self, messages: Vec<ChatMessage>) {
        self.messages = messages;
    }

    pub fn reset(&mut self) {
        self.messages.clear();
    }
}
