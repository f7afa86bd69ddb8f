// Presence roster reconciliation: join batches and disconnects.

use chrono::{DateTime, Utc};
use coiisy_common::types::{Participant, SessionIdentity};
use tracing::{debug, trace};

/// Participants known to a session, online ones first.
///
/// At most one record per `user_id`. Records are updated in place and never
/// removed except by [`PresenceRoster::reset`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceRoster {
    participants: Vec<Participant>,
}

impl PresenceRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn get(&self, user_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub fn online(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.is_online)
    }

    /// Everyone in the roster except the local user.
    pub fn guests<'a>(
        &'a self,
        identity: Option<&'a SessionIdentity>,
    ) -> impl Iterator<Item = &'a Participant> + 'a {
        self.participants
            .iter()
            .filter(move |p| identity.map_or(true, |me| me.user_id != p.user_id))
    }

    /// Merge a join batch.
    ///
    /// Incoming records overwrite the matching `user_id` or are appended.
    /// Participants missing from the batch are left as they are. The roster
    /// is then stably partitioned online-first.
    pub fn apply_join_batch(&mut self, batch: Vec<Participant>) {
        let incoming = batch.len();
        for participant in batch {
            match self.participants.iter_mut().find(|p| p.user_id == participant.user_id) {
                Some(existing) => {
                    trace!(user_id = %participant.user_id, "updating roster entry");
                    *existing = participant;
                }
                None => {
                    trace!(user_id = %participant.user_id, "adding roster entry");
                    self.participants.push(participant);
                }
            }
        }
        // `sort_by_key` is stable, so ties keep their prior relative order.
        self.participants.sort_by_key(|p| !p.is_online);
        debug!(incoming, roster = self.participants.len(), "applied join batch");
    }

    /// Mark a participant offline. Unknown user ids are ignored.
    ///
    /// Returns whether a record was updated.
    pub fn apply_disconnect(&mut self, user_id: &str, now: DateTime<Utc>) -> bool {
        let Some(participant) = self.participants.iter_mut().find(|p| p.user_id == user_id) else {
            debug!(%user_id, "ignoring disconnect for unknown participant");
            return false;
        };
        participant.is_online = false;
        participant.last_active_at = Some(now);
        true
    }

    pub fn reset(&mut self) {
        self.participants.clear();
    }
}
