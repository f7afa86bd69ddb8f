use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use coiisy_common::session::SessionId;
use coiisy_common::types::SessionSnapshot;
use tracing::trace;

use super::SessionStore;

const SNAPSHOT_FILE_EXT: &str = "json";

/// Stores one JSON snapshot per session at `<root>/sessions/{session_id}.json`.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    sessions_dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let sessions_dir = root.as_ref().join("sessions");
        fs::create_dir_all(&sessions_dir).with_context(|| {
            format!("failed to create sessions directory `{}`", sessions_dir.display())
        })?;
        Ok(Self { sessions_dir })
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    fn snapshot_path(&self, session_id: &SessionId) -> PathBuf {
        self.sessions_dir.join(format!("{session_id}.{SNAPSHOT_FILE_EXT}"))
    }

    fn temp_path_for(&self, session_id: &SessionId) -> PathBuf {
        self.sessions_dir.join(format!("{session_id}.{SNAPSHOT_FILE_EXT}.tmp"))
    }
}

impl SessionStore for FileSessionStore {
    fn read(&self, session_id: &SessionId) -> Result<Option<SessionSnapshot>> {
        let path = self.snapshot_path(session_id);
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read session snapshot `{}`", path.display()))?;
        let snapshot = serde_json::from_str(&contents)
            .with_context(|| format!("session snapshot `{}` is not valid", path.display()))?;
        Ok(Some(snapshot))
    }

    fn write(&self, session_id: &SessionId, snapshot: &SessionSnapshot) -> Result<()> {
        let encoded =
            serde_json::to_vec(snapshot).context("failed to encode session snapshot")?;

        let target_path = self.snapshot_path(session_id);
        let tmp_path = self.temp_path_for(session_id);
        let mut file = fs::File::create(&tmp_path).with_context(|| {
            format!("failed to open temp snapshot `{}`", tmp_path.display())
        })?;
        file.write_all(&encoded).context("failed to write session snapshot")?;
        file.sync_data().context("failed to fsync session snapshot")?;
        drop(file);

        fs::rename(&tmp_path, &target_path).with_context(|| {
            format!(
                "failed to atomically move snapshot `{}` to `{}`",
                tmp_path.display(),
                target_path.display()
            )
        })?;
        trace!(path = %target_path.display(), bytes = encoded.len(), "wrote session snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use coiisy_common::types::{ChatMessage, DeliveryState, SessionIdentity};
    use tempfile::TempDir;

    fn session(id: &str) -> SessionId {
        SessionId::parse(id).unwrap()
    }

    fn message(id: &str, state: DeliveryState) -> ChatMessage {
        ChatMessage {
            message_id: id.to_string(),
            session_id: "room-1".into(),
            author_user_id: "u1".into(),
            author_display_name: "Alice".into(),
            content: format!("content of {id}"),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            delivery_state: state,
        }
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path()).unwrap();
        let snapshot = SessionSnapshot {
            session_id: "room-1".into(),
            identity: Some(SessionIdentity::new("u1", "Alice")),
            messages: vec![message("m-1", DeliveryState::Sent), message("m-2", DeliveryState::Sending)],
        };

        store.write(&session("room-1"), &snapshot).unwrap();
        let loaded = store.read(&session("room-1")).unwrap();

        assert_eq!(loaded, Some(snapshot));
        assert!(!store.temp_path_for(&session("room-1")).exists());
    }

    #[test]
    fn missing_snapshot_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path()).unwrap();
        assert!(store.read(&session("never-written")).unwrap().is_none());
    }

    #[test]
    fn snapshots_survive_a_new_store_instance() {
        let dir = TempDir::new().unwrap();
        let snapshot = SessionSnapshot::empty("room-1");
        FileSessionStore::new(dir.path()).unwrap().write(&session("room-1"), &snapshot).unwrap();

        let reopened = FileSessionStore::new(dir.path()).unwrap();
        assert_eq!(reopened.read(&session("room-1")).unwrap(), Some(snapshot));
    }

    #[test]
    fn corrupt_snapshot_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path()).unwrap();
        fs::write(store.snapshot_path(&session("room-1")), b"{not json").unwrap();

        let error = store.read(&session("room-1")).expect_err("corrupt snapshot should fail");
        assert!(error.to_string().contains("is not valid"));
    }

    #[test]
    fn write_overwrites_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path()).unwrap();
        let mut snapshot = SessionSnapshot::empty("room-1");
        snapshot.messages.push(message("m-1", DeliveryState::Sent));
        store.write(&session("room-1"), &snapshot).unwrap();

        store.write(&session("room-1"), &SessionSnapshot::empty("room-1")).unwrap();
        assert!(store.read(&session("room-1")).unwrap().unwrap().messages.is_empty());
    }

    #[test]
    fn longest_multibyte_id_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path()).unwrap();
        let id = "é".repeat(coiisy_common::session::MAX_SESSION_ID_BYTES / 2);
        let mut snapshot = SessionSnapshot::empty(id.clone());
        snapshot.messages.push(message("m-1", DeliveryState::Sent));

        store.write(&session(&id), &snapshot).unwrap();
        assert_eq!(store.read(&session(&id)).unwrap(), Some(snapshot));
    }
}
