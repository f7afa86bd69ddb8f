use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use coiisy_common::session::SessionId;
use coiisy_common::types::SessionSnapshot;

use super::SessionStore;

/// In-process snapshot store. Contents live as long as the store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    snapshots: Mutex<HashMap<SessionId, SessionSnapshot>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().map(|guard| guard.len()).unwrap_or_default()
    }
}

impl SessionStore for MemorySessionStore {
    fn read(&self, session_id: &SessionId) -> Result<Option<SessionSnapshot>> {
        let guard = self.snapshots.lock().map_err(|_| anyhow!("session store lock poisoned"))?;
        Ok(guard.get(session_id).cloned())
    }

    fn write(&self, session_id: &SessionId, snapshot: &SessionSnapshot) -> Result<()> {
        let mut guard =
            self.snapshots.lock().map_err(|_| anyhow!("session store lock poisoned"))?;
        guard.insert(session_id.clone(), snapshot.clone());
        Ok(())
    }
}
