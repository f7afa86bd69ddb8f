// Persistence: per-session snapshots for hydration across reloads.

pub mod file;
pub mod memory;

use std::sync::Arc;

use anyhow::Result;
use coiisy_common::session::SessionId;
use coiisy_common::types::SessionSnapshot;

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;

/// Synchronous keyed snapshot store. One snapshot per session id; writes
/// overwrite unconditionally and nothing expires.
pub trait SessionStore {
    fn read(&self, session_id: &SessionId) -> Result<Option<SessionSnapshot>>;

    fn write(&self, session_id: &SessionId, snapshot: &SessionSnapshot) -> Result<()>;
}

impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    fn read(&self, session_id: &SessionId) -> Result<Option<SessionSnapshot>> {
        (**self).read(session_id)
    }

    fn write(&self, session_id: &SessionId, snapshot: &SessionSnapshot) -> Result<()> {
        (**self).write(session_id, snapshot)
    }
}

impl<T: SessionStore + ?Sized> SessionStore for Box<T> {
    fn read(&self, session_id: &SessionId) -> Result<Option<SessionSnapshot>> {
        (**self).read(session_id)
    }

    fn write(&self, session_id: &SessionId, snapshot: &SessionSnapshot) -> Result<()> {
        (**self).write(session_id, snapshot)
    }
}
