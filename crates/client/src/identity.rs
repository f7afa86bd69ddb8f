// Session identity resolution, injected into the orchestrator.

use coiisy_common::session::SessionId;
use coiisy_common::types::SessionIdentity;

/// Resolves the local user's identity for a session when no persisted
/// snapshot carries one.
pub trait IdentityResolver {
    fn resolve(&self, session_id: &SessionId) -> Option<SessionIdentity>;
}

/// Never resolves; the identity must come from a snapshot or a join flow.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIdentity;

impl IdentityResolver for NoIdentity {
    fn resolve(&self, _session_id: &SessionId) -> Option<SessionIdentity> {
        None
    }
}

/// Resolves the same identity for every session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticIdentity(pub SessionIdentity);

impl IdentityResolver for StaticIdentity {
    fn resolve(&self, _session_id: &SessionId) -> Option<SessionIdentity> {
        Some(self.0.clone())
    }
}

impl<F> IdentityResolver for F
where
    F: Fn(&SessionId) -> Option<SessionIdentity>,
{
    fn resolve(&self, session_id: &SessionId) -> Option<SessionIdentity> {
        self(session_id)
    }
}
