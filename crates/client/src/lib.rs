// coiisy-client: session-state reconciliation for chat and presence

pub mod config;
pub mod gateway;
pub mod identity;
pub mod orchestrator;
pub mod roster;
pub mod store;
pub mod timeline;

pub use gateway::{ConnectionGateway, ConnectionStatus, GatewayEvent, LoopbackGateway};
pub use identity::{IdentityResolver, NoIdentity, StaticIdentity};
pub use orchestrator::{SessionView, SyncOrchestrator, SyncState};
pub use roster::PresenceRoster;
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
pub use timeline::{MergeOutcome, MessageTimeline};
