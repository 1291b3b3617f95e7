//! Pointfinder client core
//!
//! Offline-first resilience layer for the Pointfinder game client: a durable
//! action queue, the sync engine that replays it, resumable chunked media
//! uploads, single-flight token refresh and a reconnecting realtime stream.

pub mod api;
pub mod auth;
pub mod config;
pub mod connectivity;
pub mod context;
pub mod error;
pub mod queue;
pub mod realtime;
pub mod recovery;
pub mod sync;
pub mod upload;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use api::{HttpApiClient, HttpTransport, SyncApi};
pub use auth::{AuthEvent, CredentialStore, Credentials, TokenRefreshCoordinator, TokenRefresher};
pub use config::{ClientConfig, LoggingConfig, load_config};
pub use connectivity::ConnectivityMonitor;
pub use context::{ClientContext, ClientContextBuilder, ClientStatus};
pub use error::{PointfinderError, PointfinderResult};
pub use queue::{ActionKind, MediaCheckpoint, PendingAction, PersistentActionStore};
pub use realtime::{ConnectionState, RealtimeEnvelope, RealtimeReconnectClient};
pub use sync::{SyncCompletionHook, SyncEngine, SyncEvent, SyncIssue, SyncIssueKind, SyncReport};
pub use upload::{UploadSession, UploadSessionClient, UploadStatus};
