//! Draining the action queue against the server

mod engine;
mod media;


pub use engine::SyncEngine;

use async_trait::async_trait;
use uuid::Uuid;

/// Why the last sync attempt left something behind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncIssueKind {
    /// Transient failure; the action stays queued and is retried
    WillRetry,
    /// The media must be re-supplied before the action can proceed
    NeedsReselect,
    /// The server refused the action; it was removed
    Rejected,
    /// The retry budget ran out; the action was removed
    RetriesExhausted,
    /// Credentials are gone; the action waits for a new login
    AuthExpired,
}

/// Last sync error, as shown to the player
#[derive(Debug, Clone, PartialEq)]
pub struct SyncIssue {
    pub kind: SyncIssueKind,
    pub message: String,
    pub action_id: Option<Uuid>,
}

impl SyncIssue {
    pub fn new(kind: SyncIssueKind, message: impl Into<String>, action_id: Uuid) -> Self {
        Self {
            kind,
            message: message.into(),
            action_id: Some(action_id),
        }
    }

    /// Whether the player has to act (reselect media, log in again)
    pub fn is_blocking(&self) -> bool {
        matches!(
            self.kind,
            SyncIssueKind::NeedsReselect | SyncIssueKind::AuthExpired
        )
    }
}

/// Counters for one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub synced: usize,
    pub retried: usize,
    pub dropped: usize,
    pub stalled: usize,
}

/// Notifications published while the queue drains
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Started,
    ActionSynced { action_id: Uuid },
    ActionRetried { action_id: Uuid, retry_count: u32 },
    ActionDropped { action_id: Uuid, reason: String },
    ActionStalled { action_id: Uuid, kind: SyncIssueKind },
    Completed(SyncReport),
}

/// Invoked once after every completed pass
///
/// Used to refresh state that depends on server acknowledgements, such as
/// base progress.
#[async_trait]
pub trait SyncCompletionHook: Send + Sync {
    async fn on_sync_complete(&self, report: &SyncReport);
}
