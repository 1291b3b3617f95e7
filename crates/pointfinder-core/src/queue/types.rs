//! Queued action records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// A write that has not been acknowledged by the server yet
///
/// `id` is generated once and sent as the idempotency key on every replay, so
/// the server records the action at most once however often it is retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAction {
    pub id: Uuid,
    #[serde(flatten)]
    pub kind: ActionKind,
    pub game_id: Uuid,
    pub base_id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub last_error: Option<String>,
}

/// What the action does, with the data each kind needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ActionKind {
    CheckIn,
    #[serde(rename = "submission")]
    TextSubmission { challenge_id: Uuid, answer: String },
    MediaSubmission {
        challenge_id: Uuid,
        answer: String,
        media: MediaCheckpoint,
    },
}

impl ActionKind {
    /// Processing order within a sync pass; lower runs first
    pub fn sync_priority(&self) -> u8 {
        match self {
            Self::CheckIn => 0,
            Self::TextSubmission { .. } => 1,
            Self::MediaSubmission { .. } => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CheckIn => "check_in",
            Self::TextSubmission { .. } => "submission",
            Self::MediaSubmission { .. } => "media_submission",
        }
    }
}

/// Upload progress of a media submission, persisted after every accepted chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaCheckpoint {
    pub content_type: String,
    pub total_size_bytes: u64,
    /// Copy owned by the queue; deleted together with the action
    #[serde(default)]
    pub local_file_path: Option<PathBuf>,
    /// The user's original file; never deleted by the client
    #[serde(default)]
    pub source_path: Option<PathBuf>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub upload_session_id: Option<Uuid>,
    #[serde(default)]
    pub next_chunk_index: u32,
    #[serde(default)]
    pub total_chunks: Option<u32>,
    #[serde(default)]
    pub needs_reselect: bool,
}

impl MediaCheckpoint {
    pub fn new(content_type: impl Into<String>, total_size_bytes: u64) -> Self {
        Self {
            content_type: content_type.into(),
            total_size_bytes,
            local_file_path: None,
            source_path: None,
            file_name: None,
            upload_session_id: None,
            next_chunk_index: 0,
            total_chunks: None,
            needs_reselect: false,
        }
    }

    pub fn with_local_copy(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_file_path = Some(path.into());
        self
    }

    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Forget the server-side session and start over from chunk 0
    pub fn reset_upload(&mut self) {
        self.upload_session_id = None;
        self.next_chunk_index = 0;
        self.total_chunks = None;
    }
}

impl PendingAction {
    fn new(kind: ActionKind, game_id: Uuid, base_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            game_id,
            base_id,
            created_at: Utc::now(),
            retry_count: 0,
            last_error: None,
        }
    }

    pub fn check_in(game_id: Uuid, base_id: Uuid) -> Self {
        Self::new(ActionKind::CheckIn, game_id, base_id)
    }

    pub fn text_submission(
        game_id: Uuid,
        base_id: Uuid,
        challenge_id: Uuid,
        answer: impl Into<String>,
    ) -> Self {
        Self::new(
            ActionKind::TextSubmission {
                challenge_id,
                answer: answer.into(),
            },
            game_id,
            base_id,
        )
    }

    pub fn media_submission(
        game_id: Uuid,
        base_id: Uuid,
        challenge_id: Uuid,
        answer: impl Into<String>,
        media: MediaCheckpoint,
    ) -> Self {
        Self::new(
            ActionKind::MediaSubmission {
                challenge_id,
                answer: answer.into(),
                media,
            },
            game_id,
            base_id,
        )
    }

    pub fn challenge_id(&self) -> Option<Uuid> {
        match &self.kind {
            ActionKind::CheckIn => None,
            ActionKind::TextSubmission { challenge_id, .. }
            | ActionKind::MediaSubmission { challenge_id, .. } => Some(*challenge_id),
        }
    }

    pub fn answer(&self) -> Option<&str> {
        match &self.kind {
            ActionKind::CheckIn => None,
            ActionKind::TextSubmission { answer, .. }
            | ActionKind::MediaSubmission { answer, .. } => Some(answer),
        }
    }

    pub fn media(&self) -> Option<&MediaCheckpoint> {
        match &self.kind {
            ActionKind::MediaSubmission { media, .. } => Some(media),
            _ => None,
        }
    }

    pub fn media_mut(&mut self) -> Option<&mut MediaCheckpoint> {
        match &mut self.kind {
            ActionKind::MediaSubmission { media, .. } => Some(media),
            _ => None,
        }
    }

    pub fn is_check_in(&self) -> bool {
        matches!(self.kind, ActionKind::CheckIn)
    }

    pub fn is_submission(&self) -> bool {
        !self.is_check_in()
    }

    /// True while the action waits for the user to re-supply its media
    pub fn needs_reselect(&self) -> bool {
        self.media().is_some_and(|m| m.needs_reselect)
    }
}
