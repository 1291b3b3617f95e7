//! Media submission replay

use super::engine::SyncEngine;
use crate::api::PlayerSubmissionRequest;
use crate::error::{PointfinderError, PointfinderResult};
use crate::queue::{MediaCheckpoint, PendingAction};
use crate::upload::{MediaSource, resume_upload};
use std::path::PathBuf;
use tokio::fs;
use uuid::Uuid;

pub(super) const RESELECT_MESSAGE: &str = "Media source unavailable. Please reselect.";

impl SyncEngine {
    /// Upload the remaining chunks, then submit the answer with the file URL
    pub(super) async fn replay_media(
        &self,
        action: &PendingAction,
        challenge_id: Uuid,
        answer: &str,
        media: &MediaCheckpoint,
    ) -> PointfinderResult<()> {
        let Some(path) = resolve_media_path(media).await else {
            if let Err(err) = self.store.mark_needs_reselect(action.id, RESELECT_MESSAGE).await {
                tracing::warn!(action_id = %action.id, error = %err, "failed to flag media for reselect");
            }
            return Err(PointfinderError::needs_reselect(action.id, RESELECT_MESSAGE));
        };

        let total_size_bytes = if media.total_size_bytes > 0 {
            media.total_size_bytes
        } else {
            fs::metadata(&path)
                .await
                .map_err(|e| PointfinderError::io_with_path(e.to_string(), path.display().to_string()))?
                .len()
        };
        if total_size_bytes == 0 {
            return Err(PointfinderError::invalid_action_for(action.id, "Media file is empty"));
        }

        let file_url = resume_upload(
            self.api.as_ref(),
            &self.store,
            action,
            MediaSource {
                path: &path,
                total_size_bytes,
            },
            self.chunk_size,
        )
        .await?;

        let submission = PlayerSubmissionRequest {
            base_id: action.base_id,
            challenge_id,
            answer: answer.to_string(),
            file_url: Some(file_url),
            idempotency_key: Some(action.id),
        };
        self.api.submit_answer(action.game_id, &submission).await?;
        Ok(())
    }
}

/// The queue's own copy if still present, else the user's original
async fn resolve_media_path(media: &MediaCheckpoint) -> Option<PathBuf> {
    for candidate in [&media.local_file_path, &media.source_path].into_iter().flatten() {
        if fs::try_exists(candidate).await.unwrap_or(false) {
            return Some(candidate.clone());
        }
    }
    None
}
