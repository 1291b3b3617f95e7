//! Resuming a media upload from its persisted checkpoint

use super::client::UploadSessionClient;
use super::session::UploadSession;
use crate::api::SyncApi;
use crate::error::{PointfinderError, PointfinderResult};
use crate::queue::{MediaCheckpoint, PendingAction, PersistentActionStore};
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Source bytes of one media upload
pub struct MediaSource<'a> {
    pub path: &'a Path,
    pub total_size_bytes: u64,
}

/// Upload the remaining chunks of `action`'s media and return the file URL
///
/// Progress is checkpointed in `store` after every accepted chunk, so a later
/// call picks up where this one stopped. The server's list of accepted chunks
/// always wins over the local checkpoint.
pub async fn resume_upload(
    api: &dyn SyncApi,
    store: &PersistentActionStore,
    action: &PendingAction,
    source: MediaSource<'_>,
    chunk_size: u64,
) -> PointfinderResult<String> {
    let media = action.media().ok_or_else(|| {
        PointfinderError::invalid_action_for(action.id, "Action carries no media")
    })?;
    let client = UploadSessionClient::new(api, action.game_id);

    let mut session =
        ensure_session(&client, store, action, media, source.total_size_bytes, chunk_size).await?;
    if let Some(url) = session.completed_file_url() {
        tracing::info!(action_id = %action.id, "upload already completed on server");
        return Ok(url.to_string());
    }

    let mut file = File::open(source.path).await.map_err(|e| {
        PointfinderError::io_with_path(e.to_string(), source.path.display().to_string())
    })?;

    for index in 0..session.total_chunks {
        if session.is_chunk_uploaded(index) {
            continue;
        }
        let bytes = read_chunk(&mut file, &session, index)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::UnexpectedEof => PointfinderError::invalid_action_for(
                    action.id,
                    "Media file is shorter than its declared size",
                ),
                _ => PointfinderError::io_with_path(
                    e.to_string(),
                    source.path.display().to_string(),
                ),
            })?;

        session = client.upload_chunk(&session, index, bytes).await?;
        checkpoint(store, action, &session, index + 1).await;
    }

    let completed = client.complete_session(&session).await?;
    completed
        .completed_file_url()
        .map(str::to_string)
        .ok_or_else(|| {
            PointfinderError::invalid_action_for(action.id, "Upload completed without a file URL")
        })
}

/// Reuse the checkpointed session when the server still has it, else start one
async fn ensure_session(
    client: &UploadSessionClient<'_>,
    store: &PersistentActionStore,
    action: &PendingAction,
    media: &MediaCheckpoint,
    total_size: u64,
    chunk_size: u64,
) -> PointfinderResult<UploadSession> {
    if let Some(session_id) = media.upload_session_id {
        match client.get_session(session_id).await {
            Ok(session) if session.completed_file_url().is_some() => return Ok(session),
            Ok(session) if session.is_open() && session.matches_size(total_size) => {
                tracing::info!(
                    action_id = %action.id,
                    session_id = %session_id,
                    missing = session.missing_chunks().len(),
                    "resuming upload session"
                );
                return Ok(session);
            }
            Ok(session) => {
                tracing::info!(
                    session_id = %session_id,
                    status = ?session.status,
                    "upload session no longer usable, starting a new one"
                );
            }
            // Only a definitive answer from the server justifies a new session.
            Err(PointfinderError::Http { status_code, .. }) => {
                tracing::info!(session_id = %session_id, status_code, "upload session lookup refused");
            }
            Err(err) => return Err(err),
        }
    }

    let session = client
        .create_session(
            media.file_name.clone(),
            media.content_type.clone(),
            total_size,
            chunk_size,
        )
        .await?;
    checkpoint(store, action, &session, 0).await;
    Ok(session)
}

async fn read_chunk(
    file: &mut File,
    session: &UploadSession,
    index: u32,
) -> std::io::Result<Vec<u8>> {
    let len = session.expected_chunk_len(index).unwrap_or(0) as usize;
    file.seek(SeekFrom::Start(session.chunk_offset(index))).await?;
    let mut buf = vec![0u8; len];
    file.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Persist progress; the server remains the source of truth if this fails
async fn checkpoint(
    store: &PersistentActionStore,
    action: &PendingAction,
    session: &UploadSession,
    next_chunk_index: u32,
) {
    if let Err(err) = store
        .update_upload_progress(
            action.id,
            session.session_id,
            next_chunk_index,
            session.total_chunks,
        )
        .await
    {
        tracing::warn!(action_id = %action.id, error = %err, "failed to checkpoint upload progress");
    }
}
