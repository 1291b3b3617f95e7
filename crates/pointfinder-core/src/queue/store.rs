//! Durable action queue

use super::types::{MediaCheckpoint, PendingAction};
use crate::error::{PointfinderError, PointfinderResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, watch};
use uuid::Uuid;

/// FIFO store of [`PendingAction`]s backed by a single JSON file
///
/// Every mutation rewrites the whole file through a temp file and rename, and
/// only becomes visible in memory once that write succeeded. Uniqueness is not
/// enforced; callers check `has_pending_*` before enqueuing.
pub struct PersistentActionStore {
    path: PathBuf,
    actions: Mutex<Vec<PendingAction>>,
    count_tx: watch::Sender<usize>,
}

impl PersistentActionStore {
    /// Open the store at `path`, rehydrating whatever the file holds
    ///
    /// A missing or unreadable file yields an empty queue.
    pub async fn open(path: impl Into<PathBuf>) -> PointfinderResult<Self> {
        let path = path.into();
        let actions = load_actions(&path).await;
        tracing::debug!(path = %path.display(), count = actions.len(), "opened action store");
        let (count_tx, _) = watch::channel(actions.len());
        Ok(Self {
            path,
            actions: Mutex::new(actions),
            count_tx,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pending count, published after every committed mutation
    pub fn subscribe_count(&self) -> watch::Receiver<usize> {
        self.count_tx.subscribe()
    }

    pub async fn enqueue(&self, action: PendingAction) -> PointfinderResult<Uuid> {
        let id = action.id;
        let kind = action.kind.name();
        self.mutate(move |actions| {
            actions.push(action);
            Some(())
        })
        .await?;
        tracing::info!(action_id = %id, kind, "queued action");
        Ok(id)
    }

    pub async fn enqueue_check_in(&self, game_id: Uuid, base_id: Uuid) -> PointfinderResult<Uuid> {
        self.enqueue(PendingAction::check_in(game_id, base_id)).await
    }

    pub async fn enqueue_submission(
        &self,
        game_id: Uuid,
        base_id: Uuid,
        challenge_id: Uuid,
        answer: impl Into<String>,
    ) -> PointfinderResult<Uuid> {
        self.enqueue(PendingAction::text_submission(
            game_id,
            base_id,
            challenge_id,
            answer,
        ))
        .await
    }

    pub async fn enqueue_media_submission(
        &self,
        game_id: Uuid,
        base_id: Uuid,
        challenge_id: Uuid,
        answer: impl Into<String>,
        media: MediaCheckpoint,
    ) -> PointfinderResult<Uuid> {
        self.enqueue(PendingAction::media_submission(
            game_id,
            base_id,
            challenge_id,
            answer,
            media,
        ))
        .await
    }

    /// Remove an action and delete the media copy it owns
    pub async fn dequeue(&self, id: Uuid) -> PointfinderResult<Option<PendingAction>> {
        let removed = self
            .mutate(|actions| {
                let index = actions.iter().position(|a| a.id == id)?;
                Some(actions.remove(index))
            })
            .await?;
        if let Some(action) = &removed {
            remove_local_media(action).await;
            tracing::debug!(action_id = %id, "removed action");
        }
        Ok(removed)
    }

    /// Every queued action, oldest first
    pub async fn all_pending(&self) -> Vec<PendingAction> {
        let mut actions = self.actions.lock().await.clone();
        actions.sort_by_key(|a| a.created_at);
        actions
    }

    pub async fn pending_for_game(&self, game_id: Uuid) -> Vec<PendingAction> {
        let mut actions: Vec<_> = self
            .actions
            .lock()
            .await
            .iter()
            .filter(|a| a.game_id == game_id)
            .cloned()
            .collect();
        actions.sort_by_key(|a| a.created_at);
        actions
    }

    pub async fn get(&self, id: Uuid) -> Option<PendingAction> {
        self.actions.lock().await.iter().find(|a| a.id == id).cloned()
    }

    pub async fn contains(&self, id: Uuid) -> bool {
        self.actions.lock().await.iter().any(|a| a.id == id)
    }

    pub async fn pending_count(&self) -> usize {
        self.actions.lock().await.len()
    }

    /// Replace the stored record with the same id; false when it is gone
    pub async fn update(&self, action: PendingAction) -> PointfinderResult<bool> {
        let updated = self
            .mutate(move |actions| {
                let slot = actions.iter_mut().find(|a| a.id == action.id)?;
                *slot = action;
                Some(())
            })
            .await?;
        Ok(updated.is_some())
    }

    pub async fn has_pending_check_in(&self, game_id: Uuid, base_id: Uuid) -> bool {
        self.actions
            .lock()
            .await
            .iter()
            .any(|a| a.is_check_in() && a.game_id == game_id && a.base_id == base_id)
    }

    /// Text and media submissions both count
    pub async fn has_pending_submission(&self, base_id: Uuid, challenge_id: Uuid) -> bool {
        self.actions
            .lock()
            .await
            .iter()
            .any(|a| a.base_id == base_id && a.challenge_id() == Some(challenge_id))
    }

    /// Remove every action, or only those of one game; returns how many went
    pub async fn clear(&self, game_id: Option<Uuid>) -> PointfinderResult<usize> {
        let removed = self
            .mutate(|actions| {
                let (gone, kept): (Vec<_>, Vec<_>) = actions
                    .drain(..)
                    .partition(|a| game_id.is_none_or(|g| a.game_id == g));
                *actions = kept;
                (!gone.is_empty()).then_some(gone)
            })
            .await?
            .unwrap_or_default();
        for action in &removed {
            remove_local_media(action).await;
        }
        tracing::info!(count = removed.len(), game_id = ?game_id, "cleared queued actions");
        Ok(removed.len())
    }

    /// Record a transient failure; returns the new retry count
    pub async fn increment_retry_count(
        &self,
        id: Uuid,
        error: impl Into<String>,
    ) -> PointfinderResult<Option<u32>> {
        let error = error.into();
        self.mutate(move |actions| {
            let action = actions.iter_mut().find(|a| a.id == id)?;
            action.retry_count += 1;
            action.last_error = Some(error);
            Some(action.retry_count)
        })
        .await
    }

    /// Persist upload progress after the server accepted a chunk or created a session
    pub async fn update_upload_progress(
        &self,
        id: Uuid,
        session_id: Uuid,
        next_chunk_index: u32,
        total_chunks: u32,
    ) -> PointfinderResult<bool> {
        let updated = self
            .mutate(move |actions| {
                let media = actions.iter_mut().find(|a| a.id == id)?.media_mut()?;
                media.upload_session_id = Some(session_id);
                media.next_chunk_index = next_chunk_index;
                media.total_chunks = Some(total_chunks);
                Some(())
            })
            .await?;
        Ok(updated.is_some())
    }

    /// Stop automatic retries until the media is re-supplied
    pub async fn mark_needs_reselect(
        &self,
        id: Uuid,
        message: impl Into<String>,
    ) -> PointfinderResult<bool> {
        let message = message.into();
        let updated = self
            .mutate(move |actions| {
                let action = actions.iter_mut().find(|a| a.id == id)?;
                action.media_mut()?.needs_reselect = true;
                action.last_error = Some(message);
                Some(())
            })
            .await?;
        Ok(updated.is_some())
    }

    /// Point a media action at a freshly selected file
    ///
    /// The previous upload session no longer matches the bytes, so the
    /// checkpoint starts over. The stale local copy is deleted.
    pub async fn reselect_media(
        &self,
        id: Uuid,
        source_path: impl Into<PathBuf>,
        total_size_bytes: Option<u64>,
    ) -> PointfinderResult<bool> {
        let source_path = source_path.into();
        let total_size_bytes = match total_size_bytes {
            Some(size) => size,
            None => fs::metadata(&source_path)
                .await
                .map_err(|e| {
                    PointfinderError::io_with_path(
                        format!("Cannot read reselected media: {}", e),
                        source_path.display().to_string(),
                    )
                })?
                .len(),
        };
        let stale_copy = self
            .mutate(move |actions| {
                let action = actions.iter_mut().find(|a| a.id == id)?;
                let media = action.media_mut()?;
                let stale = media.local_file_path.take();
                media.source_path = Some(source_path);
                media.total_size_bytes = total_size_bytes;
                media.needs_reselect = false;
                media.reset_upload();
                action.last_error = None;
                Some(stale)
            })
            .await?;
        match stale_copy {
            Some(stale) => {
                if let Some(path) = stale {
                    remove_file_quietly(&path).await;
                }
                tracing::info!(action_id = %id, "media reselected");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Apply `f` to a copy of the queue and commit it once written to disk
    ///
    /// `f` returns `None` when nothing changed; no write happens then.
    async fn mutate<R, F>(&self, f: F) -> PointfinderResult<Option<R>>
    where
        F: FnOnce(&mut Vec<PendingAction>) -> Option<R>,
    {
        let mut actions = self.actions.lock().await;
        let mut next = actions.clone();
        let Some(result) = f(&mut next) else {
            return Ok(None);
        };
        save_actions(&self.path, &next).await?;
        *actions = next;
        self.count_tx.send_replace(actions.len());
        Ok(Some(result))
    }
}

async fn load_actions(path: &Path) -> Vec<PendingAction> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read action queue");
            return Vec::new();
        }
    };
    match serde_json::from_str(&content) {
        Ok(actions) => actions,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "discarding unreadable action queue");
            Vec::new()
        }
    }
}

async fn save_actions(path: &Path, actions: &[PendingAction]) -> PointfinderResult<()> {
    let context = format!("Writing action queue to '{}'", path.display());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| PointfinderError::storage(e.to_string(), &context))?;
    }

    let content = serde_json::to_vec_pretty(actions)
        .map_err(|e| PointfinderError::storage(e.to_string(), &context))?;

    let tmp_path = path.with_extension("json.tmp");
    let write = async {
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(&content).await?;
        file.sync_all().await?;
        fs::rename(&tmp_path, path).await
    };
    write
        .await
        .map_err(|e| PointfinderError::storage(e.to_string(), context))
}

async fn remove_local_media(action: &PendingAction) {
    if let Some(path) = action.media().and_then(|m| m.local_file_path.as_ref()) {
        remove_file_quietly(path).await;
    }
}

async fn remove_file_quietly(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "deleted cached media"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to delete cached media"),
    }
}
