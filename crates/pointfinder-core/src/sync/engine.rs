//! Sync engine

use super::{SyncCompletionHook, SyncEvent, SyncIssue, SyncIssueKind, SyncReport};
use crate::api::{PlayerSubmissionRequest, SyncApi};
use crate::config::{ClientConfig, SyncConfig};
use crate::connectivity::ConnectivityMonitor;
use crate::error::{PointfinderError, PointfinderResult};
use crate::queue::{ActionKind, PendingAction, PersistentActionStore};
use crate::recovery::{ClassificationPolicy, ErrorClass, action_retry_delay};
use crate::upload::UploadSessionClient;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const WILL_RETRY_MESSAGE: &str = "Network error, will retry";

/// What happened to one action during a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Synced,
    Retried,
    Dropped,
    Stalled,
    Skipped,
}

/// Replays queued actions in priority order with retry and backoff
///
/// A pass handles check-ins first, then text submissions, then media
/// submissions, oldest first within each kind. Each action is attempted once
/// per pass. Only one pass runs at a time.
pub struct SyncEngine {
    pub(super) store: Arc<PersistentActionStore>,
    pub(super) api: Arc<dyn SyncApi>,
    connectivity: ConnectivityMonitor,
    config: SyncConfig,
    pub(super) chunk_size: u64,
    policy: ClassificationPolicy,
    syncing: AtomicBool,
    last_issue: RwLock<Option<SyncIssue>>,
    events: broadcast::Sender<SyncEvent>,
    completion_hook: RwLock<Option<Arc<dyn SyncCompletionHook>>>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<PersistentActionStore>,
        api: Arc<dyn SyncApi>,
        connectivity: ConnectivityMonitor,
        config: &ClientConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            store,
            api,
            connectivity,
            config: config.sync.clone(),
            chunk_size: config.upload.chunk_size_bytes,
            policy: ClassificationPolicy::from_config(&config.sync),
            syncing: AtomicBool::new(false),
            last_issue: RwLock::new(None),
            events,
            completion_hook: RwLock::new(None),
        }
    }

    pub fn set_completion_hook(&self, hook: Arc<dyn SyncCompletionHook>) {
        *self.completion_hook.write() = Some(hook);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &Arc<PersistentActionStore> {
        &self.store
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    pub fn last_sync_error(&self) -> Option<SyncIssue> {
        self.last_issue.read().clone()
    }

    /// Attempt every queued action once
    ///
    /// Returns `None` without doing anything when offline or when another pass
    /// is already running.
    pub async fn sync_pending_actions(&self) -> Option<SyncReport> {
        if !self.connectivity.is_online() {
            tracing::debug!("offline, skipping sync");
            return None;
        }
        if self
            .syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("sync already in progress");
            return None;
        }
        let _guard = SyncingGuard(&self.syncing);

        *self.last_issue.write() = None;
        self.publish(SyncEvent::Started);

        let mut pending = self.store.all_pending().await;
        pending.sort_by_key(|a| a.kind.sync_priority());
        tracing::info!(count = pending.len(), "sync pass started");

        let mut report = SyncReport::default();
        for id in pending.into_iter().map(|a| a.id) {
            // Re-read: an earlier step or a discard may have changed it.
            let Some(action) = self.store.get(id).await else {
                continue;
            };
            match self.process(action).await {
                Outcome::Synced => report.synced += 1,
                Outcome::Retried => report.retried += 1,
                Outcome::Dropped => report.dropped += 1,
                Outcome::Stalled => report.stalled += 1,
                Outcome::Skipped => {}
            }
        }

        tracing::info!(
            synced = report.synced,
            retried = report.retried,
            dropped = report.dropped,
            stalled = report.stalled,
            "sync pass finished"
        );

        let hook = self.completion_hook.read().clone();
        if let Some(hook) = hook {
            hook.on_sync_complete(&report).await;
        }
        self.publish(SyncEvent::Completed(report));
        Some(report)
    }

    /// Remove an action on the player's request, cancelling its upload
    pub async fn discard_action(&self, id: Uuid) -> PointfinderResult<bool> {
        match self.store.dequeue(id).await? {
            Some(action) => {
                self.cancel_remote_upload(&action).await;
                tracing::info!(action_id = %id, "discarded action");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run a pass whenever connectivity comes back
    pub fn spawn_reconnect_listener(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        let mut rx = self.connectivity.subscribe();
        let mut was_online = *rx.borrow_and_update();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let online = *rx.borrow_and_update();
                        if online && !was_online {
                            tracing::info!("connectivity restored, draining queue");
                            engine.sync_pending_actions().await;
                        }
                        was_online = online;
                    }
                }
            }
            tracing::debug!("reconnect listener stopped");
        })
    }

    async fn process(&self, action: PendingAction) -> Outcome {
        let id = action.id;

        if action.retry_count >= self.config.max_retries {
            tracing::warn!(
                action_id = %id,
                kind = action.kind.name(),
                retry_count = action.retry_count,
                "retry budget exhausted, dropping action"
            );
            self.remove(id).await;
            self.record_issue(SyncIssue::new(
                SyncIssueKind::RetriesExhausted,
                "Gave up after repeated failures",
                id,
            ));
            self.publish(SyncEvent::ActionDropped {
                action_id: id,
                reason: "retry budget exhausted".to_string(),
            });
            return Outcome::Dropped;
        }

        if action.needs_reselect() {
            self.stall(&action, SyncIssueKind::NeedsReselect, reselect_message(&action));
            return Outcome::Stalled;
        }

        if action.retry_count > 0 {
            let delay = action_retry_delay(self.config.base_backoff, action.retry_count);
            tracing::debug!(action_id = %id, delay_ms = delay.as_millis() as u64, "backing off");
            tokio::time::sleep(delay).await;
        }

        let err = match self.replay(&action).await {
            Ok(()) => {
                self.remove(id).await;
                tracing::info!(action_id = %id, kind = action.kind.name(), "action synced");
                self.publish(SyncEvent::ActionSynced { action_id: id });
                return Outcome::Synced;
            }
            Err(err) => err,
        };

        match self.policy.classify(&err) {
            ErrorClass::Transient => {
                tracing::warn!(action_id = %id, error = %err, "transient failure, will retry");
                match self.store.increment_retry_count(id, err.to_string()).await {
                    Ok(Some(retry_count)) => self.publish(SyncEvent::ActionRetried {
                        action_id: id,
                        retry_count,
                    }),
                    Ok(None) => {}
                    Err(store_err) => {
                        tracing::warn!(action_id = %id, error = %store_err, "failed to record retry")
                    }
                }
                self.record_issue(SyncIssue::new(SyncIssueKind::WillRetry, WILL_RETRY_MESSAGE, id));
                Outcome::Retried
            }
            ErrorClass::NeedsReselect => {
                self.stall(&action, SyncIssueKind::NeedsReselect, error_message(&err));
                Outcome::Stalled
            }
            ErrorClass::AuthExpired => {
                self.stall(&action, SyncIssueKind::AuthExpired, "Session expired, sign in again");
                Outcome::Stalled
            }
            ErrorClass::Rejected => {
                tracing::warn!(
                    action_id = %id,
                    kind = action.kind.name(),
                    error = %err,
                    "server rejected action, dropping"
                );
                if let Some(removed) = self.remove(id).await {
                    if self.config.cancel_abandoned_uploads {
                        self.cancel_remote_upload(&removed).await;
                    }
                }
                self.record_issue(SyncIssue::new(SyncIssueKind::Rejected, error_message(&err), id));
                self.publish(SyncEvent::ActionDropped {
                    action_id: id,
                    reason: err.to_string(),
                });
                Outcome::Dropped
            }
        }
    }

    async fn replay(&self, action: &PendingAction) -> PointfinderResult<()> {
        match &action.kind {
            ActionKind::CheckIn => self
                .api
                .check_in(action.game_id, action.base_id, action.id)
                .await
                .map(|_| ()),
            ActionKind::TextSubmission {
                challenge_id,
                answer,
            } => {
                let submission = PlayerSubmissionRequest {
                    base_id: action.base_id,
                    challenge_id: *challenge_id,
                    answer: answer.clone(),
                    file_url: None,
                    idempotency_key: Some(action.id),
                };
                self.api
                    .submit_answer(action.game_id, &submission)
                    .await
                    .map(|_| ())
            }
            ActionKind::MediaSubmission {
                challenge_id,
                answer,
                media,
            } => self.replay_media(action, *challenge_id, answer, media).await,
        }
    }

    fn stall(&self, action: &PendingAction, kind: SyncIssueKind, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(action_id = %action.id, ?kind, %message, "action stalled");
        self.record_issue(SyncIssue::new(kind, message, action.id));
        self.publish(SyncEvent::ActionStalled {
            action_id: action.id,
            kind,
        });
    }

    async fn remove(&self, id: Uuid) -> Option<PendingAction> {
        match self.store.dequeue(id).await {
            Ok(removed) => removed,
            Err(err) => {
                tracing::warn!(action_id = %id, error = %err, "failed to remove action from queue");
                None
            }
        }
    }

    async fn cancel_remote_upload(&self, action: &PendingAction) {
        let Some(session_id) = action.media().and_then(|m| m.upload_session_id) else {
            return;
        };
        let client = UploadSessionClient::new(self.api.as_ref(), action.game_id);
        if let Err(err) = client.cancel_session(session_id).await {
            tracing::debug!(session_id = %session_id, error = %err, "could not cancel upload session");
        }
    }

    fn record_issue(&self, issue: SyncIssue) {
        *self.last_issue.write() = Some(issue);
    }

    fn publish(&self, event: SyncEvent) {
        let _ = self.events.send(event);
    }
}

struct SyncingGuard<'a>(&'a AtomicBool);

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn reselect_message(action: &PendingAction) -> String {
    action
        .last_error
        .clone()
        .unwrap_or_else(|| super::media::RESELECT_MESSAGE.to_string())
}

fn error_message(err: &PointfinderError) -> String {
    match err {
        PointfinderError::Http { message, .. }
        | PointfinderError::NeedsReselect { message, .. }
        | PointfinderError::InvalidAction { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
