//! Client context
//!
//! The one object an app builds at startup. It owns the queue, the sync
//! engine, the token coordinator, the realtime client and the connectivity
//! signal, and wires them together.

use crate::api::{HttpApiClient, HttpTransport, SyncApi};
use crate::auth::{AuthEvent, CredentialStore, Credentials, TokenRefreshCoordinator, TokenRefresher};
use crate::config::ClientConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::error::{PointfinderError, PointfinderResult};
use crate::queue::{MediaCheckpoint, PendingAction, PersistentActionStore};
use crate::realtime::{
    ConnectionState, RealtimeConnector, RealtimeEnvelope, RealtimeReconnectClient, WebSocketConnector,
};
use crate::sync::{SyncCompletionHook, SyncEngine, SyncEvent, SyncIssue, SyncReport};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const MEDIA_DIR: &str = "media";

/// Point-in-time view of the client state
#[derive(Debug, Clone, PartialEq)]
pub struct ClientStatus {
    pub online: bool,
    pub pending_count: usize,
    pub is_syncing: bool,
    pub last_sync_error: Option<SyncIssue>,
    pub connection_state: ConnectionState,
}

/// Builder for [`ClientContext`]
///
/// Every collaborator can be replaced; the defaults talk to the configured
/// server over HTTP and websockets.
pub struct ClientContextBuilder {
    config: ClientConfig,
    credentials: Option<Arc<CredentialStore>>,
    api: Option<Arc<dyn SyncApi>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    connector: Option<Arc<dyn RealtimeConnector>>,
    connectivity: Option<ConnectivityMonitor>,
}

impl ClientContextBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            credentials: None,
            api: None,
            refresher: None,
            connector: None,
            connectivity: None,
        }
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(Arc::new(CredentialStore::new(credentials)));
        self
    }

    pub fn credential_store(mut self, store: Arc<CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    pub fn api(mut self, api: Arc<dyn SyncApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn connector(mut self, connector: Arc<dyn RealtimeConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn connectivity(mut self, connectivity: ConnectivityMonitor) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    /// Open the queue, start the background tasks and return the context
    pub async fn build(self) -> PointfinderResult<ClientContext> {
        let config = self.config;
        config.validate()?;

        let data_dir = config.data_dir()?;
        let store = Arc::new(PersistentActionStore::open(config.queue_path()?).await?);
        let credentials = self.credentials.unwrap_or_default();
        let connectivity = self.connectivity.unwrap_or_default();

        let mut transport = None;
        let refresher: Arc<dyn TokenRefresher> = match self.refresher {
            Some(refresher) => refresher,
            None => shared_transport(&config, &mut transport)?,
        };
        let auth = Arc::new(TokenRefreshCoordinator::new(credentials, refresher));
        let api: Arc<dyn SyncApi> = match self.api {
            Some(api) => api,
            None => Arc::new(HttpApiClient::new(
                shared_transport(&config, &mut transport)?,
                auth.clone(),
            )),
        };
        let connector: Arc<dyn RealtimeConnector> = match self.connector {
            Some(connector) => connector,
            None => Arc::new(WebSocketConnector::from_config(&config)?),
        };

        let shutdown = CancellationToken::new();
        let realtime = Arc::new(RealtimeReconnectClient::with_shutdown(
            connector,
            &config.realtime,
            shutdown.child_token(),
        ));
        let sync = Arc::new(SyncEngine::new(
            store.clone(),
            api,
            connectivity.clone(),
            &config,
        ));

        let tasks = vec![
            sync.spawn_reconnect_listener(shutdown.child_token()),
            spawn_auth_listener(&auth, realtime.clone(), shutdown.child_token()),
        ];

        tracing::info!(
            api_base_url = %config.api_base_url,
            data_dir = %data_dir.display(),
            pending = store.pending_count().await,
            "client context started"
        );

        Ok(ClientContext {
            config,
            media_dir: data_dir.join(MEDIA_DIR),
            store,
            auth,
            sync,
            realtime,
            connectivity,
            shutdown,
            tasks: Mutex::new(tasks),
        })
    }
}

/// Owns one instance of every component
pub struct ClientContext {
    config: ClientConfig,
    media_dir: PathBuf,
    store: Arc<PersistentActionStore>,
    auth: Arc<TokenRefreshCoordinator>,
    sync: Arc<SyncEngine>,
    realtime: Arc<RealtimeReconnectClient>,
    connectivity: ConnectivityMonitor,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ClientContext {
    pub fn builder(config: ClientConfig) -> ClientContextBuilder {
        ClientContextBuilder::new(config)
    }

    /// Start with the default HTTP and websocket collaborators
    pub async fn start(config: ClientConfig, credentials: Credentials) -> PointfinderResult<Self> {
        Self::builder(config).credentials(credentials).build().await
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<PersistentActionStore> {
        &self.store
    }

    pub fn sync_engine(&self) -> &Arc<SyncEngine> {
        &self.sync
    }

    pub fn auth(&self) -> &Arc<TokenRefreshCoordinator> {
        &self.auth
    }

    pub fn realtime(&self) -> &Arc<RealtimeReconnectClient> {
        &self.realtime
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    pub async fn status(&self) -> ClientStatus {
        ClientStatus {
            online: self.connectivity.is_online(),
            pending_count: self.store.pending_count().await,
            is_syncing: self.sync.is_syncing(),
            last_sync_error: self.sync.last_sync_error(),
            connection_state: self.realtime.state(),
        }
    }

    pub async fn pending_count(&self) -> usize {
        self.store.pending_count().await
    }

    pub fn subscribe_pending_count(&self) -> watch::Receiver<usize> {
        self.store.subscribe_count()
    }

    pub fn is_syncing(&self) -> bool {
        self.sync.is_syncing()
    }

    pub fn last_sync_error(&self) -> Option<SyncIssue> {
        self.sync.last_sync_error()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.realtime.state()
    }

    pub fn subscribe_connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.realtime.subscribe_state()
    }

    pub fn realtime_events(&self) -> broadcast::Receiver<RealtimeEnvelope> {
        self.realtime.subscribe()
    }

    pub fn sync_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.sync.subscribe()
    }

    pub fn auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth.subscribe()
    }

    pub fn set_completion_hook(&self, hook: Arc<dyn SyncCompletionHook>) {
        self.sync.set_completion_hook(hook);
    }

    /// Feed the platform's reachability signal
    pub fn set_online(&self, online: bool) -> bool {
        self.connectivity.set_online(online)
    }

    /// Run one sync pass now
    pub async fn sync_pending_actions(&self) -> Option<SyncReport> {
        self.sync.sync_pending_actions().await
    }

    /// Start a sync pass in the background
    pub fn request_sync(&self) {
        let sync = Arc::clone(&self.sync);
        let handle = tokio::spawn(async move {
            sync.sync_pending_actions().await;
        });
        let mut tasks = self.tasks.lock();
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    /// Queue a check-in; `None` when one is already pending for this base
    pub async fn queue_check_in(&self, game_id: Uuid, base_id: Uuid) -> PointfinderResult<Option<Uuid>> {
        if self.store.has_pending_check_in(game_id, base_id).await {
            tracing::info!(%game_id, %base_id, "check-in already queued");
            return Ok(None);
        }
        self.store.enqueue_check_in(game_id, base_id).await.map(Some)
    }

    /// Queue a text answer; `None` when this challenge already has one pending
    pub async fn queue_submission(
        &self,
        game_id: Uuid,
        base_id: Uuid,
        challenge_id: Uuid,
        answer: impl Into<String>,
    ) -> PointfinderResult<Option<Uuid>> {
        if self.store.has_pending_submission(base_id, challenge_id).await {
            tracing::info!(%base_id, %challenge_id, "submission already queued");
            return Ok(None);
        }
        self.store
            .enqueue_submission(game_id, base_id, challenge_id, answer)
            .await
            .map(Some)
    }

    /// Queue a media answer
    ///
    /// The file is copied into the data directory so the upload survives the
    /// original being removed. If the copy fails the original path is used.
    pub async fn queue_media_submission(
        &self,
        game_id: Uuid,
        base_id: Uuid,
        challenge_id: Uuid,
        answer: impl Into<String>,
        source: &Path,
        content_type: Option<&str>,
    ) -> PointfinderResult<Option<Uuid>> {
        if self.store.has_pending_submission(base_id, challenge_id).await {
            tracing::info!(%base_id, %challenge_id, "submission already queued");
            return Ok(None);
        }

        let total_size_bytes = tokio::fs::metadata(source)
            .await
            .map_err(|e| {
                PointfinderError::io_with_path(
                    format!("Cannot read media: {}", e),
                    source.display().to_string(),
                )
            })?
            .len();
        if total_size_bytes == 0 {
            return Err(PointfinderError::invalid_action("Media file is empty"));
        }

        let content_type = content_type
            .map(str::to_string)
            .unwrap_or_else(|| guess_content_type(source));
        let mut media = MediaCheckpoint::new(content_type, total_size_bytes).with_source_path(source);
        if let Some(name) = source.file_name().and_then(|n| n.to_str()) {
            media = media.with_file_name(name);
        }

        let mut action = PendingAction::media_submission(game_id, base_id, challenge_id, answer, media);
        let copy = self.copy_media(action.id, source).await;
        if let (Some(copy), Some(media)) = (&copy, action.media_mut()) {
            media.local_file_path = Some(copy.clone());
        }
        match self.store.enqueue(action).await {
            Ok(id) => Ok(Some(id)),
            Err(err) => {
                if let Some(copy) = copy {
                    if let Err(e) = tokio::fs::remove_file(&copy).await {
                        tracing::warn!(path = %copy.display(), error = %e, "could not remove media copy");
                    }
                }
                Err(err)
            }
        }
    }

    /// Point a stalled media action at a new file
    pub async fn reselect_media(&self, action_id: Uuid, source: &Path) -> PointfinderResult<bool> {
        self.store.reselect_media(action_id, source, None).await
    }

    /// Drop an action on the player's request
    pub async fn discard_action(&self, action_id: Uuid) -> PointfinderResult<bool> {
        self.sync.discard_action(action_id).await
    }

    /// Remove queued actions for one game, or all of them
    pub async fn clear_queue(&self, game_id: Option<Uuid>) -> PointfinderResult<usize> {
        self.store.clear(game_id).await
    }

    /// Subscribe to realtime events for `game_id` with the current access token
    pub async fn connect_realtime(&self, game_id: Uuid) -> PointfinderResult<()> {
        let token = self
            .auth
            .credentials()
            .access_token()
            .ok_or(PointfinderError::AuthExpired)?;
        self.realtime.connect(game_id, token).await
    }

    pub async fn disconnect_realtime(&self) -> PointfinderResult<()> {
        self.realtime.disconnect().await
    }

    /// Sign out: forget tokens and close the realtime stream
    ///
    /// Queued actions stay on disk and sync after the next login.
    pub async fn logout(&self) -> PointfinderResult<()> {
        self.auth.logout();
        self.realtime.disconnect().await
    }

    /// Stop background tasks and wait for them
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "background task failed");
            }
        }
        tracing::info!("client context stopped");
    }

    async fn copy_media(&self, action_id: Uuid, source: &Path) -> Option<PathBuf> {
        let mut target = self.media_dir.join(action_id.to_string());
        if let Some(ext) = source.extension() {
            target.set_extension(ext);
        }
        let copied = match tokio::fs::create_dir_all(&self.media_dir).await {
            Ok(()) => tokio::fs::copy(source, &target).await,
            Err(e) => Err(e),
        };
        match copied {
            Ok(_) => Some(target),
            Err(e) => {
                tracing::warn!(
                    source = %source.display(),
                    error = %e,
                    "could not copy media into the data directory, using the original"
                );
                None
            }
        }
    }
}

impl Drop for ClientContext {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// One HTTP transport shared by the refresher and the API client
fn shared_transport(
    config: &ClientConfig,
    slot: &mut Option<Arc<HttpTransport>>,
) -> PointfinderResult<Arc<HttpTransport>> {
    if let Some(transport) = slot {
        return Ok(transport.clone());
    }
    let transport = Arc::new(HttpTransport::new(config)?);
    *slot = Some(transport.clone());
    Ok(transport)
}

/// Close the realtime stream once the session is gone
fn spawn_auth_listener(
    auth: &TokenRefreshCoordinator,
    realtime: Arc<RealtimeReconnectClient>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let mut events = auth.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Ok(AuthEvent::SessionExpired) | Ok(AuthEvent::LoggedOut) => {
                        if let Err(e) = realtime.disconnect().await {
                            tracing::debug!(error = %e, "realtime already stopped");
                        }
                    }
                    Ok(AuthEvent::TokensRefreshed) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "auth listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    })
}

fn guess_content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type(Path::new("/tmp/a.JPG")), "image/jpeg");
        assert_eq!(guess_content_type(Path::new("clip.mov")), "video/quicktime");
        assert_eq!(guess_content_type(Path::new("/tmp/IMG_0001.heif")), "image/heif");
        assert_eq!(guess_content_type(Path::new("photo.HEIC")), "image/heic");
        assert_eq!(guess_content_type(Path::new("noext")), "application/octet-stream");
    }
}
