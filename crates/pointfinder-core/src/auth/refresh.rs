//! Single-flight access token refresh

use super::credentials::{CredentialStore, Credentials};
use crate::error::{PointfinderError, PointfinderResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot};

/// Token pair returned by the refresh endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Exchanges a refresh token for a new token pair
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> PointfinderResult<RefreshedTokens>;
}

/// Session-level notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// A refresh succeeded and new tokens are stored
    TokensRefreshed,
    /// Refresh was impossible or refused; the app must return to login
    SessionExpired,
    /// The user signed out explicitly
    LoggedOut,
}

type Waiter = oneshot::Sender<PointfinderResult<String>>;

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: Vec<Waiter>,
}

/// Wraps authenticated requests and refreshes the access token on 401/403
///
/// At most one refresh runs at a time. Requests failing while it runs wait for
/// its outcome instead of starting their own, then retry exactly once.
pub struct TokenRefreshCoordinator {
    credentials: Arc<CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
    state: Mutex<RefreshState>,
    events: broadcast::Sender<AuthEvent>,
}

impl TokenRefreshCoordinator {
    pub fn new(credentials: Arc<CredentialStore>, refresher: Arc<dyn TokenRefresher>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            credentials,
            refresher,
            state: Mutex::new(RefreshState::default()),
            events,
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Forget every token and tell subscribers the user signed out
    pub fn logout(&self) {
        self.credentials.clear();
        let _ = self.events.send(AuthEvent::LoggedOut);
        tracing::info!("logged out");
    }

    /// Run `request` with the current access token
    ///
    /// On 401/403 the token is refreshed (or the running refresh is awaited)
    /// and the request is retried once. A second 401/403 reports
    /// [`PointfinderError::AuthExpired`] and expires the session.
    pub async fn execute<T, F, Fut>(&self, request: F) -> PointfinderResult<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = PointfinderResult<T>>,
    {
        let Some(token) = self.credentials.access_token() else {
            return Err(PointfinderError::AuthExpired);
        };

        match request(token.clone()).await {
            Err(err) if err.is_auth_failure() => {
                tracing::debug!(status = ?err.status_code(), "request refused, refreshing token");
            }
            other => return other,
        }

        let fresh = self.refreshed_access_token(&token).await?;
        match request(fresh).await {
            Err(err) if err.is_auth_failure() => {
                tracing::warn!(status = ?err.status_code(), "request refused after token refresh");
                self.expire_session();
                Err(PointfinderError::AuthExpired)
            }
            other => other,
        }
    }

    /// Access token to retry with after `stale` was refused
    pub(crate) async fn refreshed_access_token(&self, stale: &str) -> PointfinderResult<String> {
        let waiter = {
            let mut state = self.state.lock();
            // Another caller already refreshed since `stale` was handed out.
            if let Some(current) = self.credentials.access_token().filter(|t| t != stale) {
                return Ok(current);
            }
            if state.in_flight {
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                Some(rx)
            } else {
                state.in_flight = true;
                None
            }
        };

        if let Some(rx) = waiter {
            return rx
                .await
                .unwrap_or_else(|_| Err(PointfinderError::network("token refresh abandoned")));
        }

        let mut guard = InFlightGuard {
            coordinator: self,
            finished: false,
        };
        let result = self.perform_refresh().await;
        guard.finish(&result);
        result
    }

    async fn perform_refresh(&self) -> PointfinderResult<String> {
        let Some(refresh_token) = self.credentials.refresh_token() else {
            tracing::info!("no refresh token available, session expired");
            self.expire_session();
            return Err(PointfinderError::AuthExpired);
        };

        match self.refresher.refresh(&refresh_token).await {
            Ok(tokens) => {
                let access_token = tokens.access_token.clone();
                self.credentials.set(Credentials::new(
                    tokens.access_token,
                    Some(tokens.refresh_token),
                ));
                let _ = self.events.send(AuthEvent::TokensRefreshed);
                tracing::info!("access token refreshed");
                Ok(access_token)
            }
            Err(err) => {
                tracing::warn!(error = %err, "token refresh failed");
                self.expire_session();
                Err(PointfinderError::AuthExpired)
            }
        }
    }

    fn expire_session(&self) {
        self.credentials.clear_refresh_token();
        let _ = self.events.send(AuthEvent::SessionExpired);
    }

    fn release_waiters(&self, result: &PointfinderResult<String>) {
        let waiters = {
            let mut state = self.state.lock();
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };
        if !waiters.is_empty() {
            tracing::debug!(count = waiters.len(), "releasing requests waiting on refresh");
        }
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
    }
}

/// Releases waiters even when the refreshing caller is dropped mid-flight
struct InFlightGuard<'a> {
    coordinator: &'a TokenRefreshCoordinator,
    finished: bool,
}

impl InFlightGuard<'_> {
    fn finish(&mut self, result: &PointfinderResult<String>) {
        self.finished = true;
        self.coordinator.release_waiters(result);
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.coordinator
                .release_waiters(&Err(PointfinderError::network("token refresh cancelled")));
        }
    }
}
