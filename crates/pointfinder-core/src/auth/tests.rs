//! Tests for token refresh coordination

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::error::{PointfinderError, PointfinderResult};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn unauthorized() -> PointfinderError {
        PointfinderError::http_status(401, "Unauthorized", None)
    }

    fn coordinator_with(
        refresher: impl TokenRefresher + 'static,
        credentials: Credentials,
    ) -> TokenRefreshCoordinator {
        TokenRefreshCoordinator::new(
            Arc::new(CredentialStore::new(credentials)),
            Arc::new(refresher),
        )
    }

    fn tokens(access: &str, refresh: &str) -> RefreshedTokens {
        RefreshedTokens {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
        }
    }

    /// Accepts only the "new" token
    async fn guarded(token: String) -> PointfinderResult<String> {
        if token == "new" {
            Ok(token)
        } else {
            Err(unauthorized())
        }
    }

    /// Refresher that takes a while, so concurrent failures pile up behind it
    struct SlowRefresher {
        calls: Arc<AtomicUsize>,
        delay: Duration,
    }

    #[async_trait]
    impl TokenRefresher for SlowRefresher {
        async fn refresh(&self, _refresh_token: &str) -> PointfinderResult<RefreshedTokens> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(tokens("new", "refresh-2"))
        }
    }

    #[tokio::test]
    async fn test_successful_request_skips_refresh() {
        let mut refresher = MockTokenRefresher::new();
        refresher.expect_refresh().times(0);
        let coordinator =
            coordinator_with(refresher, Credentials::new("old", Some("refresh-1".into())));

        let result = coordinator.execute(|token| async move { Ok(token) }).await;
        assert_eq!(result.unwrap(), "old");
    }

    #[tokio::test]
    async fn test_refresh_then_retry_once() {
        let mut refresher = MockTokenRefresher::new();
        refresher
            .expect_refresh()
            .withf(|token| token == "refresh-1")
            .times(1)
            .returning(|_| Ok(tokens("new", "refresh-2")));
        let coordinator =
            coordinator_with(refresher, Credentials::new("old", Some("refresh-1".into())));
        let mut events = coordinator.subscribe();

        let result = coordinator.execute(guarded).await;

        assert_eq!(result.unwrap(), "new");
        assert_eq!(
            coordinator.credentials().refresh_token().as_deref(),
            Some("refresh-2")
        );
        assert_eq!(events.try_recv().unwrap(), AuthEvent::TokensRefreshed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_failures_share_one_refresh() {
        let calls = Arc::new(AtomicUsize::new(0));
        let coordinator = coordinator_with(
            SlowRefresher {
                calls: calls.clone(),
                delay: Duration::from_millis(200),
            },
            Credentials::new("old", Some("refresh-1".into())),
        );

        let requests = (0..8).map(|_| coordinator.execute(guarded));
        let results = futures::future::join_all(requests).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(result.unwrap(), "new");
        }
    }

    #[tokio::test]
    async fn test_late_failure_reuses_completed_refresh() {
        let mut refresher = MockTokenRefresher::new();
        refresher
            .expect_refresh()
            .times(1)
            .returning(|_| Ok(tokens("new", "refresh-2")));
        let coordinator =
            coordinator_with(refresher, Credentials::new("old", Some("refresh-1".into())));

        assert_eq!(coordinator.execute(guarded).await.unwrap(), "new");

        // A request that was issued with the old token and fails afterwards
        // picks up the refreshed token without another refresh.
        let late = coordinator.refreshed_access_token("old").await.unwrap();
        assert_eq!(late, "new");
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_failure_fails_every_waiter() {
        struct FailingRefresher;

        #[async_trait]
        impl TokenRefresher for FailingRefresher {
            async fn refresh(&self, _refresh_token: &str) -> PointfinderResult<RefreshedTokens> {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Err(PointfinderError::http_status(401, "refresh token revoked", None))
            }
        }

        let coordinator = coordinator_with(
            FailingRefresher,
            Credentials::new("old", Some("refresh-1".into())),
        );
        let mut events = coordinator.subscribe();

        let results =
            futures::future::join_all((0..4).map(|_| coordinator.execute(guarded))).await;

        for result in results {
            assert!(matches!(result, Err(PointfinderError::AuthExpired)));
        }
        assert_eq!(coordinator.credentials().refresh_token(), None);
        assert_eq!(events.try_recv().unwrap(), AuthEvent::SessionExpired);
    }

    #[tokio::test]
    async fn test_retried_request_never_refreshes_twice() {
        let mut refresher = MockTokenRefresher::new();
        refresher
            .expect_refresh()
            .times(1)
            .returning(|_| Ok(tokens("still-bad", "refresh-2")));
        let coordinator =
            coordinator_with(refresher, Credentials::new("old", Some("refresh-1".into())));
        let mut events = coordinator.subscribe();

        let result: PointfinderResult<()> =
            coordinator.execute(|_| async { Err(unauthorized()) }).await;

        assert!(matches!(result, Err(PointfinderError::AuthExpired)));
        assert_eq!(events.try_recv().unwrap(), AuthEvent::TokensRefreshed);
        assert_eq!(events.try_recv().unwrap(), AuthEvent::SessionExpired);
    }

    #[tokio::test]
    async fn test_missing_refresh_token_expires_immediately() {
        let mut refresher = MockTokenRefresher::new();
        refresher.expect_refresh().times(0);
        let coordinator = coordinator_with(refresher, Credentials::new("old", None));
        let mut events = coordinator.subscribe();

        let result = coordinator.execute(guarded).await;

        assert!(matches!(result, Err(PointfinderError::AuthExpired)));
        assert_eq!(events.try_recv().unwrap(), AuthEvent::SessionExpired);
    }

    #[tokio::test]
    async fn test_no_access_token_is_auth_expired() {
        let coordinator = coordinator_with(MockTokenRefresher::new(), Credentials::default());
        let result = coordinator.execute(guarded).await;
        assert!(matches!(result, Err(PointfinderError::AuthExpired)));
    }

    #[tokio::test]
    async fn test_other_errors_pass_through() {
        let mut refresher = MockTokenRefresher::new();
        refresher.expect_refresh().times(0);
        let coordinator =
            coordinator_with(refresher, Credentials::new("old", Some("refresh-1".into())));

        let result: PointfinderResult<()> = coordinator
            .execute(|_| async { Err(PointfinderError::http_status(409, "conflict", None)) })
            .await;
        assert_eq!(result.unwrap_err().status_code(), Some(409));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_refresh_releases_waiters() {
        let calls = Arc::new(AtomicUsize::new(0));
        let coordinator = Arc::new(coordinator_with(
            SlowRefresher {
                calls: calls.clone(),
                delay: Duration::from_secs(10),
            },
            Credentials::new("old", Some("refresh-1".into())),
        ));

        let leader = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.execute(guarded).await })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;

        let waiter = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.execute(guarded).await })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;

        leader.abort();
        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(PointfinderError::Network { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_logout_clears_credentials() {
        let coordinator = coordinator_with(
            MockTokenRefresher::new(),
            Credentials::new("old", Some("refresh-1".into())),
        );
        let mut events = coordinator.subscribe();
        coordinator.logout();
        assert_eq!(coordinator.credentials().snapshot(), Credentials::default());
        assert_eq!(events.try_recv().unwrap(), AuthEvent::LoggedOut);
    }
}
