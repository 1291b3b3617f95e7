//! Realtime client tests against a scripted connector

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::config::RealtimeConfig;
    use crate::error::{PointfinderError, PointfinderResult};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::Instant;
    use uuid::Uuid;

    enum Step {
        Accept,
        Refuse,
        Hang,
    }

    enum Inbound {
        Text(String),
        Fail,
    }

    #[derive(Default)]
    struct MockConnector {
        script: Mutex<VecDeque<Step>>,
        attempts: AtomicUsize,
        sessions: Mutex<Vec<DesiredSession>>,
        links: Mutex<Vec<mpsc::UnboundedSender<Inbound>>>,
        ping_fails: Arc<AtomicBool>,
    }

    impl MockConnector {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn script(&self, steps: impl IntoIterator<Item = Step>) {
            self.script.lock().extend(steps);
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }

        /// Push a payload to the newest connection
        fn push(&self, inbound: Inbound) {
            let links = self.links.lock();
            let _ = links.last().map(|link| link.send(inbound));
        }

        /// Close every open connection from the server side
        fn hang_up(&self) {
            self.links.lock().clear();
        }
    }

    #[async_trait]
    impl RealtimeConnector for MockConnector {
        async fn connect(&self, session: &DesiredSession) -> PointfinderResult<Box<dyn RealtimeConnection>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            self.sessions.lock().push(session.clone());
            let step = self.script.lock().pop_front().unwrap_or(Step::Accept);
            match step {
                Step::Accept => {
                    let (tx, rx) = mpsc::unbounded_channel();
                    self.links.lock().push(tx);
                    Ok(Box::new(MockConnection {
                        inbound: rx,
                        ping_fails: self.ping_fails.clone(),
                    }))
                }
                Step::Refuse => Err(PointfinderError::transport("connection refused")),
                Step::Hang => std::future::pending().await,
            }
        }
    }

    struct MockConnection {
        inbound: mpsc::UnboundedReceiver<Inbound>,
        ping_fails: Arc<AtomicBool>,
    }

    #[async_trait]
    impl RealtimeConnection for MockConnection {
        async fn recv(&mut self) -> PointfinderResult<Option<String>> {
            match self.inbound.recv().await {
                Some(Inbound::Text(text)) => Ok(Some(text)),
                Some(Inbound::Fail) => Err(PointfinderError::transport("connection reset")),
                None => Ok(None),
            }
        }

        async fn ping(&mut self) -> PointfinderResult<()> {
            if self.ping_fails.load(Ordering::SeqCst) {
                Err(PointfinderError::transport("broken pipe"))
            } else {
                Ok(())
            }
        }

        async fn close(&mut self) -> PointfinderResult<()> {
            Ok(())
        }
    }

    fn client(connector: &Arc<MockConnector>) -> RealtimeReconnectClient {
        RealtimeReconnectClient::new(connector.clone(), &RealtimeConfig::default())
    }

    async fn wait_for_state(client: &RealtimeReconnectClient, expected: ConnectionState) {
        let mut rx = client.subscribe_state();
        tokio::time::timeout(Duration::from_secs(600), rx.wait_for(|s| *s == expected))
            .await
            .expect("timed out waiting for state")
            .expect("state channel closed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_reaches_connected() {
        let connector = MockConnector::new();
        let client = client(&connector);
        assert_eq!(client.state(), ConnectionState::Disconnected);

        let game = Uuid::new_v4();
        client.connect(game, "t1").await.unwrap();
        wait_for_state(&client, ConnectionState::Connected).await;

        assert_eq!(connector.attempts(), 1);
        let sessions = connector.sessions.lock().clone();
        assert_eq!(sessions, vec![DesiredSession::new(game, "t1")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_pair_while_connected_is_no_op() {
        let connector = MockConnector::new();
        let client = client(&connector);
        let game = Uuid::new_v4();

        client.connect(game, "t1").await.unwrap();
        wait_for_state(&client, ConnectionState::Connected).await;
        client.connect(game, "t1").await.unwrap();
        assert_eq!(client.state(), ConnectionState::Connected);
        assert_eq!(connector.attempts(), 1);

        client.connect(game, "t2").await.unwrap();
        wait_for_state(&client, ConnectionState::Connected).await;
        assert_eq!(connector.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_close_triggers_reconnect() {
        let connector = MockConnector::new();
        let client = client(&connector);
        client.connect(Uuid::new_v4(), "t").await.unwrap();
        wait_for_state(&client, ConnectionState::Connected).await;

        let lost_at = Instant::now();
        connector.hang_up();
        wait_for_state(&client, ConnectionState::Reconnecting(1)).await;
        wait_for_state(&client, ConnectionState::Connected).await;

        assert!(lost_at.elapsed() >= Duration::from_secs(2));
        assert!(lost_at.elapsed() < Duration::from_secs(3));
        assert_eq!(connector.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_grows_and_caps() {
        let connector = MockConnector::new();
        connector.script((0..6).map(|_| Step::Refuse));
        let client = client(&connector);

        let started = Instant::now();
        client.connect(Uuid::new_v4(), "t").await.unwrap();
        wait_for_state(&client, ConnectionState::Connected).await;

        // 2 + 4 + 8 + 16 + 30 + 30
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(90), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(91), "elapsed {:?}", elapsed);
        assert_eq!(connector.attempts(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_counter_resets_after_success() {
        let connector = MockConnector::new();
        connector.script([Step::Refuse, Step::Refuse]);
        let client = client(&connector);
        client.connect(Uuid::new_v4(), "t").await.unwrap();
        wait_for_state(&client, ConnectionState::Connected).await;

        connector.push(Inbound::Fail);
        wait_for_state(&client, ConnectionState::Reconnecting(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_cancels_pending_reconnect() {
        let connector = MockConnector::new();
        connector.script([Step::Refuse]);
        let client = client(&connector);

        client.connect(Uuid::new_v4(), "t").await.unwrap();
        wait_for_state(&client, ConnectionState::Reconnecting(1)).await;
        client.disconnect().await.unwrap();
        assert_eq!(client.state(), ConnectionState::Disconnected);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_while_connected() {
        let connector = MockConnector::new();
        let client = client(&connector);
        client.connect(Uuid::new_v4(), "t").await.unwrap();
        wait_for_state(&client, ConnectionState::Connected).await;

        client.disconnect().await.unwrap();
        assert_eq!(client.state(), ConnectionState::Disconnected);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_decoded_and_malformed_dropped() {
        let connector = MockConnector::new();
        let client = client(&connector);
        let mut events = client.subscribe();
        let game = Uuid::new_v4();
        client.connect(game, "t").await.unwrap();
        wait_for_state(&client, ConnectionState::Connected).await;

        connector.push(Inbound::Text("{not json".to_string()));
        connector.push(Inbound::Text(format!(
            r#"{{"version":1,"type":"activity","gameId":"{}","data":{{"message":"Team A checked in"}}}}"#,
            game
        )));

        let envelope = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(envelope.event_type, "activity");
        assert_eq!(envelope.game_id, Some(game));
        assert_eq!(client.state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_keepalive_reconnects() {
        let connector = MockConnector::new();
        let client = client(&connector);
        client.connect(Uuid::new_v4(), "t").await.unwrap();
        wait_for_state(&client, ConnectionState::Connected).await;

        connector.ping_fails.store(true, Ordering::SeqCst);
        let started = Instant::now();
        wait_for_state(&client, ConnectionState::Reconnecting(1)).await;
        assert!(started.elapsed() >= Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_attempt_times_out() {
        let connector = MockConnector::new();
        connector.script([Step::Hang]);
        let client = client(&connector);

        let started = Instant::now();
        client.connect(Uuid::new_v4(), "t").await.unwrap();
        assert_eq!(client.state(), ConnectionState::Connecting);
        wait_for_state(&client, ConnectionState::Reconnecting(1)).await;
        assert!(started.elapsed() >= Duration::from_secs(30));

        wait_for_state(&client, ConnectionState::Connected).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_client_stays_disconnected() {
        let connector = MockConnector::new();
        let config = RealtimeConfig {
            enabled: false,
            ..RealtimeConfig::default()
        };
        let client = RealtimeReconnectClient::new(connector.clone(), &config);

        client.connect(Uuid::new_v4(), "t").await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(!client.is_enabled());
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(connector.attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_worker() {
        let connector = MockConnector::new();
        let client = client(&connector);
        client.shutdown();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(client.connect(Uuid::new_v4(), "t").await.is_err());
        assert_eq!(connector.attempts(), 0);
    }
}
