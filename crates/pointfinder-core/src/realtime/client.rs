//! Realtime reconnect client
//!
//! All connection state lives in one worker task. The public handle only
//! sends commands to it and reads the published state, so transitions are
//! strictly sequential.

use super::ConnectionState;
use super::envelope::RealtimeEnvelope;
use super::transport::{DesiredSession, RealtimeConnection, RealtimeConnector};
use crate::config::RealtimeConfig;
use crate::error::{PointfinderError, PointfinderResult};
use crate::recovery::reconnect_delay;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

type ConnectFuture = BoxFuture<'static, PointfinderResult<Box<dyn RealtimeConnection>>>;

enum Command {
    Connect {
        session: DesiredSession,
        ack: oneshot::Sender<()>,
    },
    Disconnect {
        ack: oneshot::Sender<()>,
    },
}

/// Keeps one event subscription alive per (game, token) pair
pub struct RealtimeReconnectClient {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<ConnectionState>,
    events: broadcast::Sender<RealtimeEnvelope>,
    enabled: bool,
    shutdown: CancellationToken,
}

impl RealtimeReconnectClient {
    /// Spawn the worker task; must be called inside a tokio runtime
    pub fn new(connector: Arc<dyn RealtimeConnector>, config: &RealtimeConfig) -> Self {
        Self::with_shutdown(connector, config, CancellationToken::new())
    }

    pub fn with_shutdown(
        connector: Arc<dyn RealtimeConnector>,
        config: &RealtimeConfig,
        shutdown: CancellationToken,
    ) -> Self {
        let (commands, command_rx) = mpsc::channel(16);
        let (state_tx, state) = watch::channel(ConnectionState::Disconnected);
        let (events, _) = broadcast::channel(config.event_buffer.max(1));

        let worker = Worker {
            connector,
            commands: command_rx,
            state: state_tx,
            events: events.clone(),
            shutdown: shutdown.clone(),
            connect_timeout: config.connect_timeout,
            max_reconnect_delay: config.max_reconnect_delay,
            ping: keepalive(config.ping_interval),
            ping_interval: config.ping_interval,
            desired: None,
            attempt: 0,
            pending: None,
            connection: None,
            reconnect_at: None,
        };
        tokio::spawn(worker.run());

        Self {
            commands,
            state,
            events,
            enabled: config.enabled,
            shutdown,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Decoded events; malformed payloads never reach subscribers
    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEnvelope> {
        self.events.subscribe()
    }

    /// Maintain a subscription for `game_id` with `token`
    ///
    /// A no-op when already connected with the same pair. Resolves once the
    /// worker has started the attempt, not when the socket is open.
    pub async fn connect(&self, game_id: Uuid, token: impl Into<String>) -> PointfinderResult<()> {
        if !self.enabled {
            tracing::debug!("realtime disabled, ignoring connect");
            return Ok(());
        }
        let (ack, done) = oneshot::channel();
        self.send(Command::Connect {
            session: DesiredSession::new(game_id, token),
            ack,
        })
        .await?;
        done.await.map_err(|_| stopped())
    }

    /// Drop the desired session, close the socket and cancel pending retries
    pub async fn disconnect(&self) -> PointfinderResult<()> {
        let (ack, done) = oneshot::channel();
        self.send(Command::Disconnect { ack }).await?;
        done.await.map_err(|_| stopped())
    }

    /// Stop the worker task
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    async fn send(&self, command: Command) -> PointfinderResult<()> {
        self.commands.send(command).await.map_err(|_| stopped())
    }
}

fn stopped() -> PointfinderError {
    PointfinderError::transport("realtime client stopped")
}

fn keepalive(period: Duration) -> Interval {
    let period = period.max(Duration::from_millis(1));
    let mut ping = tokio::time::interval_at(Instant::now() + period, period);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ping
}

struct Worker {
    connector: Arc<dyn RealtimeConnector>,
    commands: mpsc::Receiver<Command>,
    state: watch::Sender<ConnectionState>,
    events: broadcast::Sender<RealtimeEnvelope>,
    shutdown: CancellationToken,
    connect_timeout: Duration,
    max_reconnect_delay: Duration,
    ping: Interval,
    ping_interval: Duration,
    desired: Option<DesiredSession>,
    attempt: u32,
    pending: Option<ConnectFuture>,
    connection: Option<Box<dyn RealtimeConnection>>,
    reconnect_at: Option<Instant>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                result = finish_connect(&mut self.pending) => self.on_connect_result(result),
                inbound = next_message(&mut self.connection) => self.on_inbound(inbound),
                _ = self.ping.tick(), if self.connection.is_some() => self.send_ping().await,
                _ = sleep_until(self.reconnect_at) => {
                    self.reconnect_at = None;
                    self.open();
                }
            }
        }
        self.drop_connection();
        self.set_state(ConnectionState::Disconnected);
        tracing::debug!("realtime worker stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Connect { session, ack } => {
                let current = *self.state.borrow();
                if self.desired.as_ref() == Some(&session) && current == ConnectionState::Connected {
                    tracing::debug!(game_id = %session.game_id, "realtime already connected");
                } else {
                    tracing::info!(game_id = %session.game_id, "realtime connect requested");
                    self.desired = Some(session);
                    self.attempt = 0;
                    self.reconnect_at = None;
                    self.drop_connection();
                    self.open();
                }
                let _ = ack.send(());
            }
            Command::Disconnect { ack } => {
                self.desired = None;
                self.attempt = 0;
                self.reconnect_at = None;
                self.drop_connection();
                self.set_state(ConnectionState::Disconnected);
                let _ = ack.send(());
            }
        }
    }

    /// Start a connection attempt for the desired session
    fn open(&mut self) {
        let Some(session) = self.desired.clone() else {
            self.set_state(ConnectionState::Disconnected);
            return;
        };
        self.set_state(ConnectionState::Connecting);

        let connector = Arc::clone(&self.connector);
        let timeout = self.connect_timeout;
        self.pending = Some(Box::pin(async move {
            match tokio::time::timeout(timeout, connector.connect(&session)).await {
                Ok(result) => result,
                Err(_) => Err(PointfinderError::transport(format!(
                    "realtime connect timed out after {:?}",
                    timeout
                ))),
            }
        }));
    }

    fn on_connect_result(&mut self, result: PointfinderResult<Box<dyn RealtimeConnection>>) {
        match result {
            Ok(connection) => {
                self.attempt = 0;
                self.connection = Some(connection);
                self.ping = keepalive(self.ping_interval);
                self.set_state(ConnectionState::Connected);
            }
            Err(err) => {
                tracing::warn!(error = %err, attempt = self.attempt, "realtime connect failed");
                self.on_connection_lost();
            }
        }
    }

    fn on_inbound(&mut self, inbound: PointfinderResult<Option<String>>) {
        match inbound {
            Ok(Some(text)) => match RealtimeEnvelope::decode(&text) {
                Ok(envelope) => {
                    tracing::debug!(event_type = %envelope.event_type, "realtime event");
                    let _ = self.events.send(envelope);
                }
                Err(err) => tracing::warn!(error = %err, "dropping malformed realtime payload"),
            },
            Ok(None) => {
                tracing::info!("realtime stream closed by server");
                self.on_connection_lost();
            }
            Err(err) => {
                tracing::warn!(error = %err, "realtime receive failed");
                self.on_connection_lost();
            }
        }
    }

    async fn send_ping(&mut self) {
        let Some(connection) = self.connection.as_mut() else {
            return;
        };
        if let Err(err) = connection.ping().await {
            tracing::warn!(error = %err, "realtime keepalive failed");
            self.on_connection_lost();
        }
    }

    fn on_connection_lost(&mut self) {
        self.connection = None;
        self.pending = None;
        if self.desired.is_none() {
            self.set_state(ConnectionState::Disconnected);
            return;
        }
        self.attempt = self.attempt.saturating_add(1);
        let delay = reconnect_delay(self.attempt, self.max_reconnect_delay);
        tracing::info!(
            attempt = self.attempt,
            delay_secs = delay.as_secs(),
            "scheduling realtime reconnect"
        );
        self.reconnect_at = Some(Instant::now() + delay);
        self.set_state(ConnectionState::Reconnecting(self.attempt));
    }

    fn drop_connection(&mut self) {
        self.pending = None;
        if let Some(mut connection) = self.connection.take() {
            tokio::spawn(async move {
                let _ = connection.close().await;
            });
        }
    }

    fn set_state(&self, next: ConnectionState) {
        let changed = self.state.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
        if changed {
            tracing::info!(state = %next, "realtime state changed");
        }
    }
}

async fn finish_connect(pending: &mut Option<ConnectFuture>) -> PointfinderResult<Box<dyn RealtimeConnection>> {
    match pending.as_mut() {
        Some(attempt) => {
            let result = attempt.await;
            *pending = None;
            result
        }
        None => std::future::pending().await,
    }
}

async fn next_message(connection: &mut Option<Box<dyn RealtimeConnection>>) -> PointfinderResult<Option<String>> {
    match connection.as_mut() {
        Some(connection) => connection.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
