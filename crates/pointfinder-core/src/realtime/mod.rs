//! Reconnecting realtime event stream

mod client;
mod envelope;
mod transport;

#[cfg(test)]
mod tests;

pub use client::RealtimeReconnectClient;
pub use envelope::RealtimeEnvelope;
pub use transport::{DesiredSession, RealtimeConnection, RealtimeConnector, WebSocketConnector};

use std::fmt;

/// Realtime connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Waiting to retry; carries the 1-based attempt number
    Reconnecting(u32),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting(attempt) => write!(f, "reconnecting (attempt {})", attempt),
        }
    }
}
