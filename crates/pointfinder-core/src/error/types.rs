//! Core error types

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for Pointfinder operations
pub type PointfinderResult<T> = Result<T, PointfinderError>;

/// Main error type for the Pointfinder client
///
/// `Clone` is required because a single refresh outcome is handed to every
/// request waiting on it.
#[derive(Error, Debug, Clone)]
pub enum PointfinderError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// The request never produced an HTTP response (offline, DNS, timeout, reset)
    #[error("Network error: {message}")]
    Network {
        message: String,
        url: Option<String>,
    },

    /// The server answered with a non-success status
    #[error("HTTP {status_code}: {message}")]
    Http {
        status_code: u16,
        message: String,
        url: Option<String>,
    },

    /// No usable credentials remain; the session must log in again
    #[error("Authentication expired")]
    AuthExpired,

    /// The media backing an action is gone and must be re-supplied
    #[error("Media needs reselect: {message}")]
    NeedsReselect { action_id: Uuid, message: String },

    /// The action can never succeed as stored (bad size, bad session state)
    #[error("Invalid action: {message}")]
    InvalidAction {
        message: String,
        action_id: Option<Uuid>,
    },

    /// Filesystem errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
    },

    /// JSON encoding or decoding errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        context: Option<String>,
    },

    /// The durable queue could not be read or written
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        context: Option<String>,
    },

    /// Realtime transport errors
    #[error("Transport error: {message}")]
    Transport { message: String },
}
