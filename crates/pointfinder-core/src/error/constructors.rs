//! Constructor methods for PointfinderError

use super::types::PointfinderError;
use uuid::Uuid;

impl PointfinderError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: None,
        }
    }

    /// Create a configuration error with context
    pub fn config_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            url: None,
        }
    }

    /// Create a network error for a specific URL
    pub fn network_with_url(message: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            url: Some(url.into()),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(
        status_code: u16,
        message: impl Into<String>,
        url: Option<String>,
    ) -> Self {
        Self::Http {
            status_code,
            message: message.into(),
            url,
        }
    }

    pub fn needs_reselect(action_id: Uuid, message: impl Into<String>) -> Self {
        Self::NeedsReselect {
            action_id,
            message: message.into(),
        }
    }

    /// Create an invalid action error
    pub fn invalid_action(message: impl Into<String>) -> Self {
        Self::InvalidAction {
            message: message.into(),
            action_id: None,
        }
    }

    /// Create an invalid action error tied to an action id
    pub fn invalid_action_for(action_id: Uuid, message: impl Into<String>) -> Self {
        Self::InvalidAction {
            message: message.into(),
            action_id: Some(action_id),
        }
    }

    /// Create a new IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            path: None,
        }
    }

    /// Create an IO error with path
    pub fn io_with_path(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    /// Create a new JSON error
    pub fn json(message: impl Into<String>) -> Self {
        Self::Json {
            message: message.into(),
            context: None,
        }
    }

    /// Create a JSON error with context
    pub fn json_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Json {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create a storage error with context
    pub fn storage(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}
