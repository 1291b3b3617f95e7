//! Inspection helpers used by the recovery policy and the auth layer

use super::types::PointfinderError;

impl PointfinderError {
    /// Stable code for programmatic handling and log fields
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Network { .. } => "NETWORK_ERROR",
            Self::Http { .. } => "HTTP_ERROR",
            Self::AuthExpired => "AUTH_EXPIRED",
            Self::NeedsReselect { .. } => "NEEDS_RESELECT",
            Self::InvalidAction { .. } => "INVALID_ACTION",
            Self::Io { .. } => "IO_ERROR",
            Self::Json { .. } => "JSON_ERROR",
            Self::Storage { .. } => "STORAGE_ERROR",
            Self::Transport { .. } => "TRANSPORT_ERROR",
        }
    }

    /// HTTP status carried by the error, if the server answered at all
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// 401 or 403: the bearer token was refused
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status_code(), Some(401) | Some(403))
    }

    /// The request never reached the server
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}
