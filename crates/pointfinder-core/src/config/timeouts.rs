//! Centralized timeout and delay defaults
//!
//! Every value here can be overridden through [`super::ClientConfig`].

use std::time::Duration;

/// Defaults for REST calls
pub mod network {
    use super::*;

    /// Default timeout for establishing a connection (10 seconds)
    pub const HTTP_CONNECT_SECS: u64 = 10;

    /// Default timeout for a request without an upload body (30 seconds)
    pub const HTTP_REQUEST_SECS: u64 = 30;

    /// Upload rate assumed when sizing chunk deadlines (8 KiB/s)
    pub const MIN_UPLOAD_BYTES_PER_SEC: u64 = 8 * 1024;

    pub fn http_connect_timeout() -> Duration {
        Duration::from_secs(HTTP_CONNECT_SECS)
    }

    pub fn http_request_timeout() -> Duration {
        Duration::from_secs(HTTP_REQUEST_SECS)
    }
}

/// Defaults for draining the action queue
pub mod sync {
    use super::*;

    /// Delay before the first retry; doubles for each further retry
    pub const BASE_BACKOFF_SECS: u64 = 2;

    /// Attempts after which an action is dropped
    pub const MAX_RETRIES: u32 = 5;

    pub fn base_backoff() -> Duration {
        Duration::from_secs(BASE_BACKOFF_SECS)
    }
}

/// Defaults for the realtime event stream
pub mod realtime {
    use super::*;

    /// Timeout for the websocket handshake (30 seconds)
    pub const CONNECT_SECS: u64 = 30;

    /// Keepalive ping interval while connected (20 seconds)
    pub const PING_INTERVAL_SECS: u64 = 20;

    /// Upper bound for the reconnect delay (30 seconds)
    pub const MAX_RECONNECT_DELAY_SECS: u64 = 30;

    pub fn connect_timeout() -> Duration {
        Duration::from_secs(CONNECT_SECS)
    }

    pub fn ping_interval() -> Duration {
        Duration::from_secs(PING_INTERVAL_SECS)
    }

    pub fn max_reconnect_delay() -> Duration {
        Duration::from_secs(MAX_RECONNECT_DELAY_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(network::http_request_timeout(), Duration::from_secs(30));
        assert_eq!(sync::base_backoff(), Duration::from_secs(2));
        assert_eq!(realtime::max_reconnect_delay(), Duration::from_secs(30));
        assert_eq!(realtime::ping_interval(), Duration::from_secs(20));
    }
}
