//! Configuration model

use super::logging_config::LoggingConfig;
use super::timeouts;
use crate::error::{PointfinderError, PointfinderResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// File name of the durable action queue inside the data directory
pub const QUEUE_FILE_NAME: &str = "pending_actions.json";

/// Default size of one upload chunk (8 MiB)
pub const DEFAULT_CHUNK_SIZE_BYTES: u64 = 8 * 1024 * 1024;

/// Top-level client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the game server, e.g. `https://pointfinder.example.com`
    pub api_base_url: String,
    /// Directory holding the queue file; platform data dir when unset
    pub data_dir: Option<String>,
    pub http: HttpConfig,
    pub sync: SyncConfig,
    pub upload: UploadConfig,
    pub realtime: RealtimeConfig,
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            data_dir: None,
            http: HttpConfig::default(),
            sync: SyncConfig::default(),
            upload: UploadConfig::default(),
            realtime: RealtimeConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// REST client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Deadline for a request without a sizeable body
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Slowest upload rate a chunk PUT is given time for, on top of
    /// `request_timeout`
    pub min_upload_bytes_per_sec: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: timeouts::network::http_connect_timeout(),
            request_timeout: timeouts::network::http_request_timeout(),
            min_upload_bytes_per_sec: timeouts::network::MIN_UPLOAD_BYTES_PER_SEC,
            user_agent: concat!("pointfinder/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Queue draining policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Actions whose retry count reaches this value are dropped
    pub max_retries: u32,
    /// Delay before the first retry; doubled per further retry
    #[serde(with = "humantime_serde")]
    pub base_backoff: Duration,
    /// HTTP statuses treated as transient instead of as a rejection
    pub transient_status_codes: Vec<u16>,
    /// Cancel the server-side upload session when a media action is abandoned
    pub cancel_abandoned_uploads: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retries: timeouts::sync::MAX_RETRIES,
            base_backoff: timeouts::sync::base_backoff(),
            transient_status_codes: Vec::new(),
            cancel_abandoned_uploads: true,
        }
    }
}

/// Chunked upload settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub chunk_size_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: DEFAULT_CHUNK_SIZE_BYTES,
        }
    }
}

/// Realtime event stream settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    pub enabled: bool,
    /// Websocket path appended to the API base URL
    pub path: String,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub ping_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub max_reconnect_delay: Duration,
    /// Capacity of the decoded-event broadcast channel
    pub event_buffer: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/ws/mobile".to_string(),
            connect_timeout: timeouts::realtime::connect_timeout(),
            ping_interval: timeouts::realtime::ping_interval(),
            max_reconnect_delay: timeouts::realtime::max_reconnect_delay(),
            event_buffer: 64,
        }
    }
}

impl ClientConfig {
    /// Create a config pointing at `api_base_url` with every other value defaulted
    pub fn for_server(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Default::default()
        }
    }

    /// Set the data directory
    pub fn with_data_dir(mut self, data_dir: impl Into<String>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    /// Resolve the data directory, expanding `~`
    pub fn data_dir(&self) -> PointfinderResult<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(PathBuf::from(shellexpand::tilde(dir).into_owned())),
            None => dirs::data_dir()
                .map(|dir| dir.join("pointfinder"))
                .ok_or_else(|| {
                    PointfinderError::config_with_context(
                        "No platform data directory available",
                        "Set data_dir in the configuration",
                    )
                }),
        }
    }

    /// Path of the durable action queue file
    pub fn queue_path(&self) -> PointfinderResult<PathBuf> {
        Ok(self.data_dir()?.join(QUEUE_FILE_NAME))
    }

    /// Check values that would otherwise fail far from where they were set
    pub fn validate(&self) -> PointfinderResult<()> {
        let base = self.api_base_url.trim();
        if base.is_empty() {
            return Err(PointfinderError::config("api_base_url must not be empty"));
        }
        let parsed = url::Url::parse(base)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PointfinderError::config_with_context(
                format!("Unsupported scheme '{}'", parsed.scheme()),
                "api_base_url must use http or https",
            ));
        }
        if self.upload.chunk_size_bytes == 0 {
            return Err(PointfinderError::config(
                "upload.chunk_size_bytes must be greater than zero",
            ));
        }
        if !self.realtime.path.starts_with('/') {
            return Err(PointfinderError::config(format!(
                "realtime.path '{}' must start with '/'",
                self.realtime.path
            )));
        }
        if self.http.min_upload_bytes_per_sec == 0 {
            return Err(PointfinderError::config(
                "http.min_upload_bytes_per_sec must be greater than zero",
            ));
        }
        if self.realtime.connect_timeout.is_zero() {
            return Err(PointfinderError::config(
                "realtime.connect_timeout must be greater than zero",
            ));
        }
        if self.realtime.ping_interval.is_zero() {
            return Err(PointfinderError::config(
                "realtime.ping_interval must be greater than zero",
            ));
        }
        if self.realtime.event_buffer == 0 {
            return Err(PointfinderError::config(
                "realtime.event_buffer must be greater than zero",
            ));
        }
        Ok(())
    }
}
