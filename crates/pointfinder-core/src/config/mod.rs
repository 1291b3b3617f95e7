//! Client configuration
//!
//! Loading order: file (TOML, YAML or JSON by extension), then `POINTFINDER_*`
//! environment overrides, then validation.

pub mod env_loader;
pub mod file_loader;
pub mod logging_config;
pub mod model;
pub mod timeouts;

pub use env_loader::apply_env_overrides;
pub use file_loader::load_from_file;
pub use logging_config::LoggingConfig;
pub use model::{
    ClientConfig, DEFAULT_CHUNK_SIZE_BYTES, HttpConfig, QUEUE_FILE_NAME, RealtimeConfig,
    SyncConfig, UploadConfig,
};

use crate::error::PointfinderResult;
use std::path::Path;

/// Load, override and validate the client configuration
pub fn load_config(path: Option<&Path>) -> PointfinderResult<ClientConfig> {
    let mut config = match path {
        Some(path) => load_from_file(path)?,
        None => ClientConfig::default(),
    };
    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}
