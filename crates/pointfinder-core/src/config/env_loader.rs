//! Environment variable overrides
//!
//! Variables use the `POINTFINDER_` prefix and override whatever the
//! configuration file set.

use super::model::ClientConfig;
use crate::error::{PointfinderError, PointfinderResult};
use std::env;

/// Apply `POINTFINDER_*` variables from the process environment
pub fn apply_env_overrides(config: &mut ClientConfig) -> PointfinderResult<()> {
    apply_overrides_from(config, |key| env::var(key).ok())
}

/// Apply overrides from an arbitrary lookup (the process environment in production)
pub fn apply_overrides_from<F>(config: &mut ClientConfig, lookup: F) -> PointfinderResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("POINTFINDER_API_BASE_URL") {
        config.api_base_url = url;
    }

    if let Some(dir) = lookup("POINTFINDER_DATA_DIR") {
        config.data_dir = Some(dir);
    }

    if let Some(value) = lookup("POINTFINDER_MAX_RETRIES") {
        config.sync.max_retries = value
            .parse()
            .map_err(|_| PointfinderError::config("Invalid POINTFINDER_MAX_RETRIES value"))?;
    }

    if let Some(value) = lookup("POINTFINDER_CHUNK_SIZE_BYTES") {
        config.upload.chunk_size_bytes = value
            .parse()
            .map_err(|_| PointfinderError::config("Invalid POINTFINDER_CHUNK_SIZE_BYTES value"))?;
    }

    if let Some(value) = lookup("POINTFINDER_REALTIME_ENABLED") {
        config.realtime.enabled = value.parse().unwrap_or(config.realtime.enabled);
    }

    if let Some(level) = lookup("POINTFINDER_LOG_LEVEL") {
        config.logging.level = level;
    }

    Ok(())
}
