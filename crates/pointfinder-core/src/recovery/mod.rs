//! Failure classification
//!
//! Decides what the sync engine does with an action whose replay failed.

pub mod backoff;

pub use backoff::{BackoffConfig, ExponentialBackoff, action_retry_delay, reconnect_delay};

use crate::config::SyncConfig;
use crate::error::PointfinderError;
use std::collections::HashSet;

/// How a failed replay is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Keep the action, bump its retry count, try again in a later pass
    Transient,
    /// The server refused the action for good; drop it
    Rejected,
    /// Credentials are gone; keep the action untouched until the user logs in
    AuthExpired,
    /// The media is gone; keep the action but stop retrying until reselected
    NeedsReselect,
}

/// Maps errors to an [`ErrorClass`]
///
/// Transport failures are always transient. HTTP statuses are rejections
/// unless listed in `transient_status_codes`.
#[derive(Debug, Clone, Default)]
pub struct ClassificationPolicy {
    transient_status_codes: HashSet<u16>,
}

impl ClassificationPolicy {
    pub fn new(transient_status_codes: impl IntoIterator<Item = u16>) -> Self {
        Self {
            transient_status_codes: transient_status_codes.into_iter().collect(),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.transient_status_codes.iter().copied())
    }

    pub fn classify(&self, error: &PointfinderError) -> ErrorClass {
        match error {
            PointfinderError::Network { .. } => ErrorClass::Transient,
            PointfinderError::AuthExpired => ErrorClass::AuthExpired,
            PointfinderError::NeedsReselect { .. } => ErrorClass::NeedsReselect,
            PointfinderError::Http { status_code, .. }
                if self.transient_status_codes.contains(status_code) =>
            {
                ErrorClass::Transient
            }
            _ => ErrorClass::Rejected,
        }
    }
}
