//! Realtime event envelope

use crate::error::{PointfinderError, PointfinderResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_version() -> u32 {
    1
}

/// One event pushed by the server
///
/// Unknown fields are ignored; `data` is kept as raw JSON since its shape
/// depends on `event_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeEnvelope {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub game_id: Option<Uuid>,
    #[serde(default)]
    pub emitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl RealtimeEnvelope {
    pub fn decode(text: &str) -> PointfinderResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| PointfinderError::json_with_context(e.to_string(), "Decoding realtime event"))
    }

    /// Events without a game id are broadcast to every game
    pub fn is_for_game(&self, game_id: Uuid) -> bool {
        self.game_id.is_none_or(|id| id == game_id)
    }
}
