//! Request and response bodies of the player API

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Body of `POST /api/player/games/{game}/submissions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSubmissionRequest {
    pub base_id: Uuid,
    pub challenge_id: Uuid,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<Uuid>,
}

/// Body of `POST /api/player/games/{game}/uploads/sessions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSessionInitRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_file_name: Option<String>,
    pub content_type: String,
    pub total_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_size_bytes: Option<u64>,
}

/// Acknowledgement of a check-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInReceipt {
    pub check_in_id: Uuid,
    pub base_id: Uuid,
    #[serde(default)]
    pub base_name: Option<String>,
    #[serde(default)]
    pub checked_in_at: Option<String>,
}

/// Acknowledgement of a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub id: Uuid,
    pub challenge_id: Uuid,
    pub base_id: Uuid,
    pub status: String,
    #[serde(default)]
    pub file_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_request_omits_absent_fields() {
        let request = PlayerSubmissionRequest {
            base_id: Uuid::nil(),
            challenge_id: Uuid::nil(),
            answer: "blue".into(),
            file_url: None,
            idempotency_key: Some(Uuid::nil()),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("fileUrl").is_none());
        assert_eq!(json["idempotencyKey"], Uuid::nil().to_string());
        assert_eq!(json["baseId"], Uuid::nil().to_string());
    }

    #[test]
    fn test_receipt_ignores_extra_fields() {
        let receipt: CheckInReceipt = serde_json::from_value(serde_json::json!({
            "checkInId": Uuid::nil(),
            "baseId": Uuid::nil(),
            "baseName": "Old Mill",
            "checkedInAt": "2026-05-01T10:00:00Z",
            "challenge": {"id": Uuid::nil(), "title": "Count the windows"}
        }))
        .unwrap();
        assert_eq!(receipt.base_name.as_deref(), Some("Old Mill"));
    }
}
