//! Server-side upload session state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Lifecycle of an upload session as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    #[serde(alias = "active")]
    Uploading,
    Completed,
    Expired,
    Cancelled,
    #[serde(other)]
    Unknown,
}

/// Resumable upload session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    pub session_id: Uuid,
    #[serde(default)]
    pub game_id: Option<Uuid>,
    #[serde(default)]
    pub content_type: Option<String>,
    pub total_size_bytes: u64,
    pub chunk_size_bytes: u64,
    pub total_chunks: u32,
    #[serde(default)]
    pub uploaded_chunks: BTreeSet<u32>,
    pub status: UploadStatus,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Number of chunks needed for `total_size` bytes
pub fn total_chunks(total_size: u64, chunk_size: u64) -> u32 {
    if chunk_size == 0 {
        return 0;
    }
    total_size.div_ceil(chunk_size) as u32
}

/// Exact byte length of chunk `index`; only the last chunk may be short
pub fn expected_chunk_len(total_size: u64, chunk_size: u64, index: u32) -> Option<u64> {
    let count = total_chunks(total_size, chunk_size);
    if index >= count {
        return None;
    }
    if index + 1 < count {
        Some(chunk_size)
    } else {
        Some(total_size - chunk_size * u64::from(count - 1))
    }
}

impl UploadSession {
    pub fn expected_chunk_len(&self, index: u32) -> Option<u64> {
        if index >= self.total_chunks {
            return None;
        }
        expected_chunk_len(self.total_size_bytes, self.chunk_size_bytes, index)
    }

    /// Byte offset of chunk `index` within the file
    pub fn chunk_offset(&self, index: u32) -> u64 {
        self.chunk_size_bytes * u64::from(index)
    }

    pub fn is_chunk_uploaded(&self, index: u32) -> bool {
        self.uploaded_chunks.contains(&index)
    }

    /// Chunk indices the server has not accepted yet, ascending
    pub fn missing_chunks(&self) -> Vec<u32> {
        (0..self.total_chunks)
            .filter(|i| !self.uploaded_chunks.contains(i))
            .collect()
    }

    pub fn is_fully_uploaded(&self) -> bool {
        (0..self.total_chunks).all(|i| self.uploaded_chunks.contains(&i))
    }

    /// Lowest index the server still needs, or `total_chunks` when none
    pub fn next_missing_chunk(&self) -> u32 {
        (0..self.total_chunks)
            .find(|i| !self.uploaded_chunks.contains(i))
            .unwrap_or(self.total_chunks)
    }

    /// File URL of a completed session, ignoring blank values
    pub fn completed_file_url(&self) -> Option<&str> {
        if self.status != UploadStatus::Completed {
            return None;
        }
        self.file_url.as_deref().filter(|url| !url.trim().is_empty())
    }

    /// Whether chunks can still be added to this session
    pub fn is_open(&self) -> bool {
        matches!(self.status, UploadStatus::Pending | UploadStatus::Uploading)
    }

    /// True when the session was created for a file of `total_size` bytes
    pub fn matches_size(&self, total_size: u64) -> bool {
        self.total_size_bytes == total_size
    }
}
