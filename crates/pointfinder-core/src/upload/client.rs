//! Resumable chunked upload protocol

use super::session::UploadSession;
use crate::api::{SyncApi, UploadSessionInitRequest};
use crate::error::{PointfinderError, PointfinderResult};
use uuid::Uuid;

/// Upload session operations for one game, with client-side validation
///
/// Chunk lengths and completeness are checked against the last known session
/// state before anything is sent, so a malformed request never reaches the
/// server.
pub struct UploadSessionClient<'a> {
    api: &'a dyn SyncApi,
    game_id: Uuid,
}

impl<'a> UploadSessionClient<'a> {
    pub fn new(api: &'a dyn SyncApi, game_id: Uuid) -> Self {
        Self { api, game_id }
    }

    pub async fn create_session(
        &self,
        file_name: Option<String>,
        content_type: impl Into<String>,
        total_size_bytes: u64,
        chunk_size_bytes: u64,
    ) -> PointfinderResult<UploadSession> {
        if total_size_bytes == 0 {
            return Err(PointfinderError::invalid_action("Cannot upload an empty file"));
        }
        if chunk_size_bytes == 0 {
            return Err(PointfinderError::invalid_action("Chunk size must be positive"));
        }
        let init = UploadSessionInitRequest {
            original_file_name: file_name,
            content_type: content_type.into(),
            total_size_bytes,
            chunk_size_bytes: Some(chunk_size_bytes),
        };
        let session = self.api.create_upload_session(self.game_id, &init).await?;
        tracing::info!(
            session_id = %session.session_id,
            total_chunks = session.total_chunks,
            "created upload session"
        );
        Ok(session)
    }

    pub async fn get_session(&self, session_id: Uuid) -> PointfinderResult<UploadSession> {
        self.api.get_upload_session(self.game_id, session_id).await
    }

    /// Upload chunk `index` of `session`
    ///
    /// An index the server already holds is not sent again.
    pub async fn upload_chunk(
        &self,
        session: &UploadSession,
        index: u32,
        bytes: Vec<u8>,
    ) -> PointfinderResult<UploadSession> {
        let expected = session.expected_chunk_len(index).ok_or_else(|| {
            PointfinderError::invalid_action(format!(
                "Chunk index {} out of range for {} chunks",
                index, session.total_chunks
            ))
        })?;
        if bytes.len() as u64 != expected {
            return Err(PointfinderError::invalid_action(format!(
                "Chunk {} has {} bytes, expected {}",
                index,
                bytes.len(),
                expected
            )));
        }
        if session.is_chunk_uploaded(index) {
            return Ok(session.clone());
        }
        let updated = self
            .api
            .upload_chunk(self.game_id, session.session_id, index, bytes)
            .await?;
        tracing::debug!(
            session_id = %session.session_id,
            chunk = index,
            uploaded = updated.uploaded_chunks.len(),
            total = updated.total_chunks,
            "uploaded chunk"
        );
        Ok(updated)
    }

    /// Finish a session whose chunks have all been accepted
    pub async fn complete_session(&self, session: &UploadSession) -> PointfinderResult<UploadSession> {
        if session.completed_file_url().is_some() {
            return Ok(session.clone());
        }
        if !session.is_fully_uploaded() {
            return Err(PointfinderError::invalid_action(format!(
                "Not all chunks have been uploaded (missing {:?})",
                session.missing_chunks()
            )));
        }
        self.api
            .complete_upload_session(self.game_id, session.session_id)
            .await
    }

    pub async fn cancel_session(&self, session_id: Uuid) -> PointfinderResult<()> {
        self.api.cancel_upload_session(self.game_id, session_id).await?;
        tracing::info!(session_id = %session_id, "cancelled upload session");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;

    #[tokio::test]
    async fn test_create_rejects_empty_file() {
        let api = FakeApi::new();
        let client = UploadSessionClient::new(api.as_ref(), Uuid::new_v4());

        let err = client
            .create_session(None, "image/png", 0, 1024)
            .await
            .unwrap_err();

        assert!(matches!(err, PointfinderError::InvalidAction { .. }));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_chunk_length_checked_before_sending() {
        let api = FakeApi::new();
        let client = UploadSessionClient::new(api.as_ref(), Uuid::new_v4());
        let session = client
            .create_session(Some("a.png".into()), "image/png", 10, 4)
            .await
            .unwrap();
        assert_eq!(session.total_chunks, 3);

        let err = client
            .upload_chunk(&session, 2, vec![0; 4])
            .await
            .unwrap_err();
        assert!(matches!(err, PointfinderError::InvalidAction { .. }));

        let err = client
            .upload_chunk(&session, 3, vec![0; 2])
            .await
            .unwrap_err();
        assert!(matches!(err, PointfinderError::InvalidAction { .. }));

        let session = client.upload_chunk(&session, 2, vec![0; 2]).await.unwrap();
        assert!(session.is_chunk_uploaded(2));
        assert_eq!(api.take_chunk_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_uploaded_chunk_is_not_resent() {
        let api = FakeApi::new();
        let client = UploadSessionClient::new(api.as_ref(), Uuid::new_v4());
        let session = client
            .create_session(None, "video/mp4", 8, 4)
            .await
            .unwrap();
        let session = client.upload_chunk(&session, 0, vec![1; 4]).await.unwrap();
        let session = client.upload_chunk(&session, 0, vec![1; 4]).await.unwrap();

        assert_eq!(api.take_chunk_calls().len(), 1);
        assert_eq!(session.missing_chunks(), vec![1]);
    }

    #[tokio::test]
    async fn test_complete_requires_every_chunk() {
        let api = FakeApi::new();
        let client = UploadSessionClient::new(api.as_ref(), Uuid::new_v4());
        let session = client
            .create_session(None, "video/mp4", 8, 4)
            .await
            .unwrap();
        let session = client.upload_chunk(&session, 1, vec![0; 4]).await.unwrap();

        let err = client.complete_session(&session).await.unwrap_err();
        assert!(err.to_string().contains("Not all chunks have been uploaded"));
        assert!(!api.calls().contains(&"complete_upload_session"));

        let session = client.upload_chunk(&session, 0, vec![0; 4]).await.unwrap();
        let done = client.complete_session(&session).await.unwrap();
        assert_eq!(done.status, crate::upload::UploadStatus::Completed);
        assert!(done.completed_file_url().is_some());

        // Completing twice is answered locally.
        let again = client.complete_session(&done).await.unwrap();
        assert_eq!(again.file_url, done.file_url);
        assert_eq!(
            api.calls()
                .iter()
                .filter(|c| **c == "complete_upload_session")
                .count(),
            1
        );
    }
}
