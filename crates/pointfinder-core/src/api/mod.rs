//! Player API consumed by the sync engine

mod client;
pub mod routes;
mod transport;
mod types;

pub use client::HttpApiClient;
pub use transport::{ApiRequest, HttpTransport, IDEMPOTENCY_KEY_HEADER, RequestBody};
pub use types::{
    CheckInReceipt, PlayerSubmissionRequest, SubmissionReceipt, UploadSessionInitRequest,
};

use crate::error::PointfinderResult;
use crate::upload::UploadSession;
use async_trait::async_trait;
use uuid::Uuid;

/// Authenticated calls replayed by the sync engine
///
/// Implementations attach credentials themselves; [`HttpApiClient`] does so
/// through the token refresh coordinator.
#[async_trait]
pub trait SyncApi: Send + Sync {
    /// Check in at a base; `idempotency_key` makes replays safe
    async fn check_in(
        &self,
        game_id: Uuid,
        base_id: Uuid,
        idempotency_key: Uuid,
    ) -> PointfinderResult<CheckInReceipt>;

    async fn submit_answer(
        &self,
        game_id: Uuid,
        submission: &PlayerSubmissionRequest,
    ) -> PointfinderResult<SubmissionReceipt>;

    async fn create_upload_session(
        &self,
        game_id: Uuid,
        init: &UploadSessionInitRequest,
    ) -> PointfinderResult<UploadSession>;

    async fn get_upload_session(
        &self,
        game_id: Uuid,
        session_id: Uuid,
    ) -> PointfinderResult<UploadSession>;

    /// Upload one chunk; re-sending an accepted index is a no-op on the server
    async fn upload_chunk(
        &self,
        game_id: Uuid,
        session_id: Uuid,
        chunk_index: u32,
        bytes: Vec<u8>,
    ) -> PointfinderResult<UploadSession>;

    async fn complete_upload_session(
        &self,
        game_id: Uuid,
        session_id: Uuid,
    ) -> PointfinderResult<UploadSession>;

    async fn cancel_upload_session(&self, game_id: Uuid, session_id: Uuid) -> PointfinderResult<()>;
}
