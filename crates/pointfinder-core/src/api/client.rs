//! Authenticated player API over HTTP

use super::routes;
use super::transport::{ApiRequest, HttpTransport, decode};
use super::types::{
    CheckInReceipt, PlayerSubmissionRequest, SubmissionReceipt, UploadSessionInitRequest,
};
use super::SyncApi;
use crate::auth::{CredentialStore, TokenRefreshCoordinator};
use crate::config::ClientConfig;
use crate::error::PointfinderResult;
use crate::upload::UploadSession;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// [`SyncApi`] backed by [`HttpTransport`], every call wrapped in the
/// [`TokenRefreshCoordinator`]
pub struct HttpApiClient {
    transport: Arc<HttpTransport>,
    auth: Arc<TokenRefreshCoordinator>,
}

impl HttpApiClient {
    pub fn new(transport: Arc<HttpTransport>, auth: Arc<TokenRefreshCoordinator>) -> Self {
        Self { transport, auth }
    }

    /// Build transport and coordinator from configuration
    pub fn from_config(
        config: &ClientConfig,
        credentials: Arc<CredentialStore>,
    ) -> PointfinderResult<Self> {
        let transport = Arc::new(HttpTransport::new(config)?);
        let auth = Arc::new(TokenRefreshCoordinator::new(credentials, transport.clone()));
        Ok(Self::new(transport, auth))
    }

    pub fn auth(&self) -> &Arc<TokenRefreshCoordinator> {
        &self.auth
    }

    pub fn transport(&self) -> &Arc<HttpTransport> {
        &self.transport
    }

    async fn call(&self, request: ApiRequest) -> PointfinderResult<Vec<u8>> {
        let transport = &self.transport;
        let request = &request;
        self.auth
            .execute(move |token| async move { transport.send(request, Some(token.as_str())).await })
            .await
    }
}

#[async_trait]
impl SyncApi for HttpApiClient {
    async fn check_in(
        &self,
        game_id: Uuid,
        base_id: Uuid,
        idempotency_key: Uuid,
    ) -> PointfinderResult<CheckInReceipt> {
        let request =
            ApiRequest::post(routes::check_in(game_id, base_id)).with_idempotency_key(idempotency_key);
        decode(&self.call(request).await?, "check-in response")
    }

    async fn submit_answer(
        &self,
        game_id: Uuid,
        submission: &PlayerSubmissionRequest,
    ) -> PointfinderResult<SubmissionReceipt> {
        let mut request = ApiRequest::post_json(routes::submissions(game_id), submission)?;
        if let Some(key) = submission.idempotency_key {
            request = request.with_idempotency_key(key);
        }
        decode(&self.call(request).await?, "submission response")
    }

    async fn create_upload_session(
        &self,
        game_id: Uuid,
        init: &UploadSessionInitRequest,
    ) -> PointfinderResult<UploadSession> {
        let request = ApiRequest::post_json(routes::upload_sessions(game_id), init)?;
        decode(&self.call(request).await?, "upload session")
    }

    async fn get_upload_session(
        &self,
        game_id: Uuid,
        session_id: Uuid,
    ) -> PointfinderResult<UploadSession> {
        let request = ApiRequest::get(routes::upload_session(game_id, session_id));
        decode(&self.call(request).await?, "upload session")
    }

    async fn upload_chunk(
        &self,
        game_id: Uuid,
        session_id: Uuid,
        chunk_index: u32,
        bytes: Vec<u8>,
    ) -> PointfinderResult<UploadSession> {
        let request =
            ApiRequest::put_octets(routes::upload_chunk(game_id, session_id, chunk_index), bytes);
        decode(&self.call(request).await?, "upload session")
    }

    async fn complete_upload_session(
        &self,
        game_id: Uuid,
        session_id: Uuid,
    ) -> PointfinderResult<UploadSession> {
        let request = ApiRequest::post(routes::complete_upload(game_id, session_id));
        decode(&self.call(request).await?, "upload session")
    }

    async fn cancel_upload_session(&self, game_id: Uuid, session_id: Uuid) -> PointfinderResult<()> {
        let request = ApiRequest::delete(routes::upload_session(game_id, session_id));
        self.call(request).await.map(|_| ())
    }
}
