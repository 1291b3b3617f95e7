//! In-memory game server used by unit tests

use crate::api::{
    CheckInReceipt, PlayerSubmissionRequest, SubmissionReceipt, SyncApi, UploadSessionInitRequest,
};
use crate::config::DEFAULT_CHUNK_SIZE_BYTES;
use crate::error::{PointfinderError, PointfinderResult};
use crate::upload::{UploadSession, UploadStatus, expected_chunk_len, total_chunks};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ChunkCall {
    pub session_id: Uuid,
    pub index: u32,
    pub len: usize,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<&'static str>,
    network_down: bool,
    check_in_error: Option<PointfinderError>,
    submission_error: Option<PointfinderError>,
    lose_next_submission_response: bool,
    chunk_budget: Option<usize>,
    check_ins: HashMap<Uuid, CheckInReceipt>,
    submissions: HashMap<Uuid, SubmissionReceipt>,
    submission_requests: Vec<PlayerSubmissionRequest>,
    sessions: HashMap<Uuid, UploadSession>,
    chunk_calls: Vec<ChunkCall>,
    cancelled: Vec<Uuid>,
}

/// Server double with the real idempotency and upload-session rules
#[derive(Default)]
pub(crate) struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_network_down(&self, down: bool) {
        self.state.lock().network_down = down;
    }

    pub fn set_check_in_error(&self, error: Option<PointfinderError>) {
        self.state.lock().check_in_error = error;
    }

    pub fn set_submission_error(&self, error: Option<PointfinderError>) {
        self.state.lock().submission_error = error;
    }

    /// Record the next submission but answer with a network error
    pub fn lose_next_submission_response(&self) {
        self.state.lock().lose_next_submission_response = true;
    }

    /// Accept `budget` more chunks, then fail chunk uploads with a network error
    pub fn fail_chunk_uploads_after(&self, budget: Option<usize>) {
        self.state.lock().chunk_budget = budget;
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().calls.clone()
    }

    pub fn take_chunk_calls(&self) -> Vec<ChunkCall> {
        std::mem::take(&mut self.state.lock().chunk_calls)
    }

    pub fn check_in_records(&self) -> usize {
        self.state.lock().check_ins.len()
    }

    pub fn submission_records(&self) -> usize {
        self.state.lock().submissions.len()
    }

    pub fn submission_requests(&self) -> Vec<PlayerSubmissionRequest> {
        self.state.lock().submission_requests.clone()
    }

    pub fn session(&self, session_id: Uuid) -> Option<UploadSession> {
        self.state.lock().sessions.get(&session_id).cloned()
    }

    pub fn insert_session(&self, session: UploadSession) {
        self.state.lock().sessions.insert(session.session_id, session);
    }

    pub fn cancelled_sessions(&self) -> Vec<Uuid> {
        self.state.lock().cancelled.clone()
    }

    fn enter(&self, call: &'static str) -> PointfinderResult<parking_lot::MutexGuard<'_, FakeState>> {
        let mut state = self.state.lock();
        state.calls.push(call);
        if state.network_down {
            return Err(PointfinderError::network("The Internet connection appears to be offline"));
        }
        Ok(state)
    }
}

fn not_found(what: &str) -> PointfinderError {
    PointfinderError::http_status(404, format!("{} not found", what), None)
}

fn bad_request(message: &str) -> PointfinderError {
    PointfinderError::http_status(400, message, None)
}

#[async_trait]
impl SyncApi for FakeApi {
    async fn check_in(
        &self,
        _game_id: Uuid,
        base_id: Uuid,
        idempotency_key: Uuid,
    ) -> PointfinderResult<CheckInReceipt> {
        let mut state = self.enter("check_in")?;
        if let Some(err) = state.check_in_error.clone() {
            return Err(err);
        }
        let receipt = state
            .check_ins
            .entry(idempotency_key)
            .or_insert_with(|| CheckInReceipt {
                check_in_id: Uuid::new_v4(),
                base_id,
                base_name: None,
                checked_in_at: None,
            })
            .clone();
        Ok(receipt)
    }

    async fn submit_answer(
        &self,
        _game_id: Uuid,
        submission: &PlayerSubmissionRequest,
    ) -> PointfinderResult<SubmissionReceipt> {
        let mut state = self.enter("submit_answer")?;
        if let Some(err) = state.submission_error.clone() {
            return Err(err);
        }
        state.submission_requests.push(submission.clone());
        let key = submission.idempotency_key.unwrap_or_else(Uuid::new_v4);
        let receipt = state
            .submissions
            .entry(key)
            .or_insert_with(|| SubmissionReceipt {
                id: Uuid::new_v4(),
                challenge_id: submission.challenge_id,
                base_id: submission.base_id,
                status: "pending".to_string(),
                file_url: submission.file_url.clone(),
            })
            .clone();
        if std::mem::take(&mut state.lose_next_submission_response) {
            return Err(PointfinderError::network("connection reset"));
        }
        Ok(receipt)
    }

    async fn create_upload_session(
        &self,
        game_id: Uuid,
        init: &UploadSessionInitRequest,
    ) -> PointfinderResult<UploadSession> {
        let mut state = self.enter("create_upload_session")?;
        let chunk_size = init.chunk_size_bytes.unwrap_or(DEFAULT_CHUNK_SIZE_BYTES);
        let session = UploadSession {
            session_id: Uuid::new_v4(),
            game_id: Some(game_id),
            content_type: Some(init.content_type.clone()),
            total_size_bytes: init.total_size_bytes,
            chunk_size_bytes: chunk_size,
            total_chunks: total_chunks(init.total_size_bytes, chunk_size),
            uploaded_chunks: BTreeSet::new(),
            status: UploadStatus::Pending,
            file_url: None,
            expires_at: None,
        };
        state.sessions.insert(session.session_id, session.clone());
        Ok(session)
    }

    async fn get_upload_session(
        &self,
        _game_id: Uuid,
        session_id: Uuid,
    ) -> PointfinderResult<UploadSession> {
        let state = self.enter("get_upload_session")?;
        state
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or_else(|| not_found("Upload session"))
    }

    async fn upload_chunk(
        &self,
        _game_id: Uuid,
        session_id: Uuid,
        chunk_index: u32,
        bytes: Vec<u8>,
    ) -> PointfinderResult<UploadSession> {
        let mut state = self.enter("upload_chunk")?;
        if let Some(budget) = state.chunk_budget {
            if budget == 0 {
                return Err(PointfinderError::network("timed out"));
            }
            state.chunk_budget = Some(budget - 1);
        }
        let session = state
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| not_found("Upload session"))?;
        if !session.is_open() {
            return Err(PointfinderError::http_status(409, "Upload session is not active", None));
        }
        let expected =
            expected_chunk_len(session.total_size_bytes, session.chunk_size_bytes, chunk_index)
                .ok_or_else(|| bad_request("Chunk index out of range"))?;
        if bytes.len() as u64 != expected {
            return Err(bad_request("Chunk size mismatch"));
        }
        session.uploaded_chunks.insert(chunk_index);
        session.status = UploadStatus::Uploading;
        let updated = session.clone();
        state.chunk_calls.push(ChunkCall {
            session_id,
            index: chunk_index,
            len: bytes.len(),
        });
        Ok(updated)
    }

    async fn complete_upload_session(
        &self,
        _game_id: Uuid,
        session_id: Uuid,
    ) -> PointfinderResult<UploadSession> {
        let mut state = self.enter("complete_upload_session")?;
        let session = state
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| not_found("Upload session"))?;
        if session.status != UploadStatus::Completed {
            if !session.is_fully_uploaded() {
                return Err(bad_request("Not all chunks have been uploaded"));
            }
            session.status = UploadStatus::Completed;
            session.file_url = Some(format!("https://cdn.example.com/uploads/{}", session_id));
        }
        Ok(session.clone())
    }

    async fn cancel_upload_session(&self, _game_id: Uuid, session_id: Uuid) -> PointfinderResult<()> {
        let mut state = self.enter("cancel_upload_session")?;
        let session = state
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| not_found("Upload session"))?;
        session.status = UploadStatus::Cancelled;
        state.cancelled.push(session_id);
        Ok(())
    }
}
