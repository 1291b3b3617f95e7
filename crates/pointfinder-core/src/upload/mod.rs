//! Resumable chunked media upload

mod client;
mod resume;
mod session;

pub use client::UploadSessionClient;
pub use resume::{MediaSource, resume_upload};
pub use session::{UploadSession, UploadStatus, expected_chunk_len, total_chunks};
