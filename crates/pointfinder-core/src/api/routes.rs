//! REST paths

use uuid::Uuid;

pub const REFRESH: &str = "/api/auth/refresh";

pub fn check_in(game_id: Uuid, base_id: Uuid) -> String {
    format!("/api/player/games/{}/bases/{}/check-in", game_id, base_id)
}

pub fn submissions(game_id: Uuid) -> String {
    format!("/api/player/games/{}/submissions", game_id)
}

pub fn upload_sessions(game_id: Uuid) -> String {
    format!("/api/player/games/{}/uploads/sessions", game_id)
}

pub fn upload_session(game_id: Uuid, session_id: Uuid) -> String {
    format!("{}/{}", upload_sessions(game_id), session_id)
}

pub fn upload_chunk(game_id: Uuid, session_id: Uuid, chunk_index: u32) -> String {
    format!("{}/chunks/{}", upload_session(game_id, session_id), chunk_index)
}

pub fn complete_upload(game_id: Uuid, session_id: Uuid) -> String {
    format!("{}/complete", upload_session(game_id, session_id))
}
