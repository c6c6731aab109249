//! Response bodies for the REST handlers.
//!
//! Every success body carries `"success": true`; errors are rendered by
//! [`AppError`](crate::error::AppError) with `"success": false`.

use jamlist_core::playlist::Entry;
use jamlist_core::presence::Participant;
use serde::Serialize;

/// `GET /api/playlist`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistResponse {
    pub success: bool,
    pub playlist: Vec<Entry>,
    pub total_songs: usize,
    pub persistence_enabled: bool,
}

/// `POST /api/playlist`
#[derive(Debug, Serialize)]
pub struct AddResponse {
    pub success: bool,
    pub song: Entry,
    pub persisted: bool,
}

/// `DELETE /api/playlist/{id}`
#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    pub success: bool,
    pub song: Entry,
    pub persisted: bool,
}

/// `DELETE /api/playlist`
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub success: bool,
    pub persisted: bool,
}

/// `GET /api/participants`
#[derive(Debug, Serialize)]
pub struct ParticipantsResponse {
    pub success: bool,
    pub participants: Vec<Participant>,
    pub total: usize,
}
