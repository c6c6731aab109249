use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::response::ParticipantsResponse;
use crate::state::AppState;

/// GET /api/participants
///
/// Everyone currently joined on the push channel.
pub async fn list_participants(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let participants = state.coordinator.participants().await;

    Ok(Json(ParticipantsResponse {
        success: true,
        total: participants.len(),
        participants,
    }))
}
