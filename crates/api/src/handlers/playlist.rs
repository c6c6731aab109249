//! Handlers for the shared playlist.
//!
//! Thin translation between HTTP and [`SyncCoordinator`]: every mutation
//! goes through the same coordinator operation the WebSocket layer uses.
//!
//! [`SyncCoordinator`]: jamlist_sync::SyncCoordinator

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use jamlist_core::playlist::NewEntry;

use crate::error::AppResult;
use crate::response::{AddResponse, ClearResponse, PlaylistResponse, RemoveResponse};
use crate::state::AppState;

/// GET /api/playlist
///
/// Returns the playlist, reconciled against the durable store when one is
/// available.
pub async fn list_playlist(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let playlist = state.coordinator.playlist().await;

    Ok(Json(PlaylistResponse {
        success: true,
        total_songs: playlist.len(),
        playlist,
        persistence_enabled: state.coordinator.persistence_enabled(),
    }))
}

/// POST /api/playlist
///
/// Validate and append an entry. Responds `201 Created`; `persisted`
/// reports whether the durable store accepted the row.
pub async fn add_song(
    State(state): State<AppState>,
    payload: Result<Json<NewEntry>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    let contributor_id = input.contributor_id.clone();

    let outcome = state.coordinator.add_entry(input, contributor_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(AddResponse {
            success: true,
            song: outcome.entry,
            persisted: outcome.persisted,
        }),
    ))
}

/// DELETE /api/playlist/{id}
pub async fn remove_song(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let outcome = state.coordinator.remove_entry(&id).await?;

    Ok(Json(RemoveResponse {
        success: true,
        song: outcome.entry,
        persisted: outcome.persisted,
    }))
}

/// DELETE /api/playlist
pub async fn clear_playlist(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let outcome = state.coordinator.clear().await;

    Ok(Json(ClearResponse {
        success: true,
        persisted: outcome.persisted,
    }))
}
