use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::playlist;
use crate::state::AppState;

/// Playlist routes mounted at `/playlist`.
///
/// ```text
/// GET    /          -> list_playlist
/// POST   /          -> add_song
/// DELETE /          -> clear_playlist
/// DELETE /{id}      -> remove_song
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(playlist::list_playlist)
                .post(playlist::add_song)
                .delete(playlist::clear_playlist),
        )
        .route("/{id}", delete(playlist::remove_song))
}
