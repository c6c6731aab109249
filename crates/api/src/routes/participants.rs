use axum::routing::get;
use axum::Router;

use crate::handlers::participants;
use crate::state::AppState;

/// Presence routes mounted at `/participants`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(participants::list_participants))
}
