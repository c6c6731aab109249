pub mod health;
pub mod participants;
pub mod playlist;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api` route tree.
///
/// ```text
/// /ws                 WebSocket push channel
///
/// /playlist           list (GET), add (POST), clear (DELETE)
/// /playlist/{id}      remove (DELETE)
///
/// /participants       list (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/playlist", playlist::router())
        .nest("/participants", participants::router())
}
