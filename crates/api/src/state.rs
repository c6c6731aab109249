use std::sync::Arc;

use jamlist_sync::SyncCoordinator;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Single entry point for every playlist and presence mutation. Also
    /// owns the broadcast bus the WebSocket layer subscribes to.
    pub coordinator: Arc<SyncCoordinator>,
}
