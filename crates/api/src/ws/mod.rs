//! WebSocket push channel.
//!
//! Provides the HTTP upgrade handler used by the `/api/ws` route and the
//! heartbeat task that keeps idle connections alive.

mod handler;
mod heartbeat;

pub use handler::ws_handler;
pub use heartbeat::{start_heartbeat, HEARTBEAT_INTERVAL};
