use std::sync::Arc;
use std::time::Duration;

use jamlist_core::protocol::ServerMessage;
use jamlist_events::BroadcastBus;

/// Interval between heartbeat pings.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Spawn a background task that sends periodic Ping frames to every
/// subscribed WebSocket client.
///
/// The task runs until aborted via the returned `JoinHandle` during
/// shutdown.
pub fn start_heartbeat(
    bus: Arc<BroadcastBus<ServerMessage>>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(interval);

        loop {
            interval.tick().await;
            let count = bus.subscriber_count().await;
            tracing::debug!(count, "WebSocket heartbeat ping");
            bus.ping_all().await;
        }
    })
}
