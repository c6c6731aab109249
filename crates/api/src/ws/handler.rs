use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use jamlist_core::error::CoreError;
use jamlist_core::protocol::{ClientMessage, ServerMessage};
use jamlist_events::{Delivery, Subscription};
use jamlist_sync::SyncCoordinator;

use crate::error::AppError;
use crate::state::AppState;

/// HTTP handler that upgrades the connection to WebSocket.
///
/// After the upgrade the connection is subscribed to the broadcast bus and
/// managed by two tasks (sender + receiver).
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.coordinator))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Subscribes to the bus; the subscriber id is the connection id.
///   2. Spawns a sender task that turns deliveries into frames.
///   3. Dispatches inbound messages to the coordinator on the current task.
///   4. Unsubscribes and leaves presence on disconnect.
async fn handle_socket(socket: WebSocket, coordinator: Arc<SyncCoordinator>) {
    let bus = Arc::clone(coordinator.bus());
    let Subscription {
        id: conn_id,
        receiver: mut rx,
    } = bus.subscribe().await;
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(delivery) = rx.recv().await {
            let closing = matches!(delivery, Delivery::Close);
            let frame = match delivery {
                Delivery::Message(message) => match message.to_json() {
                    Ok(text) => Message::Text(text.into()),
                    Err(e) => {
                        tracing::error!(conn_id = %sender_conn_id, error = %e, "Failed to encode message");
                        continue;
                    }
                },
                Delivery::Ping => Message::Ping(Default::default()),
                Delivery::Close => Message::Close(None),
            };
            if sink.send(frame).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => dispatch(&coordinator, &conn_id, text.as_str()).await,
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    bus.unsubscribe(&conn_id).await;
    coordinator.leave(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}

/// Route one inbound text frame to the coordinator.
///
/// Anything rejected is answered with an `error` message to this
/// connection only. Mutations do not wait for the durable store, so a slow
/// backend never holds up the next frame.
async fn dispatch(coordinator: &SyncCoordinator, conn_id: &str, text: &str) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(conn_id = %conn_id, error = %e, "Unparseable client message");
            let err = AppError::BadRequest(format!("Invalid message: {e}"));
            reject(coordinator, conn_id, err).await;
            return;
        }
    };

    let result = match message {
        ClientMessage::Join { display_name } => {
            let display_name = display_name.trim();
            if display_name.is_empty() {
                Err(CoreError::Validation("displayName is required".into()))
            } else {
                coordinator.join(conn_id, display_name.to_string()).await;
                Ok(())
            }
        }
        ClientMessage::Add { mut fields } => {
            let missing_name = fields
                .added_by
                .as_deref()
                .map_or(true, |name| name.trim().is_empty());
            if missing_name {
                fields.added_by = coordinator.display_name(conn_id).await;
            }
            coordinator
                .add_entry_detached(fields, Some(conn_id.to_string()))
                .await
                .map(|_| ())
        }
        ClientMessage::Remove { id } => coordinator
            .remove_entry_detached(&id)
            .await
            .map(|_| ()),
    };

    if let Err(e) = result {
        reject(coordinator, conn_id, AppError::Core(e)).await;
    }
}

async fn reject(coordinator: &SyncCoordinator, conn_id: &str, err: AppError) {
    let (_, code, message) = err.classify();
    coordinator
        .bus()
        .send_to(
            conn_id,
            ServerMessage::Error {
                code: code.to_string(),
                message,
            },
        )
        .await;
}
