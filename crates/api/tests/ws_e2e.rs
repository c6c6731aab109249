//! End-to-end tests for the WebSocket push channel.
//!
//! Binds the real router to an ephemeral port and drives it with
//! `tokio-tungstenite` clients, mixing in REST calls against the same state.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use common::{body_json, post_json, TestApp};
use futures::{SinkExt, StreamExt};
use jamlist_db::InMemoryAdapter;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn serve(app: &TestApp) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.router();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}/api/ws")).await.unwrap();
    client
}

async fn send(client: &mut Client, value: Value) {
    client.send(Message::Text(value.to_string())).await.unwrap();
}

/// Next frame that is not a ping/pong.
async fn next_frame(client: &mut Client) -> Message {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection ended")
            .unwrap();
        match frame {
            Message::Ping(_) | Message::Pong(_) => continue,
            other => return other,
        }
    }
}

async fn next_json(client: &mut Client) -> Value {
    match next_frame(client).await {
        Message::Text(text) => serde_json::from_str(&text).unwrap(),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

/// Connect and join, consuming the joiner's own initialState and
/// participantsChanged.
async fn join(addr: SocketAddr, name: &str) -> (Client, Value) {
    let mut client = connect(addr).await;
    send(&mut client, json!({ "type": "join", "displayName": name })).await;

    let initial = next_json(&mut client).await;
    assert_eq!(initial["type"], "initialState");
    let presence = next_json(&mut client).await;
    assert_eq!(presence["type"], "participantsChanged");
    (client, initial)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn join_receives_current_playlist_and_others_see_presence() {
    let app = common::build_memory_only_app();
    let addr = serve(&app).await;
    post_json(
        app.router(),
        "/api/playlist",
        json!({ "title": "Existing", "artist": "A", "addedBy": "Seed" }),
    )
    .await;

    let (mut alice, initial) = join(addr, "Alice").await;
    assert_eq!(initial["playlist"].as_array().unwrap().len(), 1);
    assert_eq!(initial["playlist"][0]["title"], "Existing");

    let (_bob, _) = join(addr, "Bob").await;

    let presence = next_json(&mut alice).await;
    assert_eq!(presence["type"], "participantsChanged");
    assert_eq!(presence["total"], 2);
    let names: Vec<_> = presence["participants"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["displayName"].as_str().unwrap().to_string())
        .collect();
    assert!(names.contains(&"Alice".to_string()));
    assert!(names.contains(&"Bob".to_string()));
}

#[tokio::test]
async fn push_add_is_broadcast_to_everyone_with_joined_name() {
    let app = common::build_memory_only_app();
    let addr = serve(&app).await;

    let (mut alice, _) = join(addr, "Alice").await;
    let (mut bob, _) = join(addr, "Bob").await;
    next_json(&mut alice).await; // Bob's arrival

    send(
        &mut alice,
        json!({ "type": "add", "title": "Live", "artist": "Band" }),
    )
    .await;

    for client in [&mut alice, &mut bob] {
        let event = next_json(client).await;
        assert_eq!(event["type"], "stateChanged");
        assert_eq!(event["action"], "add");
        assert_eq!(event["entry"]["title"], "Live");
        assert_eq!(event["entry"]["addedBy"], "Alice");
        assert!(event["entry"]["contributorId"].is_string());
        assert_eq!(event["playlist"].as_array().unwrap().len(), 1);
    }
}

#[tokio::test]
async fn rest_mutations_reach_push_subscribers() {
    let app = common::build_memory_only_app();
    let addr = serve(&app).await;
    let (mut alice, _) = join(addr, "Alice").await;

    let response = post_json(
        app.router(),
        "/api/playlist",
        json!({ "title": "Via REST", "artist": "A", "addedBy": "Carol" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = body_json(response).await["song"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let event = next_json(&mut alice).await;
    assert_eq!(event["action"], "add");
    assert_eq!(event["entry"]["id"], id.as_str());

    send(&mut alice, json!({ "type": "remove", "id": id })).await;
    let event = next_json(&mut alice).await;
    assert_eq!(event["action"], "remove");
    assert_eq!(event["playlist"].as_array().unwrap().len(), 0);

    common::delete(app.router(), "/api/playlist").await;
    let event = next_json(&mut alice).await;
    assert_eq!(event["action"], "clear");
    assert!(event.get("entry").is_none());
}

#[tokio::test]
async fn slow_store_does_not_delay_push_mutations() {
    let store = Arc::new(InMemoryAdapter::new());
    let app = common::build_app_with(store.clone(), Duration::from_secs(2));
    let addr = serve(&app).await;
    let (mut alice, _) = join(addr, "Alice").await;
    store.set_delay(Some(Duration::from_secs(3)));

    let started = Instant::now();
    send(&mut alice, json!({ "type": "add", "title": "Fast", "artist": "A" })).await;
    let added = next_json(&mut alice).await;
    assert_eq!(added["action"], "add");
    let id = added["entry"]["id"].as_str().unwrap().to_string();

    send(&mut alice, json!({ "type": "remove", "id": id })).await;
    let removed = next_json(&mut alice).await;
    assert_eq!(removed["action"], "remove");
    assert_eq!(removed["entry"]["id"], id.as_str());

    assert!(
        started.elapsed() < Duration::from_secs(1),
        "push mutations waited on the store: {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn invalid_messages_get_an_error_only_for_the_sender() {
    let app = common::build_memory_only_app();
    let addr = serve(&app).await;
    let (mut alice, _) = join(addr, "Alice").await;
    let (mut bob, _) = join(addr, "Bob").await;
    next_json(&mut alice).await; // Bob's arrival

    send(&mut bob, json!({ "type": "remove", "id": "missing" })).await;
    let error = next_json(&mut bob).await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["code"], "NOT_FOUND");

    bob.send(Message::Text("not json".to_string())).await.unwrap();
    let error = next_json(&mut bob).await;
    assert_eq!(error["code"], "BAD_REQUEST");

    send(&mut bob, json!({ "type": "add", "title": "No artist" })).await;
    let error = next_json(&mut bob).await;
    assert_eq!(error["code"], "VALIDATION_ERROR");

    // Alice saw none of it: the next thing she gets is a real mutation.
    post_json(
        app.router(),
        "/api/playlist",
        json!({ "title": "Marker", "artist": "A", "addedBy": "Carol" }),
    )
    .await;
    let event = next_json(&mut alice).await;
    assert_eq!(event["type"], "stateChanged");
    assert_eq!(event["entry"]["title"], "Marker");
}

#[tokio::test]
async fn disconnect_leaves_presence_but_keeps_entries() {
    let app = common::build_memory_only_app();
    let addr = serve(&app).await;
    let (mut alice, _) = join(addr, "Alice").await;
    let (mut bob, _) = join(addr, "Bob").await;
    next_json(&mut alice).await; // Bob's arrival

    send(
        &mut bob,
        json!({ "type": "add", "title": "Bob's", "artist": "B" }),
    )
    .await;
    next_json(&mut alice).await;
    next_json(&mut bob).await;

    bob.close(None).await.unwrap();

    let presence = next_json(&mut alice).await;
    assert_eq!(presence["type"], "participantsChanged");
    assert_eq!(presence["total"], 1);
    assert_eq!(presence["participants"][0]["displayName"], "Alice");

    assert_eq!(app.state.coordinator.snapshot().await.len(), 1);
}

#[tokio::test]
async fn shutdown_sends_close_frame() {
    let app = common::build_memory_only_app();
    let addr = serve(&app).await;
    let (mut alice, _) = join(addr, "Alice").await;

    app.bus.shutdown_all().await;

    assert!(matches!(next_frame(&mut alice).await, Message::Close(_)));
}
