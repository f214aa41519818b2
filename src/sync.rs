//! Sync WebSocket handler — the real-time change feed.
//!
//! Clients mutate only through the REST API; this socket is one-way. On
//! connect the server sends a full snapshot, then forwards every planner
//! event as tagged JSON. A client that misses events just reconnects and
//! gets a fresh snapshot.

use crate::api::{SharedState, WeekResponse};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;

/// First frame on every connection: the whole collection at one revision.
#[derive(Serialize)]
struct Snapshot {
    #[serde(rename = "type")]
    kind: &'static str,
    revision: u64,
    weeks: Vec<WeekResponse>,
}

// ── WS upgrade handler ────────────────────────────────────────

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

// ── Socket lifecycle ───────────────────────────────────────────

async fn handle_socket(socket: WebSocket, state: SharedState) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Subscribe to the broadcast BEFORE reading the snapshot, so no event
    // can fall between snapshot and subscription.
    let mut events_rx = state.events_tx.subscribe();

    let snapshot_json = {
        let planner = state.planner.read().unwrap();
        let snapshot = Snapshot {
            kind: "snapshot",
            revision: planner.revision,
            weeks: planner.weeks.iter().map(WeekResponse::from).collect(),
        };
        match serde_json::to_string(&snapshot) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "snapshot serialization failed");
                return;
            }
        }
    };

    if ws_tx.send(Message::Text(snapshot_json)).await.is_err() {
        return; // client already gone
    }
    tracing::debug!("sync client connected");

    // Forward broadcast events to this client.
    let mut send_task = tokio::spawn(async move {
        while let Ok(json) = events_rx.recv().await {
            if ws_tx.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    // Drain the inbound side; mutations come in over REST, so everything
    // except Close is ignored.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    // Unsubscribe is the teardown: whichever side finishes aborts the other.
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    tracing::debug!("sync client disconnected");
}
