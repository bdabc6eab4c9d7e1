//! WebSocket endpoint for the realtime upload channel.
//!
//! Frames are JSON objects `{"event": "...", "payload": ...}` in both
//! directions. Inbound frames that don't parse are dropped; the channel
//! never answers garbage.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::realtime::{self, EventSink};
use crate::state::AppState;

/// Header naming the authenticated user, set by the fronting proxy.
pub const USER_HEADER: &str = "x-parlor-user";

#[derive(Debug, Deserialize)]
struct ClientEvent {
    event: String,
    #[serde(default)]
    payload: Option<Value>,
}

/// `GET /ws`. Upgrades to the upload event channel; requests without an
/// authenticated user are refused before the upgrade.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let owner = headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    let owner = match owner {
        Some(owner) => owner,
        None => {
            tracing::debug!("Refused channel connection without user identity");
            return (StatusCode::UNAUTHORIZED, "Missing user identity").into_response();
        }
    };

    ws.on_upgrade(move |socket| session_loop(state, owner, socket))
}

async fn session_loop(state: Arc<AppState>, owner: String, socket: WebSocket) {
    tracing::debug!(owner = %owner, "Upload channel connected");

    let (mut sender, mut receiver) = socket.split();
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // All writes go through one task so event emission never blocks the
    // read loop.
    let writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let sink = ChannelSink { outbound };

    while let Some(Ok(message)) = receiver.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(text.as_str()) {
                Ok(client_event) => {
                    realtime::dispatch(
                        &state.tokens,
                        &owner,
                        &client_event.event,
                        client_event.payload.as_ref(),
                        &sink,
                    )
                    .await;
                }
                Err(e) => tracing::trace!(error = %e, "Ignoring malformed channel frame"),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    drop(sink);
    let _ = writer.await;
    tracing::debug!(owner = %owner, "Upload channel disconnected");
}

struct ChannelSink {
    outbound: mpsc::UnboundedSender<Message>,
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &str, payload: Value) {
        let frame = serde_json::json!({ "event": event, "payload": payload });
        let _ = self.outbound.send(Message::Text(frame.to_string().into()));
    }
}
