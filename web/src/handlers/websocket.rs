//! WebSocket realtime channel.
//!
//! # Message Protocol
//!
//! **Server → Client (Event):**
//! ```json
//! { "event": "complaintUpdated", "data": { "complaintId": "...", "newStatus": "Resolved" } }
//! ```
//!
//! **Client → Server (Keep-alive):**
//! ```json
//! { "type": "ping" }
//! ```
//!
//! **Server → Client (Keep-alive reply):**
//! ```json
//! { "type": "pong" }
//! ```
//!
//! Other client frames are ignored.

use crate::realtime::RealtimeHub;
use crate::state::AppState;
use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Control frames exchanged with the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlFrame {
    /// Keep-alive request from the client
    Ping,
    /// Reply to [`ControlFrame::Ping`]
    Pong,
}

/// `GET /ws`
#[allow(clippy::unused_async)]
pub async fn handle(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    debug!("WebSocket connection requested");
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub))
}

/// Handle one connection until either side goes away.
///
/// Two tasks run concurrently:
/// 1. **Sender**: forwards hub frames and pong replies to the client
/// 2. **Receiver**: reads client frames and requests pongs
async fn handle_socket(socket: WebSocket, hub: RealtimeHub) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = hub.subscribe();
    let (pong_tx, mut pong_rx) = mpsc::channel::<ControlFrame>(8);

    info!(subscribers = hub.subscriber_count(), "WebSocket connection established");

    let mut send_task = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                event = events.recv() => match event {
                    Ok(frame) => frame.to_string(),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "WebSocket subscriber lagging, events dropped");
                        continue;
                    },
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                Some(control) = pong_rx.recv() => match serde_json::to_string(&control) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "Failed to encode control frame");
                        continue;
                    },
                },
            };

            if sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }

        debug!("WebSocket send task terminated");
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ControlFrame>(&text) {
                    Ok(ControlFrame::Ping) => {
                        if pong_tx.send(ControlFrame::Pong).await.is_err() {
                            break;
                        }
                    },
                    Ok(ControlFrame::Pong) => debug!("Received pong from client"),
                    Err(e) => debug!(error = %e, "Ignoring unrecognised client frame"),
                },
                Message::Close(_) => {
                    debug!("Client requested close");
                    break;
                },
                // Protocol pings are answered by axum.
                Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => {},
            }
        }

        debug!("WebSocket receive task terminated");
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    info!("WebSocket connection closed");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn control_frames_use_lowercase_type_tag() {
        assert_eq!(
            serde_json::from_str::<ControlFrame>(r#"{"type":"ping"}"#).unwrap(),
            ControlFrame::Ping
        );
        assert_eq!(
            serde_json::to_string(&ControlFrame::Pong).unwrap(),
            r#"{"type":"pong"}"#
        );
        assert!(serde_json::from_str::<ControlFrame>(r#"{"type":"subscribe"}"#).is_err());
    }
}
