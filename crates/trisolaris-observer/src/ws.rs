//! `WebSocket` session transport.
//!
//! Each connection becomes one observer of one world. Frames queued by the
//! session are written to the socket in order; text frames from the client
//! are decoded as [`ClientMessage`] and forwarded. Malformed frames are
//! dropped without closing the connection. However the connection ends,
//! the observer is detached.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};
use trisolaris_core::{ObserverSink, SessionHandle};
use trisolaris_types::{ClientMessage, ObserverId, WorldId};

use crate::state::AppState;

/// Attach to the default world.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_default(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    upgrade(ws, &state, &WorldId::default())
}

/// Attach to a named world.
///
/// # Route
///
/// `GET /ws/{world}`
pub async fn ws_world(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(world): Path<String>,
) -> impl IntoResponse {
    upgrade(ws, &state, &WorldId::new(world))
}

fn upgrade(ws: WebSocketUpgrade, state: &AppState, world: &WorldId) -> impl IntoResponse + use<> {
    let session = state.session(world);
    let buffer = state.observer_buffer;
    ws.on_upgrade(move |socket| handle_ws(socket, session, buffer))
}

async fn handle_ws(socket: WebSocket, session: SessionHandle, buffer: usize) {
    let observer = ObserverId::new();
    let (sink, mut frames) = ObserverSink::channel(buffer);
    if let Err(e) = session.attach(observer, sink).await {
        warn!(%observer, error = %e, "attach failed");
        return;
    }
    info!(%observer, world = %session.world(), "WebSocket observer connected");

    let (mut outbound, mut inbound) = socket.split();

    loop {
        tokio::select! {
            frame = frames.recv() => {
                let Some(text) = frame else {
                    debug!(%observer, "session dropped the observer");
                    break;
                };
                if outbound.send(Message::Text(text.into())).await.is_err() {
                    debug!(%observer, "WebSocket send failed");
                    break;
                }
            }
            msg = inbound.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match ClientMessage::decode(text.as_str()) {
                            Ok(message) => {
                                if session.inbound(observer, message).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => debug!(%observer, error = %e, "malformed client frame dropped"),
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if outbound.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(%observer, "WebSocket error: {e}");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    if let Err(e) = session.detach(observer).await {
        debug!(%observer, error = %e, "detach after close failed");
    }
    info!(%observer, world = %session.world(), "WebSocket observer disconnected");
}
