//! Live capture feed over WebSocket
//!
//! Each session is one task that waits on both the client socket and its
//! subscription queue. Whichever side ends first closes the session: a read
//! error or close frame from the client, a failed write, or the queue closing
//! because the broadcaster dropped the subscriber.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use smspit_broadcaster::MessageBroadcaster;

use crate::state::AppState;

/// GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let broadcaster = Arc::clone(&state.broadcaster);
    ws.on_upgrade(move |socket| run_session(socket, broadcaster))
}

async fn run_session(mut socket: WebSocket, broadcaster: Arc<MessageBroadcaster>) {
    let mut subscription = match broadcaster.subscribe().await {
        Ok(subscription) => subscription,
        Err(e) => {
            warn!("Refusing WebSocket subscriber: {}", e);
            let _ = socket.send(WsMessage::Close(None)).await;
            return;
        }
    };
    subscription.mark_open();
    let id = subscription.id();
    info!("🔌 WebSocket client connected (subscriber {})", id);

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = subscription.recv() => match event {
                Some(payload) => {
                    if let Err(e) = sender.send(WsMessage::Text(payload.to_string())).await {
                        debug!("Write to subscriber {} failed: {}", id, e);
                        break;
                    }
                }
                None => {
                    // Dropped by the broadcaster (lagging or shutting down)
                    let _ = sender.send(WsMessage::Close(None)).await;
                    break;
                }
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Read from subscriber {} failed: {}", id, e);
                    break;
                }
            },
        }
    }

    subscription.mark_closing();
    broadcaster.close(&mut subscription).await;
    info!("🔌 WebSocket client disconnected (subscriber {})", id);
}
