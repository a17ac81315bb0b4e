use crate::signaling::{SignalingService, WsSignalingChannel};
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tandem_core::{SessionId, SignalingEnvelope};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<SignalingService>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, service))
}

async fn handle_socket(socket: WebSocket, service: SignalingService) {
    let session_id = SessionId::new();
    info!("New WebSocket connection: {}", session_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let channel = Arc::new(WsSignalingChannel::new(tx));
    let inbound = match service.open_session(session_id, channel).await {
        Ok(inbound) => inbound,
        Err(e) => {
            error!("[{}] Closing socket: {}", session_id, e);
            send_task.abort();
            return;
        }
    };

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match SignalingEnvelope::from_wire(text.as_str()) {
                    Ok(envelope) => {
                        if inbound.send(envelope).await.is_err() {
                            error!("[{}] Negotiation loop died", session_id);
                            break;
                        }
                    }
                    Err(e) => warn!("[{}] Invalid envelope: {}", session_id, e),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    service.close_session(&session_id).await;
    info!("WebSocket disconnected: {}", session_id);
}
