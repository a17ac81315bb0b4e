use async_trait::async_trait;
use axum::extract::ws::Message;
use tandem_core::SignalingEnvelope;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Outbound half of the signaling transport. Inbound envelopes reach the
/// coordinator through the receiver handed to `NegotiationCoordinator::run`.
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    /// Sends an envelope to the remote coordinator. Delivery failures are
    /// logged by the implementation.
    async fn send(&self, envelope: SignalingEnvelope);
}

/// Writes envelopes as text frames into a WebSocket writer task.
#[derive(Clone)]
pub struct WsSignalingChannel {
    tx: mpsc::UnboundedSender<Message>,
}

impl WsSignalingChannel {
    pub fn new(tx: mpsc::UnboundedSender<Message>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl SignalingChannel for WsSignalingChannel {
    async fn send(&self, envelope: SignalingEnvelope) {
        match envelope.to_wire() {
            Ok(json) => {
                debug!("Sending {} {}", envelope.role, envelope.kind);
                if let Err(e) = self.tx.send(Message::Text(json.into())) {
                    warn!("Socket writer gone, dropping {} {}: {}", envelope.role, envelope.kind, e);
                }
            }
            Err(e) => error!("Failed to encode envelope: {}", e),
        }
    }
}
