use crate::media::{MediaSource, StaticMediaSource};
use crate::negotiation::NegotiationCoordinator;
use crate::signaling::{SessionManager, SignalingChannel};
use crate::transport::{PeerConnectionFactory, TransportConfig, WebRtcPeerConnectionFactory};
use std::sync::Arc;
use tandem_core::{MediaConstraints, Result, SessionId, SignalingEnvelope};
use tokio::sync::mpsc;
use tracing::{error, info};

struct SignalingInner {
    sessions: SessionManager,
    factory: Arc<dyn PeerConnectionFactory>,
    media: Arc<dyn MediaSource>,
    constraints: MediaConstraints,
}

/// Shared server state: how sessions are opened and which are live.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl SignalingService {
    pub fn new(
        factory: Arc<dyn PeerConnectionFactory>,
        media: Arc<dyn MediaSource>,
        constraints: MediaConstraints,
    ) -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                sessions: SessionManager::new(),
                factory,
                media,
                constraints,
            }),
        }
    }

    /// Service backed by the `webrtc` crate and the static track source.
    pub fn with_webrtc(config: TransportConfig, constraints: MediaConstraints) -> Self {
        Self::new(
            Arc::new(WebRtcPeerConnectionFactory::new(config)),
            Arc::new(StaticMediaSource),
            constraints,
        )
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.inner.sessions
    }

    /// Opens a session on `channel`: initializes both connections, sends the
    /// local offer and spawns the negotiation loop fed by the returned sender.
    pub async fn open_session(
        &self,
        session_id: SessionId,
        channel: Arc<dyn SignalingChannel>,
    ) -> Result<mpsc::Sender<SignalingEnvelope>> {
        let mut coordinator =
            NegotiationCoordinator::new(session_id, self.inner.factory.clone(), channel);

        if let Err(e) = self.start(&mut coordinator).await {
            error!("[{}] Session failed to start: {}", session_id, e);
            coordinator.teardown().await;
            return Err(e);
        }

        let (inbound_tx, inbound_rx) = mpsc::channel(64);
        self.inner.sessions.register(session_id, coordinator.handle());
        tokio::spawn(coordinator.run(inbound_rx));

        info!("[{}] Session open", session_id);
        Ok(inbound_tx)
    }

    pub async fn close_session(&self, session_id: &SessionId) {
        self.inner.sessions.remove(session_id).await;
    }

    async fn start(&self, coordinator: &mut NegotiationCoordinator) -> Result<()> {
        coordinator.initialize().await?;
        let tracks = self.inner.media.acquire(self.inner.constraints).await?;
        if tracks.is_empty() {
            info!(
                "[{}] No local media requested, waiting for the remote offer",
                coordinator.session_id()
            );
            return Ok(());
        }
        coordinator.start_session(tracks).await
    }
}
