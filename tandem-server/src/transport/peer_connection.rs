use crate::transport::TransportEvent;
use async_trait::async_trait;
use std::sync::Arc;
use tandem_core::{IceCandidate, MediaTrack, Result, Role, SessionDescription};
use tokio::sync::mpsc;

/// Capabilities of one platform peer connection.
///
/// Failures come back as `SessionError`: description and offer/answer
/// problems as `Negotiation`, candidate problems as `Validation` or
/// `Negotiation`.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    async fn add_track(&self, track: MediaTrack) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Opens peer connections for a session.
///
/// `events` is the connection's only subscriber: every candidate, state and
/// track callback is forwarded there for the lifetime of the connection.
#[async_trait]
pub trait PeerConnectionFactory: Send + Sync {
    async fn create(
        &self,
        role: Role,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Arc<dyn PeerConnection>>;
}
