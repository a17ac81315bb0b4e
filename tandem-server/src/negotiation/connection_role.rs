use crate::negotiation::SessionHandle;
use crate::transport::PeerConnection;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tandem_core::{
    ConnectionState, IceCandidate, MediaTrack, Result, Role, SdpType, SessionDescription,
    SessionError,
};

/// One of the two local peer connections and its description state.
///
/// Never buffers candidates itself; that is the coordinator's job.
pub struct ConnectionRole {
    role: Role,
    peer_connection: Arc<dyn PeerConnection>,
    session: SessionHandle,
    local_description: Option<SessionDescription>,
    remote_description: Option<SessionDescription>,
    state: ConnectionState,
    closed: AtomicBool,
}

impl ConnectionRole {
    pub(crate) fn new(
        role: Role,
        peer_connection: Arc<dyn PeerConnection>,
        session: SessionHandle,
    ) -> Self {
        Self {
            role,
            peer_connection,
            session,
            local_description: None,
            remote_description: None,
            state: ConnectionState::New,
            closed: AtomicBool::new(false),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn local_description(&self) -> Option<&SessionDescription> {
        self.local_description.as_ref()
    }

    pub fn remote_description(&self) -> Option<&SessionDescription> {
        self.remote_description.as_ref()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// False once this role was closed or its session torn down.
    pub fn is_alive(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && self.session.is_alive()
    }

    pub async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self.peer_connection.create_offer().await?;
        if offer.sdp_type != SdpType::Offer {
            return Err(self.reject(format!("expected an offer, platform produced {}", offer.sdp_type)));
        }
        Ok(offer)
    }

    pub async fn create_answer(&self) -> Result<SessionDescription> {
        if !matches!(&self.remote_description, Some(d) if d.sdp_type == SdpType::Offer) {
            return Err(self.reject("cannot answer without a remote offer"));
        }
        self.peer_connection.create_answer().await
    }

    pub async fn set_local_description(&mut self, desc: SessionDescription) -> Result<()> {
        if self.local_description.is_some() {
            return Err(self.reject("local description already set"));
        }
        match desc.sdp_type {
            SdpType::Offer if self.remote_description.is_some() => {
                return Err(self.reject("cannot offer while holding a remote description"));
            }
            SdpType::Answer | SdpType::PrAnswer if self.remote_description.is_none() => {
                return Err(self.reject("cannot answer without a remote offer"));
            }
            SdpType::Rollback => return Err(self.reject("rollback is not supported")),
            _ => {}
        }

        self.peer_connection.set_local_description(desc.clone()).await?;
        if self.is_alive() {
            self.local_description = Some(desc);
        }
        Ok(())
    }

    pub async fn set_remote_description(&mut self, desc: SessionDescription) -> Result<()> {
        if self.remote_description.is_some() {
            return Err(self.reject("remote description already set for this cycle"));
        }
        match desc.sdp_type {
            SdpType::Offer if self.local_description.is_some() => {
                return Err(self.reject("remote offer collides with local offer"));
            }
            SdpType::Answer | SdpType::PrAnswer if self.local_description.is_none() => {
                return Err(self.reject("answer without an outstanding offer"));
            }
            SdpType::Rollback => return Err(self.reject("rollback is not supported")),
            _ => {}
        }

        self.peer_connection.set_remote_description(desc.clone()).await?;
        if self.is_alive() {
            self.remote_description = Some(desc);
        }
        Ok(())
    }

    pub async fn add_track(&self, track: MediaTrack) -> Result<()> {
        if self.role == Role::Receiver {
            return Err(SessionError::usage(format!(
                "{} track {} offered to the receiver connection",
                track.kind, track.id
            )));
        }
        self.peer_connection.add_track(track).await
    }

    pub async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.peer_connection.add_ice_candidate(candidate).await
    }

    /// Closes this role's connection only. The other role keeps negotiating.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.peer_connection.close().await
    }

    /// Stores the last reported state. `Failed` and `Closed` stick.
    pub(crate) fn record_state(&mut self, state: ConnectionState) {
        if !self.state.is_terminal() {
            self.state = state;
        }
    }

    fn reject(&self, reason: impl Into<String>) -> SessionError {
        SessionError::negotiation(self.role, reason)
    }
}
