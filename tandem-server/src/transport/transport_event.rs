use tandem_core::{ConnectionState, IceCandidate, Role, TrackKind};

/// Events a peer connection reports to its single subscriber, the
/// negotiation coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A local candidate was gathered and has to reach the remote peer.
    CandidateDiscovered(Role, IceCandidate),

    /// Peer connection state changed. Diagnostic only.
    StateChanged(Role, ConnectionState),

    /// ICE agent state changed. Diagnostic only.
    IceStateChanged(Role, String),

    /// Remote media arrived on the connection.
    TrackReceived(Role, TrackKind),
}

impl TransportEvent {
    pub fn role(&self) -> Role {
        match self {
            TransportEvent::CandidateDiscovered(role, _)
            | TransportEvent::StateChanged(role, _)
            | TransportEvent::IceStateChanged(role, _)
            | TransportEvent::TrackReceived(role, _) => *role,
        }
    }
}
