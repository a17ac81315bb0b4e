mod candidate;
mod description;
mod media;
mod role;
mod session;
mod signaling;
mod state;

pub use candidate::IceCandidate;
pub use description::{SdpType, SessionDescription};
pub use media::{MediaConstraints, MediaTrack, TrackKind};
pub use role::Role;
pub use session::SessionId;
pub use signaling::{DEFAULT_STUN_ADDRS, IceServerConfig, SignalKind, SignalingEnvelope};
pub use state::ConnectionState;
