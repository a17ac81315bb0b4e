pub mod media;
pub mod negotiation;
pub mod signaling;
pub mod transport;

pub use media::*;
pub use negotiation::*;
pub use signaling::*;
pub use transport::*;
