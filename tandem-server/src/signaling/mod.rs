mod router;
mod session_manager;
mod signaling_channel;
mod signaling_service;
mod ws_handler;

pub use router::*;
pub use session_manager::*;
pub use signaling_channel::*;
pub use signaling_service::*;
pub use ws_handler::*;
