mod candidate_buffer;
mod connection_role;
mod coordinator;
mod role_map;
mod routing;
mod session_handle;

pub use candidate_buffer::*;
pub use connection_role::*;
pub use coordinator::*;
pub use role_map::*;
pub use routing::*;
pub use session_handle::*;
