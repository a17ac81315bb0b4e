pub mod error;
pub mod model;

pub use error::{Result, SessionError};
pub use model::*;
