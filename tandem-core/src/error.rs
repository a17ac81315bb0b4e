use crate::model::Role;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The platform refused the ICE/server setup. Aborts initialization.
    #[error("configuration rejected: {reason}")]
    Configuration { reason: String },

    /// Out-of-sequence signaling or a description the platform rejected.
    /// Only the named role's negotiation is affected.
    #[error("{role} negotiation failed: {reason}")]
    Negotiation { role: Role, reason: String },

    /// Malformed candidate or envelope. Dropped by the coordinator.
    #[error("invalid signaling data: {reason}")]
    Validation { reason: String },

    #[error("usage error: {reason}")]
    Usage { reason: String },
}

impl SessionError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub fn negotiation(role: Role, reason: impl Into<String>) -> Self {
        Self::Negotiation {
            role,
            reason: reason.into(),
        }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub fn usage(reason: impl Into<String>) -> Self {
        Self::Usage {
            reason: reason.into(),
        }
    }

    pub fn is_negotiation(&self) -> bool {
        matches!(self, Self::Negotiation { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
