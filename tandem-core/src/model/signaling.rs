use crate::error::{Result, SessionError};
use crate::model::role::Role;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const DEFAULT_STUN_ADDRS: [&str; 5] = [
    "stun:stun.l.google.com:19302",
    "stun:stun1.l.google.com:19302",
    "stun:stun2.l.google.com:19302",
    "stun:stun3.l.google.com:19302",
    "stun:stun4.l.google.com:19302",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            urls,
            username: None,
            credential: None,
        }
    }

    pub fn default_stun() -> Self {
        Self::new(DEFAULT_STUN_ADDRS.iter().map(|s| s.to_string()).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Offer,
    Answer,
    Candidate,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Offer => f.write_str("offer"),
            SignalKind::Answer => f.write_str("answer"),
            SignalKind::Candidate => f.write_str("candidate"),
        }
    }
}

/// One signaling message, tagged with the role that produced it.
///
/// `payload` is JSON text: a full session description for offers and
/// answers, a single candidate init for candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalingEnvelope {
    pub role: Role,
    pub kind: SignalKind,
    pub payload: String,
}

#[derive(Serialize, Deserialize)]
struct WireEnvelope {
    #[serde(rename = "peerType")]
    role: Role,
    #[serde(rename = "type")]
    kind: SignalKind,
    data: Value,
}

impl SignalingEnvelope {
    pub fn new(role: Role, kind: SignalKind, payload: impl Into<String>) -> Self {
        Self {
            role,
            kind,
            payload: payload.into(),
        }
    }

    /// Encodes to `{"peerType":..,"type":..,"data":..}`.
    ///
    /// JSON object payloads are embedded as-is; anything else travels as a
    /// plain string.
    pub fn to_wire(&self) -> Result<String> {
        let data = match serde_json::from_str::<Value>(&self.payload) {
            Ok(value @ Value::Object(_)) => value,
            _ => Value::String(self.payload.clone()),
        };

        let wire = WireEnvelope {
            role: self.role,
            kind: self.kind,
            data,
        };
        serde_json::to_string(&wire)
            .map_err(|e| SessionError::validation(format!("envelope encoding: {e}")))
    }

    /// Decodes a wire frame. `data` may be an embedded object or a string
    /// holding the object's JSON text (browser clients double-encode).
    pub fn from_wire(text: &str) -> Result<Self> {
        let wire: WireEnvelope = serde_json::from_str(text)
            .map_err(|e| SessionError::validation(format!("envelope: {e}")))?;

        let payload = match wire.data {
            Value::String(s) => s,
            value @ Value::Object(_) => value.to_string(),
            other => {
                return Err(SessionError::validation(format!(
                    "envelope data must be an object or a string, got {other}"
                )));
            }
        };

        Ok(Self {
            role: wire.role,
            kind: wire.kind,
            payload,
        })
    }
}
