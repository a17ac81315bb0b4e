use crate::error::{Result, SessionError};
use serde::{Deserialize, Serialize};

/// A single trickled ICE candidate, in the `RTCIceCandidateInit` JSON shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
            username_fragment: None,
        }
    }

    pub fn with_mid(mut self, sdp_mid: impl Into<String>, sdp_m_line_index: u16) -> Self {
        self.sdp_mid = Some(sdp_mid.into());
        self.sdp_m_line_index = Some(sdp_m_line_index);
        self
    }

    /// Parses and validates a candidate payload.
    ///
    /// An empty candidate line is accepted: browsers use it to signal the
    /// end of gathering.
    pub fn parse(text: &str) -> Result<Self> {
        let candidate: IceCandidate = serde_json::from_str(text)
            .map_err(|e| SessionError::validation(format!("candidate payload: {e}")))?;

        let line = candidate.candidate.trim();
        let line = line.strip_prefix("a=").unwrap_or(line);
        if !line.is_empty() && !line.starts_with("candidate:") {
            return Err(SessionError::validation(format!(
                "not a candidate line: {:?}",
                candidate.candidate
            )));
        }

        Ok(candidate)
    }

    pub fn is_end_of_candidates(&self) -> bool {
        self.candidate.trim().is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
