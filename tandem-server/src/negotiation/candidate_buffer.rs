use crate::negotiation::ConnectionRole;
use std::collections::VecDeque;
use tandem_core::IceCandidate;
use tracing::warn;

/// Candidates that arrived before their role had a remote description.
#[derive(Debug, Default)]
pub struct CandidateBuffer {
    queue: VecDeque<IceCandidate>,
}

impl CandidateBuffer {
    pub fn push(&mut self, candidate: IceCandidate) {
        self.queue.push_back(candidate);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Applies every buffered candidate in arrival order and returns how many
    /// the connection accepted. A rejected candidate is logged and skipped.
    /// The buffer is empty afterwards.
    pub async fn drain_into(&mut self, role: &ConnectionRole) -> usize {
        let mut applied = 0;

        while let Some(candidate) = self.queue.pop_front() {
            if !role.is_alive() {
                self.queue.clear();
                break;
            }
            match role.add_ice_candidate(candidate).await {
                Ok(()) => applied += 1,
                Err(e) => warn!("{} rejected buffered candidate: {}", role.role(), e),
            }
        }

        applied
    }
}
