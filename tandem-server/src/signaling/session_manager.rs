use crate::negotiation::SessionHandle;
use dashmap::DashMap;
use std::sync::Arc;
use tandem_core::SessionId;
use tracing::info;

/// Live sessions, one per signaling connection.
#[derive(Clone, Default)]
pub struct SessionManager {
    sessions: Arc<DashMap<SessionId, SessionHandle>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, session_id: SessionId, handle: SessionHandle) {
        self.sessions.insert(session_id, handle);
        info!("Session {} registered ({} live)", session_id, self.sessions.len());
    }

    /// Forgets a session and tears it down.
    pub async fn remove(&self, session_id: &SessionId) {
        let Some((_, handle)) = self.sessions.remove(session_id) else {
            return;
        };
        handle.teardown().await;
        info!("Session {} removed ({} live)", session_id, self.sessions.len());
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub async fn teardown_all(&self) {
        // Collect first so no map guard is held across an await.
        let handles: Vec<_> = self
            .sessions
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        for (session_id, handle) in handles {
            self.sessions.remove(&session_id);
            handle.teardown().await;
        }
    }
}
