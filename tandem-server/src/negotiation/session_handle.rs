use crate::transport::PeerConnection;
use std::sync::Arc;
use tandem_core::Role;
use tokio::sync::{Mutex, watch};
use tracing::warn;

struct SessionShared {
    alive: watch::Sender<bool>,
    connections: Mutex<Vec<(Role, Arc<dyn PeerConnection>)>>,
}

/// Cloneable view of a session's liveness.
///
/// Lets another task tear the session down while the coordinator is suspended
/// inside a negotiation step; the coordinator checks [`SessionHandle::is_alive`]
/// after every step and drops late completions.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<SessionShared>,
}

impl SessionHandle {
    pub(crate) fn new() -> Self {
        let (alive, _) = watch::channel(true);
        Self {
            shared: Arc::new(SessionShared {
                alive,
                connections: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn is_alive(&self) -> bool {
        *self.shared.alive.borrow()
    }

    /// Resolves once the session has been torn down.
    pub async fn closed(&self) {
        let mut rx = self.shared.alive.subscribe();
        let _ = rx.wait_for(|alive| !*alive).await;
    }

    /// Marks the session dead and closes every registered connection.
    /// Returns `false` if it was already torn down.
    pub async fn teardown(&self) -> bool {
        if !self.shared.alive.send_replace(false) {
            return false;
        }

        let connections = std::mem::take(&mut *self.shared.connections.lock().await);
        for (role, connection) in connections {
            if let Err(e) = connection.close().await {
                warn!("Failed to close {} connection: {}", role, e);
            }
        }
        true
    }

    pub(crate) async fn register(&self, role: Role, connection: Arc<dyn PeerConnection>) {
        self.shared.connections.lock().await.push((role, connection));
    }
}
