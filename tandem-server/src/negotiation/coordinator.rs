use crate::negotiation::{CandidateBuffer, ConnectionRole, RoleMap, SessionHandle, route};
use crate::signaling::SignalingChannel;
use crate::transport::{PeerConnectionFactory, TransportEvent};
use std::sync::Arc;
use tandem_core::{
    ConnectionState, IceCandidate, MediaTrack, Result, Role, SdpType, SessionDescription,
    SessionError, SessionId, SignalKind, SignalingEnvelope,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Drives the sender and receiver connections of one session through the
/// offer/answer/candidate handshake over a single signaling channel.
///
/// Envelopes are handled one at a time in arrival order. Every method that
/// awaits the platform re-checks liveness afterwards, so a teardown issued
/// through [`SessionHandle`] mid-step is never undone by a late completion.
pub struct NegotiationCoordinator {
    session_id: SessionId,
    factory: Arc<dyn PeerConnectionFactory>,
    signaling: Arc<dyn SignalingChannel>,
    handle: SessionHandle,
    roles: RoleMap<Option<ConnectionRole>>,
    pending: RoleMap<CandidateBuffer>,
    rejected_candidates: usize,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: mpsc::UnboundedReceiver<TransportEvent>,
}

impl NegotiationCoordinator {
    pub fn new(
        session_id: SessionId,
        factory: Arc<dyn PeerConnectionFactory>,
        signaling: Arc<dyn SignalingChannel>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            session_id,
            factory,
            signaling,
            handle: SessionHandle::new(),
            roles: RoleMap::default(),
            pending: RoleMap::default(),
            rejected_candidates: 0,
            events_tx,
            events_rx,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn role(&self, role: Role) -> Option<&ConnectionRole> {
        self.roles.get(role).as_ref()
    }

    pub fn pending_candidates(&self, role: Role) -> usize {
        self.pending.get(role).len()
    }

    /// Candidates dropped because their payload did not validate.
    pub fn rejected_candidates(&self) -> usize {
        self.rejected_candidates
    }

    pub fn is_torn_down(&self) -> bool {
        !self.handle.is_alive()
    }

    /// Opens the sender and receiver connections. Both report their events
    /// to this coordinator only.
    ///
    /// After a teardown this starts a fresh cycle: new liveness handle, new
    /// event channel, no roles and no buffered candidates. Handles cloned
    /// before that keep pointing at the dead cycle.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.is_torn_down() {
            self.reset();
        } else if self.roles.sender.is_some() || self.roles.receiver.is_some() {
            return Err(SessionError::usage("session already initialized"));
        }

        for role in Role::ALL {
            let connection = match self.factory.create(role, self.events_tx.clone()).await {
                Ok(connection) => connection,
                Err(e) => {
                    error!("[{}] Failed to open {} connection: {}", self.session_id, role, e);
                    self.handle.teardown().await;
                    return Err(e);
                }
            };

            self.handle.register(role, connection.clone()).await;
            if self.is_torn_down() {
                // Torn down while opening; the teardown may have missed this one.
                if let Err(e) = connection.close().await {
                    warn!("[{}] Failed to close {} connection: {}", self.session_id, role, e);
                }
                return Ok(());
            }
            *self.roles.get_mut(role) =
                Some(ConnectionRole::new(role, connection, self.handle.clone()));
        }

        info!("[{}] Sender and receiver connections ready", self.session_id);
        Ok(())
    }

    /// Attaches `tracks` to the sender connection and sends its offer.
    pub async fn start_session(&mut self, tracks: Vec<MediaTrack>) -> Result<()> {
        if self.is_torn_down() {
            return Err(SessionError::usage(
                "session was torn down, initialize a new cycle first",
            ));
        }
        let Some(sender) = self.roles.sender.as_mut() else {
            return Err(SessionError::negotiation(
                Role::Sender,
                "start_session called before initialize",
            ));
        };
        if sender.local_description().is_some() {
            return Err(SessionError::negotiation(
                Role::Sender,
                "offer already outstanding",
            ));
        }
        if tracks.is_empty() {
            return Err(SessionError::negotiation(
                Role::Sender,
                "no local tracks to offer",
            ));
        }

        for track in tracks {
            sender.add_track(track).await?;
        }

        let offer = sender.create_offer().await?;
        if !sender.is_alive() {
            return Ok(());
        }
        sender.set_local_description(offer.clone()).await?;
        if !sender.is_alive() {
            return Ok(());
        }

        info!("[{}] Sending offer", self.session_id);
        self.emit(Role::Sender, SignalKind::Offer, &offer).await
    }

    /// Handles one inbound envelope. After teardown this does nothing.
    ///
    /// A malformed candidate is logged and dropped; it never fails the call.
    pub async fn on_envelope(&mut self, envelope: SignalingEnvelope) -> Result<()> {
        if self.is_torn_down() {
            debug!(
                "[{}] Ignoring {} {} after teardown",
                self.session_id, envelope.role, envelope.kind
            );
            return Ok(());
        }

        let target = route(envelope.kind, envelope.role);
        debug!(
            "[{}] {} {} routed to local {}",
            self.session_id, envelope.role, envelope.kind, target
        );

        if self.roles.get(target).as_ref().is_some_and(|c| !c.is_alive()) {
            debug!("[{}] Ignoring {} for closed {}", self.session_id, envelope.kind, target);
            return Ok(());
        }

        match envelope.kind {
            SignalKind::Offer => self.accept_offer(target, &envelope.payload).await,
            SignalKind::Answer => self.accept_answer(target, &envelope.payload).await,
            SignalKind::Candidate => {
                if let Err(e) = self.accept_candidate(target, &envelope.payload).await {
                    self.rejected_candidates += 1;
                    warn!("[{}] Dropping candidate for {}: {}", self.session_id, target, e);
                }
                Ok(())
            }
        }
    }

    async fn accept_offer(&mut self, role: Role, payload: &str) -> Result<()> {
        let Some(connection) = self.roles.get_mut(role).as_mut() else {
            return Err(SessionError::negotiation(role, "offer received before initialize"));
        };
        if connection.remote_description().is_some() {
            return Err(SessionError::negotiation(
                role,
                "duplicate offer: remote description already set",
            ));
        }

        let offer = parse_description(role, payload, &[SdpType::Offer])?;
        connection.set_remote_description(offer).await?;
        if !connection.is_alive() {
            return Ok(());
        }

        let answer = connection.create_answer().await?;
        if !connection.is_alive() {
            return Ok(());
        }
        connection.set_local_description(answer.clone()).await?;
        if !connection.is_alive() {
            return Ok(());
        }

        info!("[{}] Sending answer", self.session_id);
        self.emit(role, SignalKind::Answer, &answer).await?;
        self.drain_pending(role).await;
        Ok(())
    }

    async fn accept_answer(&mut self, role: Role, payload: &str) -> Result<()> {
        let Some(connection) = self.roles.get_mut(role).as_mut() else {
            return Err(SessionError::negotiation(role, "answer received before initialize"));
        };
        if connection.local_description().is_none() {
            return Err(SessionError::negotiation(
                role,
                "stray answer: no outstanding offer",
            ));
        }
        if connection.remote_description().is_some() {
            return Err(SessionError::negotiation(
                role,
                "duplicate answer: remote description already set",
            ));
        }

        let answer = parse_description(role, payload, &[SdpType::Answer, SdpType::PrAnswer])?;
        connection.set_remote_description(answer).await?;
        if !connection.is_alive() {
            return Ok(());
        }

        info!("[{}] Answer applied", self.session_id);
        self.drain_pending(role).await;
        Ok(())
    }

    async fn accept_candidate(&mut self, role: Role, payload: &str) -> Result<()> {
        let candidate = IceCandidate::parse(payload)?;

        match self.roles.get(role) {
            Some(connection) if connection.remote_description().is_some() => {
                if let Err(e) = connection.add_ice_candidate(candidate).await {
                    warn!("[{}] {} rejected candidate: {}", self.session_id, role, e);
                }
            }
            _ => {
                let pending = self.pending.get_mut(role);
                pending.push(candidate);
                debug!(
                    "[{}] Buffered candidate for {} ({} pending)",
                    self.session_id,
                    role,
                    pending.len()
                );
            }
        }
        Ok(())
    }

    async fn drain_pending(&mut self, role: Role) {
        let Some(connection) = self.roles.get(role) else {
            return;
        };
        let pending = self.pending.get_mut(role);
        if pending.is_empty() {
            return;
        }

        let applied = pending.drain_into(connection).await;
        debug!(
            "[{}] Applied {} buffered candidates to {}",
            self.session_id, applied, role
        );
    }

    /// Reacts to a callback reported by one of the peer connections.
    pub async fn handle_transport_event(&mut self, event: TransportEvent) {
        if self.is_torn_down() {
            debug!(
                "[{}] Ignoring {} transport event after teardown",
                self.session_id,
                event.role()
            );
            return;
        }

        match event {
            TransportEvent::CandidateDiscovered(role, candidate) => {
                match candidate.to_json() {
                    Ok(payload) => {
                        self.signaling
                            .send(SignalingEnvelope::new(role, SignalKind::Candidate, payload))
                            .await;
                    }
                    Err(e) => error!("[{}] Failed to encode {} candidate: {}", self.session_id, role, e),
                }
            }

            TransportEvent::StateChanged(role, state) => {
                if let Some(connection) = self.roles.get_mut(role).as_mut() {
                    connection.record_state(state);
                }
                match state {
                    ConnectionState::Connected => {
                        info!("[{}] {} connection connected", self.session_id, role)
                    }
                    ConnectionState::Disconnected
                    | ConnectionState::Failed
                    | ConnectionState::Closed => {
                        warn!("[{}] {} connection {}", self.session_id, role, state)
                    }
                    ConnectionState::New | ConnectionState::Connecting => {
                        debug!("[{}] {} connection {}", self.session_id, role, state)
                    }
                }
            }

            TransportEvent::IceStateChanged(role, state) => {
                debug!("[{}] {} ICE agent {}", self.session_id, role, state);
            }

            TransportEvent::TrackReceived(role, kind) => {
                info!("[{}] {} received {} track", self.session_id, role, kind);
            }
        }
    }

    /// Processes inbound envelopes and transport events until the signaling
    /// channel closes or the session is torn down, then tears down.
    pub async fn run(mut self, mut inbound: mpsc::Receiver<SignalingEnvelope>) {
        info!("[{}] Negotiation loop started", self.session_id);
        let handle = self.handle.clone();

        loop {
            tokio::select! {
                envelope = inbound.recv() => {
                    match envelope {
                        Some(envelope) => {
                            let (role, kind) = (envelope.role, envelope.kind);
                            if let Err(e) = self.on_envelope(envelope).await {
                                error!("[{}] {} {} failed: {}", self.session_id, role, kind, e);
                            }
                        }
                        None => {
                            info!("[{}] Signaling channel closed", self.session_id);
                            break;
                        }
                    }
                }

                Some(event) = self.events_rx.recv() => {
                    self.handle_transport_event(event).await;
                }

                _ = handle.closed() => break,
            }
        }

        self.teardown().await;
        info!("[{}] Negotiation loop finished", self.session_id);
    }

    /// Closes both connections and discards buffered candidates. Idempotent.
    pub async fn teardown(&mut self) {
        if self.handle.teardown().await {
            info!("[{}] Session torn down", self.session_id);
        }

        for role in Role::ALL {
            self.pending.get_mut(role).clear();
            if let Some(connection) = self.roles.get_mut(role).as_mut() {
                connection.record_state(ConnectionState::Closed);
            }
        }
    }

    fn reset(&mut self) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        self.events_tx = events_tx;
        self.events_rx = events_rx;
        self.handle = SessionHandle::new();
        self.roles = RoleMap::default();
        self.pending = RoleMap::default();
        info!("[{}] Starting a new negotiation cycle", self.session_id);
    }

    async fn emit(&self, role: Role, kind: SignalKind, desc: &SessionDescription) -> Result<()> {
        let payload = desc
            .to_json()
            .map_err(|e| SessionError::negotiation(role, format!("encoding {kind}: {e}")))?;
        self.signaling
            .send(SignalingEnvelope::new(role, kind, payload))
            .await;
        Ok(())
    }
}

fn parse_description(role: Role, payload: &str, expected: &[SdpType]) -> Result<SessionDescription> {
    let desc = SessionDescription::from_json(payload)
        .map_err(|e| SessionError::negotiation(role, format!("malformed description: {e}")))?;
    if !expected.contains(&desc.sdp_type) {
        return Err(SessionError::negotiation(
            role,
            format!("unexpected {} description", desc.sdp_type),
        ));
    }
    Ok(desc)
}
