use tandem_core::{ConnectionState, Role, SignalKind, SignalingEnvelope};
use tandem_server::TransportEvent;

use crate::integration::init_tracing;
use crate::utils::{TestSession, host_candidate, remote_candidate, remote_offer};

#[tokio::test]
async fn test_malformed_candidate_is_counted_and_dropped() {
    init_tracing();

    let mut session = TestSession::initialized().await;
    session
        .coordinator
        .on_envelope(remote_offer("v=0 remote-offer"))
        .await
        .unwrap();

    for payload in ["not json at all", r#"{"candidate":"garbage"}"#] {
        let envelope = SignalingEnvelope::new(Role::Sender, SignalKind::Candidate, payload);
        session
            .coordinator
            .on_envelope(envelope)
            .await
            .expect("malformed candidate must not fail the call");
    }

    assert_eq!(session.coordinator.rejected_candidates(), 2);
    assert!(!session.coordinator.is_torn_down());

    // The session keeps going.
    session
        .coordinator
        .on_envelope(remote_candidate(Role::Sender, 9001))
        .await
        .unwrap();

    let receiver_pc = session.factory.connection(Role::Receiver).await;
    assert_eq!(receiver_pc.applied_candidates().await, vec![host_candidate(9001)]);
}

#[tokio::test]
async fn test_malformed_candidate_is_not_buffered() {
    init_tracing();

    let mut session = TestSession::initialized().await;
    let envelope = SignalingEnvelope::new(Role::Sender, SignalKind::Candidate, "{}");
    session.coordinator.on_envelope(envelope).await.unwrap();

    assert_eq!(session.coordinator.rejected_candidates(), 1);
    assert_eq!(session.coordinator.pending_candidates(Role::Receiver), 0);
}

#[tokio::test]
async fn test_malformed_candidate_leaves_buffer_and_state_alone() {
    init_tracing();

    let mut session = TestSession::initialized().await;
    session
        .coordinator
        .handle_transport_event(TransportEvent::StateChanged(
            Role::Receiver,
            ConnectionState::Connecting,
        ))
        .await;
    for port in [9101, 9102] {
        session
            .coordinator
            .on_envelope(remote_candidate(Role::Sender, port))
            .await
            .unwrap();
    }

    let envelope = SignalingEnvelope::new(Role::Sender, SignalKind::Candidate, "{not json");
    session.coordinator.on_envelope(envelope).await.unwrap();

    assert_eq!(session.coordinator.rejected_candidates(), 1);
    assert_eq!(session.coordinator.pending_candidates(Role::Receiver), 2);
    assert_eq!(
        session.coordinator.role(Role::Receiver).unwrap().state(),
        ConnectionState::Connecting
    );

    // The buffered pair still drains in order.
    session
        .coordinator
        .on_envelope(remote_offer("v=0 remote-offer"))
        .await
        .unwrap();
    let receiver_pc = session.factory.connection(Role::Receiver).await;
    assert_eq!(
        receiver_pc.applied_candidates().await,
        vec![host_candidate(9101), host_candidate(9102)]
    );
}
