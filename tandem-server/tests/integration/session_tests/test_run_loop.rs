use std::sync::Arc;
use std::time::Duration;

use tandem_core::{ConnectionState, Role, SessionId, SignalKind};
use tandem_server::{NegotiationCoordinator, TransportEvent};
use tokio::sync::mpsc;

use crate::integration::init_tracing;
use crate::utils::{
    Call, FakeFactory, MockSignalingChannel, SIGNAL_TIMEOUT_MS, TestSession, host_candidate,
    remote_candidate, remote_offer,
};

#[tokio::test]
async fn test_run_loop_relays_envelopes_and_events() {
    init_tracing();

    let factory = FakeFactory::new();
    let (signaling, _rx) = MockSignalingChannel::new();
    let mut coordinator = NegotiationCoordinator::new(
        SessionId::new(),
        Arc::new(factory.clone()),
        Arc::new(signaling.clone()),
    );
    coordinator.initialize().await.unwrap();
    let handle = coordinator.handle();

    let (inbound_tx, inbound_rx) = mpsc::channel(16);
    let task = tokio::spawn(coordinator.run(inbound_rx));

    inbound_tx.send(remote_candidate(Role::Sender, 4501)).await.unwrap();
    inbound_tx.send(remote_offer("v=0 remote-offer")).await.unwrap();

    signaling
        .wait_for(Role::Receiver, SignalKind::Answer, SIGNAL_TIMEOUT_MS)
        .await
        .expect("no answer from the loop");

    let receiver_pc = factory.connection(Role::Receiver).await;

    // Platform callbacks come back out as candidate envelopes.
    receiver_pc.emit(TransportEvent::CandidateDiscovered(
        Role::Receiver,
        host_candidate(4502),
    ));
    let candidate = signaling
        .wait_for(Role::Receiver, SignalKind::Candidate, SIGNAL_TIMEOUT_MS)
        .await
        .expect("gathered candidate not signaled");
    assert_eq!(
        tandem_core::IceCandidate::parse(&candidate.payload).unwrap(),
        host_candidate(4502)
    );
    // Events are handled after the offer, so the buffer was drained by now.
    assert_eq!(receiver_pc.applied_candidates().await, vec![host_candidate(4501)]);

    // Closing the signaling channel ends the loop and the session.
    drop(inbound_tx);
    tokio::time::timeout(Duration::from_millis(SIGNAL_TIMEOUT_MS), task)
        .await
        .expect("loop did not stop")
        .unwrap();

    assert!(!handle.is_alive());
    for role in Role::ALL {
        let pc = factory.connection(role).await;
        assert_eq!(pc.count(|c| matches!(c, Call::Close)).await, 1);
    }
}

#[tokio::test]
async fn test_external_teardown_stops_run_loop() {
    init_tracing();

    let session = TestSession::initialized().await;
    let handle = session.coordinator.handle();

    let (_inbound_tx, inbound_rx) = mpsc::channel(16);
    let task = tokio::spawn(session.coordinator.run(inbound_rx));

    assert!(handle.teardown().await);
    tokio::time::timeout(Duration::from_millis(SIGNAL_TIMEOUT_MS), task)
        .await
        .expect("loop ignored teardown")
        .unwrap();

    for role in Role::ALL {
        let pc = session.factory.connection(role).await;
        assert_eq!(pc.count(|c| matches!(c, Call::Close)).await, 1);
    }
}

#[tokio::test]
async fn test_state_changes_are_recorded() {
    init_tracing();

    let mut session = TestSession::initialized().await;
    session
        .coordinator
        .handle_transport_event(TransportEvent::StateChanged(
            Role::Sender,
            ConnectionState::Connected,
        ))
        .await;
    session
        .coordinator
        .handle_transport_event(TransportEvent::IceStateChanged(
            Role::Receiver,
            "checking".to_string(),
        ))
        .await;

    assert_eq!(
        session.coordinator.role(Role::Sender).unwrap().state(),
        ConnectionState::Connected
    );
    assert_eq!(
        session.coordinator.role(Role::Receiver).unwrap().state(),
        ConnectionState::New
    );
    assert!(!session.coordinator.is_torn_down());
    assert_eq!(session.signaling.count().await, 0);
}

#[tokio::test]
async fn test_failed_state_is_terminal() {
    init_tracing();

    let mut session = TestSession::initialized().await;
    for state in [ConnectionState::Failed, ConnectionState::Connected] {
        session
            .coordinator
            .handle_transport_event(TransportEvent::StateChanged(Role::Sender, state))
            .await;
    }

    assert_eq!(
        session.coordinator.role(Role::Sender).unwrap().state(),
        ConnectionState::Failed
    );

    // Teardown does not overwrite it either.
    session.coordinator.teardown().await;
    assert_eq!(
        session.coordinator.role(Role::Sender).unwrap().state(),
        ConnectionState::Failed
    );
    assert_eq!(
        session.coordinator.role(Role::Receiver).unwrap().state(),
        ConnectionState::Closed
    );
}

#[tokio::test]
async fn test_disconnected_state_recovers() {
    init_tracing();

    let mut session = TestSession::initialized().await;
    for state in [ConnectionState::Disconnected, ConnectionState::Connected] {
        session
            .coordinator
            .handle_transport_event(TransportEvent::StateChanged(Role::Receiver, state))
            .await;
    }

    assert_eq!(
        session.coordinator.role(Role::Receiver).unwrap().state(),
        ConnectionState::Connected
    );
}
