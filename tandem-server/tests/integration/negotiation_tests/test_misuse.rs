use std::sync::Arc;

use tandem_core::{ConnectionState, Role, SessionDescription, SessionId, SignalKind};
use tandem_server::NegotiationCoordinator;

use crate::integration::init_tracing;
use crate::utils::{
    Call, FakeFactory, FakeOptions, MockSignalingChannel, TestSession, audio_track, video_track,
};

#[tokio::test]
async fn test_start_without_tracks_is_rejected() {
    init_tracing();

    let mut session = TestSession::initialized().await;
    let err = session
        .coordinator
        .start_session(Vec::new())
        .await
        .expect_err("empty offer accepted");

    assert!(err.is_negotiation());
    assert_eq!(session.signaling.count().await, 0);
    let sender_pc = session.factory.connection(Role::Sender).await;
    assert_eq!(sender_pc.count(|c| matches!(c, Call::CreateOffer)).await, 0);
}

#[tokio::test]
async fn test_second_start_is_rejected_before_touching_the_connection() {
    init_tracing();

    let mut session = TestSession::initialized().await;
    session
        .coordinator
        .start_session(vec![audio_track()])
        .await
        .unwrap();

    let err = session
        .coordinator
        .start_session(vec![video_track()])
        .await
        .expect_err("second offer accepted");
    assert!(err.is_negotiation());

    let sender_pc = session.factory.connection(Role::Sender).await;
    assert_eq!(sender_pc.count(|c| matches!(c, Call::AddTrack(_))).await, 1);
    assert_eq!(sender_pc.count(|c| matches!(c, Call::CreateOffer)).await, 1);
    assert_eq!(session.signaling.count_of(SignalKind::Offer).await, 1);
}

#[tokio::test]
async fn test_start_before_initialize_is_rejected() {
    init_tracing();

    let mut session = TestSession::new();
    let err = session
        .coordinator
        .start_session(vec![audio_track()])
        .await
        .expect_err("start accepted before initialize");
    assert!(err.is_negotiation());
}

#[tokio::test]
async fn test_initialize_twice_is_a_usage_error() {
    init_tracing();

    let mut session = TestSession::initialized().await;
    let err = session
        .coordinator
        .initialize()
        .await
        .expect_err("second initialize accepted");

    assert!(matches!(err, tandem_core::SessionError::Usage { .. }));
    assert_eq!(session.factory.opened().await, 2);
}

#[tokio::test]
async fn test_receiver_refuses_local_tracks() {
    init_tracing();

    let session = TestSession::initialized().await;
    let receiver = session.coordinator.role(Role::Receiver).unwrap();

    let err = receiver
        .add_track(video_track())
        .await
        .expect_err("receiver accepted a track");
    assert!(matches!(err, tandem_core::SessionError::Usage { .. }));

    let receiver_pc = session.factory.connection(Role::Receiver).await;
    assert_eq!(receiver_pc.count(|c| matches!(c, Call::AddTrack(_))).await, 0);
}

#[tokio::test]
async fn test_configuration_failure_tears_down() {
    init_tracing();

    let factory = FakeFactory::with_options(FakeOptions {
        reject_configuration: true,
        ..Default::default()
    });
    let mut session = TestSession::with_factory(factory);

    let err = session
        .coordinator
        .initialize()
        .await
        .expect_err("initialize succeeded");

    assert!(matches!(err, tandem_core::SessionError::Configuration { .. }));
    assert!(session.coordinator.is_torn_down());
    assert!(session.coordinator.role(Role::Sender).is_none());
    assert_eq!(session.factory.opened().await, 0);
}

#[tokio::test]
async fn test_offer_failure_leaves_sender_untouched() {
    init_tracing();

    let factory = FakeFactory::with_options(FakeOptions {
        fail_offer: true,
        ..Default::default()
    });
    let signaling = MockSignalingChannel::new_stored_only();
    let mut coordinator = NegotiationCoordinator::new(
        SessionId::new(),
        Arc::new(factory.clone()),
        Arc::new(signaling.clone()),
    );
    coordinator.initialize().await.unwrap();

    let err = coordinator
        .start_session(vec![audio_track()])
        .await
        .expect_err("offer succeeded");
    assert!(err.is_negotiation());

    let sender = coordinator.role(Role::Sender).unwrap();
    assert!(sender.local_description().is_none());
    assert_eq!(sender.state(), ConnectionState::New);
    assert_eq!(signaling.count_of(SignalKind::Offer).await, 0);

    // The receiver side is still usable.
    let offer = SessionDescription::offer("v=0 remote").to_json().unwrap();
    coordinator
        .on_envelope(tandem_core::SignalingEnvelope::new(
            Role::Sender,
            SignalKind::Offer,
            offer,
        ))
        .await
        .expect("receiver unusable after sender failure");
    assert_eq!(signaling.count_of(SignalKind::Answer).await, 1);
}
