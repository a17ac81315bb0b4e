use tandem_core::{Role, SignalKind};

use crate::integration::init_tracing;
use crate::utils::{Call, TestSession, remote_answer, remote_candidate, remote_offer};

#[tokio::test]
async fn test_closing_one_role_leaves_the_other_negotiating() {
    init_tracing();

    let mut session = TestSession::initialized().await;
    let sender = session.coordinator.role(Role::Sender).unwrap();
    sender.close().await.unwrap();
    sender.close().await.unwrap();
    assert!(!sender.is_alive());

    // Traffic for the closed sender is ignored.
    session
        .coordinator
        .on_envelope(remote_answer("v=0 late"))
        .await
        .expect("envelope for closed role failed");
    session
        .coordinator
        .on_envelope(remote_candidate(Role::Receiver, 4601))
        .await
        .unwrap();
    assert_eq!(session.coordinator.pending_candidates(Role::Sender), 0);

    // The receiver still answers.
    session
        .coordinator
        .on_envelope(remote_offer("v=0 remote-offer"))
        .await
        .expect("receiver stopped negotiating");
    assert!(
        session
            .signaling
            .find(Role::Receiver, SignalKind::Answer)
            .await
            .is_some()
    );
    assert!(!session.coordinator.is_torn_down());

    let sender_pc = session.factory.connection(Role::Sender).await;
    assert_eq!(sender_pc.calls().await, vec![Call::Close]);
}
