use tandem_core::{Role, SignalKind};

/// Local role that handles an inbound envelope, indexed by `[kind][tag]`.
///
/// Offers always land on the receiving connection and answers on the sending
/// one. A candidate describes the remote role that gathered it, so it goes to
/// the complementary local role.
const ROUTES: [[Role; 2]; 3] = [
    //              tag: sender     tag: receiver
    /* offer     */ [Role::Receiver, Role::Receiver],
    /* answer    */ [Role::Sender, Role::Sender],
    /* candidate */ [Role::Receiver, Role::Sender],
];

pub fn route(kind: SignalKind, tag: Role) -> Role {
    let row = match kind {
        SignalKind::Offer => 0,
        SignalKind::Answer => 1,
        SignalKind::Candidate => 2,
    };
    let column = match tag {
        Role::Sender => 0,
        Role::Receiver => 1,
    };
    ROUTES[row][column]
}
