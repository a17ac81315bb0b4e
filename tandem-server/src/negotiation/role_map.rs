use tandem_core::Role;

/// One value per local role.
#[derive(Debug, Default)]
pub struct RoleMap<T> {
    pub sender: T,
    pub receiver: T,
}

impl<T> RoleMap<T> {
    pub fn get(&self, role: Role) -> &T {
        match role {
            Role::Sender => &self.sender,
            Role::Receiver => &self.receiver,
        }
    }

    pub fn get_mut(&mut self, role: Role) -> &mut T {
        match role {
            Role::Sender => &mut self.sender,
            Role::Receiver => &mut self.receiver,
        }
    }
}
