use inkbridge_core::{ConnectionId, Role};

/// Which connection currently holds each role.
///
/// Holds at most one connection per role, and a connection holds at most one
/// role. Binding and unbinding never touch the network; callers decide what
/// to tell the peers.
#[derive(Debug, Default)]
pub struct RoleRegistry {
    operator: Option<ConnectionId>,
    arm: Option<ConnectionId>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, role: Role) -> &Option<ConnectionId> {
        match role {
            Role::Operator => &self.operator,
            Role::Arm => &self.arm,
        }
    }

    fn slot_mut(&mut self, role: Role) -> &mut Option<ConnectionId> {
        match role {
            Role::Operator => &mut self.operator,
            Role::Arm => &mut self.arm,
        }
    }

    /// Make `connection` the holder of `role`.
    ///
    /// Returns the evicted previous holder, if it was a different connection.
    pub fn bind(&mut self, role: Role, connection: ConnectionId) -> Option<ConnectionId> {
        for other in Role::ALL {
            if other != role && self.slot(other).as_ref() == Some(&connection) {
                *self.slot_mut(other) = None;
            }
        }
        self.slot_mut(role)
            .replace(connection.clone())
            .filter(|previous| previous != &connection)
    }

    /// Release whatever role `connection` held.
    pub fn unbind(&mut self, connection: &ConnectionId) -> Option<Role> {
        let role = self.role_of(connection)?;
        *self.slot_mut(role) = None;
        Some(role)
    }

    pub fn lookup(&self, role: Role) -> Option<&ConnectionId> {
        self.slot(role).as_ref()
    }

    pub fn role_of(&self, connection: &ConnectionId) -> Option<Role> {
        Role::ALL
            .into_iter()
            .find(|role| self.slot(*role).as_ref() == Some(connection))
    }

    pub fn is_bound(&self, role: Role) -> bool {
        self.slot(role).is_some()
    }

    /// Whether `connection` is the current holder of `role`.
    pub fn holds(&self, role: Role, connection: &ConnectionId) -> bool {
        self.lookup(role) == Some(connection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ConnectionId {
        ConnectionId::from_raw(s)
    }

    #[test]
    fn empty_registry_has_no_holders() {
        let registry = RoleRegistry::new();
        assert!(registry.lookup(Role::Operator).is_none());
        assert!(registry.lookup(Role::Arm).is_none());
    }

    #[test]
    fn bind_and_lookup() {
        let mut registry = RoleRegistry::new();
        assert_eq!(registry.bind(Role::Arm, id("a")), None);
        assert_eq!(registry.lookup(Role::Arm), Some(&id("a")));
        assert_eq!(registry.role_of(&id("a")), Some(Role::Arm));
        assert!(!registry.is_bound(Role::Operator));
    }

    #[test]
    fn rebinding_role_evicts_previous_holder() {
        let mut registry = RoleRegistry::new();
        registry.bind(Role::Arm, id("c1"));
        let evicted = registry.bind(Role::Arm, id("c2"));
        assert_eq!(evicted, Some(id("c1")));
        assert_eq!(registry.lookup(Role::Arm), Some(&id("c2")));
        assert_eq!(registry.role_of(&id("c1")), None);
    }

    #[test]
    fn rebinding_same_connection_evicts_nothing() {
        let mut registry = RoleRegistry::new();
        registry.bind(Role::Operator, id("op"));
        assert_eq!(registry.bind(Role::Operator, id("op")), None);
        assert!(registry.holds(Role::Operator, &id("op")));
    }

    #[test]
    fn connection_holds_one_role_at_a_time() {
        let mut registry = RoleRegistry::new();
        registry.bind(Role::Operator, id("x"));
        registry.bind(Role::Arm, id("x"));
        assert_eq!(registry.lookup(Role::Operator), None);
        assert_eq!(registry.role_of(&id("x")), Some(Role::Arm));
    }

    #[test]
    fn unbind_returns_vacated_role() {
        let mut registry = RoleRegistry::new();
        registry.bind(Role::Operator, id("op"));
        registry.bind(Role::Arm, id("arm"));

        assert_eq!(registry.unbind(&id("arm")), Some(Role::Arm));
        assert_eq!(registry.unbind(&id("arm")), None);
        assert_eq!(registry.unbind(&id("stranger")), None);
        assert!(registry.holds(Role::Operator, &id("op")));
    }
}
