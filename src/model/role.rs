use strum::Display;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin = 1,
    Supervisor = 2,
    Employee = 3,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Supervisor),
            3 => Some(Role::Employee),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Admins and supervisors share the elevated attendance permissions.
    pub fn is_elevated(self) -> bool {
        matches!(self, Role::Admin | Role::Supervisor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ids_round_trip() {
        for role in [Role::Admin, Role::Supervisor, Role::Employee] {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_id(9), None);
    }

    #[test]
    fn only_admin_and_supervisor_are_elevated() {
        assert!(Role::Admin.is_elevated());
        assert!(Role::Supervisor.is_elevated());
        assert!(!Role::Employee.is_elevated());
    }
}
