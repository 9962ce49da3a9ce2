use strum::Display;

/// Audit event kinds written to the append-only `system_logs` table.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LogEvent {
    Login,
    Logout,
    Attendance,
    Verify,
    Export,
    Backup,
    Justification,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_types_serialize_lowercase() {
        assert_eq!(LogEvent::Login.to_string(), "login");
        assert_eq!(LogEvent::Justification.to_string(), "justification");
    }
}
