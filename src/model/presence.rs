use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// One login session (keyed by the refresh-token jti). A user may hold
/// several concurrent sessions.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct UserSession {
    pub id: u64,
    pub user_id: u64,
    pub session_key: String,
    pub ip_address: String,
    pub user_agent: String,

    #[schema(value_type = String, format = "date-time")]
    pub login_at: DateTime<Utc>,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub last_seen_at: Option<DateTime<Utc>>,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub logout_at: Option<DateTime<Utc>>,

    pub is_active: bool,
}

/// Per-(user, date) login digest maintained by the auth handlers and the
/// activity heartbeat. Derived state, never user-editable.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct UserDailyLogin {
    pub id: u64,
    pub user_id: u64,

    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub first_login_at: Option<DateTime<Utc>>,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub last_login_at: Option<DateTime<Utc>>,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub last_seen_at: Option<DateTime<Utc>>,

    pub last_ip: String,
    pub online: bool,
}
