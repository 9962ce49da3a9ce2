use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// One (user, date) attendance record. Created lazily on first edit, never
/// deleted in normal operation.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceDay {
    pub id: u64,
    pub user_id: u64,

    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(value_type = Option<String>, example = "08:30:00")]
    pub arrival_time: Option<NaiveTime>,

    #[schema(value_type = Option<String>, example = "17:30:00")]
    pub departure_time: Option<NaiveTime>,

    pub verified_by: Option<u64>,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub verified_at: Option<DateTime<Utc>>,
}

impl AttendanceDay {
    pub fn is_present(&self) -> bool {
        self.arrival_time.is_some()
    }

    pub fn is_verified(&self) -> bool {
        self.verified_by.is_some()
    }
}
