pub mod admin;
pub mod attendance;
pub mod dashboard;
pub mod employee;
pub mod history;
pub mod justification;

use chrono::NaiveDate;
use sqlx::MySqlPool;

use crate::model::{attendance::AttendanceDay, user::User};

pub(crate) const USER_COLUMNS: &str = "id, username, first_name, last_name, role_id, \
     department_id, is_intern, start_date, profile_image, last_login_at";

pub(crate) async fn fetch_user(
    pool: &MySqlPool,
    user_id: u64,
) -> Result<Option<User>, sqlx::Error> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    sqlx::query_as::<_, User>(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn fetch_day(
    pool: &MySqlPool,
    user_id: u64,
    date: NaiveDate,
) -> Result<Option<AttendanceDay>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceDay>(
        r#"
        SELECT id, user_id, date, arrival_time, departure_time, verified_by, verified_at
        FROM attendance_days
        WHERE user_id = ? AND date = ?
        "#,
    )
    .bind(user_id)
    .bind(date)
    .fetch_optional(pool)
    .await
}

/// "First Last", falling back to the username for blank names.
pub(crate) fn display_name(first_name: &str, last_name: &str, username: &str) -> String {
    let name = format!("{first_name} {last_name}");
    let name = name.trim();
    if name.is_empty() {
        username.to_string()
    } else {
        name.to_string()
    }
}
