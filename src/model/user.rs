use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::core::schedule::expected_end_time;

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct User {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "asilva")]
    pub username: String,

    #[schema(example = "Ana")]
    pub first_name: String,

    #[schema(example = "Silva")]
    pub last_name: String,

    #[schema(example = 3)]
    pub role_id: u8,

    #[schema(example = 10, nullable = true)]
    pub department_id: Option<u64>,

    #[schema(example = false)]
    pub is_intern: bool,

    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub start_date: NaiveDate,

    #[schema(nullable = true)]
    pub profile_image: Option<String>,

    #[schema(value_type = Option<String>, format = "date-time", nullable = true)]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn full_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.username.clone()
        } else {
            name.to_string()
        }
    }

    pub fn expected_end_time(&self) -> NaiveTime {
        expected_end_time(self.is_intern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: &str, last: &str) -> User {
        User {
            id: 1,
            username: "asilva".into(),
            first_name: first.into(),
            last_name: last.into(),
            role_id: 3,
            department_id: None,
            is_intern: false,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            profile_image: None,
            last_login_at: None,
        }
    }

    #[test]
    fn full_name_falls_back_to_username() {
        assert_eq!(user("Ana", "Silva").full_name(), "Ana Silva");
        assert_eq!(user("", "").full_name(), "asilva");
        assert_eq!(user("Ana", "").full_name(), "Ana");
    }
}
