use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JustificationReason {
    Medical,
    Funeral,
    Personal,
    Official,
    Other,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JustificationStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct AbsenceJustification {
    pub id: u64,
    pub user_id: u64,
    pub created_by: Option<u64>,

    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,

    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,

    #[schema(example = "medical")]
    pub reason: String,

    pub other_reason: Option<String>,
    pub receipt_path: Option<String>,

    #[schema(example = "pending")]
    pub status: String,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
}

fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut last_dash = true;
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Storage path for an uploaded receipt:
/// `justifications/<slugified-name>/<start>_to_<end>/<filename>`.
pub fn receipt_upload_path(
    employee_name: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    filename: &str,
) -> String {
    format!(
        "justifications/{}/{}_to_{}/{}",
        slugify(employee_name),
        start_date,
        end_date,
        filename
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn reasons_round_trip_as_lowercase_strings() {
        assert_eq!(JustificationReason::Medical.to_string(), "medical");
        assert_eq!(
            JustificationReason::from_str("official").unwrap(),
            JustificationReason::Official
        );
        assert!(JustificationReason::from_str("vacation").is_err());
    }

    #[test]
    fn status_transitions_are_named() {
        assert_eq!(JustificationStatus::Pending.to_string(), "pending");
        assert_eq!(
            JustificationStatus::from_str("rejected").unwrap(),
            JustificationStatus::Rejected
        );
    }

    #[test]
    fn receipt_path_slugifies_the_employee_name() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 1, 7).unwrap();
        assert_eq!(
            receipt_upload_path("Ana María Silva", start, end, "note.pdf"),
            "justifications/ana-mar-a-silva/2026-01-05_to_2026-01-07/note.pdf"
        );
        assert_eq!(
            receipt_upload_path("  Bob  ", start, end, "r.png"),
            "justifications/bob/2026-01-05_to_2026-01-07/r.png"
        );
    }
}
