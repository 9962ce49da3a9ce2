use actix_web::error::ErrorBadRequest;
use chrono::NaiveDate;
use serde_json::Value;
use sqlx::MySqlPool;

/// Columns an elevated user may patch on an account. Anything else in the
/// payload is rejected, never silently dropped.
const USER_UPDATE_COLUMNS: &[&str] = &[
    "first_name",
    "last_name",
    "role_id",
    "department_id",
    "is_intern",
    "start_date",
    "profile_image",
];

#[derive(Debug)]
pub enum SqlValue {
    String(String),
    I64(i64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    Null,
}

#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Build `UPDATE users SET ... WHERE id = ?` from a JSON object restricted
/// to the whitelisted columns.
pub fn build_user_update(payload: &Value, user_id: u64) -> Result<SqlUpdate, actix_web::Error> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ErrorBadRequest("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(ErrorBadRequest("No fields provided for update"));
    }

    let mut columns = Vec::with_capacity(obj.len());
    let mut values = Vec::with_capacity(obj.len() + 1);

    for (key, value) in obj {
        if !USER_UPDATE_COLUMNS.contains(&key.as_str()) {
            return Err(ErrorBadRequest(format!("Unknown column: {key}")));
        }
        columns.push(format!("{key} = ?"));
        values.push(coerce(value)?);
    }

    let sql = format!("UPDATE users SET {} WHERE id = ?", columns.join(", "));
    values.push(SqlValue::I64(user_id as i64));

    Ok(SqlUpdate { sql, values })
}

fn coerce(value: &Value) -> Result<SqlValue, actix_web::Error> {
    match value {
        Value::String(s) => {
            if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                Ok(SqlValue::Date(d))
            } else {
                Ok(SqlValue::String(s.clone()))
            }
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(SqlValue::I64(i))
            } else if let Some(f) = n.as_f64() {
                Ok(SqlValue::F64(f))
            } else {
                Err(ErrorBadRequest("Unsupported numeric value"))
            }
        }
        Value::Bool(b) => Ok(SqlValue::Bool(*b)),
        Value::Null => Ok(SqlValue::Null),
        _ => Err(ErrorBadRequest("Unsupported JSON value type")),
    }
}

pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_whitelisted_update() {
        let update = build_user_update(
            &json!({"department_id": 3, "is_intern": true, "start_date": "2026-01-05"}),
            42,
        )
        .unwrap();
        assert!(update.sql.starts_with("UPDATE users SET "));
        assert!(update.sql.ends_with("WHERE id = ?"));
        assert!(update.sql.contains("department_id = ?"));
        assert!(update.sql.contains("is_intern = ?"));
        // Three SET values plus the id.
        assert_eq!(update.values.len(), 4);
        assert!(matches!(update.values.last(), Some(SqlValue::I64(42))));
    }

    #[test]
    fn date_strings_bind_as_dates() {
        let update = build_user_update(&json!({"start_date": "2026-01-05"}), 1).unwrap();
        assert!(matches!(update.values[0], SqlValue::Date(_)));
        let update = build_user_update(&json!({"first_name": "Ana"}), 1).unwrap();
        assert!(matches!(update.values[0], SqlValue::String(_)));
    }

    #[test]
    fn unknown_columns_are_rejected() {
        assert!(build_user_update(&json!({"password": "x"}), 1).is_err());
        assert!(build_user_update(&json!({"id": 9}), 1).is_err());
        assert!(build_user_update(&json!({}), 1).is_err());
        assert!(build_user_update(&json!([1, 2]), 1).is_err());
    }
}
