use sqlx::MySqlPool;

use crate::model::system_log::LogEvent;

/// Append a row to the audit trail without blocking the caller. A failed
/// insert is logged and swallowed; the primary action has already happened.
pub fn log_event(
    pool: &MySqlPool,
    event: LogEvent,
    user_id: Option<u64>,
    ip_address: &str,
    message: String,
    meta: serde_json::Value,
) {
    let pool = pool.clone();
    let ip_address = ip_address.to_string();

    actix_web::rt::spawn(async move {
        let result = sqlx::query(
            r#"
            INSERT INTO system_logs (event_type, message, user_id, ip_address, meta)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.to_string())
        .bind(&message)
        .bind(user_id)
        .bind(&ip_address)
        .bind(meta.to_string())
        .execute(&pool)
        .await;

        if let Err(e) = result {
            tracing::error!(error = %e, event = %event, "Failed to append system log");
        }
    });
}
