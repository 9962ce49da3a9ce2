use actix_web::middleware::Next;
use actix_web::{
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
    Error, HttpMessage,
};
use chrono::{Local, Utc};
use sqlx::MySqlPool;

use crate::auth::auth::AuthUser;
use crate::utils::presence_cache;

/// Heartbeat: refresh the viewer's presence rows on authenticated traffic,
/// throttled to once per interval per user. Runs after `auth_middleware`
/// has populated the request extensions; failures never fail the request.
pub async fn activity_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let seen = {
        let extensions = req.extensions();
        extensions
            .get::<AuthUser>()
            .map(|user| (user.user_id, user.session_key.clone()))
    };

    if let Some((user_id, session_key)) = seen {
        if presence_cache::should_heartbeat(user_id).await {
            presence_cache::mark_seen(user_id).await;

            if let Some(pool) = req.app_data::<Data<MySqlPool>>() {
                let pool = pool.get_ref().clone();
                let ip_address = req
                    .connection_info()
                    .realip_remote_addr()
                    .unwrap_or("")
                    .to_string();

                actix_web::rt::spawn(async move {
                    if let Err(e) = touch_presence(&pool, user_id, &session_key, &ip_address).await
                    {
                        tracing::warn!(error = %e, user_id, "Presence heartbeat failed");
                    }
                });
            }
        }
    }

    next.call(req).await
}

async fn touch_presence(
    pool: &MySqlPool,
    user_id: u64,
    session_key: &str,
    ip_address: &str,
) -> Result<(), sqlx::Error> {
    let now = Utc::now();
    let today = Local::now().date_naive();

    sqlx::query(
        r#"
        INSERT INTO user_daily_logins (user_id, date, last_seen_at, last_ip, online)
        VALUES (?, ?, ?, ?, TRUE)
        ON DUPLICATE KEY UPDATE
            last_seen_at = VALUES(last_seen_at),
            last_ip = VALUES(last_ip),
            online = TRUE
        "#,
    )
    .bind(user_id)
    .bind(today)
    .bind(now)
    .bind(ip_address)
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        UPDATE user_sessions
        SET last_seen_at = ?, ip_address = ?
        WHERE user_id = ? AND session_key = ? AND is_active = TRUE
        "#,
    )
    .bind(now)
    .bind(ip_address)
    .bind(user_id)
    .bind(session_key)
    .execute(pool)
    .await?;

    Ok(())
}
