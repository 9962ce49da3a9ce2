use crate::{
    auth::jwt::{generate_access_token, generate_refresh_token, verify_token},
    auth::password::verify_password,
    config::Config,
    model::system_log::LogEvent,
    models::{LoginReqDto, TokenType, UserSql},
    utils::{audit, client_ip},
};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};

#[derive(Serialize, Deserialize)]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
}

/// Login endpoint
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = Object, example = json!({
            "access_token": "...",
            "refresh_token": "..."
        })),
        (status = 400, description = "Missing credentials"),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(req, pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    req: HttpRequest,
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return HttpResponse::BadRequest().body("Username or password required");
    }

    debug!("Fetching user from database");

    let db_user = match sqlx::query_as::<_, UserSql>(
        r#"
        SELECT id, username, password, role_id
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(&user.username)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(Some(user)) => {
            debug!(user_id = user.id, "User found");
            user
        }
        Ok(None) => {
            info!("Invalid credentials: user not found");
            return HttpResponse::Unauthorized().body("Invalid credentials");
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching user");
            return HttpResponse::InternalServerError().finish();
        }
    };

    debug!("Verifying password");

    if verify_password(&user.password, &db_user.password).is_err() {
        info!("Invalid credentials: password mismatch");
        return HttpResponse::Unauthorized().body("Invalid credentials");
    }

    // Remembered logins get the long refresh TTL.
    let remember = user.remember_me.unwrap_or(false);
    let refresh_ttl = if remember {
        config.remember_refresh_ttl
    } else {
        config.refresh_token_ttl
    };

    let (refresh_token, refresh_claims) = generate_refresh_token(
        db_user.id,
        db_user.username.clone(),
        db_user.role_id,
        &config.jwt_secret,
        refresh_ttl,
    );

    let access_token = generate_access_token(
        db_user.id,
        db_user.username.clone(),
        db_user.role_id,
        refresh_claims.jti.clone(),
        &config.jwt_secret,
        config.access_token_ttl,
    );

    debug!(
        user_id = db_user.id,
        jti = %refresh_claims.jti,
        "Storing refresh token"
    );

    if let Err(e) = sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(db_user.id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool.get_ref())
    .await
    {
        error!(error = %e, "Failed to store refresh token");
        return HttpResponse::InternalServerError().finish();
    }

    let ip_address = client_ip(&req);
    let user_agent = req
        .headers()
        .get(actix_web::http::header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("")
        .chars()
        .take(255)
        .collect::<String>();

    if let Err(e) = record_login_presence(
        pool.get_ref(),
        db_user.id,
        &refresh_claims.jti,
        &ip_address,
        &user_agent,
    )
    .await
    {
        // Presence tracking must not block a successful login.
        error!(error = %e, "Failed to record login presence");
    }

    // last_login_at is informational, also non-fatal.
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }

    audit::log_event(
        pool.get_ref(),
        LogEvent::Login,
        Some(db_user.id),
        &ip_address,
        format!("User {} logged in", db_user.username),
        json!({ "session_key": refresh_claims.jti }),
    );

    info!("Login successful");

    HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token,
    })
}

/// Session row plus the per-day login digest.
async fn record_login_presence(
    pool: &MySqlPool,
    user_id: u64,
    session_key: &str,
    ip_address: &str,
    user_agent: &str,
) -> Result<(), sqlx::Error> {
    let now = Utc::now();
    let today = Local::now().date_naive();

    sqlx::query(
        r#"
        INSERT INTO user_sessions
            (user_id, session_key, ip_address, user_agent, login_at, last_seen_at, is_active)
        VALUES (?, ?, ?, ?, ?, ?, TRUE)
        "#,
    )
    .bind(user_id)
    .bind(session_key)
    .bind(ip_address)
    .bind(user_agent)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO user_daily_logins
            (user_id, date, first_login_at, last_login_at, last_seen_at, last_ip, online)
        VALUES (?, ?, ?, ?, ?, ?, TRUE)
        ON DUPLICATE KEY UPDATE
            first_login_at = COALESCE(first_login_at, VALUES(first_login_at)),
            last_login_at = VALUES(last_login_at),
            last_seen_at = VALUES(last_seen_at),
            last_ip = VALUES(last_ip),
            online = TRUE
        "#,
    )
    .bind(user_id)
    .bind(today)
    .bind(now)
    .bind(now)
    .bind(now)
    .bind(ip_address)
    .execute(pool)
    .await?;

    Ok(())
}

/// Refresh endpoint: rotates the refresh token, keeping the session row.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = Object, example = json!({
            "access_token": "...",
            "refresh_token": "..."
        })),
        (status = 401, description = "Invalid, revoked or non-refresh token"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let header = match req.headers().get("Authorization") {
        Some(h) => h.to_str().unwrap_or(""),
        None => return Ok(HttpResponse::Unauthorized().body("No token")),
    };

    let token = match header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return Ok(HttpResponse::Unauthorized().body("Invalid token")),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return Ok(HttpResponse::Unauthorized().finish()),
    };

    if claims.token_type != TokenType::Refresh {
        return Ok(HttpResponse::Unauthorized().finish());
    }

    let record = sqlx::query_as::<_, (u64, u64, bool)>(
        r#"
        SELECT id, user_id, revoked
        FROM refresh_tokens
        WHERE jti = ?
        "#,
    )
    .bind(&claims.jti)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to look up refresh token");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let (record_id, record_user_id) = match record {
        Some((id, user_id, revoked)) if !revoked => (id, user_id),
        _ => return Ok(HttpResponse::Unauthorized().finish()),
    };

    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = ?")
        .bind(record_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to revoke refresh token");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let (new_refresh_token, new_claims) = generate_refresh_token(
        claims.user_id,
        claims.sub.clone(),
        claims.role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(record_user_id)
    .bind(&new_claims.jti)
    .bind(new_claims.exp as i64)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to store rotated refresh token");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    // Session rows are keyed by the refresh jti; carry the key forward so
    // the login session survives rotation.
    if let Err(e) = sqlx::query(
        "UPDATE user_sessions SET session_key = ? WHERE session_key = ? AND is_active = TRUE",
    )
    .bind(&new_claims.jti)
    .bind(&claims.jti)
    .execute(pool.get_ref())
    .await
    {
        error!(error = %e, "Failed to rotate session key");
    }

    let access_token = generate_access_token(
        claims.user_id,
        claims.sub.clone(),
        claims.role,
        new_claims.jti.clone(),
        &config.jwt_secret,
        config.access_token_ttl,
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "access_token": access_token,
        "refresh_token": new_refresh_token
    })))
}

/// Logout endpoint: revokes the refresh token and closes the session.
/// Succeeds (204) even for unknown or already-revoked tokens.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Logged out")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let header = match req.headers().get("Authorization") {
        Some(h) => h.to_str().unwrap_or(""),
        None => return HttpResponse::NoContent().finish(),
    };

    let token = match header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return HttpResponse::NoContent().finish(),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::NoContent().finish(),
    };

    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    let now = Utc::now();
    let today = Local::now().date_naive();

    // Revoke is idempotent.
    let _ = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await;

    let _ = sqlx::query(
        r#"
        UPDATE user_sessions
        SET is_active = FALSE, logout_at = ?
        WHERE session_key = ? AND is_active = TRUE
        "#,
    )
    .bind(now)
    .bind(&claims.jti)
    .execute(pool.get_ref())
    .await;

    let _ = sqlx::query("UPDATE user_daily_logins SET online = FALSE WHERE user_id = ? AND date = ?")
        .bind(claims.user_id)
        .bind(today)
        .execute(pool.get_ref())
        .await;

    audit::log_event(
        pool.get_ref(),
        LogEvent::Logout,
        Some(claims.user_id),
        &client_ip(&req),
        format!("User {} logged out", claims.sub),
        json!({ "session_key": claims.jti }),
    );

    HttpResponse::NoContent().finish()
}
