use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::{Duration, Local, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::api::{display_name, fetch_day, fetch_user};
use crate::auth::auth::AuthUser;
use crate::core::lifecycle::{
    authorize_arrival, authorize_departure, can_edit_arrival, can_edit_departure, EditContext,
    EditError,
};
use crate::core::schedule::{self, parse_date, parse_time_or_default, week_days, work_start_time};
use crate::core::summary::{summarize_window, DaySpan, WindowSummary};
use crate::model::role::Role;
use crate::model::system_log::LogEvent;
use crate::model::user::User;
use crate::utils::{audit, client_ip};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct WeekQuery {
    /// Week start date (ISO); defaults to the current week's Monday.
    #[param(example = "2026-01-05")]
    pub week: Option<String>,
    /// Target employee id; elevated viewers only.
    #[param(example = 42)]
    pub user: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct SaveDayReq {
    /// Defaults to the caller.
    pub user_id: Option<u64>,
    #[schema(example = "2026-01-05")]
    pub date: String,
    #[serde(default)]
    pub set_arrival: bool,
    /// "HH:MM"; the workday start when absent or malformed.
    #[schema(example = "08:30")]
    pub arrival_time: Option<String>,
    #[serde(default)]
    pub set_departure: bool,
    /// "HH:MM"; the employee's expected end of day when absent or malformed.
    #[schema(example = "17:30")]
    pub departure_time: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct VerifyReq {
    #[schema(example = json!([101, 102, 103]))]
    pub ids: Vec<u64>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PendingQuery {
    /// Defaults to today.
    #[param(example = "2026-01-05")]
    pub date: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct WeekDayRow {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, example = "08:30:00")]
    pub arrival_time: Option<NaiveTime>,
    #[schema(value_type = Option<String>, example = "17:30:00")]
    pub departure_time: Option<NaiveTime>,
    pub is_present: bool,
    pub is_verified: bool,
    pub can_edit_arrival: bool,
    pub can_edit_departure: bool,
    pub is_future: bool,
    pub is_before_start: bool,
    pub is_locked: bool,
}

#[derive(Serialize, ToSchema)]
pub struct WeekResponse {
    #[schema(value_type = String, format = "date")]
    pub week_start: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub week_end: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub prev_week: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub next_week: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub today: NaiveDate,
    pub user_id: u64,
    pub employee: String,
    pub is_self_service: bool,
    #[schema(value_type = String, example = "17:30:00")]
    pub default_departure_time: NaiveTime,
    pub days: Vec<WeekDayRow>,
    pub summary: WindowSummary,
}

#[derive(Serialize, ToSchema)]
pub struct PendingRow {
    pub id: u64,
    pub user_id: u64,
    pub employee: String,
    pub department: Option<String>,
    #[schema(value_type = Option<String>, example = "08:30:00")]
    pub arrival_time: Option<NaiveTime>,
}

#[derive(Serialize, ToSchema)]
pub struct PendingResponse {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    /// The verification screen is locked until the viewer records their own
    /// arrival for today.
    pub needs_checkin: bool,
    pub pending: Vec<PendingRow>,
}

struct EditTarget {
    user: User,
    elevated: bool,
    self_service: bool,
}

/// Resolve who is being edited/viewed and in which capacity. Non-elevated
/// callers may only name themselves.
async fn resolve_target(
    auth: &AuthUser,
    pool: &MySqlPool,
    requested: Option<u64>,
) -> actix_web::Result<Result<EditTarget, HttpResponse>> {
    let target_id = requested.unwrap_or(auth.user_id);
    if target_id != auth.user_id {
        auth.require_supervisor_or_admin()?;
    }

    let user = fetch_user(pool, target_id).await.map_err(|e| {
        error!(error = %e, target_id, "Failed to fetch user");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let user = match user {
        Some(user) => user,
        None => {
            return Ok(Err(HttpResponse::NotFound().json(json!({
                "message": "Employee not found."
            }))));
        }
    };

    let elevated = auth.role.is_elevated();
    let self_service = !elevated && user.id == auth.user_id;

    Ok(Ok(EditTarget { user, elevated, self_service }))
}

/// Week view for one employee
#[utoipa::path(
    get,
    path = "/api/v1/attendance/week",
    params(WeekQuery),
    responses(
        (status = 200, description = "Week rows with edit flags and summary", body = WeekResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Non-elevated viewer named another user"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn week_view(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<WeekQuery>,
) -> actix_web::Result<impl Responder> {
    let target = match resolve_target(&auth, pool.get_ref(), query.user).await? {
        Ok(target) => target,
        Err(resp) => return Ok(resp),
    };

    let today = Local::now().date_naive();
    let week_start =
        parse_date(query.week.as_deref()).unwrap_or_else(|| schedule::week_start(today));
    let days = week_days(week_start);
    let week_end = days[6];

    let records = sqlx::query_as::<_, crate::model::attendance::AttendanceDay>(
        r#"
        SELECT id, user_id, date, arrival_time, departure_time, verified_by, verified_at
        FROM attendance_days
        WHERE user_id = ? AND date BETWEEN ? AND ?
        "#,
    )
    .bind(target.user.id)
    .bind(week_start)
    .bind(week_end)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id = target.user.id, "Failed to fetch week records");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let spans: Vec<DaySpan> = records
        .iter()
        .map(|r| DaySpan {
            date: r.date,
            arrival: r.arrival_time,
            departure: r.departure_time,
        })
        .collect();
    let summary = summarize_window(
        week_start,
        week_end,
        target.user.start_date,
        today,
        target.user.is_intern,
        &spans,
    );

    let day_rows = days
        .iter()
        .map(|day| {
            let record = records.iter().find(|r| r.date == *day);
            let ctx = EditContext {
                elevated: target.elevated,
                self_service: target.self_service,
                date: *day,
                today,
                start_date: target.user.start_date,
            };
            let arrival = record.and_then(|r| r.arrival_time);
            let departure = record.and_then(|r| r.departure_time);
            let is_before_start = *day < target.user.start_date;
            WeekDayRow {
                date: *day,
                arrival_time: arrival,
                departure_time: departure,
                is_present: record.map(|r| r.is_present()).unwrap_or(false),
                is_verified: record.map(|r| r.is_verified()).unwrap_or(false),
                can_edit_arrival: can_edit_arrival(&ctx, arrival),
                can_edit_departure: can_edit_departure(&ctx, arrival, departure),
                is_future: *day > today,
                is_before_start,
                is_locked: is_before_start
                    || *day > today
                    || (target.self_service && *day != today),
            }
        })
        .collect();

    Ok(HttpResponse::Ok().json(WeekResponse {
        week_start,
        week_end,
        prev_week: week_start - Duration::days(7),
        next_week: week_start + Duration::days(7),
        today,
        user_id: target.user.id,
        employee: target.user.full_name(),
        is_self_service: target.self_service,
        default_departure_time: target.user.expected_end_time(),
        days: day_rows,
        summary,
    }))
}

/// Persist whichever of the two time fields this request may set. NULL
/// values leave the stored field untouched, so one statement covers
/// creation, partial fill and elevated overwrite.
async fn upsert_day(
    pool: &MySqlPool,
    user_id: u64,
    date: NaiveDate,
    arrival: Option<NaiveTime>,
    departure: Option<NaiveTime>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO attendance_days (user_id, date, arrival_time, departure_time)
        VALUES (?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            arrival_time = COALESCE(VALUES(arrival_time), arrival_time),
            departure_time = COALESCE(VALUES(departure_time), departure_time)
        "#,
    )
    .bind(user_id)
    .bind(date)
    .bind(arrival)
    .bind(departure)
    .execute(pool)
    .await?;
    Ok(())
}

/// Set arrival/departure on one day
#[utoipa::path(
    post,
    path = "/api/v1/attendance/day",
    request_body = SaveDayReq,
    responses(
        (status = 200, description = "Saved, or a warning when a self-service overwrite was refused", body = Object, example = json!({
            "message": "Attendance saved.",
            "severity": "success",
            "changed": true
        })),
        (status = 400, description = "Rejected by the lifecycle rules"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn save_day(
    auth: AuthUser,
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    payload: web::Json<SaveDayReq>,
) -> actix_web::Result<impl Responder> {
    let target = match resolve_target(&auth, pool.get_ref(), payload.user_id).await? {
        Ok(target) => target,
        Err(resp) => return Ok(resp),
    };

    let date = match parse_date(Some(payload.date.as_str())) {
        Some(date) => date,
        None => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Select a valid day to save."
            })));
        }
    };

    let today = Local::now().date_naive();
    let ctx = EditContext {
        elevated: target.elevated,
        self_service: target.self_service,
        date,
        today,
        start_date: target.user.start_date,
    };

    let existing = fetch_day(pool.get_ref(), target.user.id, date)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = target.user.id, "Failed to fetch attendance day");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;
    let current_arrival = existing.as_ref().and_then(|r| r.arrival_time);
    let current_departure = existing.as_ref().and_then(|r| r.departure_time);

    let mut new_arrival: Option<NaiveTime> = None;
    let mut new_departure: Option<NaiveTime> = None;
    let mut warning: Option<EditError> = None;

    if payload.set_arrival {
        match authorize_arrival(&ctx, current_arrival) {
            Ok(()) => {
                new_arrival = Some(parse_time_or_default(
                    payload.arrival_time.as_deref(),
                    work_start_time(),
                ));
            }
            Err(e) if e.is_warning() => warning = Some(e),
            Err(e) => {
                return Ok(HttpResponse::BadRequest().json(json!({ "message": e.to_string() })));
            }
        }
    }

    if payload.set_departure {
        // An arrival set by this same request satisfies the precondition.
        match authorize_departure(&ctx, new_arrival.or(current_arrival), current_departure) {
            Ok(()) => {
                new_departure = Some(parse_time_or_default(
                    payload.departure_time.as_deref(),
                    target.user.expected_end_time(),
                ));
            }
            Err(e) if e.is_warning() => warning = warning.or(Some(e)),
            Err(e) => {
                return Ok(HttpResponse::BadRequest().json(json!({ "message": e.to_string() })));
            }
        }
    }

    if new_arrival.is_some() || new_departure.is_some() {
        upsert_day(pool.get_ref(), target.user.id, date, new_arrival, new_departure)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = target.user.id, "Failed to save attendance day");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;

        audit::log_event(
            pool.get_ref(),
            LogEvent::Attendance,
            Some(auth.user_id),
            &client_ip(&req),
            format!("Attendance updated by {}", auth.username),
            json!({
                "employee": target.user.username,
                "day": date.to_string(),
                "arrival": new_arrival.map(|t| t.to_string()),
                "departure": new_departure.map(|t| t.to_string()),
            }),
        );

        return Ok(HttpResponse::Ok().json(json!({
            "message": "Attendance saved.",
            "severity": "success",
            "changed": true
        })));
    }

    if let Some(warning) = warning {
        return Ok(HttpResponse::Ok().json(json!({
            "message": warning.to_string(),
            "severity": "warning",
            "changed": false
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "No changes to save for this day.",
        "severity": "info",
        "changed": false
    })))
}

/// Self check-in for today
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-in",
    responses(
        (status = 200, description = "Checked in, or a warning when already checked in", body = Object, example = json!({
            "message": "Checked in successfully",
            "severity": "success",
            "changed": true
        })),
        (status = 400, description = "Today precedes the start date"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let user = fetch_user(pool.get_ref(), auth.user_id)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = auth.user_id, "Failed to fetch user");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?
        .ok_or_else(|| actix_web::error::ErrorForbidden("Unknown account"))?;

    let today = Local::now().date_naive();
    if today < user.start_date {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": EditError::BeforeStartDate.to_string()
        })));
    }

    let now_time = Local::now().time();

    // Never overwrites: the punch only lands on an empty arrival field.
    let result = sqlx::query(
        r#"
        INSERT INTO attendance_days (user_id, date, arrival_time)
        VALUES (?, ?, ?)
        ON DUPLICATE KEY UPDATE
            arrival_time = COALESCE(arrival_time, VALUES(arrival_time))
        "#,
    )
    .bind(auth.user_id)
    .bind(today)
    .bind(now_time)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id = auth.user_id, "Check-in failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::Ok().json(json!({
            "message": "Already checked in today",
            "severity": "warning",
            "changed": false
        })));
    }

    audit::log_event(
        pool.get_ref(),
        LogEvent::Attendance,
        Some(auth.user_id),
        &client_ip(&req),
        format!("{} checked in", auth.username),
        json!({ "date": today.to_string() }),
    );

    Ok(HttpResponse::Ok().json(json!({
        "message": "Checked in successfully",
        "severity": "success",
        "changed": true
    })))
}

/// Self check-out for today
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-out",
    responses(
        (status = 200, description = "Checked out, or a warning when already checked out", body = Object, example = json!({
            "message": "Checked out successfully",
            "severity": "success",
            "changed": true
        })),
        (status = 400, description = "No arrival recorded for today"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let user = fetch_user(pool.get_ref(), auth.user_id)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = auth.user_id, "Failed to fetch user");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?
        .ok_or_else(|| actix_web::error::ErrorForbidden("Unknown account"))?;

    let today = Local::now().date_naive();
    let elevated = auth.role.is_elevated();
    let ctx = EditContext {
        elevated,
        self_service: !elevated,
        date: today,
        today,
        start_date: user.start_date,
    };

    let existing = fetch_day(pool.get_ref(), auth.user_id, today)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = auth.user_id, "Failed to fetch attendance day");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;
    let arrival = existing.as_ref().and_then(|r| r.arrival_time);
    let departure = existing.as_ref().and_then(|r| r.departure_time);

    match authorize_departure(&ctx, arrival, departure) {
        Ok(()) => {}
        Err(e) if e.is_warning() => {
            return Ok(HttpResponse::Ok().json(json!({
                "message": e.to_string(),
                "severity": "warning",
                "changed": false
            })));
        }
        Err(e) => {
            return Ok(HttpResponse::BadRequest().json(json!({ "message": e.to_string() })));
        }
    }

    upsert_day(
        pool.get_ref(),
        auth.user_id,
        today,
        None,
        Some(Local::now().time()),
    )
    .await
    .map_err(|e| {
        error!(error = %e, user_id = auth.user_id, "Check-out failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    audit::log_event(
        pool.get_ref(),
        LogEvent::Attendance,
        Some(auth.user_id),
        &client_ip(&req),
        format!("{} checked out", auth.username),
        json!({ "date": today.to_string() }),
    );

    Ok(HttpResponse::Ok().json(json!({
        "message": "Checked out successfully",
        "severity": "success",
        "changed": true
    })))
}

/// Is the viewer's own arrival for today still missing?
async fn needs_self_checkin(pool: &MySqlPool, user_id: u64) -> Result<bool, sqlx::Error> {
    let today = Local::now().date_naive();
    let record = fetch_day(pool, user_id, today).await?;
    Ok(record.and_then(|r| r.arrival_time).is_none())
}

/// Verify a batch of attendance days
#[utoipa::path(
    post,
    path = "/api/v1/attendance/verify",
    request_body = VerifyReq,
    responses(
        (status = 200, description = "Count of newly verified rows; already-verified ids are skipped", body = Object, example = json!({
            "verified": 3,
            "message": "Verified 3 employees."
        })),
        (status = 400, description = "Viewer has not checked in today"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn verify(
    auth: AuthUser,
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    payload: web::Json<VerifyReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_supervisor_or_admin()?;

    // A supervisor approves nobody before recording their own arrival.
    let gate = needs_self_checkin(pool.get_ref(), auth.user_id)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = auth.user_id, "Failed to check self check-in");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;
    if gate {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Check in before verifying attendance."
        })));
    }

    if payload.ids.is_empty() {
        return Ok(HttpResponse::Ok().json(json!({
            "verified": 0,
            "message": "No records selected."
        })));
    }

    let placeholders = vec!["?"; payload.ids.len()].join(", ");
    let sql = format!(
        "UPDATE attendance_days SET verified_by = ?, verified_at = ? \
         WHERE verified_by IS NULL AND id IN ({placeholders})"
    );

    let mut query = sqlx::query(&sql).bind(auth.user_id).bind(Utc::now());
    for id in &payload.ids {
        query = query.bind(*id);
    }

    let result = query.execute(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Verification update failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let verified = result.rows_affected();

    if verified > 0 {
        audit::log_event(
            pool.get_ref(),
            LogEvent::Verify,
            Some(auth.user_id),
            &client_ip(&req),
            format!("{} verified {} employees", auth.username, verified),
            json!({ "count": verified, "ids": payload.ids.clone() }),
        );
    }

    let message = if verified > 0 {
        format!("Verified {verified} employees.")
    } else {
        "No new records verified.".to_string()
    };

    Ok(HttpResponse::Ok().json(json!({
        "verified": verified,
        "message": message
    })))
}

#[derive(sqlx::FromRow)]
struct PendingSql {
    id: u64,
    user_id: u64,
    username: String,
    first_name: String,
    last_name: String,
    department: Option<String>,
    arrival_time: Option<NaiveTime>,
}

/// Unverified arrivals for a date
#[utoipa::path(
    get,
    path = "/api/v1/attendance/pending",
    params(PendingQuery),
    responses(
        (status = 200, description = "Verification screen data", body = PendingResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn pending(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PendingQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_supervisor_or_admin()?;

    let date = parse_date(query.date.as_deref()).unwrap_or_else(|| Local::now().date_naive());

    let needs_checkin = needs_self_checkin(pool.get_ref(), auth.user_id)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = auth.user_id, "Failed to check self check-in");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let rows = sqlx::query_as::<_, PendingSql>(
        r#"
        SELECT a.id, a.user_id, u.username, u.first_name, u.last_name,
               d.name AS department, a.arrival_time
        FROM attendance_days a
        JOIN users u ON u.id = a.user_id
        LEFT JOIN departments d ON d.id = u.department_id
        WHERE a.date = ?
          AND a.arrival_time IS NOT NULL
          AND a.verified_by IS NULL
          AND u.role_id = ?
        ORDER BY d.name, u.last_name, u.first_name
        "#,
    )
    .bind(date)
    .bind(Role::Employee.id())
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch pending attendance");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let pending = rows
        .into_iter()
        .map(|row| PendingRow {
            id: row.id,
            user_id: row.user_id,
            employee: display_name(&row.first_name, &row.last_name, &row.username),
            department: row.department,
            arrival_time: row.arrival_time,
        })
        .collect();

    Ok(HttpResponse::Ok().json(PendingResponse {
        date,
        needs_checkin,
        pending,
    }))
}
