use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::api::fetch_user;
use crate::auth::auth::AuthUser;
use crate::model::justification::{
    receipt_upload_path, AbsenceJustification, JustificationReason,
};
use crate::model::role::Role;
use crate::model::system_log::LogEvent;
use crate::utils::{audit, client_ip};

#[derive(Deserialize, ToSchema)]
pub struct CreateJustification {
    /// Employee the absence belongs to.
    #[schema(example = 42)]
    pub user_id: u64,
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-07", value_type = String, format = "date")]
    pub end_date: NaiveDate,
    #[schema(example = "medical")]
    pub reason: JustificationReason,
    #[schema(example = "Medical appointment")]
    pub other_reason: Option<String>,
    /// Name of an uploaded receipt file; its storage path is derived here.
    #[schema(example = "receipt.pdf")]
    pub receipt_filename: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct JustificationFilter {
    /// Filter by employee ID
    #[param(example = 42)]
    pub user_id: Option<u64>,
    /// Filter by status
    #[param(example = "pending")]
    pub status: Option<String>,
    /// Pagination page number (starts at 1)
    pub page: Option<u64>,
    /// Items per page
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct JustificationListResponse {
    pub data: Vec<AbsenceJustification>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

/* =========================
Create justification (Supervisor/Admin, on behalf of an employee)
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/justifications",
    request_body = CreateJustification,
    responses(
        (status = 201, description = "Justification recorded as pending", body = Object, example = json!({
            "message": "Justification saved.",
            "status": "pending"
        })),
        (status = 400, description = "Bad dates or missing description"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Justification"
)]
pub async fn create_justification(
    auth: AuthUser,
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateJustification>,
) -> actix_web::Result<impl Responder> {
    auth.require_supervisor_or_admin()?;

    if payload.start_date > payload.end_date {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "End date must be after start date."
        })));
    }

    let needs_text = payload.reason == JustificationReason::Other
        && payload
            .other_reason
            .as_deref()
            .map(|t| t.trim().is_empty())
            .unwrap_or(true);
    if needs_text {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Please describe the reason."
        })));
    }

    let employee = fetch_user(pool.get_ref(), payload.user_id)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = payload.user_id, "Failed to fetch employee");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;
    let employee = match employee {
        Some(user) if user.role_id == Role::Employee.id() => user,
        _ => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Employee not found."
            })));
        }
    };

    let receipt_path = payload.receipt_filename.as_deref().map(|filename| {
        receipt_upload_path(
            &employee.full_name(),
            payload.start_date,
            payload.end_date,
            filename,
        )
    });

    sqlx::query(
        r#"
        INSERT INTO absence_justifications
            (user_id, created_by, start_date, end_date, reason, other_reason, receipt_path, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, 'pending')
        "#,
    )
    .bind(employee.id)
    .bind(auth.user_id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.reason.to_string())
    .bind(payload.other_reason.as_deref())
    .bind(receipt_path.as_deref())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to create justification");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    audit::log_event(
        pool.get_ref(),
        LogEvent::Justification,
        Some(auth.user_id),
        &client_ip(&req),
        format!("Justification added by {}", auth.username),
        json!({ "employee": employee.username }),
    );

    Ok(HttpResponse::Created().json(json!({
        "message": "Justification saved.",
        "status": "pending"
    })))
}

/* =========================
Approve justification (Supervisor/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/justifications/{justification_id}/approve",
    params(
        ("justification_id" = u64, Path, description = "ID of the justification to approve")
    ),
    responses(
        (status = 200, description = "Justification approved", body = Object, example = json!({
            "message": "Justification approved"
        })),
        (status = 400, description = "Not found or already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Justification"
)]
pub async fn approve_justification(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_supervisor_or_admin()?;

    let justification_id = path.into_inner();

    // One-way transition: only pending rows move.
    let result = sqlx::query(
        r#"
        UPDATE absence_justifications
        SET status = 'approved'
        WHERE id = ?
        AND status = 'pending'
        "#,
    )
    .bind(justification_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, justification_id, "Approve justification failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Justification not found or already processed"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Justification approved"
    })))
}

/* =========================
Reject justification (Supervisor/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/justifications/{justification_id}/reject",
    params(
        ("justification_id" = u64, Path, description = "ID of the justification to reject")
    ),
    responses(
        (status = 200, description = "Justification rejected", body = Object, example = json!({
            "message": "Justification rejected"
        })),
        (status = 400, description = "Not found or already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Justification"
)]
pub async fn reject_justification(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_supervisor_or_admin()?;

    let justification_id = path.into_inner();

    let result = sqlx::query(
        r#"
        UPDATE absence_justifications
        SET status = 'rejected'
        WHERE id = ?
        AND status = 'pending'
        "#,
    )
    .bind(justification_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, justification_id, "Reject justification failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Justification not found or already processed"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Justification rejected"
    })))
}

/// List justifications
#[utoipa::path(
    get,
    path = "/api/v1/justifications",
    params(JustificationFilter),
    responses(
        (status = 200, description = "Paginated justification list", body = JustificationListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Justification"
)]
pub async fn justification_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<JustificationFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_supervisor_or_admin()?;

    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(user_id) = query.user_id {
        where_sql.push_str(" AND user_id = ?");
        args.push(FilterValue::U64(user_id));
    }

    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status));
    }

    let count_sql = format!("SELECT COUNT(*) FROM absence_justifications{where_sql}");

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count justifications");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let data_sql = format!(
        r#"
        SELECT id, user_id, created_by, start_date, end_date, reason,
               other_reason, receipt_path, status, created_at
        FROM absence_justifications
        {where_sql}
        ORDER BY start_date DESC
        LIMIT ? OFFSET ?
        "#
    );

    let mut data_q = sqlx::query_as::<_, AbsenceJustification>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }

    let justifications = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch justification list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(JustificationListResponse {
        data: justifications,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}
