use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::api::display_name;
use crate::auth::auth::AuthUser;
use crate::core::matrix::{
    build_week_matrix, csv_header, csv_rows, sheet_header, sheet_row, MatrixDepartment,
    MatrixEmployee, MatrixRecord, WeekMatrix,
};
use crate::core::schedule::{parse_date, week_label, weeks_between};
use crate::model::role::Role;
use crate::model::system_log::LogEvent;
use crate::utils::{audit, client_ip};

const WEEKS_PER_PAGE: usize = 10;

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct HistoryQuery {
    /// Window start (ISO); defaults to 90 days ago.
    pub start: Option<String>,
    /// Window end (ISO); defaults to today.
    pub end: Option<String>,
    /// Page number (starts at 1).
    pub page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct WeekEntry {
    #[schema(value_type = String, format = "date")]
    pub start: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end: NaiveDate,
    #[schema(example = "2026-01-05 to 2026-01-11")]
    pub label: String,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryResponse {
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub page: u32,
    pub per_page: u32,
    pub total: usize,
    pub weeks: Vec<WeekEntry>,
}

/// Paginated week list
#[utoipa::path(
    get,
    path = "/api/v1/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Week windows covering the range", body = HistoryResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "History"
)]
pub async fn history(
    auth: AuthUser,
    query: web::Query<HistoryQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_supervisor_or_admin()?;

    let today = Local::now().date_naive();
    let mut start_date =
        parse_date(query.start.as_deref()).unwrap_or_else(|| today - Duration::days(90));
    let mut end_date = parse_date(query.end.as_deref()).unwrap_or(today);
    if start_date > end_date {
        std::mem::swap(&mut start_date, &mut end_date);
    }

    let weeks = weeks_between(start_date, end_date);
    let total = weeks.len();
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page as usize - 1) * WEEKS_PER_PAGE;

    let entries = weeks
        .into_iter()
        .skip(offset)
        .take(WEEKS_PER_PAGE)
        .map(|(start, end)| WeekEntry {
            start,
            end,
            label: week_label(start),
        })
        .collect();

    Ok(HttpResponse::Ok().json(HistoryResponse {
        start_date,
        end_date,
        page,
        per_page: WEEKS_PER_PAGE as u32,
        total,
        weeks: entries,
    }))
}

#[derive(sqlx::FromRow)]
struct EmployeeSql {
    id: u64,
    username: String,
    first_name: String,
    last_name: String,
    department_id: Option<u64>,
}

#[derive(sqlx::FromRow)]
struct RecordSql {
    user_id: u64,
    date: NaiveDate,
    arrival_time: Option<NaiveTime>,
    departure_time: Option<NaiveTime>,
    verified_at: Option<DateTime<Utc>>,
    verifier_username: Option<String>,
    verifier_first: Option<String>,
    verifier_last: Option<String>,
}

async fn load_matrix(
    pool: &MySqlPool,
    week_start: NaiveDate,
) -> Result<WeekMatrix, actix_web::Error> {
    let week_end = week_start + Duration::days(6);

    let departments = sqlx::query_as::<_, (u64, String)>(
        "SELECT id, name FROM departments ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch departments");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?
    .into_iter()
    .map(|(id, name)| MatrixDepartment { id, name })
    .collect::<Vec<_>>();

    let employees = sqlx::query_as::<_, EmployeeSql>(
        r#"
        SELECT u.id, u.username, u.first_name, u.last_name, u.department_id
        FROM users u
        LEFT JOIN departments d ON d.id = u.department_id
        WHERE u.role_id = ?
        ORDER BY d.name, u.last_name, u.first_name
        "#,
    )
    .bind(Role::Employee.id())
    .fetch_all(pool)
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch employees");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?
    .into_iter()
    .map(|row| MatrixEmployee {
        user_id: row.id,
        name: display_name(&row.first_name, &row.last_name, &row.username),
        department_id: row.department_id,
    })
    .collect::<Vec<_>>();

    let records = sqlx::query_as::<_, RecordSql>(
        r#"
        SELECT a.user_id, a.date, a.arrival_time, a.departure_time, a.verified_at,
               v.username AS verifier_username,
               v.first_name AS verifier_first,
               v.last_name AS verifier_last
        FROM attendance_days a
        JOIN users u ON u.id = a.user_id
        LEFT JOIN users v ON v.id = a.verified_by
        WHERE u.role_id = ? AND a.date BETWEEN ? AND ?
        "#,
    )
    .bind(Role::Employee.id())
    .bind(week_start)
    .bind(week_end)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch week records");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?
    .into_iter()
    .map(|row| {
        let verified_by = row.verifier_username.as_deref().map(|username| {
            display_name(
                row.verifier_first.as_deref().unwrap_or(""),
                row.verifier_last.as_deref().unwrap_or(""),
                username,
            )
        });
        MatrixRecord {
            user_id: row.user_id,
            date: row.date,
            arrival: row.arrival_time,
            departure: row.departure_time,
            verified_by,
            verified_at: row.verified_at,
        }
    })
    .collect::<Vec<_>>();

    Ok(build_week_matrix(week_start, &departments, &employees, &records))
}

/// Week matrix
#[utoipa::path(
    get,
    path = "/api/v1/history/week/{week_start}",
    params(
        ("week_start" = String, Path, description = "Week start date (ISO)")
    ),
    responses(
        (status = 200, description = "Employees by department, one cell per weekday", body = WeekMatrix),
        (status = 400, description = "Invalid week start"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "History"
)]
pub async fn history_week(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require_supervisor_or_admin()?;

    let week_start = match parse_date(Some(path.as_str())) {
        Some(date) => date,
        None => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": "Invalid week start."
            })));
        }
    };

    let matrix = load_matrix(pool.get_ref(), week_start).await?;
    Ok(HttpResponse::Ok().json(matrix))
}

fn export_csv(matrix: &WeekMatrix) -> Result<Vec<u8>, actix_web::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(csv_header(&matrix.week_days))
        .map_err(|e| {
            error!(error = %e, "CSV header write failed");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;
    for row in csv_rows(matrix) {
        writer.write_record(&row).map_err(|e| {
            error!(error = %e, "CSV row write failed");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;
    }
    writer.into_inner().map_err(|e| {
        error!(error = %e, "CSV flush failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })
}

fn export_xlsx(matrix: &WeekMatrix) -> Result<Vec<u8>, actix_web::Error> {
    let internal = |e: rust_xlsxwriter::XlsxError| {
        error!(error = %e, "XLSX build failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    };

    let mut workbook = rust_xlsxwriter::Workbook::new();
    let header = sheet_header(&matrix.week_days);

    for group in &matrix.groups {
        let worksheet = workbook.add_worksheet();
        // Sheet names are capped at 31 characters.
        let name: String = group.label.chars().take(31).collect();
        worksheet.set_name(&name).map_err(internal)?;

        for (col, value) in header.iter().enumerate() {
            worksheet
                .write_string(0, col as u16, value)
                .map_err(internal)?;
        }
        for (idx, row) in group.rows.iter().enumerate() {
            for (col, value) in sheet_row(row).iter().enumerate() {
                worksheet
                    .write_string(idx as u32 + 1, col as u16, value)
                    .map_err(internal)?;
            }
        }
    }

    // A workbook cannot be saved without at least one sheet.
    if matrix.groups.is_empty() {
        let worksheet = workbook.add_worksheet();
        for (col, value) in header.iter().enumerate() {
            worksheet
                .write_string(0, col as u16, value)
                .map_err(internal)?;
        }
    }

    workbook.save_to_buffer().map_err(internal)
}

/// Export one week as csv or xlsx
#[utoipa::path(
    get,
    path = "/api/v1/history/export/{week_start}/{fmt}",
    params(
        ("week_start" = String, Path, description = "Week start date (ISO)"),
        ("fmt" = String, Path, description = "csv or xlsx")
    ),
    responses(
        (status = 200, description = "Attachment with one row per employee"),
        (status = 400, description = "Invalid week start or unsupported format"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "History"
)]
pub async fn history_export(
    auth: AuthUser,
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    path: web::Path<(String, String)>,
) -> actix_web::Result<impl Responder> {
    auth.require_supervisor_or_admin()?;

    let (week_start_raw, fmt) = path.into_inner();
    let week_start = match parse_date(Some(week_start_raw.as_str())) {
        Some(date) => date,
        None => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": "Invalid week start."
            })));
        }
    };

    if fmt != "csv" && fmt != "xlsx" {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Format not supported."
        })));
    }

    let matrix = load_matrix(pool.get_ref(), week_start).await?;

    let (body, content_type) = if fmt == "csv" {
        (export_csv(&matrix)?, "text/csv")
    } else {
        (
            export_xlsx(&matrix)?,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        )
    };

    audit::log_event(
        pool.get_ref(),
        LogEvent::Export,
        Some(auth.user_id),
        &client_ip(&req),
        format!("Weekly {} exported by {}", fmt.to_uppercase(), auth.username),
        serde_json::json!({ "week_start": week_start.to_string() }),
    );

    Ok(HttpResponse::Ok()
        .content_type(content_type)
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"attendance_{week_start}.{fmt}\""),
        ))
        .body(body))
}
