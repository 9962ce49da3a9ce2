use actix_web::{web, HttpResponse, Responder};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use std::collections::HashMap;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::api::USER_COLUMNS;
use crate::auth::auth::AuthUser;
use crate::core::schedule::{is_online, parse_date, week_start};
use crate::core::summary::{department_rate, summarize_window, DaySpan, WindowSummary};
use crate::model::department::Department;
use crate::model::presence::UserDailyLogin;
use crate::model::role::Role;
use crate::model::user::User;

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct DashboardQuery {
    /// Window start (ISO); defaults to 30 days ago.
    #[param(example = "2026-01-01")]
    pub start: Option<String>,
    /// Window end (ISO); defaults to today.
    #[param(example = "2026-01-31")]
    pub end: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct DepartmentRow {
    pub department_id: u64,
    pub department: String,
    #[schema(example = 40)]
    pub expected: u32,
    #[schema(example = 36)]
    pub present: u32,
    #[schema(example = 90.0)]
    pub rate: f64,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeRow {
    pub user_id: u64,
    pub employee: String,
    pub department: Option<String>,
    pub summary: WindowSummary,
}

/// All-time digest shown on the employee cards, with derived online status.
#[derive(Serialize, ToSchema)]
pub struct EmployeeCard {
    pub user_id: u64,
    pub employee: String,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    pub online: bool,
    #[schema(example = 320.0)]
    pub present_hours: f64,
    #[schema(example = 40.0)]
    pub absent_hours: f64,
    #[schema(example = 4)]
    pub absent_days: u32,
}

#[derive(Serialize, ToSchema)]
pub struct DashboardResponse {
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub current_week_start: NaiveDate,
    pub departments: Vec<DepartmentRow>,
    pub employees: Vec<EmployeeRow>,
    pub cards: Vec<EmployeeCard>,
}

#[derive(sqlx::FromRow)]
struct AttendanceSql {
    user_id: u64,
    date: NaiveDate,
    arrival_time: Option<NaiveTime>,
    departure_time: Option<NaiveTime>,
}

/// Admin dashboard
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Aggregated stats over the window", body = DashboardResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn dashboard(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<DashboardQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let today = Local::now().date_naive();
    let mut start_date =
        parse_date(query.start.as_deref()).unwrap_or_else(|| today - Duration::days(30));
    let mut end_date = parse_date(query.end.as_deref()).unwrap_or(today);
    if start_date > end_date {
        std::mem::swap(&mut start_date, &mut end_date);
    }

    let departments = sqlx::query_as::<_, Department>(
        "SELECT id, code, name, is_active, created_at FROM departments ORDER BY name",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch departments");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let employees_sql = format!(
        "SELECT {USER_COLUMNS} FROM users WHERE role_id = ? \
         ORDER BY last_name, first_name"
    );
    let employees = sqlx::query_as::<_, User>(&employees_sql)
        .bind(Role::Employee.id())
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch employees");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    // All history up to today in one pass; both the window rows and the
    // all-time cards are computed from it in memory.
    let records = sqlx::query_as::<_, AttendanceSql>(
        r#"
        SELECT a.user_id, a.date, a.arrival_time, a.departure_time
        FROM attendance_days a
        JOIN users u ON u.id = a.user_id
        WHERE u.role_id = ? AND a.date <= ?
        "#,
    )
    .bind(Role::Employee.id())
    .bind(today)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch attendance records");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let mut spans_by_user: HashMap<u64, Vec<DaySpan>> = HashMap::new();
    for record in records {
        spans_by_user.entry(record.user_id).or_default().push(DaySpan {
            date: record.date,
            arrival: record.arrival_time,
            departure: record.departure_time,
        });
    }

    let daily_logins = sqlx::query_as::<_, UserDailyLogin>(
        r#"
        SELECT id, user_id, date, first_login_at, last_login_at, last_seen_at, last_ip, online
        FROM user_daily_logins
        WHERE date = ?
        "#,
    )
    .bind(today)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch daily logins");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;
    let presence: HashMap<u64, (bool, Option<DateTime<Utc>>)> = daily_logins
        .into_iter()
        .map(|row| (row.user_id, (row.online, row.last_seen_at)))
        .collect();

    let dept_names: HashMap<u64, &str> = departments
        .iter()
        .map(|d| (d.id, d.name.as_str()))
        .collect();
    let mut dept_totals: HashMap<u64, (u32, u32)> = HashMap::new();

    let now = Utc::now();
    let empty = Vec::new();
    let mut employee_rows = Vec::with_capacity(employees.len());
    let mut cards = Vec::with_capacity(employees.len());

    for employee in &employees {
        let spans = spans_by_user.get(&employee.id).unwrap_or(&empty);

        let summary = summarize_window(
            start_date,
            end_date,
            employee.start_date,
            today,
            employee.is_intern,
            spans,
        );

        if let Some(dept_id) = employee.department_id {
            let totals = dept_totals.entry(dept_id).or_default();
            totals.0 += summary.expected_days;
            totals.1 += summary.present_days;
        }

        employee_rows.push(EmployeeRow {
            user_id: employee.id,
            employee: employee.full_name(),
            department: employee
                .department_id
                .and_then(|id| dept_names.get(&id).map(|name| name.to_string())),
            summary,
        });

        let total = summarize_window(
            employee.start_date,
            today,
            employee.start_date,
            today,
            employee.is_intern,
            spans,
        );
        let (online_flag, last_seen) = presence
            .get(&employee.id)
            .copied()
            .unwrap_or((false, None));

        cards.push(EmployeeCard {
            user_id: employee.id,
            employee: employee.full_name(),
            start_date: employee.start_date,
            online: is_online(online_flag, last_seen, now),
            present_hours: total.present_hours,
            absent_hours: total.absent_hours,
            absent_days: total.absent_days,
        });
    }

    let department_rows = departments
        .iter()
        .map(|dept| {
            let (expected, present) = dept_totals.get(&dept.id).copied().unwrap_or((0, 0));
            DepartmentRow {
                department_id: dept.id,
                department: dept.name.clone(),
                expected,
                present,
                rate: department_rate(present, expected),
            }
        })
        .collect();

    Ok(HttpResponse::Ok().json(DashboardResponse {
        start_date,
        end_date,
        current_week_start: week_start(today),
        departments: department_rows,
        employees: employee_rows,
        cards,
    }))
}
