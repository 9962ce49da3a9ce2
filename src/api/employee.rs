use actix_web::{error::ErrorInternalServerError, web, HttpResponse, Responder};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::MySqlPool;
use tracing::{debug, error};
use utoipa::{IntoParams, ToSchema};

use crate::api::{fetch_user, USER_COLUMNS};
use crate::auth::auth::AuthUser;
use crate::auth::password::hash_password;
use crate::model::department::Department;
use crate::model::role::Role;
use crate::model::user::User;
use crate::utils::db_utils::{build_user_update, execute_update};

#[derive(Deserialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "Ana Silva")]
    pub full_name: String,
    #[schema(example = "asilva")]
    pub username: String,
    #[schema(example = "secret")]
    pub password: String,
    #[schema(example = 1)]
    pub department_id: Option<u64>,
    #[schema(example = false)]
    #[serde(default)]
    pub is_intern: bool,
    /// Defaults to today; attendance is only meaningful from this date on.
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Filter by department
    pub department_id: Option<u64>,
    /// Search by name or username
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<User>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateDepartment {
    #[schema(example = "ACC")]
    pub code: String,
    #[schema(example = "Accounting")]
    pub name: String,
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/v1/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee account created", body = Object, example = json!({
            "message": "Employee created."
        })),
        (status = 400, description = "Bad request"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Username already exists"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_supervisor_or_admin()?;

    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Username and password must not be empty"
        })));
    }

    // Full name splits into first word + remainder.
    let full_name = payload.full_name.trim();
    let mut parts = full_name.splitn(2, char::is_whitespace);
    let first_name = parts.next().unwrap_or("").to_string();
    let last_name = parts.next().unwrap_or("").trim().to_string();

    if let Some(department_id) = payload.department_id {
        let active = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM departments WHERE id = ? AND is_active = TRUE)",
        )
        .bind(department_id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to check department");
            ErrorInternalServerError("Internal Server Error")
        })?;
        if !active {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Unknown or inactive department."
            })));
        }
    }

    let hashed = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let start_date = payload
        .start_date
        .unwrap_or_else(|| Local::now().date_naive());

    let result = sqlx::query(
        r#"
        INSERT INTO users
            (username, password, first_name, last_name, role_id, department_id, is_intern, start_date)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(username)
    .bind(&hashed)
    .bind(&first_name)
    .bind(&last_name)
    .bind(Role::Employee.id())
    .bind(payload.department_id)
    .bind(payload.is_intern)
    .bind(start_date)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => Ok(HttpResponse::Created().json(json!({
            "message": "Employee created."
        }))),
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict().json(json!({
                        "message": "Username already exists."
                    })));
                }
            }
            error!(error = %e, "Failed to create employee");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Something went wrong, contact the system admin"
            })))
        }
    }
}

/// List employees
#[utoipa::path(
    get,
    path = "/api/v1/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_supervisor_or_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE role_id = ?");
    let mut args: Vec<FilterValue> = vec![FilterValue::U64(Role::Employee.id() as u64)];

    if let Some(department_id) = query.department_id {
        where_sql.push_str(" AND department_id = ?");
        args.push(FilterValue::U64(department_id));
    }

    let like;
    if let Some(search) = query.search.as_deref() {
        where_sql.push_str(" AND (first_name LIKE ? OR last_name LIKE ? OR username LIKE ?)");
        like = format!("%{search}%");
        args.push(FilterValue::Str(&like));
        args.push(FilterValue::Str(&like));
        args.push(FilterValue::Str(&like));
    }

    let count_sql = format!("SELECT COUNT(*) FROM users{where_sql}");
    debug!(sql = %count_sql, "Counting employees");

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count employees");
        ErrorInternalServerError("Database error")
    })?;

    let data_sql = format!(
        "SELECT {USER_COLUMNS} FROM users{where_sql} \
         ORDER BY last_name, first_name LIMIT ? OFFSET ?"
    );
    debug!(sql = %data_sql, page, per_page, "Fetching employees");

    let mut data_q = sqlx::query_as::<_, User>(&data_sql);
    for arg in &args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(*v),
            FilterValue::Str(s) => data_q.bind(*s),
        };
    }

    let employees = data_q
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch employees");
            ErrorInternalServerError("Database error")
        })?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees,
        page,
        per_page,
        total,
    }))
}

/// Get employee by id
#[utoipa::path(
    get,
    path = "/api/v1/employees/{user_id}",
    params(
        ("user_id", Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = User),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_supervisor_or_admin()?;

    let user_id = path.into_inner();

    let user = fetch_user(pool.get_ref(), user_id).await.map_err(|e| {
        error!(error = %e, user_id, "Failed to fetch employee");
        ErrorInternalServerError("Internal Server Error")
    })?;

    match user {
        Some(user) => Ok(HttpResponse::Ok().json(user)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found."
        }))),
    }
}

/// Update employee
#[utoipa::path(
    put,
    path = "/api/v1/employees/{user_id}",
    params(
        ("user_id", Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Employee updated", body = Object, example = json!({
            "message": "Employee updated."
        })),
        (status = 400, description = "Empty payload or unknown column"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_supervisor_or_admin()?;

    let user_id = path.into_inner();

    let update = build_user_update(&body, user_id)?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(|e| {
            error!(error = %e, user_id, "Failed to update employee");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found."
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee updated."
    })))
}

/// Create department
#[utoipa::path(
    post,
    path = "/api/v1/departments",
    request_body = CreateDepartment,
    responses(
        (status = 201, description = "Department created", body = Object, example = json!({
            "message": "Department created."
        })),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Code already exists"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn create_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateDepartment>,
) -> actix_web::Result<impl Responder> {
    auth.require_supervisor_or_admin()?;

    if payload.code.trim().is_empty() || payload.name.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Code and name must not be empty"
        })));
    }

    let result = sqlx::query("INSERT INTO departments (code, name) VALUES (?, ?)")
        .bind(payload.code.trim())
        .bind(payload.name.trim())
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(_) => Ok(HttpResponse::Created().json(json!({
            "message": "Department created."
        }))),
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict().json(json!({
                        "message": "Department code already exists."
                    })));
                }
            }
            error!(error = %e, "Failed to create department");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}

/// List departments
#[utoipa::path(
    get,
    path = "/api/v1/departments",
    responses(
        (status = 200, description = "Departments in name order", body = [Department])
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn list_departments(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let departments = sqlx::query_as::<_, Department>(
        "SELECT id, code, name, is_active, created_at FROM departments ORDER BY name",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch departments");
        ErrorInternalServerError("Database error")
    })?;

    Ok(HttpResponse::Ok().json(departments))
}
