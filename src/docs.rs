use crate::api::attendance::{
    PendingQuery, PendingResponse, PendingRow, SaveDayReq, VerifyReq, WeekDayRow, WeekQuery,
    WeekResponse,
};
use crate::api::dashboard::{
    DashboardQuery, DashboardResponse, DepartmentRow, EmployeeCard, EmployeeRow,
};
use crate::api::employee::{
    CreateDepartment, CreateEmployee, EmployeeListResponse, EmployeeQuery,
};
use crate::api::admin::{SessionListResponse, SessionQuery};
use crate::api::history::{HistoryQuery, HistoryResponse, WeekEntry};
use crate::api::justification::{
    CreateJustification, JustificationFilter, JustificationListResponse,
};
use crate::core::matrix::{DayCell, MatrixGroup, MatrixRow, WeekMatrix};
use crate::core::summary::WindowSummary;
use crate::model::attendance::AttendanceDay;
use crate::model::department::Department;
use crate::model::justification::{
    AbsenceJustification, JustificationReason, JustificationStatus,
};
use crate::model::presence::{UserDailyLogin, UserSession};
use crate::model::user::User;
use crate::models::LoginReqDto;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Presence API",
        version = "1.0.0",
        description = r#"
## Presence — Employee Attendance Tracking

This API powers an internal attendance tracker.

### 🔹 Key Features
- **Attendance Lifecycle**
  - Daily check-in/check-out, supervised edits, batch verification
- **Absence Justifications**
  - Filed by supervisors on behalf of employees, approved or rejected once
- **Aggregation & Reporting**
  - Presence/absence stats per employee and department, weekly matrices
- **History & Export**
  - Weekly review grids with CSV/XLSX export

### 🔐 Security
Endpoints are protected with **JWT Bearer authentication**; elevated
operations require the **Supervisor** or **Admin** role.

### 📦 Response Format
- JSON-based RESTful responses
- Every mutating action returns a single flash-style message

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::attendance::week_view,
        crate::api::attendance::save_day,
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::verify,
        crate::api::attendance::pending,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::create_department,
        crate::api::employee::list_departments,

        crate::api::justification::create_justification,
        crate::api::justification::approve_justification,
        crate::api::justification::reject_justification,
        crate::api::justification::justification_list,

        crate::api::dashboard::dashboard,

        crate::api::history::history,
        crate::api::history::history_week,
        crate::api::history::history_export,

        crate::api::admin::backup,
        crate::api::admin::sessions
    ),
    components(
        schemas(
            LoginReqDto,
            User,
            Department,
            AttendanceDay,
            AbsenceJustification,
            JustificationReason,
            JustificationStatus,
            WeekQuery,
            SaveDayReq,
            VerifyReq,
            PendingQuery,
            WeekDayRow,
            WeekResponse,
            PendingRow,
            PendingResponse,
            WindowSummary,
            CreateEmployee,
            EmployeeQuery,
            EmployeeListResponse,
            CreateDepartment,
            CreateJustification,
            JustificationFilter,
            JustificationListResponse,
            DashboardQuery,
            DashboardResponse,
            DepartmentRow,
            EmployeeRow,
            EmployeeCard,
            HistoryQuery,
            HistoryResponse,
            WeekEntry,
            WeekMatrix,
            MatrixGroup,
            MatrixRow,
            DayCell,
            SessionQuery,
            SessionListResponse,
            UserSession,
            UserDailyLogin
        )
    ),
    tags(
        (name = "Auth", description = "Login, refresh and logout"),
        (name = "Attendance", description = "Attendance lifecycle APIs"),
        (name = "Employee", description = "Employee account APIs"),
        (name = "Department", description = "Department APIs"),
        (name = "Justification", description = "Absence justification APIs"),
        (name = "Dashboard", description = "Aggregate statistics"),
        (name = "History", description = "Weekly review and export"),
        (name = "Admin", description = "Backup and maintenance"),
    )
)]
pub struct ApiDoc;
