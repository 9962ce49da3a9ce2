use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;

use crate::core::schedule::week_days;

/// Inputs the builder needs, already joined by the caller.
#[derive(Debug, Clone)]
pub struct MatrixDepartment {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct MatrixEmployee {
    pub user_id: u64,
    pub name: String,
    pub department_id: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct MatrixRecord {
    pub user_id: u64,
    pub date: NaiveDate,
    pub arrival: Option<NaiveTime>,
    pub departure: Option<NaiveTime>,
    pub verified_by: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DayCell {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, example = "08:30:00")]
    pub arrival: Option<NaiveTime>,
    #[schema(value_type = Option<String>, example = "17:30:00")]
    pub departure: Option<NaiveTime>,
    pub verified_by: Option<String>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub verified_at: Option<DateTime<Utc>>,
    pub is_verified: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MatrixRow {
    pub user_id: u64,
    pub employee: String,
    pub cells: Vec<DayCell>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MatrixGroup {
    pub department_id: Option<u64>,
    pub label: String,
    pub rows: Vec<MatrixRow>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WeekMatrix {
    #[schema(value_type = String, format = "date")]
    pub week_start: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub week_end: NaiveDate,
    #[schema(value_type = Vec<String>)]
    pub week_days: Vec<NaiveDate>,
    pub groups: Vec<MatrixGroup>,
}

pub const UNASSIGNED_LABEL: &str = "Unassigned";

/// One row per employee, grouped by department (name order), one cell per
/// day of the week. Employees without a department land in a trailing
/// "Unassigned" group, which is omitted when empty.
pub fn build_week_matrix(
    week_start: NaiveDate,
    departments: &[MatrixDepartment],
    employees: &[MatrixEmployee],
    records: &[MatrixRecord],
) -> WeekMatrix {
    let days = week_days(week_start);
    let week_end = days[6];

    let mut sorted_departments: Vec<&MatrixDepartment> = departments.iter().collect();
    sorted_departments.sort_by(|a, b| a.name.cmp(&b.name));

    let mut groups: Vec<MatrixGroup> = sorted_departments
        .iter()
        .map(|dept| MatrixGroup {
            department_id: Some(dept.id),
            label: dept.name.clone(),
            rows: Vec::new(),
        })
        .collect();
    let group_index: HashMap<u64, usize> = sorted_departments
        .iter()
        .enumerate()
        .map(|(idx, dept)| (dept.id, idx))
        .collect();
    let mut unassigned = MatrixGroup {
        department_id: None,
        label: UNASSIGNED_LABEL.to_string(),
        rows: Vec::new(),
    };

    let record_map: HashMap<(u64, NaiveDate), &MatrixRecord> = records
        .iter()
        .map(|record| ((record.user_id, record.date), record))
        .collect();

    for employee in employees {
        let cells = days
            .iter()
            .map(|day| {
                let record = record_map.get(&(employee.user_id, *day));
                DayCell {
                    date: *day,
                    arrival: record.and_then(|r| r.arrival),
                    departure: record.and_then(|r| r.departure),
                    verified_by: record.and_then(|r| r.verified_by.clone()),
                    verified_at: record.and_then(|r| r.verified_at),
                    is_verified: record.map(|r| r.verified_by.is_some()).unwrap_or(false),
                }
            })
            .collect();
        let row = MatrixRow {
            user_id: employee.user_id,
            employee: employee.name.clone(),
            cells,
        };
        match employee.department_id.and_then(|id| group_index.get(&id)) {
            Some(&idx) => groups[idx].rows.push(row),
            None => unassigned.rows.push(row),
        }
    }

    if !unassigned.rows.is_empty() {
        groups.push(unassigned);
    }

    WeekMatrix {
        week_start,
        week_end,
        week_days: days,
        groups,
    }
}

fn day_columns(day: NaiveDate) -> [String; 4] {
    [
        format!("{day} Arrival"),
        format!("{day} Departure"),
        format!("{day} Verified By"),
        format!("{day} Verified At"),
    ]
}

/// CSV header: department and employee, then four columns per day.
pub fn csv_header(days: &[NaiveDate]) -> Vec<String> {
    let mut header = vec!["Department".to_string(), "Employee".to_string()];
    for day in days {
        header.extend(day_columns(*day));
    }
    header
}

/// Per-sheet header for the spreadsheet export (one sheet per group, so no
/// department column).
pub fn sheet_header(days: &[NaiveDate]) -> Vec<String> {
    let mut header = vec!["Employee".to_string()];
    for day in days {
        header.extend(day_columns(*day));
    }
    header
}

fn cell_columns(cell: &DayCell) -> [String; 4] {
    [
        cell.arrival.map(|t| t.format("%H:%M").to_string()).unwrap_or_default(),
        cell.departure.map(|t| t.format("%H:%M").to_string()).unwrap_or_default(),
        cell.verified_by.clone().unwrap_or_default(),
        cell.verified_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default(),
    ]
}

/// Flat CSV rows, one per employee, department groups in matrix order.
pub fn csv_rows(matrix: &WeekMatrix) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for group in &matrix.groups {
        for row in &group.rows {
            let mut values = vec![group.label.clone(), row.employee.clone()];
            for cell in &row.cells {
                values.extend(cell_columns(cell));
            }
            rows.push(values);
        }
    }
    rows
}

/// Row values for one employee on a spreadsheet sheet.
pub fn sheet_row(row: &MatrixRow) -> Vec<String> {
    let mut values = vec![row.employee.clone()];
    for cell in &row.cells {
        values.extend(cell_columns(cell));
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn fixture() -> (Vec<MatrixDepartment>, Vec<MatrixEmployee>, Vec<MatrixRecord>) {
        let departments = vec![
            MatrixDepartment { id: 2, name: "Operations".into() },
            MatrixDepartment { id: 1, name: "Accounting".into() },
        ];
        let employees = vec![
            MatrixEmployee { user_id: 10, name: "Ana Silva".into(), department_id: Some(1) },
            MatrixEmployee { user_id: 11, name: "Ben Osei".into(), department_id: Some(2) },
            MatrixEmployee { user_id: 12, name: "Cleo Park".into(), department_id: None },
        ];
        let records = vec![MatrixRecord {
            user_id: 10,
            date: d(2026, 1, 5),
            arrival: Some(t(8, 30)),
            departure: Some(t(17, 30)),
            verified_by: Some("Sam Boss".into()),
            verified_at: Some(Utc.with_ymd_and_hms(2026, 1, 5, 18, 0, 0).unwrap()),
        }];
        (departments, employees, records)
    }

    #[test]
    fn groups_sorted_by_name_with_unassigned_last() {
        let (departments, employees, records) = fixture();
        let matrix = build_week_matrix(d(2026, 1, 5), &departments, &employees, &records);
        let labels: Vec<&str> = matrix.groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["Accounting", "Operations", UNASSIGNED_LABEL]);
        assert_eq!(matrix.groups[2].rows[0].employee, "Cleo Park");
    }

    #[test]
    fn unassigned_group_omitted_when_empty() {
        let (departments, mut employees, records) = fixture();
        employees.retain(|e| e.department_id.is_some());
        let matrix = build_week_matrix(d(2026, 1, 5), &departments, &employees, &records);
        assert!(matrix.groups.iter().all(|g| g.label != UNASSIGNED_LABEL));
    }

    #[test]
    fn every_row_has_seven_cells() {
        let (departments, employees, records) = fixture();
        let matrix = build_week_matrix(d(2026, 1, 5), &departments, &employees, &records);
        for group in &matrix.groups {
            for row in &group.rows {
                assert_eq!(row.cells.len(), 7);
            }
        }
        assert_eq!(matrix.week_end, d(2026, 1, 11));
    }

    #[test]
    fn recorded_day_fills_its_cell() {
        let (departments, employees, records) = fixture();
        let matrix = build_week_matrix(d(2026, 1, 5), &departments, &employees, &records);
        let cell = &matrix.groups[0].rows[0].cells[0];
        assert_eq!(cell.arrival, Some(t(8, 30)));
        assert!(cell.is_verified);
        let empty = &matrix.groups[0].rows[0].cells[1];
        assert!(empty.arrival.is_none());
        assert!(!empty.is_verified);
    }

    #[test]
    fn csv_header_repeats_four_columns_per_day() {
        let days = week_days(d(2026, 1, 5));
        let header = csv_header(&days);
        assert_eq!(header.len(), 2 + 7 * 4);
        assert_eq!(header[0], "Department");
        assert_eq!(header[1], "Employee");
        assert_eq!(header[2], "2026-01-05 Arrival");
        assert_eq!(header[3], "2026-01-05 Departure");
        assert_eq!(header[4], "2026-01-05 Verified By");
        assert_eq!(header[5], "2026-01-05 Verified At");
        assert_eq!(header[6], "2026-01-06 Arrival");
    }

    #[test]
    fn csv_rows_render_times_and_blanks() {
        let (departments, employees, records) = fixture();
        let matrix = build_week_matrix(d(2026, 1, 5), &departments, &employees, &records);
        let rows = csv_rows(&matrix);
        assert_eq!(rows.len(), 3);
        let ana = &rows[0];
        assert_eq!(ana[0], "Accounting");
        assert_eq!(ana[1], "Ana Silva");
        assert_eq!(ana[2], "08:30");
        assert_eq!(ana[3], "17:30");
        assert_eq!(ana[4], "Sam Boss");
        assert_eq!(ana[5], "2026-01-05 18:00");
        assert_eq!(ana[6], "");
        // Last group is Unassigned.
        assert_eq!(rows[2][0], UNASSIGNED_LABEL);
    }

    #[test]
    fn sheet_header_drops_the_department_column() {
        let days = week_days(d(2026, 1, 5));
        let header = sheet_header(&days);
        assert_eq!(header.len(), 1 + 7 * 4);
        assert_eq!(header[0], "Employee");
    }
}
