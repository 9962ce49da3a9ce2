use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use utoipa::ToSchema;

use crate::core::schedule::{expected_daily_hours, hours_between, working_days_between};

/// One attendance day as the aggregation sees it.
#[derive(Debug, Clone, Copy)]
pub struct DaySpan {
    pub date: NaiveDate,
    pub arrival: Option<NaiveTime>,
    pub departure: Option<NaiveTime>,
}

/// Presence/absence totals for one employee over a clipped date window.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct WindowSummary {
    #[schema(example = 22)]
    pub expected_days: u32,
    #[schema(example = 20)]
    pub present_days: u32,
    #[schema(example = 2)]
    pub absent_days: u32,
    #[schema(example = 180.0)]
    pub present_hours: f64,
    #[schema(example = 198.0)]
    pub expected_hours: f64,
    #[schema(example = 18.0)]
    pub absent_hours: f64,
}

impl WindowSummary {
    fn empty() -> Self {
        WindowSummary {
            expected_days: 0,
            present_days: 0,
            absent_days: 0,
            present_hours: 0.0,
            expected_hours: 0.0,
            absent_hours: 0.0,
        }
    }
}

/// Summarize `days` over [start, end] clipped to [employee_start, today].
///
/// Days with an arrival count as present; hours accrue only from days with
/// both times set, each span floored at zero. An empty clipped window yields
/// all zeros.
pub fn summarize_window(
    start: NaiveDate,
    end: NaiveDate,
    employee_start: NaiveDate,
    today: NaiveDate,
    is_intern: bool,
    days: &[DaySpan],
) -> WindowSummary {
    let effective_start = start.max(employee_start);
    let effective_end = end.min(today);
    if effective_start > effective_end {
        return WindowSummary::empty();
    }

    let in_window = |d: &&DaySpan| d.date >= effective_start && d.date <= effective_end;

    let present_days = days
        .iter()
        .filter(in_window)
        .filter(|d| d.arrival.is_some())
        .count() as u32;

    let present_hours: f64 = days
        .iter()
        .filter(in_window)
        .filter_map(|d| match (d.arrival, d.departure) {
            (Some(arrival), Some(departure)) => Some(hours_between(arrival, departure)),
            _ => None,
        })
        .sum();

    let expected_days = working_days_between(effective_start, effective_end);
    let expected_hours = expected_daily_hours(is_intern) * expected_days as f64;

    WindowSummary {
        expected_days,
        present_days,
        absent_days: expected_days.saturating_sub(present_days),
        present_hours,
        expected_hours,
        absent_hours: (expected_hours - present_hours).max(0.0),
    }
}

/// Presence rate as a percentage; zero expected days never divides.
pub fn department_rate(present: u32, expected: u32) -> f64 {
    if expected == 0 {
        0.0
    } else {
        present as f64 / expected as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn span(date: NaiveDate, arrival: Option<NaiveTime>, departure: Option<NaiveTime>) -> DaySpan {
        DaySpan { date, arrival, departure }
    }

    #[test]
    fn window_clips_to_start_date() {
        // Employee starts Monday 2026-01-05; the requested window opens earlier
        // and closes Saturday 2026-01-10. Only Mon-Fri of the clipped range count.
        let summary = summarize_window(
            d(2026, 1, 1),
            d(2026, 1, 10),
            d(2026, 1, 5),
            d(2026, 1, 31),
            false,
            &[],
        );
        assert_eq!(summary.expected_days, 5);
        assert_eq!(summary.absent_days, 5);
    }

    #[test]
    fn absent_days_never_negative() {
        // Present on Saturday and Sunday: more present days than expected ones.
        let days = [
            span(d(2026, 1, 10), Some(t(9, 0)), None),
            span(d(2026, 1, 11), Some(t(9, 0)), None),
        ];
        let summary = summarize_window(
            d(2026, 1, 10),
            d(2026, 1, 11),
            d(2026, 1, 1),
            d(2026, 1, 31),
            false,
            &days,
        );
        assert_eq!(summary.expected_days, 0);
        assert_eq!(summary.present_days, 2);
        assert_eq!(summary.absent_days, 0);
    }

    #[test]
    fn arrival_only_days_contribute_zero_hours() {
        let days = [
            span(d(2026, 1, 5), Some(t(8, 30)), None),
            span(d(2026, 1, 6), Some(t(8, 30)), Some(t(17, 30))),
        ];
        let summary = summarize_window(
            d(2026, 1, 5),
            d(2026, 1, 9),
            d(2026, 1, 1),
            d(2026, 1, 31),
            false,
            &days,
        );
        assert_eq!(summary.present_days, 2);
        assert_eq!(summary.present_hours, 9.0);
    }

    #[test]
    fn intern_and_standard_quotas() {
        let days = [span(d(2026, 1, 5), Some(t(8, 30)), Some(t(16, 30)))];
        let intern = summarize_window(
            d(2026, 1, 5),
            d(2026, 1, 5),
            d(2026, 1, 1),
            d(2026, 1, 31),
            true,
            &days,
        );
        assert_eq!(intern.present_hours, 8.0);
        assert_eq!(intern.expected_hours, 8.0);
        assert_eq!(intern.absent_hours, 0.0);

        let days = [span(d(2026, 1, 5), Some(t(8, 30)), Some(t(17, 30)))];
        let standard = summarize_window(
            d(2026, 1, 5),
            d(2026, 1, 5),
            d(2026, 1, 1),
            d(2026, 1, 31),
            false,
            &days,
        );
        assert_eq!(standard.present_hours, 9.0);
        assert_eq!(standard.expected_hours, 9.0);
    }

    #[test]
    fn negative_day_spans_floor_at_zero() {
        let days = [span(d(2026, 1, 5), Some(t(17, 0)), Some(t(9, 0)))];
        let summary = summarize_window(
            d(2026, 1, 5),
            d(2026, 1, 5),
            d(2026, 1, 1),
            d(2026, 1, 31),
            false,
            &days,
        );
        assert_eq!(summary.present_hours, 0.0);
    }

    #[test]
    fn future_window_is_empty() {
        let summary = summarize_window(
            d(2026, 2, 1),
            d(2026, 2, 28),
            d(2026, 1, 1),
            d(2026, 1, 15),
            false,
            &[],
        );
        assert_eq!(summary.expected_days, 0);
        assert_eq!(summary.expected_hours, 0.0);
        assert_eq!(summary.absent_days, 0);
    }

    #[test]
    fn rate_handles_zero_expected() {
        assert_eq!(department_rate(0, 0), 0.0);
        assert_eq!(department_rate(5, 0), 0.0);
        assert_eq!(department_rate(5, 10), 50.0);
        assert_eq!(department_rate(10, 10), 100.0);
    }
}
