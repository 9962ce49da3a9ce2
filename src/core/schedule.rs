use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

/// Heartbeat middleware refreshes presence at most this often per user.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 60;
/// A stored "online" flag older than this is treated as offline.
pub const ONLINE_STALE_AFTER_SECS: i64 = 300;

pub fn work_start_time() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 30, 0).unwrap()
}

pub fn work_end_time() -> NaiveTime {
    NaiveTime::from_hms_opt(17, 30, 0).unwrap()
}

pub fn intern_end_time() -> NaiveTime {
    NaiveTime::from_hms_opt(16, 30, 0).unwrap()
}

pub fn expected_end_time(is_intern: bool) -> NaiveTime {
    if is_intern {
        intern_end_time()
    } else {
        work_end_time()
    }
}

/// Daily quota in hours, measured from the fixed workday start.
pub fn expected_daily_hours(is_intern: bool) -> f64 {
    hours_between(work_start_time(), expected_end_time(is_intern))
}

/// Monday of the week containing `day`.
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(day.weekday().num_days_from_monday() as i64)
}

pub fn week_days(week_start: NaiveDate) -> Vec<NaiveDate> {
    (0..7).map(|offset| week_start + Duration::days(offset)).collect()
}

pub fn week_label(week_start: NaiveDate) -> String {
    let week_end = week_start + Duration::days(6);
    format!("{} to {}", week_start, week_end)
}

/// Count of weekdays (Mon-Fri) in the inclusive range. Zero when start > end.
pub fn working_days_between(start: NaiveDate, end: NaiveDate) -> u32 {
    let mut count = 0;
    let mut current = start;
    while current <= end {
        if current.weekday().num_days_from_monday() < 5 {
            count += 1;
        }
        current += Duration::days(1);
    }
    count
}

/// Hours from `start` to `end` on the same day, floored at zero.
pub fn hours_between(start: NaiveTime, end: NaiveTime) -> f64 {
    let delta = end.signed_duration_since(start);
    (delta.num_seconds() as f64 / 3600.0).max(0.0)
}

pub fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    value
        .filter(|v| !v.is_empty())
        .and_then(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").ok())
}

/// Lenient "HH:MM" parsing; anything malformed or absent yields `default`.
pub fn parse_time_or_default(value: Option<&str>, default: NaiveTime) -> NaiveTime {
    value
        .filter(|v| !v.is_empty())
        .and_then(|v| NaiveTime::parse_from_str(v, "%H:%M").ok())
        .unwrap_or(default)
}

/// Aligned week windows covering [start, end], oldest first.
pub fn weeks_between(start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let mut weeks = Vec::new();
    let mut current = week_start(start);
    while current <= end {
        weeks.push((current, current + Duration::days(6)));
        current += Duration::days(7);
    }
    weeks
}

/// Derived presence: the stored flag alone is not trusted, a missed logout
/// would leave it stale forever.
pub fn is_online(flag: bool, last_seen_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last_seen_at {
        Some(seen) => flag && (now - seen).num_seconds() <= ONLINE_STALE_AFTER_SECS,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn week_start_is_monday() {
        // 2026-01-07 is a Wednesday.
        assert_eq!(week_start(d(2026, 1, 7)), d(2026, 1, 5));
        assert_eq!(week_start(d(2026, 1, 5)), d(2026, 1, 5));
        assert_eq!(week_start(d(2026, 1, 11)), d(2026, 1, 5));
    }

    #[test]
    fn week_days_spans_seven() {
        let days = week_days(d(2026, 1, 5));
        assert_eq!(days.len(), 7);
        assert_eq!(days[0], d(2026, 1, 5));
        assert_eq!(days[6], d(2026, 1, 11));
    }

    #[test]
    fn working_days_skips_weekends() {
        // Mon 2026-01-05 .. Fri 2026-01-09
        assert_eq!(working_days_between(d(2026, 1, 5), d(2026, 1, 9)), 5);
        // Full week including the weekend still counts 5.
        assert_eq!(working_days_between(d(2026, 1, 5), d(2026, 1, 11)), 5);
        // Inverted range counts nothing.
        assert_eq!(working_days_between(d(2026, 1, 9), d(2026, 1, 5)), 0);
        // Saturday only.
        assert_eq!(working_days_between(d(2026, 1, 10), d(2026, 1, 10)), 0);
    }

    #[test]
    fn hours_between_floors_negative_spans() {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        assert_eq!(hours_between(t(8, 30), t(17, 30)), 9.0);
        assert_eq!(hours_between(t(8, 30), t(16, 30)), 8.0);
        assert_eq!(hours_between(t(17, 0), t(9, 0)), 0.0);
    }

    #[test]
    fn daily_quota_depends_on_intern_flag() {
        assert_eq!(expected_daily_hours(false), 9.0);
        assert_eq!(expected_daily_hours(true), 8.0);
    }

    #[test]
    fn parse_time_falls_back_to_default() {
        let default = work_start_time();
        assert_eq!(parse_time_or_default(Some("09:15"), default), NaiveTime::from_hms_opt(9, 15, 0).unwrap());
        assert_eq!(parse_time_or_default(Some("not a time"), default), default);
        assert_eq!(parse_time_or_default(Some(""), default), default);
        assert_eq!(parse_time_or_default(None, default), default);
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert_eq!(parse_date(Some("2026-01-05")), Some(d(2026, 1, 5)));
        assert_eq!(parse_date(Some("05/01/2026")), None);
        assert_eq!(parse_date(Some("")), None);
        assert_eq!(parse_date(None), None);
    }

    #[test]
    fn weeks_between_aligns_to_monday() {
        let weeks = weeks_between(d(2026, 1, 7), d(2026, 1, 20));
        assert_eq!(weeks.len(), 3);
        assert_eq!(weeks[0], (d(2026, 1, 5), d(2026, 1, 11)));
        assert_eq!(weeks[2], (d(2026, 1, 19), d(2026, 1, 25)));
    }

    #[test]
    fn online_requires_fresh_last_seen() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap();
        let fresh = now - Duration::seconds(30);
        let stale = now - Duration::seconds(ONLINE_STALE_AFTER_SECS + 1);
        assert!(is_online(true, Some(fresh), now));
        assert!(!is_online(true, Some(stale), now));
        assert!(!is_online(false, Some(fresh), now));
        assert!(!is_online(true, None, now));
    }
}
