use chrono::{NaiveDate, NaiveTime};
use derive_more::Display;

/// Why an arrival/departure edit was refused. Display strings double as the
/// user-facing flash messages.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum EditError {
    #[display(fmt = "This day is before the employee start date.")]
    BeforeStartDate,
    #[display(fmt = "Future days cannot be recorded.")]
    InFuture,
    #[display(fmt = "Only today can be submitted.")]
    NotToday,
    #[display(fmt = "Arrival already recorded. Ask a supervisor or admin to edit.")]
    ArrivalAlreadyRecorded,
    #[display(fmt = "Departure already recorded. Ask a supervisor or admin to edit.")]
    DepartureAlreadyRecorded,
    #[display(fmt = "Departure requires an arrival time. Ask a supervisor or admin.")]
    DepartureRequiresArrival,
}

impl EditError {
    /// Overwrite refusals are surfaced as warnings without a mutation; the
    /// rest are hard validation errors.
    pub fn is_warning(self) -> bool {
        matches!(
            self,
            EditError::ArrivalAlreadyRecorded | EditError::DepartureAlreadyRecorded
        )
    }
}

/// Everything the gating rules need to know about one attempted edit,
/// detached from account objects so the engine is testable with plain values.
#[derive(Debug, Clone, Copy)]
pub struct EditContext {
    /// Actor is an admin or supervisor.
    pub elevated: bool,
    /// Actor is the target employee editing their own record.
    pub self_service: bool,
    pub date: NaiveDate,
    pub today: NaiveDate,
    pub start_date: NaiveDate,
}

fn check_date(ctx: &EditContext) -> Result<(), EditError> {
    if ctx.date < ctx.start_date {
        return Err(EditError::BeforeStartDate);
    }
    if ctx.date > ctx.today {
        return Err(EditError::InFuture);
    }
    if ctx.self_service && ctx.date != ctx.today {
        return Err(EditError::NotToday);
    }
    Ok(())
}

/// Gate for setting the arrival field. Elevated actors may overwrite; a
/// self-service employee may only fill an empty field, today.
pub fn authorize_arrival(
    ctx: &EditContext,
    existing_arrival: Option<NaiveTime>,
) -> Result<(), EditError> {
    check_date(ctx)?;
    if existing_arrival.is_some() && !ctx.elevated {
        return Err(EditError::ArrivalAlreadyRecorded);
    }
    Ok(())
}

/// Gate for setting the departure field. `arrival` is the value the record
/// will hold once this request lands, so an arrival being set in the same
/// request satisfies the precondition.
pub fn authorize_departure(
    ctx: &EditContext,
    arrival: Option<NaiveTime>,
    existing_departure: Option<NaiveTime>,
) -> Result<(), EditError> {
    check_date(ctx)?;
    if arrival.is_none() && !ctx.elevated {
        return Err(EditError::DepartureRequiresArrival);
    }
    if existing_departure.is_some() && !ctx.elevated {
        return Err(EditError::DepartureAlreadyRecorded);
    }
    Ok(())
}

/// View-layer flag mirroring `authorize_arrival`, used to lock week cells.
pub fn can_edit_arrival(ctx: &EditContext, existing_arrival: Option<NaiveTime>) -> bool {
    authorize_arrival(ctx, existing_arrival).is_ok()
}

/// View-layer flag mirroring `authorize_departure`.
pub fn can_edit_departure(
    ctx: &EditContext,
    arrival: Option<NaiveTime>,
    existing_departure: Option<NaiveTime>,
) -> bool {
    authorize_departure(ctx, arrival, existing_departure).is_ok()
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

    fn self_today() -> EditContext {
        EditContext {
            elevated: false,
            self_service: true,
            date: d(2026, 1, 7),
            today: d(2026, 1, 7),
            start_date: d(2026, 1, 5),
        }
    }

    fn supervisor(date: NaiveDate) -> EditContext {
        EditContext {
            elevated: true,
            self_service: false,
            date,
            today: d(2026, 1, 7),
            start_date: d(2026, 1, 5),
        }
    }

    #[test]
    fn self_service_first_arrival_is_allowed() {
        assert!(authorize_arrival(&self_today(), None).is_ok());
    }

    #[test]
    fn self_service_second_arrival_is_a_warning_not_an_error() {
        let err = authorize_arrival(&self_today(), Some(t(8, 30))).unwrap_err();
        assert_eq!(err, EditError::ArrivalAlreadyRecorded);
        assert!(err.is_warning());
    }

    #[test]
    fn self_service_is_today_only() {
        let mut ctx = self_today();
        ctx.date = d(2026, 1, 6);
        assert_eq!(authorize_arrival(&ctx, None).unwrap_err(), EditError::NotToday);
    }

    #[test]
    fn nobody_edits_before_start_date() {
        let ctx = supervisor(d(2026, 1, 2));
        assert_eq!(
            authorize_arrival(&ctx, None).unwrap_err(),
            EditError::BeforeStartDate
        );
    }

    #[test]
    fn nobody_edits_the_future() {
        let ctx = supervisor(d(2026, 1, 8));
        assert_eq!(authorize_arrival(&ctx, None).unwrap_err(), EditError::InFuture);
        assert!(!authorize_arrival(&ctx, None).unwrap_err().is_warning());
    }

    #[test]
    fn supervisor_may_overwrite_any_past_day() {
        let ctx = supervisor(d(2026, 1, 6));
        assert!(authorize_arrival(&ctx, Some(t(8, 30))).is_ok());
        assert!(authorize_departure(&ctx, Some(t(8, 30)), Some(t(17, 30))).is_ok());
    }

    #[test]
    fn departure_requires_arrival_without_elevation() {
        let err = authorize_departure(&self_today(), None, None).unwrap_err();
        assert_eq!(err, EditError::DepartureRequiresArrival);
        assert!(!err.is_warning());
    }

    #[test]
    fn supervisor_sets_departure_without_arrival() {
        let ctx = supervisor(d(2026, 1, 6));
        assert!(authorize_departure(&ctx, None, None).is_ok());
    }

    #[test]
    fn arrival_set_in_same_request_satisfies_departure_precondition() {
        assert!(authorize_departure(&self_today(), Some(t(8, 30)), None).is_ok());
    }

    #[test]
    fn edit_flags_mirror_the_gates() {
        let ctx = self_today();
        assert!(can_edit_arrival(&ctx, None));
        assert!(!can_edit_arrival(&ctx, Some(t(8, 30))));
        assert!(!can_edit_departure(&ctx, None, None));
        assert!(can_edit_departure(&ctx, Some(t(8, 30)), None));
    }
}
