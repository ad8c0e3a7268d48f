use chrono::{DateTime, Duration, FixedOffset, NaiveTime};
use derive_more::Display;

use crate::model::attendance::AttendanceRecord;
use crate::model::schedule::AttendanceSchedule;

/// A return from break counts as on time from this long before break end.
const ON_TIME_RETURN_LEAD_MINUTES: i64 = 15;

/// The four schedule boundaries materialized as instants on one civil day
/// in the reference zone.
#[derive(Debug, Clone, Copy)]
pub struct DayWindows {
    pub check_in_deadline: DateTime<FixedOffset>,
    pub break_start: DateTime<FixedOffset>,
    pub break_end: DateTime<FixedOffset>,
    pub check_out: DateTime<FixedOffset>,
}

impl DayWindows {
    /// `day_start` must be midnight in the reference zone (see
    /// [`ReferenceZone::day_start`](crate::core::clock::ReferenceZone::day_start)).
    pub fn for_day(schedule: &AttendanceSchedule, day_start: DateTime<FixedOffset>) -> Self {
        let at = |t: NaiveTime| day_start + (t - NaiveTime::MIN);
        Self {
            check_in_deadline: at(schedule.check_in_deadline),
            break_start: at(schedule.break_start_time),
            break_end: at(schedule.break_end_time),
            check_out: at(schedule.check_out_time),
        }
    }

    pub fn on_time_return_opens(&self) -> DateTime<FixedOffset> {
        self.break_end - Duration::minutes(ON_TIME_RETURN_LEAD_MINUTES)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CheckInStatus {
    #[display(fmt = "on time")]
    OnTime,
    #[display(fmt = "late")]
    Late,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ReturnStatus {
    #[display(fmt = "on time")]
    OnTime,
    #[display(fmt = "late")]
    Late,
}

/// The single stage an accepted request is allowed to record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    CheckIn(CheckInStatus),
    BreakStart,
    BreakEnd(ReturnStatus),
    CheckOut,
}

impl Transition {
    pub fn message(&self) -> String {
        match self {
            Transition::CheckIn(status) => format!("Checked in: {status}."),
            Transition::BreakStart => "Break started.".to_string(),
            Transition::BreakEnd(status) => format!("Returned from break: {status}."),
            Transition::CheckOut => "Checked out.".to_string(),
        }
    }
}

/// Why a request fell outside its legal window. Messages are surfaced
/// verbatim to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum WindowDenied {
    #[display(fmt = "Check-in window has closed for today.")]
    CheckInClosed,
    #[display(fmt = "Not yet time for break.")]
    BreakNotOpen,
    #[display(fmt = "Not yet time to return from break.")]
    ReturnNotOpen,
    #[display(fmt = "Not yet time to check out.")]
    CheckOutNotOpen,
    #[display(fmt = "All attendance stages are already recorded for today.")]
    DayComplete,
}

/// Decide which transition, if any, is legal for this user at `now`.
///
/// Daily progression: no record -> checked in -> on break -> returned ->
/// checked out, where the break stage may be skipped entirely: a user who
/// never scanned for break moves straight to check-out once that window
/// opens. Rejections leave the record (and the submitted token) untouched.
///
/// Boundaries are inclusive on the side they name: exactly at break end a
/// return is still on time, exactly at check-out time leaving is allowed.
pub fn evaluate(
    existing: Option<&AttendanceRecord>,
    windows: &DayWindows,
    now: DateTime<FixedOffset>,
) -> Result<Transition, WindowDenied> {
    let Some(record) = existing else {
        return first_check_in(windows, now);
    };

    if record.break_start_time.is_some() && record.break_end_time.is_none() {
        return return_from_break(windows, now);
    }

    // Break not yet started: the break window itself, or, past break end,
    // fall through to check-out so a skipped break never wedges the day.
    if record.break_start_time.is_none() {
        if now < windows.break_start {
            return Err(WindowDenied::BreakNotOpen);
        }
        if now < windows.break_end {
            return Ok(Transition::BreakStart);
        }
    }

    if record.check_out_time.is_none() {
        if now < windows.check_out {
            return Err(WindowDenied::CheckOutNotOpen);
        }
        return Ok(Transition::CheckOut);
    }

    Err(WindowDenied::DayComplete)
}

fn first_check_in(
    windows: &DayWindows,
    now: DateTime<FixedOffset>,
) -> Result<Transition, WindowDenied> {
    if now < windows.check_in_deadline {
        Ok(Transition::CheckIn(CheckInStatus::OnTime))
    } else if now < windows.break_start {
        Ok(Transition::CheckIn(CheckInStatus::Late))
    } else {
        // No retroactive check-in once the morning window is gone.
        Err(WindowDenied::CheckInClosed)
    }
}

fn return_from_break(
    windows: &DayWindows,
    now: DateTime<FixedOffset>,
) -> Result<Transition, WindowDenied> {
    if now < windows.on_time_return_opens() {
        Err(WindowDenied::ReturnNotOpen)
    } else if now <= windows.break_end {
        Ok(Transition::BreakEnd(ReturnStatus::OnTime))
    } else {
        Ok(Transition::BreakEnd(ReturnStatus::Late))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::core::clock::ReferenceZone;

    fn zone() -> ReferenceZone {
        ReferenceZone::from_offset_hours(7).unwrap()
    }

    fn schedule() -> AttendanceSchedule {
        AttendanceSchedule {
            id: 1,
            check_in_deadline: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            break_start_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            break_end_time: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
            check_out_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn windows() -> DayWindows {
        let day_start = zone().day_start(Utc.with_ymd_and_hms(2025, 6, 2, 1, 0, 0).unwrap());
        DayWindows::for_day(&schedule(), day_start)
    }

    fn local(h: u32, m: u32) -> DateTime<FixedOffset> {
        NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
            .and_local_timezone(*windows().check_in_deadline.offset())
            .unwrap()
    }

    fn record(
        break_start: Option<(u32, u32)>,
        break_end: Option<(u32, u32)>,
        check_out: Option<(u32, u32)>,
    ) -> AttendanceRecord {
        let utc = |hm: (u32, u32)| local(hm.0, hm.1).with_timezone(&Utc);
        AttendanceRecord {
            id: 1,
            user_name: "budi".into(),
            day: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            ip_address: None,
            mac_address: Some("AA:BB:CC:DD:EE:FF".into()),
            device_name: Some("Pixel 7".into()),
            status: Some("on time".into()),
            check_in_time: utc((7, 45)),
            break_start_time: break_start.map(utc),
            break_end_time: break_end.map(utc),
            check_out_time: check_out.map(utc),
        }
    }

    #[test]
    fn first_check_in_before_deadline_is_on_time() {
        let decision = evaluate(None, &windows(), local(7, 59)).unwrap();
        assert_eq!(decision, Transition::CheckIn(CheckInStatus::OnTime));
    }

    #[test]
    fn first_check_in_after_deadline_is_late() {
        let decision = evaluate(None, &windows(), local(8, 30)).unwrap();
        assert_eq!(decision, Transition::CheckIn(CheckInStatus::Late));
    }

    #[test]
    fn check_in_exactly_at_deadline_is_late() {
        let decision = evaluate(None, &windows(), local(8, 0)).unwrap();
        assert_eq!(decision, Transition::CheckIn(CheckInStatus::Late));
    }

    #[test]
    fn no_retroactive_check_in_after_break_start() {
        let denied = evaluate(None, &windows(), local(13, 30)).unwrap_err();
        assert_eq!(denied, WindowDenied::CheckInClosed);
    }

    #[test]
    fn break_before_window_is_denied() {
        let rec = record(None, None, None);
        let denied = evaluate(Some(&rec), &windows(), local(11, 0)).unwrap_err();
        assert_eq!(denied, WindowDenied::BreakNotOpen);
    }

    #[test]
    fn break_inside_window_is_accepted() {
        let rec = record(None, None, None);
        let decision = evaluate(Some(&rec), &windows(), local(12, 30)).unwrap();
        assert_eq!(decision, Transition::BreakStart);
    }

    #[test]
    fn return_too_early_is_denied() {
        let rec = record(Some((12, 30)), None, None);
        let denied = evaluate(Some(&rec), &windows(), local(12, 44)).unwrap_err();
        assert_eq!(denied, WindowDenied::ReturnNotOpen);
    }

    #[test]
    fn return_within_lead_window_is_on_time() {
        let rec = record(Some((12, 30)), None, None);
        let decision = evaluate(Some(&rec), &windows(), local(12, 46)).unwrap();
        assert_eq!(decision, Transition::BreakEnd(ReturnStatus::OnTime));
    }

    #[test]
    fn return_exactly_at_break_end_is_on_time() {
        let rec = record(Some((12, 30)), None, None);
        let decision = evaluate(Some(&rec), &windows(), local(13, 0)).unwrap();
        assert_eq!(decision, Transition::BreakEnd(ReturnStatus::OnTime));
    }

    #[test]
    fn return_after_break_end_is_late() {
        let rec = record(Some((12, 30)), None, None);
        let decision = evaluate(Some(&rec), &windows(), local(13, 10)).unwrap();
        assert_eq!(decision, Transition::BreakEnd(ReturnStatus::Late));
    }

    #[test]
    fn check_out_before_time_is_denied() {
        let rec = record(Some((12, 30)), Some((13, 0)), None);
        let denied = evaluate(Some(&rec), &windows(), local(16, 59)).unwrap_err();
        assert_eq!(denied, WindowDenied::CheckOutNotOpen);
    }

    #[test]
    fn check_out_exactly_at_time_is_accepted() {
        let rec = record(Some((12, 30)), Some((13, 0)), None);
        let decision = evaluate(Some(&rec), &windows(), local(17, 0)).unwrap();
        assert_eq!(decision, Transition::CheckOut);
    }

    #[test]
    fn skipped_break_goes_straight_to_check_out() {
        let rec = record(None, None, None);
        let decision = evaluate(Some(&rec), &windows(), local(17, 1)).unwrap();
        assert_eq!(decision, Transition::CheckOut);
    }

    #[test]
    fn skipped_break_before_check_out_time_is_denied_not_break() {
        // Past break end with no break taken: the break window is gone,
        // the only remaining stage is check-out and it is not open yet.
        let rec = record(None, None, None);
        let denied = evaluate(Some(&rec), &windows(), local(14, 0)).unwrap_err();
        assert_eq!(denied, WindowDenied::CheckOutNotOpen);
    }

    #[test]
    fn completed_day_rejects_everything() {
        let rec = record(Some((12, 30)), Some((13, 0)), Some((17, 5)));
        let denied = evaluate(Some(&rec), &windows(), local(18, 0)).unwrap_err();
        assert_eq!(denied, WindowDenied::DayComplete);

        let rec_no_break = record(None, None, Some((17, 5)));
        let denied = evaluate(Some(&rec_no_break), &windows(), local(18, 0)).unwrap_err();
        assert_eq!(denied, WindowDenied::DayComplete);
    }

    #[test]
    fn windows_land_on_the_right_instants() {
        let w = windows();
        assert_eq!(w.check_in_deadline, local(8, 0));
        assert_eq!(w.break_end, local(13, 0));
        assert_eq!(w.on_time_return_opens(), local(12, 45));
    }
}
