//! Business-period resolution: weekly local schedule -> concrete UTC intervals.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use storewatch_core::{DailyHours, WeeklySchedule};

/// A UTC interval `[start, end)` during which a store is scheduled to be open.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct BusinessPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BusinessPeriod {
    pub fn minutes(&self) -> f64 {
        minutes_between(self.start, self.end)
    }
}

/// Length of `[start, end)` in (fractional) minutes.
pub fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / 60_000.0
}

/// Resolve the business periods of `schedule` that overlap `[window_start, window_end]`.
///
/// Every local calendar date touching the window contributes at most one period. The
/// start and end of each period are converted to UTC independently, using the offset
/// in effect at that local instant, then clipped to the window. Empty periods are
/// dropped. Output is ordered and non-overlapping.
pub fn resolve_business_periods(
    schedule: &WeeklySchedule,
    tz: Tz,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Vec<BusinessPeriod> {
    let mut periods = Vec::new();

    let mut day = window_start.with_timezone(&tz).date_naive();
    let last_day = window_end.with_timezone(&tz).date_naive();

    while day <= last_day {
        let Some((local_start, local_end)) = local_bounds(schedule, day) else {
            break;
        };

        let start = local_to_utc(tz, local_start).max(window_start);
        let end = local_to_utc(tz, local_end).min(window_end);

        if start < end {
            periods.push(BusinessPeriod { start, end });
        }

        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    periods
}

/// Local wall-clock bounds of the business day on `day`.
///
/// `None` only when the calendar runs out (the day after `NaiveDate::MAX`).
fn local_bounds(schedule: &WeeklySchedule, day: NaiveDate) -> Option<(NaiveDateTime, NaiveDateTime)> {
    match schedule.hours_for(day.weekday()) {
        DailyHours::Window { start, end } => Some((day.and_time(start), day.and_time(end))),
        DailyHours::AllDay => {
            let next = day.succ_opt()?;
            Some((
                day.and_time(NaiveTime::default()),
                next.and_time(NaiveTime::default()),
            ))
        }
    }
}

/// Convert a local wall-clock time in `tz` to UTC.
///
/// Ambiguous times (clocks going back) resolve to the earlier instant. Times skipped
/// by a forward jump are read with the offset in effect before the jump, which lands
/// them the same distance past the transition.
pub fn local_to_utc(tz: Tz, local: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            let before = tz.offset_from_utc_datetime(&(local - Duration::days(1))).fix();
            let utc = local - Duration::seconds(i64::from(before.local_minus_utc()));
            Utc.from_utc_datetime(&utc)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storewatch_core::BusinessHourRule;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn nine_to_five_every_day() -> WeeklySchedule {
        let rules: Vec<_> = (0..7)
            .map(|d| BusinessHourRule::new("s1", d, t(9, 0), t(17, 0)))
            .collect();
        WeeklySchedule::from_rules(&rules).unwrap()
    }

    #[test]
    fn always_open_store_covers_whole_window() {
        let schedule = WeeklySchedule::default();
        let start = utc(2024, 1, 10, 6, 30);
        let end = utc(2024, 1, 11, 6, 30);

        let periods = resolve_business_periods(&schedule, chrono_tz::UTC, start, end);

        assert_eq!(
            periods,
            vec![
                BusinessPeriod { start, end: utc(2024, 1, 11, 0, 0) },
                BusinessPeriod { start: utc(2024, 1, 11, 0, 0), end },
            ]
        );
        let total: f64 = periods.iter().map(BusinessPeriod::minutes).sum();
        assert_eq!(total, 1440.0);
    }

    #[test]
    fn periods_are_clipped_to_the_window() {
        let schedule = nine_to_five_every_day();
        // 2024-01-10 is a Wednesday; Kolkata is UTC+05:30 year round.
        let tz: Tz = "Asia/Kolkata".parse().unwrap();
        let start = utc(2024, 1, 10, 5, 0);
        let end = utc(2024, 1, 10, 6, 0);

        let periods = resolve_business_periods(&schedule, tz, start, end);

        // 09:00 IST = 03:30 UTC, 17:00 IST = 11:30 UTC -> whole window is open.
        assert_eq!(periods, vec![BusinessPeriod { start, end }]);
    }

    #[test]
    fn closed_hours_produce_no_period() {
        let schedule = nine_to_five_every_day();
        let start = utc(2024, 1, 10, 18, 0);
        let end = utc(2024, 1, 10, 19, 0);

        assert!(resolve_business_periods(&schedule, chrono_tz::UTC, start, end).is_empty());
    }

    #[test]
    fn rule_ending_before_it_starts_yields_nothing_for_that_day() {
        let rules = vec![BusinessHourRule::new("s1", 2, t(22, 0), t(2, 0))];
        let schedule = WeeklySchedule::from_rules(&rules).unwrap();
        // Wednesday 2024-01-10, whole UTC day.
        let periods = resolve_business_periods(
            &schedule,
            chrono_tz::UTC,
            utc(2024, 1, 10, 0, 0),
            utc(2024, 1, 10, 23, 0),
        );
        assert!(periods.is_empty());
    }

    #[test]
    fn daylight_saving_shift_changes_utc_boundaries() {
        // New York springs forward on Sunday 2024-03-10 (UTC-5 -> UTC-4).
        let schedule = nine_to_five_every_day();
        let tz: Tz = "America/New_York".parse().unwrap();
        let now = utc(2024, 3, 13, 23, 0);
        let week_ago = now - Duration::weeks(1);

        let periods = resolve_business_periods(&schedule, tz, week_ago, now);

        let saturday = periods
            .iter()
            .find(|p| p.start.date_naive() == NaiveDate::from_ymd_opt(2024, 3, 9).unwrap())
            .unwrap();
        assert_eq!(saturday.start, utc(2024, 3, 9, 14, 0));
        assert_eq!(saturday.end, utc(2024, 3, 9, 22, 0));

        let monday = periods
            .iter()
            .find(|p| p.start.date_naive() == NaiveDate::from_ymd_opt(2024, 3, 11).unwrap())
            .unwrap();
        assert_eq!(monday.start, utc(2024, 3, 11, 13, 0));
        assert_eq!(monday.end, utc(2024, 3, 11, 21, 0));
    }

    #[test]
    fn all_day_default_is_23_hours_on_spring_forward_day() {
        let schedule = WeeklySchedule::default();
        let tz: Tz = "America/New_York".parse().unwrap();

        let periods = resolve_business_periods(
            &schedule,
            tz,
            utc(2024, 3, 10, 5, 0),
            utc(2024, 3, 11, 4, 0),
        );

        assert_eq!(periods.len(), 1);
        assert_eq!(periods[0].minutes(), 23.0 * 60.0);
    }

    #[test]
    fn skipped_local_time_uses_pre_transition_offset() {
        let tz: Tz = "America/New_York".parse().unwrap();
        let gap = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap().and_time(t(2, 30));
        assert_eq!(local_to_utc(tz, gap), utc(2024, 3, 10, 7, 30));
    }

    #[test]
    fn ambiguous_local_time_resolves_to_earliest() {
        let tz: Tz = "America/New_York".parse().unwrap();
        let fold = NaiveDate::from_ymd_opt(2024, 11, 3).unwrap().and_time(t(1, 30));
        assert_eq!(local_to_utc(tz, fold), utc(2024, 11, 3, 5, 30));
    }
}
